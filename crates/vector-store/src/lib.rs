//! # Tutor Vector Store
//!
//! In-memory similarity retrieval over pre-embedded chunks.
//!
//! ## Architecture
//!
//! ```text
//! ChunkStore (owns text)
//!     │
//!     ├──> Embedder (external model, or the offline stub)
//!     │      └─> Vec<f32>
//!     │
//!     └──> SimilarityIndex (one per corpus)
//!            ├─> (ChunkId, vector) pairs, append-only
//!            └─> cosine scoring, threshold filter, stable top-k
//! ```
//!
//! An index is filled during ingestion and only read afterwards. `query`
//! takes `&self`, so a built index can be shared across threads freely.
//!
//! ## Example
//!
//! ```rust
//! use tutor_code_chunker::ChunkId;
//! use tutor_vector_store::SimilarityIndex;
//!
//! let mut index = SimilarityIndex::new();
//! index.insert(ChunkId::new(0), vec![1.0, 0.0]).unwrap();
//! index.insert(ChunkId::new(1), vec![0.0, 1.0]).unwrap();
//!
//! let hits = index.query(&[1.0, 0.1], 5, 0.5).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].chunk, ChunkId::new(0));
//! ```

mod embeddings;
mod error;
mod index;
mod types;
mod vector;

pub use embeddings::{Embedder, StubEmbedder, DEFAULT_STUB_DIMENSION};
pub use error::{Result, VectorStoreError};
pub use index::SimilarityIndex;
pub use types::SearchHit;
pub use vector::{cosine_similarity, magnitude, normalize, EmbeddingVector};

// Re-export chunk identity for convenience
pub use tutor_code_chunker::ChunkId;
