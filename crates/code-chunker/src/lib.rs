//! # Tutor Code Chunker
//!
//! Cheap, grammar-free segmentation of JavaScript sources (and Markdown docs) into
//! retrievable chunks.
//!
//! ## Architecture
//!
//! ```text
//! Raw source text
//!     │
//!     ├──> Segmenter (single pass, brace depth + string/comment modes)
//!     │      └─> trimmed &str chunks in source order
//!     │
//!     ├──> Markdown splitter (ATX headers)
//!     │      └─> (section, body) pairs
//!     │
//!     └──> ChunkStore
//!            └─> Chunk { text, source_id, kind } addressed by ChunkId
//! ```
//!
//! The segmenter only splits at the outermost block boundary: entering depth 1,
//! returning to depth 1, and `;` at depth 1. Nested bodies stay whole inside
//! their enclosing chunk.
//!
//! ## Example
//!
//! ```rust
//! use tutor_code_chunker::segment;
//!
//! let code = "class Grid {\n  static size = 3;\n  fill() { return 1; }\n}";
//! let chunks: Vec<&str> = segment(code).collect();
//!
//! assert_eq!(chunks[0], "class Grid {");
//! assert_eq!(chunks[1], "static size = 3;");
//! assert_eq!(chunks[2], "fill() { return 1; }");
//! ```

mod error;
mod markdown;
mod segmenter;
mod store;
mod types;

pub use error::{ChunkerError, Result};
pub use markdown::{split_sections, MarkdownSection};
pub use segmenter::{segment, segment_with_report, Quote, ScanMode, ScanReport, Segments};
pub use store::{ChunkStore, SourceIngest};
pub use types::{Chunk, ChunkId, ChunkKind};
