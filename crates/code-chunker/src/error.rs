use crate::types::ChunkId;
use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while building chunks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkerError {
    /// Chunk text was empty after trimming
    #[error("Empty content provided for {source_id}")]
    EmptyContent { source_id: String },

    /// Chunk id does not belong to this store
    #[error("Unknown chunk {0}")]
    UnknownChunk(ChunkId),
}

impl ChunkerError {
    /// Create an empty content error
    pub fn empty_content(source_id: impl Into<String>) -> Self {
        Self::EmptyContent {
            source_id: source_id.into(),
        }
    }
}
