use serde::{Deserialize, Serialize};
use tutor_code_chunker::ChunkId;

/// One scored entry of an index query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: ChunkId,
    pub score: f32,
}
