use crate::error::{Result, VectorStoreError};
use crate::types::SearchHit;
use crate::vector::{cosine_similarity, EmbeddingVector};
use tutor_code_chunker::ChunkId;

/// Brute-force cosine index for one corpus.
///
/// Entries keep insertion order; duplicates are allowed. The dimension is
/// fixed by the first inserted vector unless set up front.
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    dimension: Option<usize>,
    entries: Vec<(ChunkId, EmbeddingVector)>,
}

impl SimilarityIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index that only accepts vectors of `dimension` components
    #[must_use]
    pub const fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            entries: Vec::new(),
        }
    }

    /// Append a vector for `chunk`
    pub fn insert(&mut self, chunk: ChunkId, vector: EmbeddingVector) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != vector.len() => {
                return Err(VectorStoreError::InvalidDimension {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
            None => self.dimension = Some(vector.len()),
        }

        self.entries.push((chunk, vector));
        Ok(())
    }

    /// Score every entry against `query` and return the best `top_k` whose
    /// score is at least `threshold`, best first. Equal scores keep insertion
    /// order.
    ///
    /// An empty index answers with no hits whatever the query looks like.
    pub fn query(&self, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<SearchHit>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(VectorStoreError::InvalidDimension {
                    expected,
                    actual: query.len(),
                });
            }
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|(chunk, vector)| SearchHit {
                chunk: *chunk,
                score: cosine_similarity(query, vector),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();

        // Stable: ties keep insertion order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);

        log::debug!(
            "Index query: {} entries, {} hits (top_k={top_k}, threshold={threshold})",
            self.entries.len(),
            hits.len()
        );
        Ok(hits)
    }

    #[must_use]
    pub const fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
