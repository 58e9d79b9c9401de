use crate::error::Result;
use crate::vector::{normalize, EmbeddingVector};
use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_STUB_DIMENSION: usize = 256;

/// Text → vector collaborator.
///
/// Indices never call this themselves; ingestion embeds first and inserts the
/// vectors only once embedding succeeded.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model producing the vectors
    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Deterministic offline embedder: hashed bag of lowercase words, L2-normalised.
///
/// Texts sharing words land close together, which is enough to exercise the
/// pipeline without a model server.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
    model_id: String,
}

impl StubEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: format!("stub-{dimension}"),
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn embed_sync(&self, text: &str) -> EmbeddingVector {
        let mut vec = vec![0.0_f32; self.dimension];
        if self.dimension == 0 {
            return vec;
        }

        for word in text.unicode_words() {
            let hash = fnv1a_64(word.to_lowercase().as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }

        normalize(&mut vec);
        vec
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DIMENSION)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        Ok(self.embed_sync(text))
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
