use crate::config::{CorpusSettings, RetrievalConfig};
use crate::error::{Result, SearchError};
use serde::Serialize;
use tutor_code_chunker::{Chunk, ChunkId, ChunkStore};
use tutor_vector_store::SimilarityIndex;

/// A named index together with its ranking knobs
#[derive(Debug, Clone)]
pub struct Corpus {
    name: String,
    index: SimilarityIndex,
    settings: CorpusSettings,
}

impl Corpus {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    fn query(&self, query: &[f32]) -> Result<Vec<RankedHit<'_>>> {
        let hits = self
            .index
            .query(query, self.settings.top_k, self.settings.threshold)?;
        Ok(hits
            .into_iter()
            .map(|hit| RankedHit {
                corpus: &self.name,
                chunk: hit.chunk,
                score: hit.score,
            })
            .collect())
    }
}

/// Hit tagged with the corpus it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedHit<'a> {
    pub corpus: &'a str,
    pub chunk: ChunkId,
    pub score: f32,
}

/// Hit resolved against the chunk store, ready for prompt assembly
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetrievalResult<'a> {
    pub corpus: &'a str,
    pub chunk_id: ChunkId,
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// Concatenate per-corpus rankings and re-rank them by score.
///
/// The sort is stable, so equal scores keep corpus order and, within a corpus,
/// their per-corpus rank. `cap` truncates the merged list when set.
#[must_use]
pub fn merge_ranked<'a>(
    per_corpus: impl IntoIterator<Item = Vec<RankedHit<'a>>>,
    cap: Option<usize>,
) -> Vec<RankedHit<'a>> {
    let mut merged: Vec<RankedHit<'a>> = per_corpus.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    if let Some(cap) = cap {
        merged.truncate(cap);
    }
    merged
}

/// Two-stage retrieval over several corpora: each corpus filters and cuts
/// its own top-k, then the survivors are merged into one global ranking.
///
/// Per-corpus cuts keep a corpus full of weak matches from crowding out a
/// corpus with a few strong ones.
#[derive(Debug, Clone, Default)]
pub struct RetrievalCoordinator {
    corpora: Vec<Corpus>,
    global_cap: Option<usize>,
}

impl RetrievalCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_global_cap(mut self, cap: Option<usize>) -> Self {
        self.global_cap = cap;
        self
    }

    /// Register `index` under `name`; registration order breaks score ties.
    pub fn add_corpus(
        &mut self,
        name: impl Into<String>,
        index: SimilarityIndex,
        settings: CorpusSettings,
    ) -> Result<()> {
        let name = name.into();
        if self.corpus(&name).is_some() {
            return Err(SearchError::DuplicateCorpus(name));
        }
        settings.validate(&name)?;

        log::debug!(
            "Registered corpus '{name}' ({} vectors, top_k={}, threshold={})",
            index.len(),
            settings.top_k,
            settings.threshold
        );
        self.corpora.push(Corpus {
            name,
            index,
            settings,
        });
        Ok(())
    }

    /// Register every index in `indices`, taking each corpus' settings from
    /// `config`
    pub fn from_config(
        config: &RetrievalConfig,
        indices: impl IntoIterator<Item = (String, SimilarityIndex)>,
    ) -> Result<Self> {
        let mut coordinator = Self::new().with_global_cap(config.global_cap);
        for (name, index) in indices {
            let settings = config.settings_for(&name);
            coordinator.add_corpus(name, index, settings)?;
        }
        Ok(coordinator)
    }

    #[must_use]
    pub fn corpus(&self, name: &str) -> Option<&Corpus> {
        self.corpora.iter().find(|corpus| corpus.name == name)
    }

    pub fn corpora(&self) -> impl Iterator<Item = &Corpus> + '_ {
        self.corpora.iter()
    }

    #[must_use]
    pub const fn global_cap(&self) -> Option<usize> {
        self.global_cap
    }

    /// Query every corpus and merge the results, best first
    pub fn retrieve(&self, query: &[f32]) -> Result<Vec<RankedHit<'_>>> {
        let per_corpus = self
            .corpora
            .iter()
            .map(|corpus| corpus.query(query))
            .collect::<Result<Vec<_>>>()?;

        let merged = merge_ranked(per_corpus, self.global_cap);
        log::debug!(
            "Retrieved {} hits across {} corpora",
            merged.len(),
            self.corpora.len()
        );
        Ok(merged)
    }

    /// Query a single corpus by name
    pub fn retrieve_corpus(&self, name: &str, query: &[f32]) -> Result<Vec<RankedHit<'_>>> {
        let corpus = self
            .corpus(name)
            .ok_or_else(|| SearchError::UnknownCorpus(name.to_string()))?;
        corpus.query(query)
    }

    /// [`retrieve`](Self::retrieve), with every hit resolved to its chunk
    pub fn retrieve_from<'a>(
        &'a self,
        store: &'a ChunkStore,
        query: &[f32],
    ) -> Result<Vec<RetrievalResult<'a>>> {
        self.retrieve(query)?
            .into_iter()
            .map(|hit| -> Result<RetrievalResult<'a>> {
                Ok(RetrievalResult {
                    corpus: hit.corpus,
                    chunk_id: hit.chunk,
                    chunk: store.resolve(hit.chunk)?,
                    score: hit.score,
                })
            })
            .collect()
    }
}
