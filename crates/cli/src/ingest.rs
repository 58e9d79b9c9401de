use crate::scanner::{FileScanner, SourceFile, SourceKind};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tokio::task::JoinSet;
use tutor_code_chunker::{ChunkId, ChunkStore};
use tutor_search::{
    RetrievalConfig, RetrievalCoordinator, RetrievalResult, CODE_CORPUS, DOCS_CORPUS,
};
use tutor_vector_store::{Embedder, SimilarityIndex};

const EMBED_BATCH_SIZE: usize = 32;

/// Counts reported after ingesting a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub code_files: usize,
    pub doc_files: usize,
    pub code_chunks: usize,
    pub doc_chunks: usize,
    /// Sources whose scan ended with open braces, strings or comments
    pub unbalanced_files: Vec<String>,
}

/// Everything needed to answer questions about one project
pub struct KnowledgeBase {
    store: ChunkStore,
    coordinator: RetrievalCoordinator,
    stats: IngestStats,
}

/// Chunks cut from one file, before they receive global ids
struct SegmentedFile {
    position: usize,
    kind: SourceKind,
    source_id: String,
    chunks: ChunkStore,
    unbalanced: bool,
}

impl KnowledgeBase {
    /// Scan `root`, segment every source, embed the chunks and index them per corpus
    pub async fn build(
        root: &Path,
        embedder: &dyn Embedder,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        let files = FileScanner::new(root).scan();
        let segmented = segment_files(files).await?;

        let mut store = ChunkStore::new();
        let mut stats = IngestStats::default();
        let mut code_ids = Vec::new();
        let mut doc_ids = Vec::new();

        for file in segmented {
            if file.unbalanced {
                stats.unbalanced_files.push(file.source_id.clone());
            }
            let ids: Vec<ChunkId> = file
                .chunks
                .into_chunks()
                .into_iter()
                .map(|chunk| store.push(chunk))
                .collect();
            log::debug!("{}: {} chunks", file.source_id, ids.len());

            match file.kind {
                SourceKind::JavaScript => {
                    stats.code_files += 1;
                    code_ids.extend(ids);
                }
                SourceKind::Markdown => {
                    stats.doc_files += 1;
                    doc_ids.extend(ids);
                }
            }
        }
        stats.code_chunks = code_ids.len();
        stats.doc_chunks = doc_ids.len();

        let code_index = embed_into_index(&store, &code_ids, embedder).await?;
        let docs_index = embed_into_index(&store, &doc_ids, embedder).await?;
        let coordinator = RetrievalCoordinator::from_config(
            config,
            [
                (CODE_CORPUS.to_string(), code_index),
                (DOCS_CORPUS.to_string(), docs_index),
            ],
        )?;

        log::info!(
            "Indexed {} code chunks from {} files and {} doc sections from {} files ({})",
            stats.code_chunks,
            stats.code_files,
            stats.doc_chunks,
            stats.doc_files,
            embedder.model_id()
        );
        Ok(Self {
            store,
            coordinator,
            stats,
        })
    }

    /// Embed `question` and retrieve the best chunks across corpora
    pub async fn search<'a>(
        &'a self,
        embedder: &dyn Embedder,
        question: &str,
    ) -> Result<Vec<RetrievalResult<'a>>> {
        let query = embedder
            .embed(question)
            .await
            .context("failed to embed query")?;
        let results = self.coordinator.retrieve_from(&self.store, &query)?;
        Ok(results)
    }

    #[must_use]
    pub const fn stats(&self) -> &IngestStats {
        &self.stats
    }

    #[must_use]
    pub const fn store(&self) -> &ChunkStore {
        &self.store
    }

    #[must_use]
    pub const fn coordinator(&self) -> &RetrievalCoordinator {
        &self.coordinator
    }
}

/// Read and segment every file on the blocking pool, returning them in scan order
async fn segment_files(files: Vec<SourceFile>) -> Result<Vec<SegmentedFile>> {
    let mut tasks = JoinSet::new();
    for (position, file) in files.into_iter().enumerate() {
        tasks.spawn_blocking(move || segment_file(position, file));
    }

    let mut segmented = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined.context("segmentation task panicked")? {
            Ok(file) => segmented.push(file),
            Err(err) => log::warn!("Skipping unreadable source: {err:#}"),
        }
    }
    segmented.sort_by_key(|file| file.position);
    Ok(segmented)
}

fn segment_file(position: usize, file: SourceFile) -> Result<SegmentedFile> {
    let content = std::fs::read_to_string(&file.path)
        .with_context(|| format!("failed to read {}", file.path.display()))?;

    let mut chunks = ChunkStore::new();
    let ingest = match file.kind {
        SourceKind::JavaScript => chunks.add_javascript(&file.source_id, &content),
        SourceKind::Markdown => chunks.add_markdown(&file.source_id, &content),
    };

    Ok(SegmentedFile {
        position,
        kind: file.kind,
        source_id: file.source_id,
        chunks,
        unbalanced: ingest.is_unbalanced(),
    })
}

async fn embed_into_index(
    store: &ChunkStore,
    ids: &[ChunkId],
    embedder: &dyn Embedder,
) -> Result<SimilarityIndex> {
    let mut index = SimilarityIndex::new();
    for batch in ids.chunks(EMBED_BATCH_SIZE) {
        let texts = batch
            .iter()
            .map(|id| store.resolve(*id).map(|chunk| chunk.embedding_text()))
            .collect::<tutor_code_chunker::Result<Vec<_>>>()?;
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .context("failed to embed chunks")?;
        for (id, vector) in batch.iter().zip(vectors) {
            index.insert(*id, vector)?;
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;
    use tutor_vector_store::StubEmbedder;

    fn write_project(root: &Path) {
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(
            root.join("src/quadrille.js"),
            "class Quadrille {\n\
             \x20 invert(cells) { return cells.map((c) => !c); }\n\
             \x20 fill(cells, value) { return cells.fill(value); }\n\
             }\n",
        )
        .unwrap();
        fs::write(root.join("src/broken.js"), "function open() { if (x) {").unwrap();
        fs::write(
            root.join("README.md"),
            "# Quadrille\nA grid library.\n\n## Invert\nSwaps filled and empty cells.\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn builds_both_corpora_in_scan_order() {
        let temp = tempdir().unwrap();
        write_project(temp.path());
        let embedder = StubEmbedder::new(128);

        let kb = KnowledgeBase::build(temp.path(), &embedder, &RetrievalConfig::default())
            .await
            .unwrap();

        assert_eq!(
            kb.stats(),
            &IngestStats {
                code_files: 2,
                doc_files: 1,
                code_chunks: 6,
                doc_chunks: 2,
                unbalanced_files: vec!["src/broken.js".to_string()],
            }
        );

        let sources: Vec<&str> = kb.store().iter().map(|(_, c)| c.source_id()).collect();
        assert_eq!(
            sources,
            vec![
                "README.md",
                "README.md",
                "src/broken.js",
                "src/broken.js",
                "src/quadrille.js",
                "src/quadrille.js",
                "src/quadrille.js",
                "src/quadrille.js",
            ]
        );
        assert_eq!(kb.coordinator().corpus(CODE_CORPUS).unwrap().index().len(), 6);
        assert_eq!(kb.coordinator().corpus(DOCS_CORPUS).unwrap().index().len(), 2);
    }

    #[tokio::test]
    async fn search_finds_the_matching_function() {
        let temp = tempdir().unwrap();
        write_project(temp.path());
        let embedder = StubEmbedder::default();

        let kb = KnowledgeBase::build(temp.path(), &embedder, &RetrievalConfig::default())
            .await
            .unwrap();
        let results = kb.search(&embedder, "invert cells").await.unwrap();

        assert!(!results.is_empty());
        assert!(results
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score));
        assert!(results
            .iter()
            .any(|r| r.corpus == CODE_CORPUS && r.chunk.text().starts_with("invert(cells)")));
    }

    #[tokio::test]
    async fn empty_project_yields_no_results() {
        let temp = tempdir().unwrap();
        let embedder = StubEmbedder::default();

        let kb = KnowledgeBase::build(temp.path(), &embedder, &RetrievalConfig::default())
            .await
            .unwrap();

        assert_eq!(kb.stats(), &IngestStats::default());
        assert!(kb.search(&embedder, "anything").await.unwrap().is_empty());
    }
}
