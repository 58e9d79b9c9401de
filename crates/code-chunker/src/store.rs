use crate::error::{ChunkerError, Result};
use crate::markdown::split_sections;
use crate::segmenter::{segment_with_report, ScanReport};
use crate::types::{Chunk, ChunkId, ChunkKind};

/// Ordered, append-only owner of chunk text.
///
/// Indices refer to chunks by [`ChunkId`] only, so several corpora can share
/// one store without copying text.
#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
}

/// Outcome of ingesting one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIngest {
    /// Ids of the chunks appended for this source, in source order
    pub ids: Vec<ChunkId>,
    /// Scanner report for code sources; `None` for documentation
    pub scan: Option<ScanReport>,
}

impl SourceIngest {
    /// Code source that ended with open braces, strings or block comments
    #[must_use]
    pub fn is_unbalanced(&self) -> bool {
        self.scan.is_some_and(|report| !report.is_balanced())
    }
}

impl ChunkStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return its id
    pub fn push(&mut self, chunk: Chunk) -> ChunkId {
        let id = ChunkId::new(self.chunks.len());
        self.chunks.push(chunk);
        id
    }

    /// Segment a JavaScript source and append every chunk it yields.
    ///
    /// Unbalanced input is logged and kept; it never aborts ingestion.
    pub fn add_javascript(&mut self, source_id: &str, content: &str) -> SourceIngest {
        let (segments, report) = segment_with_report(content);
        if !report.is_balanced() {
            log::warn!(
                "Unbalanced input in {source_id}: depth {} at end, unterminated {:?}",
                report.final_depth,
                report.unterminated()
            );
        }

        let ids = segments
            .into_iter()
            .filter_map(|text| Chunk::new(text, source_id, ChunkKind::Code).ok())
            .map(|chunk| self.push(chunk))
            .collect::<Vec<_>>();

        log::debug!("Segmented {source_id} into {} chunks", ids.len());
        SourceIngest {
            ids,
            scan: Some(report),
        }
    }

    /// Split a Markdown document by headers and append one chunk per section
    pub fn add_markdown(&mut self, source_id: &str, content: &str) -> SourceIngest {
        let ids = split_sections(content)
            .into_iter()
            .filter_map(|section| {
                Chunk::documentation(source_id, Some(section.title.to_string()), section.body)
                    .ok()
            })
            .map(|chunk| self.push(chunk))
            .collect::<Vec<_>>();

        log::debug!("Split {source_id} into {} sections", ids.len());
        SourceIngest { ids, scan: None }
    }

    #[must_use]
    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id.index())
    }

    /// Like [`get`](Self::get), but an unknown id is an error
    pub fn resolve(&self, id: ChunkId) -> Result<&Chunk> {
        self.get(id).ok_or(ChunkerError::UnknownChunk(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> + '_ {
        self.chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| (ChunkId::new(index), chunk))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Give up the chunks in id order, e.g. to move them into another store
    #[must_use]
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }
}
