use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Position of a chunk inside its [`ChunkStore`](crate::ChunkStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(usize);

impl ChunkId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Provenance of a chunk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkKind {
    /// Segment of a JavaScript source file
    Code,
    /// Section of a documentation file, titled by its header when known
    Documentation { section: Option<String> },
}

impl ChunkKind {
    #[must_use]
    pub const fn is_code(&self) -> bool {
        matches!(self, Self::Code)
    }

    #[must_use]
    pub fn section(&self) -> Option<&str> {
        match self {
            Self::Code => None,
            Self::Documentation { section } => section.as_deref(),
        }
    }
}

/// An immutable unit of retrievable content.
///
/// The text is always trimmed and never empty; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    text: String,
    source_id: String,
    kind: ChunkKind,
}

impl Chunk {
    /// Create a chunk, trimming surrounding whitespace from `text`
    pub fn new(
        text: impl Into<String>,
        source_id: impl Into<String>,
        kind: ChunkKind,
    ) -> Result<Self> {
        let source_id = source_id.into();
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChunkerError::empty_content(source_id));
        }
        let text = if trimmed.len() == text.len() {
            text
        } else {
            trimmed.to_string()
        };

        Ok(Self {
            text,
            source_id,
            kind,
        })
    }

    /// Create a code chunk
    pub fn code(source_id: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        Self::new(text, source_id, ChunkKind::Code)
    }

    /// Create a documentation chunk
    pub fn documentation(
        source_id: impl Into<String>,
        section: Option<String>,
        text: impl Into<String>,
    ) -> Result<Self> {
        Self::new(text, source_id, ChunkKind::Documentation { section })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    #[must_use]
    pub const fn kind(&self) -> &ChunkKind {
        &self.kind
    }

    /// Last path component of the source id (the whole id when it has none)
    #[must_use]
    pub fn file_name(&self) -> &str {
        Path::new(&self.source_id)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.source_id)
    }

    /// Text handed to the embedding model: the chunk prefixed with a short
    /// provenance header. The stored text stays untouched.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        match &self.kind {
            ChunkKind::Code => format!(
                "File: {}\nLanguage: JavaScript\nCode Definition:\n{}",
                self.file_name(),
                self.text
            ),
            ChunkKind::Documentation { section } => format!(
                "Source: {}\nSection: {}\nContent:\n{}",
                self.file_name(),
                section.as_deref().unwrap_or("(untitled)"),
                self.text
            ),
        }
    }
}
