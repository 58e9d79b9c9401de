mod config;
mod context;
mod coordinator;
mod error;

pub use config::{CorpusSettings, RetrievalConfig, CODE_CORPUS, DOCS_CORPUS};
pub use context::{render_context, PromptMessages, NOT_FOUND_ANSWER, SYSTEM_INSTRUCTIONS};
pub use coordinator::{merge_ranked, Corpus, RankedHit, RetrievalCoordinator, RetrievalResult};
pub use error::{Result, SearchError};
