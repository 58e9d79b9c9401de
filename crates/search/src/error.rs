use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] tutor_vector_store::VectorStoreError),

    #[error("Chunk store error: {0}")]
    ChunkerError(#[from] tutor_code_chunker::ChunkerError),

    #[error("Unknown corpus '{0}'")]
    UnknownCorpus(String),

    #[error("Corpus '{0}' registered twice")]
    DuplicateCorpus(String),

    #[error("Invalid retrieval config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
