use thiserror::Error;

/// Failures of the history persistence layer. Backend I/O errors are
/// converted here at the store boundary; callers never see a raw driver
/// error unwind through the agent.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Malformed record, rejected before any I/O.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Backend unreachable or erroring; the operation is not committed.
    #[error("history backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl From<rusqlite::Error> for HistoryError {
    fn from(err: rusqlite::Error) -> Self {
        HistoryError::BackendUnavailable(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for HistoryError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        HistoryError::BackendUnavailable(err.to_string())
    }
}

/// Failures of the model-side collaborators.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Chat completion failed or timed out; the turn is aborted without an
    /// assistant record.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Embedding call failed; a vector-backend write depending on it is not
    /// committed.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),
}

/// Startup configuration problems. Fatal before the server binds, never
/// raised mid-conversation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingValue(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("configuration file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for a conversation turn and for startup wiring.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("empty input")]
    EmptyInput,

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
