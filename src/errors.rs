//! Error types for the retrieval engine.
//!
//! One taxonomy for the whole crate: ingestion failures are per-document,
//! service failures are recovered locally via fallbacks, and only total
//! unavailability of the embedding service on the query path is user-visible.

use thiserror::Error;

/// Main error type for the retrieval engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Raw content is empty or unprocessable; fatal for that document only
    #[error("Chunking failed: {0}")]
    Chunking(String),

    /// External collaborator unreachable or timed out
    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// Embedding service down on the query path; surfaced to the caller
    #[error("Search temporarily unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Inconsistent embedding dimensionality; programming error, not retried
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Agentic run exceeded its constraints or hit an internal fault.
    ///
    /// The built-in orchestrator absorbs truncation by synthesizing from
    /// partial results; this variant is for alternative orchestrations that
    /// surface truncation to the caller instead.
    #[error("Agentic run aborted: {0}")]
    OrchestratorAborted(String),

    /// Invalid phase transition in the agentic run loop
    #[error("Invalid phase transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl EngineError {
    /// Shorthand for an embedding-service failure
    pub fn embedding_unavailable(reason: impl Into<String>) -> Self {
        EngineError::ServiceUnavailable {
            service: "Embedding service".to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a language-model failure
    pub fn llm_unavailable(reason: impl Into<String>) -> Self {
        EngineError::ServiceUnavailable {
            service: "Language model service".to_string(),
            reason: reason.into(),
        }
    }
}
