use thiserror::Error;

/// Top-level error type for StudyStage.
///
/// Subsystem crates define their own error types where they need extra
/// variants and implement `From<StudyError>` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    /// Text or query was empty or whitespace-only.
    #[error("input text is empty")]
    EmptyInput,

    /// Every chunk of the input failed to embed; no vector could be produced.
    #[error("embedding unavailable: all {chunks} chunk(s) failed")]
    EmbeddingUnavailable { chunks: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An external service call failed (network, non-2xx status, malformed body).
    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for StudyError {
    fn from(err: toml::de::Error) -> Self {
        StudyError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for StudyError {
    fn from(err: toml::ser::Error) -> Self {
        StudyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for StudyError {
    fn from(err: serde_json::Error) -> Self {
        StudyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for StudyStage operations.
pub type Result<T> = std::result::Result<T, StudyError>;
