//! Error types for study orchestration.

use studystage_core::error::StudyError;

/// Errors from the chat, digitization and study-assistant layer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Retrieval returned nothing, usually because no document is indexed yet.
    #[error("no indexed context found; upload documents first")]
    NoContext,
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("document digitization error: {0}")]
    Digitize(String),
    #[error(transparent)]
    Retrieval(#[from] StudyError),
}
