//! StudyStage API crate - axum HTTP server and route handlers.
//!
//! Exposes document upload, semantic search, question answering, quiz
//! generation, study planning and keyword extraction over JSON.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
