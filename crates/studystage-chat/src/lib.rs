//! Study orchestration for StudyStage.
//!
//! Wraps the shared [`studystage_vector::SimilarityIndex`] with a chat model
//! to answer questions, write quizzes, plan study time and extract keywords
//! from uploaded course material.

pub mod assistant;
pub mod client;
pub mod document;
pub mod error;
pub mod prompts;

pub use assistant::{
    AssistantSettings, IngestReport, Quiz, Source, StudyAnswer, StudyAssistant, StudyPlan,
};
pub use client::{ChatMessage, ChatService, MockChat, Role, UpstageChat};
pub use document::{html_to_text, DocumentDigitizer, PlainTextDigitizer, UpstageDocumentParser};
pub use error::ChatError;
pub use prompts::{merge_contexts, parse_keywords, QuizLevel};
