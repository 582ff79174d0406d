//! Study assistant: retrieval plus chat over indexed course material.
//!
//! Every question-style operation follows the same route: search the shared
//! index, merge the top hits into a bounded context, build a prompt and ask
//! the chat service. The plan operation may skip retrieval entirely.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use studystage_core::config::RetrievalConfig;
use studystage_core::types::{filename_metadata, metadata_filename};
use studystage_vector::{InsertOutcome, SearchHit, SimilarityIndex, DEFAULT_TOP_K};

use crate::client::ChatService;
use crate::document::DocumentDigitizer;
use crate::error::ChatError;
use crate::prompts::{self, QuizLevel, MAX_CONTEXT_CHARS};

/// Maximum length in characters for questions, topics and goals.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

const MAX_PLAN_DAYS: u32 = 365;
const MAX_PLAN_HOURS: u32 = 24;
const EXCERPT_CHARS: usize = 300;

/// Metadata key holding the RFC 3339 ingestion time.
pub const INGESTED_AT_KEY: &str = "ingested_at";

/// A retrieved passage cited by an answer or quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub filename: Option<String>,
    pub excerpt: String,
    pub score: f64,
}

impl From<&SearchHit> for Source {
    fn from(hit: &SearchHit) -> Self {
        Self {
            filename: metadata_filename(&hit.metadata).map(String::from),
            excerpt: hit.text.chars().take(EXCERPT_CHARS).collect(),
            score: hit.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub topic: String,
    pub level: QuizLevel,
    pub text: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlan {
    pub goal: String,
    pub days: u32,
    pub hours: u32,
    pub text: String,
    /// Whether indexed documents were included in the prompt.
    pub used_documents: bool,
}

/// Result of digitizing and indexing an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub filename: String,
    pub extracted_chars: usize,
    pub outcome: InsertOutcome,
}

/// Retrieval knobs used by the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistantSettings {
    pub top_k: usize,
    pub max_context_chars: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_context_chars: MAX_CONTEXT_CHARS,
        }
    }
}

impl From<&RetrievalConfig> for AssistantSettings {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.default_top_k,
            max_context_chars: config.max_context_chars,
        }
    }
}

/// Coordinates the shared index with the chat model.
pub struct StudyAssistant {
    index: Arc<SimilarityIndex>,
    chat: Arc<dyn ChatService>,
    keyword_chat: Arc<dyn ChatService>,
    settings: AssistantSettings,
}

impl std::fmt::Debug for StudyAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyAssistant")
            .field("documents", &self.index.len())
            .field("settings", &self.settings)
            .finish()
    }
}

fn check_message(text: &str) -> Result<&str, ChatError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
    }
    Ok(trimmed)
}

impl StudyAssistant {
    pub fn new(index: Arc<SimilarityIndex>, chat: Arc<dyn ChatService>) -> Self {
        Self {
            index,
            keyword_chat: Arc::clone(&chat),
            chat,
            settings: AssistantSettings::default(),
        }
    }

    /// Use a separate (usually smaller) model for keyword extraction.
    pub fn with_keyword_chat(mut self, chat: Arc<dyn ChatService>) -> Self {
        self.keyword_chat = chat;
        self
    }

    pub fn with_settings(mut self, settings: AssistantSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn index(&self) -> &Arc<SimilarityIndex> {
        &self.index
    }

    pub fn settings(&self) -> AssistantSettings {
        self.settings
    }

    /// Index raw text, tagging it with the file name and ingestion time.
    pub async fn ingest_text(
        &self,
        text: &str,
        filename: Option<&str>,
    ) -> Result<InsertOutcome, ChatError> {
        let mut metadata = filename.map(filename_metadata).unwrap_or_default();
        metadata.insert(
            INGESTED_AT_KEY.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        let outcome = self.index.insert(text, metadata).await?;
        if let InsertOutcome::Stored {
            position,
            failed_chunks,
            ..
        } = &outcome
        {
            info!(
                position,
                failed_chunks,
                filename = filename.unwrap_or("<none>"),
                "Document ingested"
            );
        }
        Ok(outcome)
    }

    /// Digitize an uploaded file and index the extracted text.
    ///
    /// A file with no readable text is reported as skipped, not as an error.
    pub async fn ingest_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        digitizer: &dyn DocumentDigitizer,
    ) -> Result<IngestReport, ChatError> {
        if bytes.is_empty() {
            return Err(ChatError::InvalidRequest("uploaded file is empty".to_string()));
        }
        let text = digitizer.digitize(filename, bytes).await?;
        let extracted_chars = text.chars().count();

        let outcome = if text.trim().is_empty() {
            warn!(filename, "No text extracted from upload");
            InsertOutcome::Skipped {
                reason: "No text extracted".to_string(),
            }
        } else {
            self.ingest_text(&text, Some(filename)).await?
        };

        Ok(IngestReport {
            filename: filename.to_string(),
            extracted_chars,
            outcome,
        })
    }

    async fn retrieve(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>, ChatError> {
        let top_k = top_k.unwrap_or(self.settings.top_k);
        let hits = self.index.search(query, top_k).await?;
        debug!(top_k, hits = hits.len(), "Retrieved context");
        Ok(hits)
    }

    /// Answer a question from the indexed documents.
    pub async fn answer(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<StudyAnswer, ChatError> {
        let question = check_message(question)?;
        let hits = self.retrieve(question, top_k).await?;
        if hits.is_empty() {
            return Err(ChatError::NoContext);
        }

        let context = prompts::merge_contexts(&hits, self.settings.max_context_chars);
        let answer = self
            .chat
            .complete(&prompts::answer_prompt(question, &context))
            .await?;

        Ok(StudyAnswer {
            answer,
            sources: hits.iter().map(Source::from).collect(),
        })
    }

    /// Generate a multiple-choice quiz on `topic` from the indexed documents.
    pub async fn quiz(&self, topic: &str, level: QuizLevel) -> Result<Quiz, ChatError> {
        let topic = check_message(topic)?;
        let hits = self.retrieve(topic, None).await?;
        if hits.is_empty() {
            return Err(ChatError::NoContext);
        }

        let context = prompts::merge_contexts(&hits, self.settings.max_context_chars);
        let text = self
            .chat
            .complete(&prompts::quiz_prompt(topic, level, &context))
            .await?;
        info!(%level, sources = hits.len(), "Quiz generated");

        Ok(Quiz {
            topic: topic.to_string(),
            level,
            text,
            sources: hits.iter().map(Source::from).collect(),
        })
    }

    /// Recommend a day-by-day study plan.
    ///
    /// With `use_documents`, indexed material related to the goal is added to
    /// the prompt when there is any.
    pub async fn plan(
        &self,
        goal: &str,
        days: u32,
        hours: u32,
        use_documents: bool,
    ) -> Result<StudyPlan, ChatError> {
        let goal = check_message(goal)?;
        if !(1..=MAX_PLAN_DAYS).contains(&days) {
            return Err(ChatError::InvalidRequest(format!(
                "days must be between 1 and {}",
                MAX_PLAN_DAYS
            )));
        }
        if !(1..=MAX_PLAN_HOURS).contains(&hours) {
            return Err(ChatError::InvalidRequest(format!(
                "hours must be between 1 and {}",
                MAX_PLAN_HOURS
            )));
        }

        let context = if use_documents {
            let hits = self.retrieve(goal, None).await?;
            prompts::merge_contexts(&hits, self.settings.max_context_chars)
        } else {
            String::new()
        };
        let used_documents = !context.is_empty();
        let text = self
            .chat
            .complete(&prompts::plan_prompt(
                goal,
                days,
                hours,
                Some(context.as_str()),
            ))
            .await?;

        Ok(StudyPlan {
            goal: goal.to_string(),
            days,
            hours,
            text,
            used_documents,
        })
    }

    /// Extract up to `top_k` keywords from `text`.
    pub async fn keywords(&self, text: &str, top_k: usize) -> Result<Vec<String>, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if top_k == 0 {
            return Err(ChatError::InvalidRequest("top_k must be positive".to_string()));
        }
        let reply = self
            .keyword_chat
            .complete(&prompts::keyword_prompt(text.trim(), top_k))
            .await?;
        Ok(prompts::parse_keywords(&reply, top_k))
    }
}
