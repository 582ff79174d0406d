//! Chat completion clients.
//!
//! `UpstageChat` talks to an OpenAI-style `/chat/completions` endpoint.
//! `MockChat` echoes the last user message and records every call, which
//! keeps tests and `--offline` runs free of network access.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use studystage_core::config::UpstageConfig;

use crate::error::ChatError;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A language model that turns a conversation into one reply.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_choice(response: CompletionResponse) -> Result<String, ChatError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ChatError::Llm("completion response has no choices".to_string()))
}

/// Chat client for an Upstage-compatible completion API.
pub struct UpstageChat {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for UpstageChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstageChat")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl UpstageChat {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        if api_key.trim().is_empty() {
            return Err(ChatError::Llm("chat API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Llm(format!("HTTP client: {}", e)))?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        info!(endpoint = %endpoint, model = %model, "Chat client ready");

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
        })
    }

    /// Client for `upstage.chat_model`.
    pub fn from_config(config: &UpstageConfig) -> Result<Self, ChatError> {
        Self::new(
            &config.base_url,
            config.resolve_api_key()?,
            config.chat_model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Same connection settings, different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatService for UpstageChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Llm(format!("completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ChatError::Llm(format!(
                "completion API returned {}: {}",
                status, body
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Llm(format!("malformed completion response: {}", e)))?;
        let reply = first_choice(parsed)?;
        debug!(model = %self.model, chars = reply.chars().count(), "Completion received");
        Ok(reply)
    }
}

/// Chat service that replies without a model.
///
/// By default the reply is the last user message prefixed with `[offline] `.
/// A fixed reply can be set with [`MockChat::with_reply`].
#[derive(Debug, Default)]
pub struct MockChat {
    reply: Option<String>,
    fail: bool,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Self::default()
        }
    }

    /// A service whose every call fails with `ChatError::Llm`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Conversations received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatService for MockChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        if self.fail {
            return Err(ChatError::Llm("mock chat failure".to_string()));
        }
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!("[offline] {}", last_user))
    }
}
