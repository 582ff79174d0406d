//! Embedding service trait and implementations.
//!
//! - `UpstageEmbedding` calls an Upstage-compatible `/embeddings` endpoint
//!   over HTTPS. This is the production backend.
//! - `MockEmbedding` provides deterministic hash-based vectors for tests and
//!   offline runs.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use studystage_core::config::UpstageConfig;
use studystage_core::error::StudyError;

/// Service that turns one piece of text into one embedding vector.
///
/// Implementations are called once per chunk. Any failure (network, status,
/// malformed body) is reported as `StudyError::Service`.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, StudyError>> + Send;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future`, which is not object-safe.
/// This trait boxes the future instead so an embedder can be held as
/// `Arc<dyn DynEmbeddingService>` without generics. Every `EmbeddingService`
/// gets it through the blanket impl below.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, StudyError>> + Send + 'a>>;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, StudyError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }
}

// ---------------------------------------------------------------------------
// UpstageEmbedding - HTTP client for the embeddings endpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding client for an Upstage-compatible API.
pub struct UpstageEmbedding {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for UpstageEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstageEmbedding")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl UpstageEmbedding {
    /// Create a client posting to `{base_url}/embeddings`.
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, StudyError> {
        if api_key.trim().is_empty() {
            return Err(StudyError::Config("embedding API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StudyError::Config(format!("HTTP client: {}", e)))?;

        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        info!(endpoint = %endpoint, model = %model, "Embedding client ready");

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
        })
    }

    /// Build a client from the `[upstage]` config section.
    pub fn from_config(config: &UpstageConfig) -> Result<Self, StudyError> {
        Self::new(
            &config.base_url,
            config.resolve_api_key()?,
            config.embedding_model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Pull the first embedding out of a decoded response body.
fn first_embedding(response: EmbeddingResponse) -> Result<Vec<f32>, StudyError> {
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| StudyError::Service("embedding response has no data".to_string()))
}

impl EmbeddingService for UpstageEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StudyError> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| StudyError::Service(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StudyError::Service(format!(
                "embedding API returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| StudyError::Service(format!("malformed embedding response: {}", e)))?;

        let vector = first_embedding(parsed)?;
        debug!(dimensions = vector.len(), "Embedding received");
        Ok(vector)
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service returning deterministic vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs. Text containing the configured failure
/// marker is rejected with `StudyError::Service`, which lets tests exercise
/// partial chunk failures.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
    fail_marker: Option<String>,
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(384)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail_marker: None,
        }
    }

    /// Fail every request whose text contains `marker`.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StudyError> {
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(StudyError::Service(format!(
                    "mock failure for text containing {:?}",
                    marker
                )));
            }
        }
        Ok(self.hash_to_vector(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedding_dimension() {
        let service = MockEmbedding::new();
        let vec = service.embed("hello world").await.unwrap();
        assert_eq!(vec.len(), 384);

        let small = MockEmbedding::with_dimensions(8);
        assert_eq!(small.embed("hello").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_mock_embedding_deterministic() {
        let service = MockEmbedding::new();
        let v1 = service.embed("same text").await.unwrap();
        let v2 = service.embed("same text").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_different_inputs() {
        let service = MockEmbedding::new();
        let v1 = service.embed("text one").await.unwrap();
        let v2 = service.embed("text two").await.unwrap();
        assert_ne!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_is_unit_length() {
        let service = MockEmbedding::new();
        let vec = service.embed("norm check").await.unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_mock_failure_marker() {
        let service = MockEmbedding::new().failing_on("BROKEN");
        assert!(service.embed("fine text").await.is_ok());
        let err = service.embed("this is BROKEN").await.unwrap_err();
        assert!(matches!(err, StudyError::Service(_)));
    }

    #[tokio::test]
    async fn test_dyn_dispatch_matches_static() {
        let service = MockEmbedding::new();
        let boxed: &dyn DynEmbeddingService = &service;
        let a = boxed.embed_boxed("dispatch").await.unwrap();
        let b = service.embed("dispatch").await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_first_embedding_parses_response() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.25,1.0]}],"model":"embedding-query"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(first_embedding(parsed).unwrap(), vec![0.5, -0.25, 1.0]);
    }

    #[test]
    fn test_first_embedding_rejects_empty_data() {
        let parsed: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(matches!(
            first_embedding(parsed),
            Err(StudyError::Service(_))
        ));
    }

    #[test]
    fn test_malformed_body_fails_to_decode() {
        let result: Result<EmbeddingResponse, _> = serde_json::from_str(r#"{"error":"nope"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_upstage_requires_api_key() {
        let result = UpstageEmbedding::new(
            "https://api.upstage.ai/v1",
            "  ".to_string(),
            "embedding-query".to_string(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(StudyError::Config(_))));
    }

    #[test]
    fn test_upstage_endpoint_trims_slash() {
        let client = UpstageEmbedding::new(
            "https://example.test/v1/",
            "key".to_string(),
            "embedding-query".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "https://example.test/v1/embeddings");
    }
}
