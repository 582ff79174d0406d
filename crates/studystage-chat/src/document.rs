//! Document digitization: uploaded files to plain text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use studystage_core::config::UpstageConfig;

use crate::error::ChatError;

/// Extracts readable text from an uploaded file.
#[async_trait]
pub trait DocumentDigitizer: Send + Sync {
    /// Returns the extracted text. An empty string means nothing readable
    /// was found; the caller decides how to report it.
    async fn digitize(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ChatError>;
}

/// Convert parser HTML output to plain text.
pub fn html_to_text(html: &str) -> Result<String, ChatError> {
    if html.trim().is_empty() {
        return Ok(String::new());
    }
    let text = htmd::convert(html).map_err(|e| ChatError::Digitize(e.to_string()))?;
    Ok(text.trim().to_string())
}

#[derive(Debug, Default, Deserialize)]
struct ParseResponse {
    #[serde(default)]
    content: ParseContent,
}

#[derive(Debug, Default, Deserialize)]
struct ParseContent {
    #[serde(default)]
    html: String,
}

/// Client for the Upstage document-digitization endpoint.
pub struct UpstageDocumentParser {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for UpstageDocumentParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstageDocumentParser")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl UpstageDocumentParser {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        if api_key.trim().is_empty() {
            return Err(ChatError::Digitize("document API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Digitize(format!("HTTP client: {}", e)))?;
        let endpoint = format!(
            "{}/document-digitization",
            base_url.trim_end_matches('/')
        );
        info!(endpoint = %endpoint, model = %model, "Document parser ready");

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
        })
    }

    pub fn from_config(config: &UpstageConfig) -> Result<Self, ChatError> {
        Self::new(
            &config.base_url,
            config.resolve_api_key()?,
            config.document_model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DocumentDigitizer for UpstageDocumentParser {
    async fn digitize(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ChatError> {
        let size = bytes.len();
        let form = Form::new()
            .text("model", self.model.clone())
            .part("document", Part::bytes(bytes).file_name(filename.to_string()));

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::Digitize(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ChatError::Digitize(format!(
                "document API returned {}: {}",
                status, body
            )));
        }

        let parsed: ParseResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Digitize(format!("malformed response: {}", e)))?;
        if parsed.content.html.trim().is_empty() {
            warn!(filename, "Document parser returned no HTML");
        }
        let text = html_to_text(&parsed.content.html)?;
        debug!(filename, bytes = size, chars = text.chars().count(), "Document digitized");
        Ok(text)
    }
}

/// Treats the upload as UTF-8 text. Used offline and for `.txt`/`.md` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextDigitizer;

#[async_trait]
impl DocumentDigitizer for PlainTextDigitizer {
    async fn digitize(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ChatError> {
        String::from_utf8(bytes)
            .map(|s| s.trim().to_string())
            .map_err(|_| ChatError::Digitize(format!("{} is not valid UTF-8 text", filename)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_strips_markup() {
        let text = html_to_text("<h1>Cell Biology</h1><p>The <b>mitochondria</b> make ATP.</p>")
            .unwrap();
        assert!(text.contains("Cell Biology"));
        assert!(text.contains("mitochondria"));
        assert!(text.contains("make ATP."));
        assert!(!text.contains("<p>"));
        assert!(!text.contains("</b>"));
    }

    #[test]
    fn test_html_to_text_empty() {
        assert_eq!(html_to_text("").unwrap(), "");
        assert_eq!(html_to_text("   ").unwrap(), "");
    }

    #[test]
    fn test_parse_response_defaults_missing_html() {
        let parsed: ParseResponse = serde_json::from_str(r#"{"api":"2.0"}"#).unwrap();
        assert!(parsed.content.html.is_empty());

        let parsed: ParseResponse =
            serde_json::from_str(r#"{"content":{"html":"<p>x</p>","text":""}}"#).unwrap();
        assert_eq!(parsed.content.html, "<p>x</p>");
    }

    #[test]
    fn test_document_parser_endpoint() {
        let parser = UpstageDocumentParser::new(
            "https://example.test/v1",
            "key".to_string(),
            "document-parse".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            parser.endpoint(),
            "https://example.test/v1/document-digitization"
        );
    }

    #[tokio::test]
    async fn test_plain_text_digitizer() {
        let text = PlainTextDigitizer
            .digitize("notes.txt", "  hello notes \n".as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(text, "hello notes");

        let err = PlainTextDigitizer
            .digitize("scan.pdf", vec![0xff, 0xfe, 0x00])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Digitize(_)));
    }
}
