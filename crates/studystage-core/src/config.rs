use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StudyError};

/// Environment variable consulted when no API key is set in the config file.
pub const API_KEY_ENV: &str = "UPSTAGE_API_KEY";

/// Top-level configuration for the StudyStage application.
///
/// Loaded from `~/.studystage/config.toml` by default. Every section falls
/// back to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub upstage: UpstageConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl StudyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StudyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values that would make the retrieval core misbehave.
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.max_chunk_chars == 0 {
            return Err(StudyError::Config(
                "retrieval.max_chunk_chars must be greater than 0".to_string(),
            ));
        }
        if r.default_top_k == 0 {
            return Err(StudyError::Config(
                "retrieval.default_top_k must be greater than 0".to_string(),
            ));
        }
        if r.embed_concurrency == 0 {
            return Err(StudyError::Config(
                "retrieval.embed_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.upstage.timeout_secs == 0 {
            return Err(StudyError::Config(
                "upstage.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Address the API server binds to.
    pub host: String,
    /// API server port.
    pub port: u16,
    /// Maximum accepted upload size in bytes.
    pub upload_limit_bytes: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8501,
            upload_limit_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Connection settings for the Upstage-compatible model API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstageConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// API key. Empty means "read `UPSTAGE_API_KEY` from the environment".
    pub api_key: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Smaller model used for keyword extraction.
    pub keyword_model: String,
    pub document_model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.upstage.ai/v1".to_string(),
            api_key: String::new(),
            embedding_model: "embedding-query".to_string(),
            chat_model: "solar-pro".to_string(),
            keyword_model: "solar-1-mini-chat".to_string(),
            document_model: "document-parse".to_string(),
            timeout_secs: 120,
        }
    }
}

impl UpstageConfig {
    /// Return the configured API key, or the `UPSTAGE_API_KEY` env var.
    pub fn resolve_api_key(&self) -> Result<String> {
        if !self.api_key.trim().is_empty() {
            return Ok(self.api_key.trim().to_string());
        }
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(StudyError::Config(format!("{API_KEY_ENV} is not set"))),
        }
    }
}

/// Settings for chunking, ranking and prompt context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum characters per embedding request.
    pub max_chunk_chars: usize,
    /// Number of hits used when a caller does not specify `top_k`.
    pub default_top_k: usize,
    /// Character budget for retrieved context in prompts.
    pub max_context_chars: usize,
    /// Chunk embedding requests in flight per document. 1 is sequential.
    pub embed_concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1000,
            default_top_k: 5,
            max_context_chars: 3000,
            embed_concurrency: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = StudyConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.host, "127.0.0.1");
        assert_eq!(config.general.port, 8501);
        assert_eq!(config.upstage.base_url, "https://api.upstage.ai/v1");
        assert_eq!(config.upstage.embedding_model, "embedding-query");
        assert_eq!(config.upstage.chat_model, "solar-pro");
        assert_eq!(config.upstage.timeout_secs, 120);
        assert_eq!(config.retrieval.max_chunk_chars, 1000);
        assert_eq!(config.retrieval.default_top_k, 5);
        assert_eq!(config.retrieval.max_context_chars, 3000);
        assert_eq!(config.retrieval.embed_concurrency, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"
port = 9000

[upstage]
api_key = "up_test"
chat_model = "solar-mini"
timeout_secs = 30

[retrieval]
max_chunk_chars = 500
default_top_k = 3
"#;
        let file = create_temp_config(content);
        let config = StudyConfig::load(file.path()).unwrap();

        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.port, 9000);
        assert_eq!(config.general.host, "127.0.0.1");
        assert_eq!(config.upstage.api_key, "up_test");
        assert_eq!(config.upstage.chat_model, "solar-mini");
        assert_eq!(config.upstage.embedding_model, "embedding-query");
        assert_eq!(config.upstage.timeout_secs, 30);
        assert_eq!(config.retrieval.max_chunk_chars, 500);
        assert_eq!(config.retrieval.default_top_k, 3);
        assert_eq!(config.retrieval.max_context_chars, 3000);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = StudyConfig::load(file.path()).unwrap();
        assert_eq!(config.general.port, 8501);
        assert_eq!(config.retrieval.max_chunk_chars, 1000);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = StudyConfig::load(file.path());
        assert!(matches!(result, Err(StudyError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = StudyConfig::load_or_default(Path::new("/does/not/exist/config.toml"));
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.retrieval.default_top_k, 5);
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut config = StudyConfig::default();
        config.retrieval.default_top_k = 8;
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = StudyConfig::load(&path).unwrap();
        assert_eq!(reloaded.retrieval.default_top_k, 8);
        assert_eq!(reloaded.upstage.document_model, "document-parse");
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = StudyConfig::default();
        config.retrieval.max_chunk_chars = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_chunk_chars"));
    }

    #[test]
    fn test_validate_rejects_zero_top_k_and_timeout() {
        let mut config = StudyConfig::default();
        config.retrieval.default_top_k = 0;
        assert!(config.validate().is_err());

        let mut config = StudyConfig::default();
        config.upstage.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = StudyConfig::default();
        config.retrieval.embed_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_api_key_prefers_config() {
        let upstage = UpstageConfig {
            api_key: "  up_from_file ".to_string(),
            ..Default::default()
        };
        assert_eq!(upstage.resolve_api_key().unwrap(), "up_from_file");
    }
}
