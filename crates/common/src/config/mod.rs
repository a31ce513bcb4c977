//! Configuration management for Swasya tools
//!
//! Supports loading configuration from:
//! - Default values
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Environment variables (prefixed with APP__)
//! - Conventional variables: DATABASE_URL, OPENAI_API_KEY, ANTHROPIC_API_KEY

use crate::context::BackendKind;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Consultation store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Persisted index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generative backend configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// HTTP server configuration (gateway only)
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Store connection URL
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum number of connections held by one engine
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Directory the vector index is persisted to
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,

    /// Chunk size in tokens (approximated as 4 characters per token)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of chunks returned per question
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: mock, openai
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Generative provider: mock, openai, anthropic
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key for the generative provider
    pub api_key: Option<String>,

    /// Endpoint override
    pub endpoint: Option<String>,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,
}

// Default value functions
fn default_store_url() -> String { "postgres://localhost/swasya".to_string() }
fn default_connect_timeout() -> u64 { 10 }
fn default_max_connections() -> u32 { 1 }
fn default_persist_dir() -> PathBuf { PathBuf::from(crate::DEFAULT_PERSIST_DIR) }
fn default_chunk_size() -> usize { 512 }
fn default_similarity_top_k() -> usize { 2 }
fn default_embedding_provider() -> String { "mock".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 100 }
fn default_llm_provider() -> String { "mock".to_string() }
fn default_llm_model() -> String { "gpt-4o-mini".to_string() }
fn default_max_tokens() -> usize { 1000 }
fn default_temperature() -> f32 { 0.1 }
fn default_llm_timeout() -> u64 { 60 }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5001 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            connect_timeout_secs: default_connect_timeout(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            persist_dir: default_persist_dir(),
            chunk_size: default_chunk_size(),
            similarity_top_k: default_similarity_top_k(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            endpoint: None,
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: 0,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Which synthesis strategy this configuration selects.
    ///
    /// Only a real provider with a non-empty key is generative; everything
    /// else falls back to heuristic synthesis.
    pub fn backend_kind(&self) -> BackendKind {
        let has_key = self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        match self.provider.as_str() {
            "openai" | "anthropic" if has_key => BackendKind::Generative,
            _ => BackendKind::Heuristic,
        }
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__INDEX__SIMILARITY_TOP_K=3
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            );

        let config = Self::with_conventional_env(config)?.build()?;

        config.try_deserialize()
    }

    /// Apply the unprefixed variables deployments commonly set in `.env`.
    fn with_conventional_env(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let openai = std::env::var("OPENAI_API_KEY").ok();
        let anthropic = std::env::var("ANTHROPIC_API_KEY").ok();

        let database_url = std::env::var("DATABASE_URL").ok();

        let mut builder = builder.set_override_option("store.url", database_url)?;

        if let Some(key) = openai.filter(|k| !k.is_empty()) {
            builder = builder
                .set_default("llm.provider", "openai")?
                .set_override("llm.api_key", key)?;
        } else if let Some(key) = anthropic.filter(|k| !k.is_empty()) {
            builder = builder
                .set_default("llm.provider", "anthropic")?
                .set_default("llm.model", "claude-3-5-sonnet-20241022")?
                .set_override("llm.api_key", key)?;
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.index.persist_dir, PathBuf::from("./llama_index_storage"));
        assert_eq!(config.index.similarity_top_k, 2);
        assert_eq!(config.embedding.dimension, 384);
    }

    #[test]
    fn test_backend_kind_requires_key() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.backend_kind(), BackendKind::Heuristic);

        llm.provider = "openai".to_string();
        assert_eq!(llm.backend_kind(), BackendKind::Heuristic);

        llm.api_key = Some("  ".to_string());
        assert_eq!(llm.backend_kind(), BackendKind::Heuristic);

        llm.api_key = Some("sk-test".to_string());
        assert_eq!(llm.backend_kind(), BackendKind::Generative);

        llm.provider = "mock".to_string();
        assert_eq!(llm.backend_kind(), BackendKind::Heuristic);
    }

    #[test]
    fn test_partial_sections_deserialize() {
        let config: AppConfig =
            serde_json::from_str(r#"{"index": {"similarity_top_k": 5}}"#).unwrap();
        assert_eq!(config.index.similarity_top_k, 5);
        assert_eq!(config.index.chunk_size, 512);
        assert_eq!(config.llm.provider, "mock");
    }
}
