//! Configuration system for faqgen.
//!
//! Uses `figment` for layered configuration: defaults -> config files -> environment -> overrides.
//! Configuration is loaded from `~/.config/faqgen/config.toml` and/or `.faqgen/config.toml`
//! in the workspace directory.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the FAQ service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaqgenConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl FaqgenConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.questions_per_document == 0 {
            return Err(ConfigError::Invalid {
                message: "generation.questions_per_document must be at least 1".into(),
            });
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid {
                message: "rate_limit.max_requests must be at least 1".into(),
            });
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "rate_limit.window_secs must be at least 1".into(),
            });
        }
        if self.server.max_urls_per_request == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_urls_per_request must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Upper bound on one `generate` call, in seconds (0 = no deadline).
    pub batch_timeout_secs: u64,
    /// Largest number of URLs accepted in one request.
    pub max_urls_per_request: usize,
    /// Extra path prefix the routes are also mounted under.
    pub route_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5328,
            batch_timeout_secs: 180,
            max_urls_per_request: 20,
            route_prefix: "/api".to_string(),
        }
    }
}

/// Per-document generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Questions requested per document; also the size of each index block.
    pub questions_per_document: usize,
    /// Maximum documents processed at once (0 = unbounded).
    pub max_concurrency: usize,
    /// Timeout for fetching one document, in seconds.
    pub fetch_timeout_secs: u64,
    /// Timeout for one generation backend call, in seconds.
    pub generation_timeout_secs: u64,
    /// Send a stale record's entries to the backend as prior context.
    pub carry_previous_context: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            questions_per_document: 5,
            max_concurrency: 0,
            fetch_timeout_secs: 30,
            generation_timeout_secs: 120,
            carry_previous_context: false,
        }
    }
}

/// Fixed-window rate limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds.
    pub window_secs: u64,
    /// Requests allowed per user per window.
    pub max_requests: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 10,
        }
    }
}

/// Which key-value backend holds cache and rate limit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

/// Key-value store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file for the SQLite backend. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Namespace prepended to every key.
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: None,
            key_prefix: "faqgen".to_string(),
        }
    }
}

impl StoreConfig {
    /// The database path, falling back to `<data dir>/faqgen.db`.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        directories::ProjectDirs::from("dev", "faqgen", "faqgen")
            .map(|d| d.data_dir().join("faqgen.db"))
            .unwrap_or_else(|| PathBuf::from("faqgen.db"))
    }
}

/// Source repository API settings, used for both content and revisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub api_base_url: String,
    /// Environment variable holding the access token (optional at runtime).
    pub token_env: String,
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            token_env: "GITHUB_ACCESS_TOKEN".to_string(),
            user_agent: format!("faqgen/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GitHubConfig {
    /// Read the token from the configured environment variable, if set.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Configuration for the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name. Only OpenAI-compatible endpoints are supported.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request HTTP timeout.
    #[serde(default = "default_llm_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_llm_request_timeout() -> u64 {
    90
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4-0125-preview".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            max_tokens: 4096,
            temperature: 0.7,
            request_timeout_secs: default_llm_request_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: self.api_key_env.clone(),
            })
    }
}

/// Exponential backoff settings for transient backend errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `FAQGEN_`)
/// 3. Explicit config file (`--config`)
/// 4. Workspace-local config (`.faqgen/config.toml`)
/// 5. User config (`~/.config/faqgen/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&FaqgenConfig>,
) -> Result<FaqgenConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(FaqgenConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "faqgen", "faqgen") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".faqgen").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(file) = config_file {
        figment = figment.merge(Toml::file(file));
    }

    // Environment variables (FAQGEN_RATE_LIMIT__MAX_REQUESTS, FAQGEN_LLM__MODEL, etc.)
    figment = figment.merge(Env::prefixed("FAQGEN_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: FaqgenConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}
