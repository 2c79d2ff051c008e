//! Error types for the faqgen core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering reference resolution, content fetching, version lookup, storage,
//! generation backends, configuration, and the orchestrator itself.

/// Top-level error type for the faqgen core library.
#[derive(Debug, thiserror::Error)]
pub enum FaqgenError {
    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from parsing a document locator into a reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Invalid document URL '{locator}': {message}")]
    InvalidUrl { locator: String, message: String },

    #[error("Document URL '{locator}' has no '{marker}' segment")]
    MissingMarker { locator: String, marker: String },

    #[error("Document URL '{locator}' is missing the {what}")]
    MissingSegments { locator: String, what: String },
}

/// Errors from the content provider.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Document not found: {locator}")]
    NotFound { locator: String },

    #[error("Content request failed: {message}")]
    Transport { message: String },

    #[error("Content request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Content could not be decoded: {message}")]
    Decode { message: String },
}

/// Errors from the version oracle.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("Document revision unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors from the durable key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend failure: {message}")]
    Backend { message: String },

    #[error("Stored value for '{key}' could not be (de)serialized: {message}")]
    Serialization { key: String, message: String },

    #[error("Stored value for '{key}' is not a counter")]
    Corrupt { key: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend {
            message: err.to_string(),
        }
    }
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Non-success HTTP response, or a request that could not be sent.
    /// `status` is absent when no response arrived.
    #[error("API request failed: {message}")]
    ApiRequest {
        status: Option<u16>,
        message: String,
    },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Provider returned no text content")]
    EmptyResponse,
}

impl LlmError {
    /// Whether the same request may succeed if sent again later.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Timeout { .. } | LlmError::Connection { .. } => {
                true
            }
            LlmError::ApiRequest { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Failures that abort a whole generation batch.
///
/// Per-document failures never surface here; they degrade that document's
/// contribution to an empty list instead.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("No document URLs were provided")]
    EmptyBatch,

    #[error("Too many document URLs: {count} given, at most {max} allowed")]
    TooManyReferences { count: usize, max: usize },

    #[error("Rate limit exceeded for '{user_id}': {limit} requests per {window_secs}s. Try again later.")]
    RateLimited {
        user_id: String,
        limit: u64,
        window_secs: u64,
    },

    #[error("None of the {} document URLs could be resolved", .errors.len())]
    NoResolvableReferences { errors: Vec<ResolveError> },

    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Generation did not finish within {timeout_secs}s")]
    DeadlineExceeded { timeout_secs: u64 },

    #[error("Document task failed: {message}")]
    TaskFailed { message: String },
}

impl GenerateError {
    /// Machine-readable error kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerateError::EmptyBatch => "empty_batch",
            GenerateError::TooManyReferences { .. } => "invalid_request",
            GenerateError::RateLimited { .. } => "rate_limited",
            GenerateError::NoResolvableReferences { .. } => "invalid_references",
            GenerateError::Store(_) => "store_unavailable",
            GenerateError::DeadlineExceeded { .. } => "deadline_exceeded",
            GenerateError::TaskFailed { .. } => "internal",
        }
    }
}

/// A type alias for results using the top-level `FaqgenError`.
pub type Result<T> = std::result::Result<T, FaqgenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_generate() {
        let err = FaqgenError::Generate(GenerateError::EmptyBatch);
        assert_eq!(
            err.to_string(),
            "Generation error: No document URLs were provided"
        );
    }

    #[test]
    fn test_error_display_rate_limited() {
        let err = GenerateError::RateLimited {
            user_id: "alice".into(),
            limit: 10,
            window_secs: 60,
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded for 'alice': 10 requests per 60s. Try again later."
        );
        assert_eq!(err.kind(), "rate_limited");
    }

    #[test]
    fn test_error_display_unresolvable() {
        let err = GenerateError::NoResolvableReferences {
            errors: vec![
                ResolveError::MissingMarker {
                    locator: "https://example.com/a".into(),
                    marker: "blob".into(),
                },
                ResolveError::InvalidUrl {
                    locator: "::".into(),
                    message: "relative URL without a base".into(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "None of the 2 document URLs could be resolved"
        );
        assert_eq!(err.kind(), "invalid_references");
    }

    #[test]
    fn test_store_error_kind() {
        let err = GenerateError::from(StoreError::Backend {
            message: "disk I/O error".into(),
        });
        assert_eq!(err.kind(), "store_unavailable");
        assert_eq!(
            err.to_string(),
            "Store unavailable: Store backend failure: disk I/O error"
        );
    }

    #[test]
    fn test_error_display_llm() {
        let err = FaqgenError::Llm(LlmError::ApiRequest {
            status: None,
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "LLM error: API request failed: connection refused"
        );
    }

    #[test]
    fn test_llm_error_transience() {
        let server = |status| LlmError::ApiRequest {
            status: Some(status),
            message: String::new(),
        };
        assert!(server(502).is_transient());
        assert!(!server(400).is_transient());
        assert!(LlmError::Timeout { timeout_secs: 1 }.is_transient());
        assert!(LlmError::RateLimited { retry_after_secs: 3 }.is_transient());
        assert!(!LlmError::EmptyResponse.is_transient());
        assert!(
            !LlmError::AuthFailed {
                provider: "openai".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_env_var_missing_display() {
        let err = FaqgenError::from(ConfigError::EnvVarMissing {
            var: "OPENAI_API_KEY".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Environment variable not set: OPENAI_API_KEY"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: FaqgenError = io_err.into();
        assert!(matches!(err, FaqgenError::Io(_)));
    }
}
