//! Generation backend construction.
//!
//! [`create_provider`] builds the configured backend and wraps it in
//! [`RetryingProvider`], which resends a request after transient failures
//! (see [`LlmError::is_transient`]).

pub mod openai_compat;

use crate::brain::LlmProvider;
use crate::config::{LlmConfig, RetryConfig};
use crate::error::{ConfigError, FaqgenError, LlmError};
use crate::types::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub use openai_compat::OpenAiCompatibleProvider;

/// Delay before retry number `attempt + 1`.
///
/// Grows geometrically from `initial_backoff_ms` up to `max_backoff_ms`, plus
/// up to a quarter of jitter. A rate limit hint from the backend is a floor.
fn retry_delay(config: &RetryConfig, attempt: u32, err: &LlmError) -> Duration {
    let grown = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let mut ms = grown.min(config.max_backoff_ms as f64) as u64;
    if config.jitter && ms > 0 {
        ms += rand::thread_rng().gen_range(0..=ms / 4);
    }
    if let LlmError::RateLimited { retry_after_secs } = err {
        ms = ms.max(retry_after_secs.saturating_mul(1000));
    }
    Duration::from_millis(ms)
}

/// Resends failed completions while the error is transient, up to
/// `max_retries` extra attempts.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    config: RetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut attempt = 0;
        loop {
            let err = match self.inner.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            if !err.is_transient() || attempt >= self.config.max_retries {
                return Err(err);
            }
            let delay = retry_delay(&self.config, attempt, &err);
            attempt += 1;
            warn!(
                attempt,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Generation backend failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Build the backend named by `config.provider`, wrapped with retries.
///
/// The API key is read from `config.api_key_env` and must be set.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, FaqgenError> {
    if !matches!(config.provider.as_str(), "openai" | "openai-compatible") {
        return Err(ConfigError::Invalid {
            message: format!(
                "llm.provider '{}' is not supported; use 'openai' or 'openai-compatible'",
                config.provider
            ),
        }
        .into());
    }
    let backend = OpenAiCompatibleProvider::new(config, config.api_key()?)?;
    Ok(Arc::new(RetryingProvider::new(
        Arc::new(backend),
        config.retry.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{MockLlmProvider, generate_text};

    fn quick_retries(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 10,
            max_backoff_ms: 40,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    fn retrying(mock: &Arc<MockLlmProvider>, max_retries: u32) -> RetryingProvider {
        RetryingProvider::new(mock.clone(), quick_retries(max_retries))
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let mock = Arc::new(MockLlmProvider::with_response("ok"));
        mock.queue_error(LlmError::Connection {
            message: "refused".into(),
        });
        mock.queue_error(LlmError::ApiRequest {
            status: Some(503),
            message: "overloaded".into(),
        });
        let provider = retrying(&mock, 3);
        assert_eq!(generate_text(&provider, "p", None).await.unwrap(), "ok");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(provider.model_name(), "mock-model");
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_not_retried() {
        let mock = Arc::new(MockLlmProvider::with_response("ok"));
        mock.queue_error(LlmError::ApiRequest {
            status: Some(400),
            message: "bad request".into(),
        });
        let result = generate_text(&retrying(&mock, 3), "p", None).await;
        assert!(matches!(
            result,
            Err(LlmError::ApiRequest {
                status: Some(400),
                ..
            })
        ));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let mock = Arc::new(MockLlmProvider::with_response("ok"));
        for _ in 0..3 {
            mock.queue_error(LlmError::Timeout { timeout_secs: 1 });
        }
        let result = generate_text(&retrying(&mock, 2), "p", None).await;
        assert!(matches!(result, Err(LlmError::Timeout { .. })));
        assert_eq!(mock.call_count(), 3);
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let config = quick_retries(10);
        let err = LlmError::Timeout { timeout_secs: 1 };
        let ms = |attempt| retry_delay(&config, attempt, &err).as_millis();
        assert_eq!(ms(0), 10);
        assert_eq!(ms(1), 20);
        assert_eq!(ms(2), 40);
        assert_eq!(ms(6), 40);
    }

    #[test]
    fn test_delay_honours_retry_after() {
        let err = LlmError::RateLimited {
            retry_after_secs: 2,
        };
        assert_eq!(
            retry_delay(&quick_retries(1), 0, &err),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_jitter_stays_within_a_quarter() {
        let config = RetryConfig {
            jitter: true,
            ..quick_retries(1)
        };
        let err = LlmError::Timeout { timeout_secs: 1 };
        for _ in 0..50 {
            let ms = retry_delay(&config, 2, &err).as_millis();
            assert!((40..=50).contains(&ms), "delay {ms}ms out of range");
        }
    }

    #[test]
    fn test_create_provider_rejects_unknown_backend() {
        let config = LlmConfig {
            provider: "carrier-pigeon".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            create_provider(&config),
            Err(FaqgenError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[test]
    fn test_create_provider_requires_api_key() {
        let config = LlmConfig {
            api_key_env: "FAQGEN_TEST_NEVER_SET_KEY".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            create_provider(&config),
            Err(FaqgenError::Config(ConfigError::EnvVarMissing { .. }))
        ));
    }
}
