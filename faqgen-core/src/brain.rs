//! Generation backend abstraction.
//!
//! Defines the `LlmProvider` trait for model-agnostic completions and the
//! prompt-plus-prior-context helper the orchestrator calls.

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Message, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Lead-in sent before prior generated content.
pub const PRIOR_CONTEXT_PREAMBLE: &str = "Generated FAQ and their answers are :\n";

/// Trait for generation backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// Build the message list for a prompt, optionally preceded by previously
/// generated content as assistant turns.
pub fn build_messages(prompt: &str, prior_context: Option<&str>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(3);
    if let Some(context) = prior_context.filter(|c| !c.trim().is_empty()) {
        messages.push(Message::assistant(PRIOR_CONTEXT_PREAMBLE));
        messages.push(Message::assistant(context));
    }
    messages.push(Message::user(prompt));
    messages
}

/// Send `prompt` (with optional prior context) and return the generated text.
pub async fn generate_text(
    provider: &dyn LlmProvider,
    prompt: &str,
    prior_context: Option<&str>,
) -> Result<String, LlmError> {
    let request = CompletionRequest {
        messages: build_messages(prompt, prior_context),
        ..CompletionRequest::default()
    };
    let response = provider.complete(request).await?;
    debug!(
        model = %response.model,
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        finish_reason = ?response.finish_reason,
        "Generation complete"
    );
    if response.message.content.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(response.message.content)
}

/// A scripted provider for tests.
///
/// Returns queued responses in order, then falls back to a fixed default.
/// Every call is counted and its request recorded.
pub struct MockLlmProvider {
    model: String,
    default_text: String,
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            default_text: "I'm a mock LLM. No queued responses available.".to_string(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Create a MockLlmProvider that always returns the given text.
    pub fn with_response(text: &str) -> Self {
        Self {
            default_text: text.to_string(),
            ..Self::new()
        }
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response to be returned by the next `complete` call.
    pub fn queue_response(&self, text: &str) {
        self.lock_responses().push_back(Ok(text.to_string()));
    }

    /// Queue an error to be returned by the next `complete` call.
    pub fn queue_error(&self, error: LlmError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn text_response(&self, text: String) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: self.model.clone(),
            finish_reason: Some("stop".to_string()),
        }
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.lock_responses().pop_front();
        match next {
            Some(Ok(text)) => Ok(self.text_response(text)),
            Some(Err(e)) => Err(e),
            None => Ok(self.text_response(self.default_text.clone())),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_build_messages_without_context() {
        let messages = build_messages("Write an FAQ", None);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[test]
    fn test_build_messages_with_context() {
        let messages = build_messages("Write an FAQ", Some("1. Old question\nOld answer"));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, PRIOR_CONTEXT_PREAMBLE);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "1. Old question\nOld answer");
        assert_eq!(messages[2].role, Role::User);
    }

    #[test]
    fn test_build_messages_ignores_blank_context() {
        assert_eq!(build_messages("p", Some("  \n")).len(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockLlmProvider::new();
        let text = generate_text(&provider, "hi", None).await.unwrap();
        assert!(text.contains("mock"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_queued_responses() {
        let provider = MockLlmProvider::with_response("fallback");
        provider.queue_response("first");
        provider.queue_error(LlmError::Timeout { timeout_secs: 5 });

        assert_eq!(generate_text(&provider, "a", None).await.unwrap(), "first");
        assert!(matches!(
            generate_text(&provider, "b", None).await,
            Err(LlmError::Timeout { .. })
        ));
        assert_eq!(generate_text(&provider, "c", None).await.unwrap(), "fallback");
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.requests()[2].messages[0].content, "c");
    }

    #[tokio::test]
    async fn test_empty_generation_is_an_error() {
        let provider = MockLlmProvider::with_response("   ");
        assert!(matches!(
            generate_text(&provider, "p", None).await,
            Err(LlmError::EmptyResponse)
        ));
    }
}
