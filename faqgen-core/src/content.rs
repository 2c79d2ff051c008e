//! Document content providers.

use crate::error::FetchError;
use crate::github::{GitHubClient, encode_path};
use crate::types::DocumentReference;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Source of raw document text.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch the current text of a document.
    async fn fetch(&self, reference: &DocumentReference) -> Result<String, FetchError>;
}

/// Reads files through the repository contents API as raw text.
#[derive(Debug, Clone)]
pub struct GitHubContentProvider {
    api: GitHubClient,
}

impl GitHubContentProvider {
    pub fn new(api: GitHubClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ContentProvider for GitHubContentProvider {
    async fn fetch(&self, reference: &DocumentReference) -> Result<String, FetchError> {
        let tail = format!("contents/{}", encode_path(reference.path()));
        let response = self
            .api
            .get_repo(reference, &tail)
            .query(&[("ref", reference.revision())])
            .header("Accept", "application/vnd.github.raw+json")
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                locator: reference.raw_locator().to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Transport {
                message: format!("GitHub contents API returned status {status}"),
            });
        }

        let text = response.text().await.map_err(|e| FetchError::Decode {
            message: e.to_string(),
        })?;
        debug!(locator = %reference, bytes = text.len(), "Fetched document");
        Ok(text)
    }
}

/// In-memory provider for tests, keyed by raw locator.
#[derive(Default)]
pub struct MockContentProvider {
    documents: Mutex<HashMap<String, String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl MockContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `text` for `locator`.
    pub fn insert(&self, locator: &str, text: &str) {
        if let Ok(mut docs) = self.documents.lock() {
            docs.insert(locator.to_string(), text.to_string());
        }
    }

    /// Make `locator` unavailable.
    pub fn remove(&self, locator: &str) {
        if let Ok(mut docs) = self.documents.lock() {
            docs.remove(locator);
        }
    }

    /// Delay every fetch of `locator`.
    pub fn set_delay(&self, locator: &str, delay: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.insert(locator.to_string(), delay);
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentProvider for MockContentProvider {
    async fn fetch(&self, reference: &DocumentReference) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .delays
            .lock()
            .ok()
            .and_then(|d| d.get(reference.raw_locator()).copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let text = self
            .documents
            .lock()
            .ok()
            .and_then(|docs| docs.get(reference.raw_locator()).cloned());
        text.ok_or_else(|| FetchError::NotFound {
            locator: reference.raw_locator().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://github.com/o/r/blob/main/README.md";

    #[tokio::test]
    async fn test_mock_serves_inserted_document() {
        let provider = MockContentProvider::new();
        provider.insert(URL, "# Title");
        let reference = DocumentReference::from_locator(URL);
        assert_eq!(provider.fetch(&reference).await.unwrap(), "# Title");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_missing_document() {
        let provider = MockContentProvider::new();
        provider.insert(URL, "text");
        provider.remove(URL);
        let reference = DocumentReference::from_locator(URL);
        assert!(matches!(
            provider.fetch(&reference).await,
            Err(FetchError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_github_provider_transport_error() {
        // Nothing listens on port 9 (discard); the request must fail cleanly.
        let config = crate::config::GitHubConfig {
            api_base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        };
        let provider = GitHubContentProvider::new(GitHubClient::new(&config, None).unwrap());
        let reference = DocumentReference::from_locator(URL);
        assert!(matches!(
            provider.fetch(&reference).await,
            Err(FetchError::Transport { .. })
        ));
    }
}
