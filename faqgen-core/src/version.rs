//! Document revision lookup.
//!
//! A document's fingerprint is the SHA of the newest commit touching its path
//! on the referenced revision. Callers treat `Unavailable` as "freshness
//! unknown" and regenerate rather than block.

use crate::error::VersionError;
use crate::github::GitHubClient;
use crate::types::{DocumentReference, Fingerprint};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Reports the current revision of a document.
#[async_trait]
pub trait VersionOracle: Send + Sync {
    async fn current_fingerprint(
        &self,
        reference: &DocumentReference,
    ) -> Result<Fingerprint, VersionError>;
}

#[derive(Debug, Deserialize)]
struct CommitSummary {
    sha: String,
}

/// Looks up the latest commit for a path through the commits API.
#[derive(Debug, Clone)]
pub struct GitHubVersionOracle {
    api: GitHubClient,
}

impl GitHubVersionOracle {
    pub fn new(api: GitHubClient) -> Self {
        Self { api }
    }
}

fn unavailable(message: impl Into<String>) -> VersionError {
    VersionError::Unavailable {
        message: message.into(),
    }
}

#[async_trait]
impl VersionOracle for GitHubVersionOracle {
    async fn current_fingerprint(
        &self,
        reference: &DocumentReference,
    ) -> Result<Fingerprint, VersionError> {
        let response = self
            .api
            .get_repo(reference, "commits")
            .query(&[
                ("path", reference.path()),
                ("sha", reference.revision()),
                ("per_page", "1"),
            ])
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!(
                "GitHub commits API returned status {}",
                response.status()
            )));
        }

        let commits: Vec<CommitSummary> = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Malformed commits response: {e}")))?;

        commits
            .into_iter()
            .next()
            .map(|c| Fingerprint::new(c.sha))
            .ok_or_else(|| unavailable(format!("No history for {}", reference.path())))
    }
}

/// Fingerprints set by hand, keyed by raw locator.
#[derive(Default)]
pub struct MockVersionOracle {
    fingerprints: Mutex<HashMap<String, Fingerprint>>,
    calls: AtomicUsize,
}

impl MockVersionOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, locator: &str, fingerprint: &str) {
        if let Ok(mut map) = self.fingerprints.lock() {
            map.insert(locator.to_string(), Fingerprint::new(fingerprint));
        }
    }

    /// Make the revision of `locator` unknown.
    pub fn clear(&self, locator: &str) {
        if let Ok(mut map) = self.fingerprints.lock() {
            map.remove(locator);
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionOracle for MockVersionOracle {
    async fn current_fingerprint(
        &self,
        reference: &DocumentReference,
    ) -> Result<Fingerprint, VersionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fingerprints
            .lock()
            .ok()
            .and_then(|map| map.get(reference.raw_locator()).cloned())
            .ok_or_else(|| unavailable(format!("No history for {reference}")))
    }
}
