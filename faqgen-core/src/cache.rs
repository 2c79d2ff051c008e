//! Fingerprinted FAQ cache.
//!
//! Each document's FAQ entries are stored under its own key together with the
//! fingerprint of the revision they were generated from. Records carry no TTL;
//! freshness is decided on every read by comparing fingerprints.
//!
//! Stored layout is a JSON tuple `[[[question, answer], ...], fingerprint]`.

use crate::error::StoreError;
use crate::store::SharedStore;
use crate::types::{CacheRecord, DocumentReference, Fingerprint, QaPair};
use tracing::debug;

type StoredRecord = (Vec<(String, String)>, String);

/// Cache of generated FAQ entries keyed by document.
#[derive(Clone)]
pub struct FaqCache {
    store: SharedStore,
    prefix: String,
}

impl FaqCache {
    pub fn new(store: SharedStore, key_prefix: &str) -> Self {
        Self {
            store,
            prefix: format!("{key_prefix}:faq:"),
        }
    }

    /// Store key for a document.
    pub fn key_for(&self, reference: &DocumentReference) -> String {
        format!("{}{}", self.prefix, reference.cache_key())
    }

    pub async fn exists(&self, reference: &DocumentReference) -> Result<bool, StoreError> {
        self.store.exists(&self.key_for(reference)).await
    }

    pub async fn get(
        &self,
        reference: &DocumentReference,
    ) -> Result<Option<CacheRecord>, StoreError> {
        let key = self.key_for(reference);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let (pairs, fingerprint): StoredRecord =
            serde_json::from_str(&raw).map_err(|e| StoreError::Serialization {
                key: key.clone(),
                message: e.to_string(),
            })?;
        debug!(key = %key, entries = pairs.len(), "Loaded cache record");
        Ok(Some(CacheRecord {
            entries: pairs
                .into_iter()
                .map(|(question, answer)| QaPair { question, answer })
                .collect(),
            fingerprint: Fingerprint::new(fingerprint),
        }))
    }

    /// Overwrite the record for a document.
    pub async fn put(
        &self,
        reference: &DocumentReference,
        record: &CacheRecord,
    ) -> Result<(), StoreError> {
        let key = self.key_for(reference);
        let stored: StoredRecord = (
            record
                .entries
                .iter()
                .map(|p| (p.question.clone(), p.answer.clone()))
                .collect(),
            record.fingerprint.as_str().to_string(),
        );
        let json = serde_json::to_string(&stored).map_err(|e| StoreError::Serialization {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.store.set(&key, &json).await?;
        debug!(key = %key, entries = record.entries.len(), fingerprint = %record.fingerprint, "Stored cache record");
        Ok(())
    }
}
