//! Core data types for the faqgen engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A document hosted in a source repository, parsed from its URL.
///
/// Unresolvable locators still produce a reference, but with empty
/// `collection_id`/`revision`/`path`; see [`DocumentReference::is_resolved`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentReference {
    raw_locator: String,
    collection_id: String,
    revision: String,
    path: String,
}

impl DocumentReference {
    pub(crate) fn new(
        raw_locator: impl Into<String>,
        collection_id: impl Into<String>,
        revision: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            raw_locator: raw_locator.into(),
            collection_id: collection_id.into(),
            revision: revision.into(),
            path: path.into(),
        }
    }

    /// A reference marked invalid: it keeps the locator for reporting but
    /// carries no collection or path.
    pub fn unresolved(raw_locator: impl Into<String>) -> Self {
        Self::new(raw_locator, "", "", "")
    }

    /// Whether the locator parsed into a usable (collection, path) pair.
    pub fn is_resolved(&self) -> bool {
        !self.collection_id.is_empty() && !self.path.is_empty()
    }

    /// The locator exactly as the caller supplied it.
    pub fn raw_locator(&self) -> &str {
        &self.raw_locator
    }

    /// Repository identifier, `owner/name`.
    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Branch, tag, or commit the locator points at.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// File path inside the repository.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Store key identifying this document, independent of URL cosmetics
    /// such as query strings or fragments.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.collection_id, self.revision, self.path)
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw_locator)
    }
}

/// Opaque revision token for a document. Compared by equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A question and its answer, without any numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A numbered FAQ entry in a batch response.
///
/// `index` is 1-based and unique across the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub index: usize,
}

impl FaqEntry {
    /// The question prefixed with its number, as shown to readers.
    pub fn numbered_question(&self) -> String {
        format!("{}. {}", self.index, self.question)
    }

    /// The `[question, answer]` pair used on the HTTP wire.
    pub fn to_wire(&self) -> [String; 2] {
        [self.numbered_question(), self.answer.clone()]
    }
}

/// FAQ entries persisted for one document together with the fingerprint of
/// the revision they were generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub entries: Vec<QaPair>,
    pub fingerprint: Fingerprint,
}

impl CacheRecord {
    /// Whether this record may be served for a document currently at `current`.
    pub fn is_fresh(&self, current: &Fingerprint) -> bool {
        &self.fingerprint == current
    }
}

/// Represents a participant role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single chat message sent to or received from a generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Token usage statistics from an LLM call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// The result of an LLM completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: Message,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// A request to the LLM for completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    /// Overrides the backend's configured temperature when set.
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub model: Option<String>,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            model: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_reference() {
        let r = DocumentReference::unresolved("not a url");
        assert!(!r.is_resolved());
        assert_eq!(r.raw_locator(), "not a url");
        assert_eq!(r.collection_id(), "");
    }

    #[test]
    fn test_cache_key_ignores_locator_cosmetics() {
        let a = DocumentReference::new(
            "https://github.com/o/r/blob/main/README.md",
            "o/r",
            "main",
            "README.md",
        );
        let b = DocumentReference::new(
            "https://github.com/o/r/blob/main/README.md?plain=1#intro",
            "o/r",
            "main",
            "README.md",
        );
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "o/r/main/README.md");
    }

    #[test]
    fn test_fingerprint_serializes_as_string() {
        let fp = Fingerprint::new("abc123");
        assert_eq!(serde_json::to_string(&fp).unwrap(), "\"abc123\"");
        assert_eq!(fp.to_string(), "abc123");
    }

    #[test]
    fn test_faq_entry_wire_format() {
        let entry = FaqEntry {
            question: "How do I install it?".into(),
            answer: "Run the installer.".into(),
            index: 7,
        };
        assert_eq!(
            entry.to_wire(),
            [
                "7. How do I install it?".to_string(),
                "Run the installer.".to_string()
            ]
        );
    }

    #[test]
    fn test_cache_record_freshness() {
        let record = CacheRecord {
            entries: vec![QaPair::new("q", "a")],
            fingerprint: Fingerprint::new("sha-1"),
        };
        assert!(record.is_fresh(&Fingerprint::new("sha-1")));
        assert!(!record.is_fresh(&Fingerprint::new("sha-2")));
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello, world!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, world!");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
