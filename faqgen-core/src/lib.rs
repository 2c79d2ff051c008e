//! # Faqgen Core
//!
//! Core library for the faqgen service.
//! Turns a batch of repository document URLs into one consistently numbered
//! FAQ list, reusing cached entries while a document's revision is unchanged
//! and limiting how many batches each user may request per window.

pub mod app;
pub mod brain;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod gateway;
pub mod github;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod providers;
pub mod rate_limiter;
pub mod resolver;
pub mod store;
pub mod types;
pub mod version;

// Re-export commonly used types at the crate root.
pub use app::{build_gateway, build_orchestrator, build_orchestrator_with_store};
pub use brain::{LlmProvider, MockLlmProvider};
pub use cache::FaqCache;
pub use config::{FaqgenConfig, load_config};
pub use content::{ContentProvider, MockContentProvider};
pub use error::{FaqgenError, GenerateError, Result};
pub use orchestrator::Orchestrator;
pub use parser::parse_faq;
pub use rate_limiter::{RateDecision, RateLimiter};
pub use resolver::resolve;
pub use store::{KvStore, MemoryStore, SharedStore, SqliteStore};
pub use types::{CacheRecord, DocumentReference, FaqEntry, Fingerprint, QaPair};
pub use version::{MockVersionOracle, VersionOracle};
