//! Batch FAQ generation.
//!
//! The orchestrator checks the caller's rate limit once, gives every input
//! reference a fixed block of `K` output indices, then processes all documents
//! concurrently. Each task writes into its own pre-sized slot, so the merged
//! output order depends only on input order and never on completion order.
//!
//! A document that cannot be fetched or generated contributes nothing; only
//! rate limit denial, a batch with no resolvable references, and store
//! failures abort the call.

use crate::brain::{LlmProvider, generate_text};
use crate::cache::FaqCache;
use crate::config::GenerationConfig;
use crate::content::ContentProvider;
use crate::error::{FetchError, GenerateError, LlmError, ResolveError, StoreError};
use crate::parser::parse_faq;
use crate::prompt::{build_prompt, prior_context};
use crate::rate_limiter::{RateDecision, RateLimiter};
use crate::resolver;
use crate::types::{CacheRecord, DocumentReference, FaqEntry, Fingerprint, QaPair};
use crate::version::VersionOracle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// Number `pairs` consecutively starting at `start_index`.
pub fn number_entries(pairs: Vec<QaPair>, start_index: usize) -> Vec<FaqEntry> {
    pairs
        .into_iter()
        .enumerate()
        .map(|(offset, pair)| FaqEntry {
            question: pair.question,
            answer: pair.answer,
            index: start_index + offset,
        })
        .collect()
}

/// First index of the block owned by input position `slot`.
pub fn block_start(slot: usize, questions_per_document: usize) -> usize {
    1 + slot * questions_per_document
}

/// Per-document pipeline shared by every task in a batch.
struct DocumentWorker {
    content: Arc<dyn ContentProvider>,
    oracle: Arc<dyn VersionOracle>,
    llm: Arc<dyn LlmProvider>,
    cache: FaqCache,
    config: GenerationConfig,
}

impl DocumentWorker {
    /// Produce the entries for one document.
    ///
    /// Only store failures are returned as errors; every other failure yields
    /// an empty list.
    async fn process(
        &self,
        reference: &DocumentReference,
        start_index: usize,
    ) -> Result<Vec<FaqEntry>, StoreError> {
        let k = self.config.questions_per_document;
        let fetch_timeout = Duration::from_secs(self.config.fetch_timeout_secs);

        let fetched = tokio::time::timeout(fetch_timeout, self.content.fetch(reference))
            .await
            .unwrap_or(Err(FetchError::Timeout {
                timeout_secs: self.config.fetch_timeout_secs,
            }));
        let content = match fetched {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Document fetch failed; contributing no entries");
                return Ok(Vec::new());
            }
        };

        let fingerprint = match tokio::time::timeout(
            fetch_timeout,
            self.oracle.current_fingerprint(reference),
        )
        .await
        {
            Ok(Ok(fp)) => Some(fp),
            Ok(Err(e)) => {
                warn!(error = %e, "Fingerprint unavailable; regenerating without caching");
                None
            }
            Err(_) => {
                warn!("Fingerprint lookup timed out; regenerating without caching");
                None
            }
        };

        let cached = match self.cache.get(reference).await {
            Ok(record) => record,
            Err(StoreError::Serialization { key, message }) => {
                warn!(key = %key, error = %message, "Unreadable cache record; regenerating");
                None
            }
            Err(e) => return Err(e),
        };

        if let (Some(record), Some(current)) = (&cached, &fingerprint)
            && record.is_fresh(current)
        {
            debug!(fingerprint = %current, entries = record.entries.len(), "Cache hit");
            let mut pairs = record.entries.clone();
            pairs.truncate(k);
            return Ok(number_entries(pairs, start_index));
        }
        debug!(cached = cached.is_some(), "Cache miss");

        let Some(pairs) = self.generate(&content, start_index, cached.as_ref()).await else {
            return Ok(Vec::new());
        };
        if pairs.is_empty() {
            warn!("Backend output contained no recognizable questions");
        }

        self.store_record(reference, &pairs, fingerprint).await?;
        Ok(number_entries(pairs, start_index))
    }

    /// Prompt the backend and parse its answer. `None` on backend failure.
    async fn generate(
        &self,
        content: &str,
        start_index: usize,
        stale: Option<&CacheRecord>,
    ) -> Option<Vec<QaPair>> {
        let k = self.config.questions_per_document;
        let prompt = build_prompt(content, start_index, k);
        let context = if self.config.carry_previous_context {
            stale.and_then(|record| prior_context(&record.entries, start_index))
        } else {
            None
        };

        let generation_timeout = Duration::from_secs(self.config.generation_timeout_secs);
        let generated = tokio::time::timeout(
            generation_timeout,
            generate_text(self.llm.as_ref(), &prompt, context.as_deref()),
        )
        .await
        .unwrap_or(Err(LlmError::Timeout {
            timeout_secs: self.config.generation_timeout_secs,
        }));
        let text = match generated {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Generation failed; contributing no entries");
                return None;
            }
        };

        let mut pairs = parse_faq(&text);
        if pairs.len() > k {
            debug!(parsed = pairs.len(), kept = k, "Dropping surplus entries");
            pairs.truncate(k);
        }
        Some(pairs)
    }

    async fn store_record(
        &self,
        reference: &DocumentReference,
        pairs: &[QaPair],
        fingerprint: Option<Fingerprint>,
    ) -> Result<(), StoreError> {
        let Some(fingerprint) = fingerprint else {
            debug!("Skipping cache write without a fingerprint");
            return Ok(());
        };
        let record = CacheRecord {
            entries: pairs.to_vec(),
            fingerprint,
        };
        self.cache.put(reference, &record).await
    }
}

/// Entry point for generating a numbered FAQ from a batch of documents.
///
/// All collaborators are injected; the orchestrator holds no global state.
pub struct Orchestrator {
    worker: Arc<DocumentWorker>,
    limiter: RateLimiter,
    semaphore: Option<Arc<Semaphore>>,
}

impl Orchestrator {
    pub fn new(
        content: Arc<dyn ContentProvider>,
        oracle: Arc<dyn VersionOracle>,
        llm: Arc<dyn LlmProvider>,
        cache: FaqCache,
        limiter: RateLimiter,
        config: GenerationConfig,
    ) -> Self {
        let semaphore =
            (config.max_concurrency > 0).then(|| Arc::new(Semaphore::new(config.max_concurrency)));
        Self {
            worker: Arc::new(DocumentWorker {
                content,
                oracle,
                llm,
                cache,
                config,
            }),
            limiter,
            semaphore,
        }
    }

    pub fn questions_per_document(&self) -> usize {
        self.worker.config.questions_per_document
    }

    /// Resolve raw locators and generate.
    pub async fn generate_urls(
        &self,
        user_id: &str,
        urls: &[String],
    ) -> Result<Vec<FaqEntry>, GenerateError> {
        let references = urls
            .iter()
            .map(|url| DocumentReference::from_locator(url))
            .collect();
        self.generate(user_id, references).await
    }

    /// Like [`Orchestrator::generate_urls`], bounded by `deadline`.
    ///
    /// On expiry every in-flight document task is aborted.
    pub async fn generate_urls_within(
        &self,
        user_id: &str,
        urls: &[String],
        deadline: Duration,
    ) -> Result<Vec<FaqEntry>, GenerateError> {
        match tokio::time::timeout(deadline, self.generate_urls(user_id, urls)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(user_id = %user_id, timeout_secs = deadline.as_secs(), "Batch deadline exceeded");
                Err(GenerateError::DeadlineExceeded {
                    timeout_secs: deadline.as_secs(),
                })
            }
        }
    }

    /// Generate the merged, globally numbered FAQ for `references`.
    ///
    /// Reference `i` owns indices `1 + i*K ..= K + i*K`. A document yielding
    /// fewer than `K` entries leaves the rest of its block unused.
    pub async fn generate(
        &self,
        user_id: &str,
        references: Vec<DocumentReference>,
    ) -> Result<Vec<FaqEntry>, GenerateError> {
        if references.is_empty() {
            return Err(GenerateError::EmptyBatch);
        }
        let batch_id = Uuid::new_v4();
        let span = info_span!("generate", %batch_id, user_id = %user_id, size = references.len());
        self.run_batch(user_id, references).instrument(span).await
    }

    async fn run_batch(
        &self,
        user_id: &str,
        references: Vec<DocumentReference>,
    ) -> Result<Vec<FaqEntry>, GenerateError> {
        if let RateDecision::Denied { count } = self.limiter.check_and_consume(user_id).await? {
            info!(count, "Rate limit denied");
            return Err(GenerateError::RateLimited {
                user_id: user_id.to_string(),
                limit: self.limiter.max_requests(),
                window_secs: self.limiter.window().as_secs(),
            });
        }

        let unresolved: Vec<ResolveError> = references
            .iter()
            .filter(|r| !r.is_resolved())
            .map(|r| {
                resolver::resolve(r.raw_locator())
                    .err()
                    .unwrap_or_else(|| ResolveError::MissingSegments {
                        locator: r.raw_locator().to_string(),
                        what: "repository location".to_string(),
                    })
            })
            .collect();
        if unresolved.len() == references.len() {
            return Err(GenerateError::NoResolvableReferences { errors: unresolved });
        }
        for err in &unresolved {
            warn!(error = %err, "Skipping unresolvable reference");
        }

        let k = self.worker.config.questions_per_document;
        let mut slots: Vec<Vec<FaqEntry>> = vec![Vec::new(); references.len()];
        let mut tasks = JoinSet::new();

        for (slot, reference) in references.into_iter().enumerate() {
            if !reference.is_resolved() {
                continue;
            }
            let start_index = block_start(slot, k);
            let worker = Arc::clone(&self.worker);
            let semaphore = self.semaphore.clone();
            let span = info_span!("document", slot, locator = %reference);
            tasks.spawn(
                async move {
                    let _permit = match semaphore {
                        Some(semaphore) => match semaphore.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(_) => return (slot, Ok(Vec::new())),
                        },
                        None => None,
                    };
                    (slot, worker.process(&reference, start_index).await)
                }
                .instrument(span),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, Ok(entries))) => slots[slot] = entries,
                Ok((slot, Err(e))) => {
                    error!(slot, error = %e, "Store failure; aborting batch");
                    tasks.abort_all();
                    return Err(GenerateError::Store(e));
                }
                Err(e) => {
                    error!(error = %e, "Document task panicked; aborting batch");
                    tasks.abort_all();
                    return Err(GenerateError::TaskFailed {
                        message: e.to_string(),
                    });
                }
            }
        }

        let entries: Vec<FaqEntry> = slots.into_iter().flatten().collect();
        info!(entries = entries.len(), "Batch complete");
        Ok(entries)
    }
}
