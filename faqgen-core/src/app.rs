//! Wiring from configuration to a running service.

use crate::cache::FaqCache;
use crate::config::FaqgenConfig;
use crate::content::GitHubContentProvider;
use crate::error::Result;
use crate::gateway::{GatewayState, SharedGateway};
use crate::github::GitHubClient;
use crate::orchestrator::Orchestrator;
use crate::providers::create_provider;
use crate::rate_limiter::RateLimiter;
use crate::store::{SharedStore, open_store};
use crate::version::GitHubVersionOracle;
use std::sync::Arc;
use tracing::info;

/// Construct the orchestrator with the GitHub collaborators, the configured
/// generation backend, and `store`.
pub fn build_orchestrator_with_store(
    config: &FaqgenConfig,
    store: SharedStore,
) -> Result<Orchestrator> {
    let token = config.github.token();
    if token.is_none() {
        info!(
            env = %config.github.token_env,
            "No GitHub token set; using unauthenticated API limits"
        );
    }
    let api = GitHubClient::new(&config.github, token)?;
    let llm = create_provider(&config.llm)?;
    let key_prefix = &config.store.key_prefix;

    Ok(Orchestrator::new(
        Arc::new(GitHubContentProvider::new(api.clone())),
        Arc::new(GitHubVersionOracle::new(api)),
        llm,
        FaqCache::new(store.clone(), key_prefix),
        RateLimiter::new(store, key_prefix, &config.rate_limit),
        config.generation.clone(),
    ))
}

/// Open the configured store and construct the orchestrator.
pub fn build_orchestrator(config: &FaqgenConfig) -> Result<Orchestrator> {
    let store = open_store(&config.store)?;
    info!(backend = ?config.store.backend, "Store opened");
    build_orchestrator_with_store(config, store)
}

/// Construct the shared gateway state for `faqgen serve`.
pub fn build_gateway(config: &FaqgenConfig) -> Result<SharedGateway> {
    let orchestrator = build_orchestrator(config)?;
    Ok(GatewayState::new(Arc::new(orchestrator), config.server.clone()).shared())
}
