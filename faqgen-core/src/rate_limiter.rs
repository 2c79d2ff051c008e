//! Per-user fixed-window request limiter.
//!
//! Each user has one counter in the shared store that expires `window` after
//! it was created. A request is allowed while the counter, after increment,
//! does not exceed `max_requests`; denied requests are not counted. The window
//! is fixed rather than sliding, so a user can get up to
//! `2 * max_requests - 1` requests through across a window boundary.

use crate::config::RateLimitConfig;
use crate::error::StoreError;
use crate::store::SharedStore;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The request may proceed; `count` is the request's position in the window.
    Allowed { count: u64 },
    /// The window's quota is used up; `count` is the number of requests
    /// admitted so far, which races can push past the maximum.
    Denied { count: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Fixed-window limiter keyed by user identity.
#[derive(Clone)]
pub struct RateLimiter {
    store: SharedStore,
    prefix: String,
    window: Duration,
    max_requests: u64,
}

impl RateLimiter {
    pub fn new(store: SharedStore, key_prefix: &str, config: &RateLimitConfig) -> Self {
        Self {
            store,
            prefix: format!("{key_prefix}:rate_limit:"),
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
        }
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether a request from `user_id` may proceed, counting it if so.
    ///
    /// A user whose quota is already used up is denied without touching the
    /// counter. Otherwise uses set-if-absent-with-expiry followed by an atomic
    /// increment, so two concurrent first requests cannot both initialize the
    /// window and the increment alone decides admission.
    pub async fn check_and_consume(&self, user_id: &str) -> Result<RateDecision, StoreError> {
        let key = format!("{}{}", self.prefix, user_id);
        if let Some(raw) = self.store.get(&key).await? {
            let used: u64 = raw
                .trim()
                .parse()
                .map_err(|_| StoreError::Corrupt { key: key.clone() })?;
            if used >= self.max_requests {
                debug!(
                    user_id = %user_id,
                    count = used,
                    max = self.max_requests,
                    "Rate limit exceeded"
                );
                return Ok(RateDecision::Denied { count: used });
            }
        }

        let created = self
            .store
            .set_if_absent_with_expiry(&key, "0", self.window)
            .await?;
        let count = self.store.incr(&key).await?;

        // The window can lapse between the two calls, leaving a counter that
        // `incr` recreated without expiry.
        if count == 1 && !created {
            warn!(user_id = %user_id, "Rate window lapsed mid-check; re-arming expiry");
            self.store.expire(&key, self.window).await?;
        }

        let count = u64::try_from(count).unwrap_or(0);
        if count <= self.max_requests {
            debug!(user_id = %user_id, count, max = self.max_requests, "Rate limit check passed");
            Ok(RateDecision::Allowed { count })
        } else {
            debug!(user_id = %user_id, count, max = self.max_requests, "Rate limit exceeded");
            Ok(RateDecision::Denied { count })
        }
    }
}
