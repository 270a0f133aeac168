//! Core sliding-window rate limiter implementation.

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::decision::Decision;
use super::key::RequestKey;
use super::store::{LogStore, ShardedLogStore};
use crate::error::{Result, SlidegateError};

/// Configuration for a sliding-window limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of the trailing window
    pub window: Duration,
    /// Maximum requests allowed per key within one window
    pub max_requests: u32,
}

impl RateLimitConfig {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
        }
    }

    /// Reject a zero window or a zero quota.
    pub fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            return Err(SlidegateError::InvalidConfig(
                "window duration must be greater than zero".to_string(),
            ));
        }
        if self.max_requests == 0 {
            return Err(SlidegateError::InvalidConfig(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A sliding-window-log rate limiter keyed by client identity and path.
///
/// Each key keeps the instants of its allowed requests. On every check the
/// log for the key is trimmed to the trailing window, then compared against
/// the quota. The evict/compare/record sequence for a key runs inside the
/// store's per-key critical section, so concurrent callers can never push a
/// key past its quota.
///
/// This struct is thread-safe and can be shared across tasks behind an `Arc`.
pub struct SlidingWindowLimiter<S: LogStore = ShardedLogStore> {
    /// Immutable limiter configuration
    config: RateLimitConfig,
    /// Timestamp logs indexed by request key
    store: S,
}

impl SlidingWindowLimiter<ShardedLogStore> {
    /// Create a new limiter backed by the default sharded store.
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        Self::with_store(config, ShardedLogStore::new())
    }
}

impl<S: LogStore> SlidingWindowLimiter<S> {
    /// Create a new limiter backed by the given store.
    pub fn with_store(config: RateLimitConfig, store: S) -> Result<Self> {
        config.validate()?;
        debug!(
            window_ms = config.window.as_millis() as u64,
            max_requests = config.max_requests,
            "Creating sliding window limiter"
        );
        Ok(Self { config, store })
    }

    /// Check a request made by `client` against `path` at instant `now`.
    ///
    /// Allowed requests are recorded; denied ones are not.
    pub fn check(&self, client: &str, path: &str, now: Instant) -> Decision {
        let key = RequestKey::new(client, path);
        self.check_key(&key, || now)
    }

    /// Check a request using the current monotonic time.
    ///
    /// The clock is read inside the key's critical section, so timestamps for
    /// a key are always recorded in non-decreasing order.
    pub fn check_now(&self, client: &str, path: &str) -> Decision {
        let key = RequestKey::new(client, path);
        self.check_key(&key, Instant::now)
    }

    fn check_key<C>(&self, key: &RequestKey, clock: C) -> Decision
    where
        C: FnOnce() -> Instant,
    {
        let window = self.config.window;
        let max_requests = self.config.max_requests as usize;

        let decision = self.store.with_log(key, |log| {
            let now = clock();
            let evicted = log.evict_outside(now, window);

            trace!(
                key = %key,
                evicted,
                in_window = log.len(),
                "Checking rate limit"
            );

            if log.len() >= max_requests {
                // The log is non-empty here since max_requests > 0
                let retry_after = log
                    .oldest()
                    .map(|oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
                    .unwrap_or(Duration::ZERO);
                return Decision::Deny { retry_after };
            }

            log.record(now);
            Decision::Allow
        });

        if let Decision::Deny { retry_after } = decision {
            debug!(
                key = %key,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
        }

        decision
    }

    /// Remove keys whose logs are empty once evicted against `now`.
    ///
    /// Returns the number of keys removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let window = self.config.window;
        let removed = self.store.retain(|_, log| {
            log.evict_outside(now, window);
            !log.is_empty()
        });

        debug!(
            removed,
            remaining = self.store.len(),
            "Swept idle rate limit keys"
        );
        removed
    }

    /// Get the limiter configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Get the number of tracked keys.
    pub fn key_count(&self) -> usize {
        self.store.len()
    }

    /// Get the current log length for a key without evicting.
    ///
    /// Returns `None` if the key has never been seen.
    pub fn log_len(&self, client: &str, path: &str) -> Option<usize> {
        self.store.peek_len(&RequestKey::new(client, path))
    }

    /// Clear all logs.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.clear();
    }
}
