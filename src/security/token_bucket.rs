//! Token-bucket rate limiter.
//!
//! New clients start with a full bucket of `burst` tokens. Every whole
//! `interval` since the last refill adds `rate` tokens, capped at `burst`.
//! Each admitted request spends one token.

use std::time::{Duration, Instant};

use crate::config::TokenBucketConfig;
use crate::security::identity::{ClientInfo, IdentifierMode};
use crate::security::rate_limit::{Decision, RateLimiter};
use crate::security::store::ClientStore;

/// Per-client bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visitor {
    pub tokens: u32,
    pub last_refill_at: Instant,
}

pub struct TokenBucketLimiter {
    name: String,
    rate: u32,
    burst: u32,
    interval: Duration,
    store: ClientStore<Visitor>,
}

impl TokenBucketLimiter {
    pub fn new(
        name: impl Into<String>,
        rate: u32,
        burst: u32,
        interval: Duration,
        mode: IdentifierMode,
    ) -> Self {
        Self {
            name: name.into(),
            rate,
            burst,
            interval,
            store: ClientStore::new(mode),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &TokenBucketConfig, mode: IdentifierMode) -> Self {
        Self::new(
            name,
            config.rate,
            config.burst,
            Duration::from_secs(config.interval_secs),
            mode,
        )
    }

    /// Snapshot of one client's bucket.
    pub fn visitor(&self, key: &str) -> Option<Visitor> {
        self.store.get(key)
    }

    fn elapsed_intervals(&self, visitor: &Visitor, now: Instant) -> u64 {
        let interval = self.interval.as_nanos();
        if interval == 0 {
            return 0;
        }
        let elapsed = now.saturating_duration_since(visitor.last_refill_at).as_nanos();
        u64::try_from(elapsed / interval).unwrap_or(u64::MAX)
    }

    /// Tokens the visitor would hold after refilling at `now`.
    fn refilled_tokens(&self, visitor: &Visitor, intervals: u64) -> u32 {
        let added = intervals.saturating_mul(u64::from(self.rate));
        let total = u64::from(visitor.tokens).saturating_add(added);
        total.min(u64::from(self.burst)) as u32
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_at(&self, client: &ClientInfo, now: Instant) -> Decision {
        let full = || Visitor {
            tokens: self.burst,
            last_refill_at: now,
        };

        let (key, allowed) = self.store.with_client(client, full, |visitor| {
            let intervals = self.elapsed_intervals(visitor, now);
            if intervals > 0 {
                visitor.tokens = self.refilled_tokens(visitor, intervals);
                visitor.last_refill_at = now;
            }

            if visitor.tokens > 0 {
                visitor.tokens -= 1;
                true
            } else {
                false
            }
        });

        Decision {
            allowed,
            key,
            quota: None,
        }
    }

    fn mode(&self) -> IdentifierMode {
        self.store.mode()
    }

    fn set_mode(&self, mode: IdentifierMode) {
        let dropped = self.store.set_mode(mode);
        tracing::info!(limiter = %self.name, mode = ?mode, dropped, "Identifier mode changed");
    }

    /// Evict visitors whose bucket would be full after refilling. Such a
    /// visitor is indistinguishable from one that was never seen.
    fn sweep_at(&self, now: Instant) -> usize {
        self.store.retain(|_, visitor| {
            let intervals = self.elapsed_intervals(visitor, now);
            intervals == 0 || self.refilled_tokens(visitor, intervals) < self.burst
        })
    }

    fn sweep_period(&self) -> Duration {
        self.interval
    }

    fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}
