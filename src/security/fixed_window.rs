//! Fixed-window rate limiter.
//!
//! Each client gets `max` requests per window. The window starts with the
//! client's first request and is a hard cutoff: a client at its limit waits
//! for the window to end, with no partial credit.

use std::time::{Duration, Instant};

use crate::config::FixedWindowConfig;
use crate::security::identity::{ClientInfo, IdentifierMode};
use crate::security::rate_limit::{Decision, Quota, RateLimiter};
use crate::security::store::ClientStore;

/// Per-client window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_at: Instant,
}

impl RateLimitEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.window_reset_at
    }
}

pub struct FixedWindowLimiter {
    name: String,
    max: u32,
    window: Duration,
    store: ClientStore<RateLimitEntry>,
}

impl FixedWindowLimiter {
    pub fn new(name: impl Into<String>, max: u32, window: Duration, mode: IdentifierMode) -> Self {
        Self {
            name: name.into(),
            max,
            window,
            store: ClientStore::new(mode),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &FixedWindowConfig, mode: IdentifierMode) -> Self {
        Self::new(
            name,
            config.max_requests,
            Duration::from_secs(config.window_secs),
            mode,
        )
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Snapshot of one client's entry.
    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.store.get(key)
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_at(&self, client: &ClientInfo, now: Instant) -> Decision {
        let fresh = || RateLimitEntry {
            count: 0,
            window_reset_at: now + self.window,
        };

        let (key, (allowed, entry)) = self.store.with_client(client, fresh, |entry| {
            if entry.is_expired(now) || entry.count == 0 {
                *entry = RateLimitEntry {
                    count: 1,
                    window_reset_at: now + self.window,
                };
                return (true, *entry);
            }
            if entry.count >= self.max {
                return (false, *entry);
            }
            entry.count += 1;
            (true, *entry)
        });

        let remaining = if allowed {
            self.max.saturating_sub(entry.count)
        } else {
            0
        };

        Decision {
            allowed,
            key,
            quota: Some(Quota::new(
                self.max,
                remaining,
                entry.window_reset_at.saturating_duration_since(now),
            )),
        }
    }

    fn mode(&self) -> IdentifierMode {
        self.store.mode()
    }

    fn set_mode(&self, mode: IdentifierMode) {
        let dropped = self.store.set_mode(mode);
        tracing::info!(limiter = %self.name, mode = ?mode, dropped, "Identifier mode changed");
    }

    fn sweep_at(&self, now: Instant) -> usize {
        self.store.retain(|_, entry| !entry.is_expired(now))
    }

    fn sweep_period(&self) -> Duration {
        self.window
    }

    fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}
