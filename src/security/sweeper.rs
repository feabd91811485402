//! Background expiry for limiter state.
//!
//! # Responsibilities
//! - Periodically drop client state that no longer affects decisions
//! - Stop on the shutdown signal, when the limiter is dropped, or when the
//!   owning handle is dropped
//!
//! # Design Decisions
//! - The task holds only a weak reference to the limiter
//! - Sweeping only removes entries; it never blocks on I/O

use std::sync::{Arc, Weak};
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::observability::metrics;
use crate::security::rate_limit::RateLimiter;

/// Owns a running sweep task. Dropping the handle stops the task.
pub struct SweepHandle {
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Start sweeping `limiter` every `limiter.sweep_period()`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(limiter: &Arc<dyn RateLimiter>, mut shutdown: broadcast::Receiver<()>) -> Self {
        let period = limiter.sweep_period();
        let weak: Weak<dyn RateLimiter> = Arc::downgrade(limiter);
        let name = limiter.name().to_string();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(limiter = %name, period = ?period, "Limiter sweep started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(limiter) = weak.upgrade() else {
                            break;
                        };
                        let removed = limiter.sweep_at(Instant::now());
                        let tracked = limiter.tracked_clients();
                        metrics::record_limiter_size(&name, tracked);
                        if removed > 0 {
                            tracing::debug!(limiter = %name, removed, tracked, "Swept expired clients");
                        }
                    }
                    _ = shutdown.recv() => {
                        break;
                    }
                }
            }

            tracing::debug!(limiter = %name, "Limiter sweep stopped");
        });

        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
