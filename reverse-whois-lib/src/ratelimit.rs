//! Global request rate limiter.
//!
//! One limiter is shared by every worker in a run. Permits are released on a
//! fixed cadence of `1 / permits_per_second`, anchored at construction time,
//! independent of when callers show up. Missed ticks are skipped rather than
//! queued, so an idle period yields at most one immediately available permit.

use crate::error::ReverseWhoisError;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Process-wide permit source.
pub struct RateLimiter {
    ticker: Mutex<Interval>,
    period: Duration,
    permits_per_second: u32,
}

impl RateLimiter {
    /// Create a limiter releasing `permits_per_second` permits per second.
    ///
    /// Values below 1 are treated as 1. The upper bound is the caller's policy.
    /// Must be called from within a Tokio runtime.
    pub fn new(permits_per_second: u32) -> Self {
        let permits_per_second = permits_per_second.max(1);
        let period = Duration::from_secs(1) / permits_per_second;

        // First permit one period after start, then every period.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            ticker: Mutex::new(ticker),
            period,
            permits_per_second,
        }
    }

    pub fn permits_per_second(&self) -> u32 {
        self.permits_per_second
    }

    /// Spacing between consecutive permits.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next permit.
    ///
    /// Returns `RateLimitCanceled` without consuming a permit if `cancel` fires
    /// first. Waiters queue fairly on the ticker lock, so at most one permit is
    /// handed out per tick across all workers.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), ReverseWhoisError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ReverseWhoisError::RateLimitCanceled),
            _ = self.next_tick() => Ok(()),
        }
    }

    async fn next_tick(&self) {
        let mut ticker = self.ticker.lock().await;
        ticker.tick().await;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("permits_per_second", &self.permits_per_second)
            .field("period", &self.period)
            .finish()
    }
}
