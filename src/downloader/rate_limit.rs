//! Request spacing for the API rate limit.
//!
//! The upstream API throttles by calls per second, so the limiter enforces a
//! minimum interval between consecutive requests rather than a windowed
//! quota. Acquisitions are strictly serialized: a caller holds the limiter
//! for the whole wait, so two requests can never be granted closer together
//! than the configured spacing.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Spaces out API requests to a fixed calls-per-second rate.
///
/// The last-grant timestamp is private state owned by this instance; callers
/// share the limiter explicitly (typically via `Arc`) rather than through
/// globals.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` calls per second.
    ///
    /// Non-positive or non-finite rates fall back to one call per second.
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            1.0
        };
        Self {
            min_interval: Duration::from_secs_f64(1.0 / rate),
            last_grant: Mutex::new(None),
        }
    }

    /// The enforced minimum spacing between grants.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until at least `1/rate` seconds have passed since the previous
    /// grant, then record this grant.
    ///
    /// The internal lock is held across the sleep, so concurrent callers
    /// queue and are granted one at a time in lock-acquisition order.
    pub async fn acquire(&self) {
        let mut last_grant = self.last_grant.lock().await;
        if let Some(previous) = *last_grant {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last_grant = Some(Instant::now());
    }
}
