//! Rate limiter for Telegram API calls.
//!
//! Spaces out messages sent to a single chat so bursts of votes do not
//! trigger Telegram's flood control.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Rate limiter that enforces minimum intervals between operations.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between allowed operations.
    min_interval: Duration,

    /// Last time an operation was performed.
    last_operation: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_operation: Mutex::new(None),
        }
    }

    /// Waits until an operation is allowed, then marks the operation as performed.
    ///
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut last = self.last_operation.lock().await;

        let wait_duration = last.map_or(Duration::ZERO, |last_time| {
            self.min_interval.saturating_sub(last_time.elapsed())
        });

        if !wait_duration.is_zero() {
            debug!(
                "Rate limiter: waiting {:?} before next message",
                wait_duration
            );
            tokio::time::sleep(wait_duration).await;
        }

        *last = Some(Instant::now());
        wait_duration
    }

    /// Sleeps for a flood wait imposed by Telegram and restarts the interval.
    pub async fn back_off(&self, wait: Duration) {
        warn!("Telegram asked to retry after {:?}", wait);
        tokio::time::sleep(wait).await;

        let mut last = self.last_operation.lock().await;
        *last = Some(Instant::now());
    }
}
