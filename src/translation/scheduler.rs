/*!
 * Dispatch-rate gating for batch execution.
 *
 * Two gates compose per batch: a bounded-concurrency semaphore (owned by the
 * batch translator) and this rate limiter, which spaces dispatch starts no
 * closer than `1000 / rps` milliseconds apart. Waiters are served in FIFO
 * order through the fairness of the internal async mutex.
 */

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Interval-gated rate limiter for dispatch starts.
pub struct RateLimiter {
    /// Minimum spacing between grants; `None` disables the limiter
    interval: Option<Duration>,
    /// Time of the most recently assigned grant slot
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter for the given requests-per-second ceiling.
    /// A ceiling of 0 disables rate limiting entirely.
    pub fn new(max_requests_per_second: u32) -> Self {
        let interval = if max_requests_per_second == 0 {
            None
        } else {
            Some(Duration::from_millis(1000 / u64::from(max_requests_per_second).max(1)))
        };
        Self {
            interval,
            last_grant: Mutex::new(None),
        }
    }

    /// Whether rate limiting is active.
    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for this caller's dispatch turn.
    ///
    /// Each caller is assigned the earliest slot at least one interval after
    /// the previously assigned slot, then sleeps until that slot arrives.
    pub async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let slot = {
            let mut last_grant = self.last_grant.lock().await;
            let now = Instant::now();
            let slot = match *last_grant {
                Some(previous) => now.max(previous + interval),
                None => now,
            };
            *last_grant = Some(slot);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}
