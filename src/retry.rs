/*!
 * Generic retry executor for provider operations.
 *
 * Wraps an async operation, consults the [`RetryPolicy`] of each classified
 * failure, and retries with exponential backoff plus jitter. Cancellation is
 * honored both between attempts and during backoff sleeps.
 */

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::errors::{ErrorKind, TranslationError};

/// Upper bound on any computed backoff delay.
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Callback invoked before each backoff sleep: (error, attempt, delay_ms).
pub type RetryCallback = Box<dyn Fn(&TranslationError, u32, u64) + Send + Sync>;

/// Options for [`with_retry`].
pub struct RetryOptions {
    /// Caller-level cap on retry attempts; the effective cap is the minimum
    /// of this and the error kind's own policy cap.
    pub max_retries: u32,
    /// Cooperative cancellation token
    pub cancel: CancellationToken,
    /// Observer called before each sleep
    pub on_retry: Option<RetryCallback>,
}

impl RetryOptions {
    /// Create options with the given retry cap and a fresh token.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            cancel: CancellationToken::new(),
            on_retry: None,
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attach a retry observer.
    pub fn with_on_retry(mut self, on_retry: RetryCallback) -> Self {
        self.on_retry = Some(on_retry);
        self
    }
}

/// Compute the delay before the next attempt.
///
/// An explicit server retry hint is used verbatim. Exponential kinds back off
/// as `base * 2^attempt` with up to 30% jitter, capped at
/// [`MAX_RETRY_DELAY_MS`]; flat kinds use their base delay.
pub fn calculate_retry_delay(error: &TranslationError, attempt: u32) -> u64 {
    if let Some(secs) = error.retry_after_secs {
        return secs * 1000;
    }

    let policy = error.retry_policy();
    if policy.exponential {
        let exponential = policy.base_delay_ms.saturating_mul(1u64 << attempt.min(20));
        let jitter_frac: f64 = rand::rng().random_range(0.0..0.3);
        let jitter = (jitter_frac * exponential as f64) as u64;
        exponential.saturating_add(jitter).min(MAX_RETRY_DELAY_MS)
    } else {
        policy.base_delay_ms
    }
}

/// Execute `operation`, retrying classified transient failures per policy.
///
/// Terminal kinds (AUTH, QUOTA, CANCELLED) and non-retryable errors surface
/// immediately. A cancellation during a backoff sleep aborts the sleep and
/// returns a CANCELLED error at once.
pub async fn with_retry<T, F, Fut>(mut operation: F, options: RetryOptions) -> Result<T, TranslationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TranslationError>>,
{
    for attempt in 0..=options.max_retries {
        if options.cancel.is_cancelled() {
            return Err(TranslationError::cancelled());
        }

        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if error.kind == ErrorKind::Cancelled {
            return Err(error);
        }

        let policy = error.retry_policy();
        if !policy.retryable {
            return Err(error);
        }
        if attempt >= options.max_retries.min(policy.max_retries) {
            return Err(error);
        }

        let delay = calculate_retry_delay(&error, attempt);
        if let Some(on_retry) = &options.on_retry {
            on_retry(&error, attempt + 1, delay);
        }

        tokio::select! {
            _ = options.cancel.cancelled() => return Err(TranslationError::cancelled()),
            _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
        }
    }

    Err(TranslationError::new(ErrorKind::Unknown, "retry attempts exhausted"))
}
