/*!
 * Error types for the subtrans translation engine.
 *
 * Every failure that crosses a provider or storage boundary is converted into
 * a [`TranslationError`] carrying a classified [`ErrorKind`]. Each kind maps
 * to a fixed [`RetryPolicy`] consumed by the retry executor.
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of failure classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Connection failures, timeouts, 5xx responses
    Network,
    /// Provider throttling (HTTP 429 or rate-limit wording)
    RateLimit,
    /// Invalid or expired credentials (401/403)
    Auth,
    /// Exhausted account quota or balance (402 or quota wording)
    Quota,
    /// Malformed or unparseable provider response
    Parse,
    /// Cooperative cancellation
    Cancelled,
    /// Anything else
    Unknown,
}

/// Static retry behavior attached to an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Whether this kind may be retried at all
    pub retryable: bool,
    /// Kind-level cap on retry attempts
    pub max_retries: u32,
    /// Base delay in milliseconds before the next attempt
    pub base_delay_ms: u64,
    /// Whether the delay grows exponentially per attempt
    pub exponential: bool,
}

impl ErrorKind {
    /// Retry policy table. Terminal kinds never retry.
    pub const fn retry_policy(self) -> RetryPolicy {
        match self {
            Self::Network => RetryPolicy { retryable: true, max_retries: 3, base_delay_ms: 1000, exponential: true },
            Self::RateLimit => RetryPolicy { retryable: true, max_retries: 5, base_delay_ms: 2000, exponential: true },
            Self::Auth => RetryPolicy { retryable: false, max_retries: 0, base_delay_ms: 0, exponential: false },
            Self::Quota => RetryPolicy { retryable: false, max_retries: 0, base_delay_ms: 0, exponential: false },
            Self::Parse => RetryPolicy { retryable: true, max_retries: 1, base_delay_ms: 500, exponential: false },
            Self::Cancelled => RetryPolicy { retryable: false, max_retries: 0, base_delay_ms: 0, exponential: false },
            Self::Unknown => RetryPolicy { retryable: true, max_retries: 2, base_delay_ms: 1000, exponential: true },
        }
    }

    /// Classify a failure from an HTTP status code, falling back to message
    /// keywords for client errors that carry no dedicated status.
    pub fn from_status(status_code: u16, message: &str) -> Self {
        match status_code {
            429 => Self::RateLimit,
            401 | 403 => Self::Auth,
            402 => Self::Quota,
            code if code >= 500 => Self::Network,
            _ => Self::from_message(message),
        }
    }

    /// Classify a failure from its message alone.
    pub fn from_message(message: &str) -> Self {
        let message = message.to_lowercase();

        if message.contains("quota") || message.contains("insufficient") || message.contains("balance") {
            return Self::Quota;
        }
        if message.contains("rate") || message.contains("too many requests") || message.contains("limit") {
            return Self::RateLimit;
        }
        if message.contains("abort") || message.contains("cancel") {
            return Self::Cancelled;
        }
        if message.contains("network")
            || message.contains("timeout")
            || message.contains("timed out")
            || message.contains("connection")
            || message.contains("connection refused")
            || message.contains("socket")
        {
            return Self::Network;
        }
        if message.contains("json") || message.contains("parse") || message.contains("unexpected token") {
            return Self::Parse;
        }

        Self::Unknown
    }

    /// Classify from an optional status code plus message.
    pub fn classify(status_code: Option<u16>, message: &str) -> Self {
        match status_code {
            Some(code) => Self::from_status(code, message),
            None => Self::from_message(message),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Network => "NETWORK",
            Self::RateLimit => "RATE_LIMIT",
            Self::Auth => "AUTH",
            Self::Quota => "QUOTA",
            Self::Parse => "PARSE",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// A classified translation failure.
///
/// Created once at the failure boundary and never mutated afterwards; carried
/// up to batch, file, and job level as-is.
#[derive(Debug, Clone, Error)]
#[error("[{kind}] {message}")]
pub struct TranslationError {
    /// Classified failure kind
    pub kind: ErrorKind,
    /// Technical message for logs
    pub message: String,
    /// HTTP status code, when the failure came from an HTTP response
    pub status_code: Option<u16>,
    /// Server-provided retry hint in seconds
    pub retry_after_secs: Option<u64>,
    /// Provider request id, when available
    pub request_id: Option<String>,
}

impl TranslationError {
    /// Create an error with an explicit kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            retry_after_secs: None,
            request_id: None,
        }
    }

    /// Classify and create from an HTTP status code.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::from_status(status_code, &message),
            message,
            status_code: Some(status_code),
            retry_after_secs: None,
            request_id: None,
        }
    }

    /// Classify and create from a bare message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::from_message(&message),
            message,
            status_code: None,
            retry_after_secs: None,
            request_id: None,
        }
    }

    /// The cancellation error raised when a token fires.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "translation cancelled")
    }

    /// Attach a server retry hint.
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    /// Attach a provider request id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Retry policy for this error's kind.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.kind.retry_policy()
    }

    /// Whether the retry executor may retry this error.
    pub fn is_retryable(&self) -> bool {
        self.retry_policy().retryable
    }

    /// Human-readable summary, distinct from the technical message.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => "Network connection failed, check your connection and try again".to_string(),
            ErrorKind::RateLimit => format!(
                "Too many requests, please wait {} seconds and try again",
                self.retry_after_secs.unwrap_or(60)
            ),
            ErrorKind::Auth => "API key is invalid or expired, check your provider configuration".to_string(),
            ErrorKind::Quota => "API quota is exhausted, top up your account or switch providers".to_string(),
            ErrorKind::Parse => "The translation service returned an unexpected format, retrying".to_string(),
            ErrorKind::Cancelled => "Translation cancelled".to_string(),
            ErrorKind::Unknown => format!("Translation failed: {}", self.message),
        }
    }
}
