/*!
 * Mock provider implementations for testing.
 *
 * The mock echoes the source text back by default, which preserves segment
 * counts and makes batch splitting deterministic in tests. Failure behaviors
 * simulate the HTTP error classes the real adapters produce.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::TranslationError;
use crate::providers::{Provider, TranslationRequest, TranslationResult};

/// Behavior mode for the mock provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Echo the source text back unchanged
    Echo,
    /// Always fail with the given HTTP status
    FailStatus(u16),
    /// Fail with the given status for the first N requests, then echo
    FailTimes { status: u16, times: usize },
    /// Always fail with HTTP 429 and an optional retry-after hint
    RateLimited { retry_after_secs: Option<u64> },
    /// Sleep before echoing, honoring cancellation
    Slow { delay_ms: u64 },
}

/// Mock provider for exercising batch and retry behavior.
#[derive(Debug)]
pub struct MockProvider {
    id: String,
    behavior: MockBehavior,
    research_capable: bool,
    request_count: Arc<AtomicUsize>,
    requests: Mutex<Vec<TranslationRequest>>,
    custom_response: Option<fn(&TranslationRequest) -> String>,
}

impl MockProvider {
    /// Create a mock with the given behavior.
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            id: "mock".to_string(),
            behavior,
            research_capable: true,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
            custom_response: None,
        }
    }

    /// A provider that always succeeds by echoing the source text.
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// A provider that always fails with the given HTTP status.
    pub fn failing_with_status(status: u16) -> Self {
        Self::new(MockBehavior::FailStatus(status))
    }

    /// A provider that fails `times` requests with `status`, then echoes.
    pub fn fail_times(status: u16, times: usize) -> Self {
        Self::new(MockBehavior::FailTimes { status, times })
    }

    /// A provider that always reports rate limiting.
    pub fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        Self::new(MockBehavior::RateLimited { retry_after_secs })
    }

    /// A provider that sleeps before echoing.
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Override the response text generator.
    pub fn with_custom_response(mut self, generator: fn(&TranslationRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Disable the research capability flag.
    pub fn without_research(mut self) -> Self {
        self.research_capable = false;
        self
    }

    /// Number of translate calls received so far.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of all received requests, in order.
    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.lock().clone()
    }

    fn respond(&self, request: &TranslationRequest) -> String {
        if let Some(generator) = self.custom_response {
            return generator(request);
        }
        echo_source_text(&request.text)
    }
}

/// Extract the payload between `<source_text>` tags, or return the input
/// unchanged when the tags are absent.
pub fn echo_source_text(text: &str) -> String {
    let open = "<source_text>";
    let close = "</source_text>";
    match (text.find(open), text.rfind(close)) {
        (Some(start), Some(end)) if start + open.len() <= end => {
            text[start + open.len()..end].trim().to_string()
        }
        _ => text.to_string(),
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports_research_prompt(&self) -> bool {
        self.research_capable
    }

    async fn translate(&self, request: TranslationRequest) -> Result<TranslationResult, TranslationError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if request.cancel.is_cancelled() {
            return Err(TranslationError::cancelled());
        }

        match self.behavior {
            MockBehavior::Echo => {}
            MockBehavior::FailStatus(status) => {
                return Err(TranslationError::from_status(
                    status,
                    format!("mock API error ({})", status),
                ));
            }
            MockBehavior::FailTimes { status, times } => {
                if count < times {
                    return Err(TranslationError::from_status(
                        status,
                        format!("mock API error ({}), attempt {}", status, count + 1),
                    ));
                }
            }
            MockBehavior::RateLimited { retry_after_secs } => {
                let mut err = TranslationError::from_status(429, "mock API error (429)");
                err.retry_after_secs = retry_after_secs;
                return Err(err);
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::select! {
                    _ = request.cancel.cancelled() => return Err(TranslationError::cancelled()),
                    _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                }
            }
        }

        Ok(TranslationResult {
            text: self.respond(&request),
            tokens: None,
        })
    }
}
