/*!
 * Common test utilities: line builders and purpose-built test providers.
 */

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use subtrans::errors::TranslationError;
use subtrans::providers::mock::echo_source_text;
use subtrans::providers::{Provider, TranslationRequest, TranslationResult};
use subtrans::storage::CacheStore;
use subtrans::subtitle_processor::{Subtitle, SubtitleFormat, SubtitleLine};
use subtrans::translation::prompts::RESEARCH_SYSTEM_PROMPT;

/// Build timed lines from texts, one second apart.
pub fn make_lines(texts: &[&str]) -> Vec<SubtitleLine> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            SubtitleLine::new(i, (i as u64) * 1000, (i as u64) * 1000 + 900, *text)
        })
        .collect()
}

/// Build an SRT subtitle document from texts.
pub fn make_subtitle(texts: &[&str]) -> Subtitle {
    Subtitle {
        format: SubtitleFormat::Srt,
        lines: make_lines(texts),
        metadata: Default::default(),
    }
}

/// A cache store whose every operation fails; the engine must treat it as
/// a permanent miss.
pub struct FailingCacheStore;

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(anyhow!("storage unavailable"))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(anyhow!("storage unavailable"))
    }
}

/// Echo provider that fails with HTTP 401 whenever the request text
/// contains a marker, for exercising partial batch failure.
#[derive(Debug)]
pub struct FailMatchingProvider {
    needle: String,
    request_count: AtomicUsize,
}

impl FailMatchingProvider {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            request_count: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for FailMatchingProvider {
    fn id(&self) -> &str {
        "fail-matching"
    }

    async fn translate(&self, request: TranslationRequest) -> Result<TranslationResult, TranslationError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if request.text.contains(&self.needle) {
            return Err(TranslationError::from_status(401, "mock API error (401)"));
        }
        Ok(TranslationResult {
            text: echo_source_text(&request.text),
            tokens: None,
        })
    }
}

/// Echo provider whose research calls always fail with a server error,
/// for asserting that the research pre-pass is non-fatal.
#[derive(Debug, Default)]
pub struct ResearchFailingProvider {
    request_count: AtomicUsize,
}

impl ResearchFailingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ResearchFailingProvider {
    fn id(&self) -> &str {
        "research-failing"
    }

    fn supports_research_prompt(&self) -> bool {
        true
    }

    async fn translate(&self, request: TranslationRequest) -> Result<TranslationResult, TranslationError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if request.system_prompt.as_deref() == Some(RESEARCH_SYSTEM_PROMPT) {
            return Err(TranslationError::from_status(500, "mock API error (500)"));
        }
        Ok(TranslationResult {
            text: echo_source_text(&request.text),
            tokens: None,
        })
    }
}
