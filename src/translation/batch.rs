/*!
 * Batch translation processing.
 *
 * The batcher splits an ordered sequence of subtitle lines into size-bounded
 * batches, enriches each batch with surrounding context, glossary matches,
 * and an optional research pre-pass, then dispatches them to the provider
 * under the scheduler's rate and concurrency gates. Returned text is split
 * back into per-line translations, tolerating ragged responses.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::app_config::{BatcherConfig, BeforeContextMode};
use crate::errors::{ErrorKind, TranslationError};
use crate::glossary::retrieve_glossary_matches;
use crate::language_utils::language_display_name;
use crate::providers::{Provider, TranslationRequest};
use crate::retry::{RetryOptions, with_retry};
use crate::subtitle_processor::SubtitleLine;

use super::cache::{TranslationCache, cache_key};
use super::prompts::{
    PromptOptions, RESEARCH_SYSTEM_PROMPT, build_research_prompt, build_system_prompt,
    build_user_prompt,
};
use super::scheduler::RateLimiter;
use super::session::CompletedBatch;

// Chain-of-thought blocks some models emit before the translation.
static THINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

// Fence markers, with or without a language tag.
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[a-zA-Z0-9_-]*\n?").unwrap());

/// Sampling temperature for the research pre-pass.
const RESEARCH_TEMPERATURE: f32 = 0.3;

/// Retry cap for the research pre-pass.
const RESEARCH_MAX_RETRIES: u32 = 2;

/// Lifecycle of a batch within one execution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Pending,
    Translating,
    Completed,
    Failed,
}

/// Context carried into a batch's prompts.
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    /// Tail of the preceding batch, translated when already available
    pub before: String,
    /// Head of the following batch, always original text
    pub after: String,
    /// Research pre-pass output, when the pass ran
    pub research: Option<String>,
}

/// A bounded group of subtitle lines merged into one provider request.
#[derive(Debug, Clone)]
pub struct TranslationBatch {
    /// Position in the batch sequence (dense, 0-based)
    pub index: usize,
    /// Contiguous non-empty lines, in original order
    pub lines: Vec<SubtitleLine>,
    /// Line texts joined by the configured separator
    pub merged_text: String,
    /// Surrounding context
    pub context: BatchContext,
    /// Execution state
    pub status: BatchStatus,
    /// Per-line translations, present once completed
    pub translations: Option<Vec<String>>,
    /// Classified error, present once failed
    pub error: Option<TranslationError>,
}

impl TranslationBatch {
    fn from_lines(lines: Vec<SubtitleLine>, index: usize, config: &BatcherConfig) -> Self {
        let merged_text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(&config.line_separator);

        Self {
            index,
            lines,
            merged_text,
            context: BatchContext::default(),
            status: BatchStatus::Pending,
            translations: None,
            error: None,
        }
    }
}

/// Split lines into batches bounded by the configured line and char limits.
///
/// A new batch starts when appending the next line would exceed either
/// limit, but a single oversized line still forms a batch alone; lines are
/// never dropped. Concatenating all batches reproduces the input exactly.
pub fn create_batches(lines: &[SubtitleLine], config: &BatcherConfig) -> Vec<TranslationBatch> {
    let mut batches = Vec::new();
    let mut current: Vec<SubtitleLine> = Vec::new();
    let mut current_chars = 0usize;
    let separator_chars = config.line_separator.chars().count();
    let max_lines = config.max_lines_per_batch.max(1);

    for line in lines {
        let line_chars = line.text.chars().count() + separator_chars;

        let should_start_new = current.len() >= max_lines
            || (current_chars + line_chars > config.max_chars_per_batch && !current.is_empty());

        if should_start_new {
            let index = batches.len();
            batches.push(TranslationBatch::from_lines(std::mem::take(&mut current), index, config));
            current_chars = 0;
        }

        current.push(line.clone());
        current_chars += line_chars;
    }

    if !current.is_empty() {
        let index = batches.len();
        batches.push(TranslationBatch::from_lines(current, index, config));
    }

    batches
}

/// Split a provider response into exactly `expected_lines` trimmed segments.
///
/// Tries the configured separator first, then common fallback separators.
/// Too many segments are truncated, too few are padded with empty strings;
/// a count mismatch is tolerated, never an error, so subtitle timing is
/// never broken by a ragged response.
pub fn split_translation(translated_text: &str, expected_lines: usize, separator: &str) -> Vec<String> {
    let parts: Vec<&str> = translated_text.split(separator).collect();
    if parts.len() == expected_lines {
        return parts.iter().map(|p| p.trim().to_string()).collect();
    }

    const FALLBACK_SEPARATORS: [&str; 3] = ["\n---\n", "\n\n", "\n"];
    for fallback in FALLBACK_SEPARATORS {
        if fallback == separator {
            continue;
        }
        let candidate: Vec<&str> = translated_text.split(fallback).collect();
        if candidate.len() == expected_lines {
            return candidate.iter().map(|p| p.trim().to_string()).collect();
        }
    }

    if parts.len() > expected_lines {
        return parts[..expected_lines].iter().map(|p| p.trim().to_string()).collect();
    }

    let mut result: Vec<String> = parts.iter().map(|p| p.trim().to_string()).collect();
    result.resize(expected_lines, String::new());
    result
}

/// Strip chain-of-thought blocks and unwrap fenced code blocks from a raw
/// provider response.
pub fn clean_response(raw: &str) -> String {
    let without_think = THINK_RE.replace_all(raw, "");
    let without_fences = FENCE_RE.replace_all(&without_think, "");
    without_fences.trim().to_string()
}

/// Arena of batches addressed by index.
///
/// Context fill is a pure recomputation against the arena's current
/// completion state, so a later-executing batch picks up whatever its
/// neighbors have finished by then. "Before" context may therefore be
/// original text instead of a translation under concurrency; that staleness
/// is an accepted trade-off, not a bug.
pub struct BatchArena {
    batches: Vec<RwLock<TranslationBatch>>,
}

impl BatchArena {
    /// Wrap freshly split batches.
    pub fn new(batches: Vec<TranslationBatch>) -> Self {
        Self {
            batches: batches.into_iter().map(RwLock::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Cloned snapshot of one batch.
    pub fn snapshot(&self, index: usize) -> TranslationBatch {
        self.batches[index].read().clone()
    }

    /// Mutate one batch under its write lock.
    pub fn update<R>(&self, index: usize, f: impl FnOnce(&mut TranslationBatch) -> R) -> R {
        f(&mut self.batches[index].write())
    }

    /// Recompute (before, after) context for a batch from the current state
    /// of its neighbors.
    pub fn compute_context(&self, index: usize, config: &BatcherConfig) -> (String, String) {
        let before = if index == 0 || config.before_context == BeforeContextMode::Disabled {
            String::new()
        } else {
            let previous = self.batches[index - 1].read();
            match &previous.translations {
                Some(translations) => {
                    let start = translations.len().saturating_sub(config.context_lines);
                    translations[start..].join("\n")
                }
                None => {
                    let start = previous.lines.len().saturating_sub(config.context_lines);
                    previous.lines[start..]
                        .iter()
                        .map(|l| l.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
        };

        let after = if index + 1 >= self.batches.len() {
            String::new()
        } else {
            let next = self.batches[index + 1].read();
            let end = config.context_lines.min(next.lines.len());
            next.lines[..end]
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };

        (before, after)
    }
}

/// Events emitted by the batch translator during one file's execution.
///
/// Progress fires in completion order, not sequence order.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Cumulative completed-line count for this file
    Progress { current: usize, total: usize },
    /// A batch finished translating
    BatchCompleted { batch: CompletedBatch },
}

/// Batch translator for one file's lines.
pub struct BatchTranslator {
    provider: Arc<dyn Provider>,
    config: BatcherConfig,
    cache: TranslationCache,
    source: String,
    target: String,
    temperature: Option<f32>,
    cancel: CancellationToken,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
}

impl BatchTranslator {
    /// Create a translator for a resolved configuration.
    pub fn new(
        provider: Arc<dyn Provider>,
        config: BatcherConfig,
        cache: TranslationCache,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            config,
            cache,
            source: source.into(),
            target: target.into(),
            temperature: None,
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    /// Set the sampling temperature for translation calls.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attach an event sender for progress and batch completion.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Cache key suffix tying entries to this translation configuration.
    pub fn cache_suffix(&self) -> String {
        cache_suffix(
            self.provider.id(),
            &self.source,
            &self.target,
            self.config.tactic_lite,
        )
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Translate all lines of one file.
    ///
    /// Empty lines map straight to empty translations and are never sent to
    /// the provider. A failed batch leaves its lines untranslated and does
    /// not abort sibling batches; cancellation does.
    pub async fn translate_lines(
        &self,
        lines: &[SubtitleLine],
    ) -> Result<Vec<SubtitleLine>, TranslationError> {
        if self.cancel.is_cancelled() {
            return Err(TranslationError::cancelled());
        }

        let mut results: Vec<SubtitleLine> = lines.to_vec();
        let mut non_empty: Vec<usize> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if line.text.trim().is_empty() {
                results[i].translated = Some(String::new());
            } else {
                non_empty.push(i);
            }
        }

        if non_empty.is_empty() {
            return Ok(results);
        }

        let batch_input: Vec<SubtitleLine> = non_empty.iter().map(|&i| lines[i].clone()).collect();
        let arena = BatchArena::new(create_batches(&batch_input, &self.config));
        let total = batch_input.len();

        info!(
            "Translating {} lines in {} batches (concurrency {}, {} rps)",
            total,
            arena.len(),
            self.config.concurrency,
            self.config.max_requests_per_second
        );

        let completed = AtomicUsize::new(0);
        let limiter = RateLimiter::new(self.config.max_requests_per_second);
        let semaphore = Semaphore::new(self.config.concurrency.max(1));

        let outcomes = stream::iter(0..arena.len())
            .map(|index| {
                let arena = &arena;
                let limiter = &limiter;
                let semaphore = &semaphore;
                let completed = &completed;
                async move {
                    let _permit = semaphore.acquire().await.unwrap();
                    limiter.acquire().await;

                    let result = self.run_batch(arena, index).await;
                    if let Ok(lines_done) = &result {
                        let current = completed.fetch_add(*lines_done, Ordering::SeqCst) + lines_done;
                        self.emit(BatchEvent::Progress { current, total });
                    }
                    (index, result)
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        for (index, outcome) in &outcomes {
            if let Err(e) = outcome {
                if e.kind == ErrorKind::Cancelled {
                    return Err(e.clone());
                }
                error!("Batch {} failed: {}", index, e);
            }
        }

        // Map translations back by stored line position, not completion order.
        let mut cursor = 0usize;
        for batch_index in 0..arena.len() {
            let batch = arena.snapshot(batch_index);
            match batch.translations {
                Some(translations) => {
                    for translation in translations {
                        results[non_empty[cursor]].translated = Some(translation);
                        cursor += 1;
                    }
                }
                None => cursor += batch.lines.len(),
            }
        }

        Ok(results)
    }

    async fn run_batch(&self, arena: &BatchArena, index: usize) -> Result<usize, TranslationError> {
        let (merged_text, line_count) = {
            let (before, after) = arena.compute_context(index, &self.config);
            arena.update(index, |batch| {
                batch.context.before = before;
                batch.context.after = after;
                batch.status = BatchStatus::Translating;
                (batch.merged_text.clone(), batch.lines.len())
            })
        };

        debug!("Batch {}: translating {} lines", index, line_count);

        match self.execute_batch(arena, index, &merged_text, line_count).await {
            Ok(translations) => {
                arena.update(index, |batch| {
                    batch.translations = Some(translations.clone());
                    batch.status = BatchStatus::Completed;
                });
                self.emit(BatchEvent::BatchCompleted {
                    batch: CompletedBatch {
                        index,
                        line_count,
                        merged_text,
                        translations,
                    },
                });
                Ok(line_count)
            }
            Err(error) => {
                arena.update(index, |batch| {
                    batch.status = BatchStatus::Failed;
                    batch.error = Some(error.clone());
                });
                Err(error)
            }
        }
    }

    async fn execute_batch(
        &self,
        arena: &BatchArena,
        index: usize,
        merged_text: &str,
        line_count: usize,
    ) -> Result<Vec<String>, TranslationError> {
        let key = cache_key(merged_text, &self.cache_suffix());
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Batch {}: cache hit", index);
            return Ok(split_translation(&cached, line_count, &self.config.line_separator));
        }

        let research = if self.config.tactic_lite && self.provider.supports_research_prompt() {
            let research = self.perform_research(index, merged_text).await;
            if !research.is_empty() {
                arena.update(index, |batch| {
                    batch.context.research = Some(research.clone());
                });
            }
            research
        } else {
            String::new()
        };

        let matched_glossary = retrieve_glossary_matches(merged_text, &self.config.glossary);
        if !matched_glossary.is_empty() {
            debug!("Batch {}: {} glossary matches", index, matched_glossary.len());
        }

        let (before, after) = {
            let batch = arena.snapshot(index);
            (batch.context.before, batch.context.after)
        };

        let target_label = language_display_name(&self.target);
        let source_label = language_display_name(&self.source);
        let prompt_options = PromptOptions {
            target_lang: &target_label,
            source_lang: Some(&source_label),
            tactic_context: (!research.is_empty()).then_some(research.as_str()),
            rich_text: self.config.rich_text,
            additional_rules: &[],
            previous_context: &before,
            future_context: &after,
            glossary: &matched_glossary,
        };
        let system_prompt =
            build_system_prompt(self.config.system_prompt_template.as_deref(), &prompt_options);
        let user_prompt = build_user_prompt(
            merged_text,
            self.config.user_prompt_template.as_deref(),
            &self.source,
            &self.target,
        );

        let mut request = TranslationRequest::new(user_prompt, &self.source, &self.target);
        request.system_prompt = Some(system_prompt);
        request.temperature = self.temperature;
        request.context_caching = self.config.enable_context_caching;
        request.cancel = self.cancel.clone();

        let provider = self.provider.clone();
        let retry_options = RetryOptions::new(self.config.max_retries)
            .with_cancel(self.cancel.clone())
            .with_on_retry(Box::new(move |error, attempt, delay| {
                warn!("Batch {}: retry {} in {}ms: {}", index, attempt, delay, error);
            }));

        let result = with_retry(
            || {
                let provider = provider.clone();
                let request = request.clone();
                async move { provider.translate(request).await }
            },
            retry_options,
        )
        .await?;

        let cleaned = clean_response(&result.text);
        self.cache.set(&key, &cleaned).await;

        Ok(split_translation(&cleaned, line_count, &self.config.line_separator))
    }

    /// Research pre-pass analyzing tone, key terms, and plot context.
    /// Non-fatal: any failure falls back to empty research text.
    async fn perform_research(&self, index: usize, merged_text: &str) -> String {
        let mut request = TranslationRequest::new(
            build_research_prompt(merged_text, &self.source, &self.target),
            "en",
            "en",
        );
        request.system_prompt = Some(RESEARCH_SYSTEM_PROMPT.to_string());
        request.temperature = Some(RESEARCH_TEMPERATURE);
        request.cancel = self.cancel.clone();

        let provider = self.provider.clone();
        let retry_options =
            RetryOptions::new(RESEARCH_MAX_RETRIES).with_cancel(self.cancel.clone());

        match with_retry(
            || {
                let provider = provider.clone();
                let request = request.clone();
                async move { provider.translate(request).await }
            },
            retry_options,
        )
        .await
        {
            Ok(result) => result.text.trim().to_string(),
            Err(e) => {
                warn!("Batch {}: research failed, proceeding without context: {}", index, e);
                String::new()
            }
        }
    }
}

/// Cache key suffix for a translation configuration.
pub fn cache_suffix(provider_id: &str, source: &str, target: &str, tactic_lite: bool) -> String {
    format!(
        "{}:{}:{}:{}",
        provider_id,
        source,
        target,
        if tactic_lite { "tactic" } else { "std" }
    )
}
