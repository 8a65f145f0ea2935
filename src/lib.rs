/*!
 * # subtrans - Batch Subtitle Translation with AI
 *
 * A Rust library for translating subtitle files through pluggable AI
 * providers, built around a batching and concurrency-control engine.
 *
 * ## Features
 *
 * - Split subtitle lines into size-bounded batches with surrounding context
 * - Optional glossary injection and two-phase research analysis
 * - Dual rate-limit / concurrency-limit scheduling of provider calls
 * - Classified errors with type-specific retry policies and backoff
 * - Content-addressed caching and resumable job sessions
 * - SRT and WebVTT parsing and serialization
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management and layered overrides
 * - `errors`: Classified error taxonomy and retry policies
 * - `retry`: Generic retry executor with backoff and cancellation
 * - `glossary`: Terminology parsing and per-batch retrieval
 * - `subtitle_processor`: Subtitle file parsing and serialization
 * - `translation`: The batching engine:
 *   - `translation::batch`: Batch split, context fill, dispatch
 *   - `translation::scheduler`: Rate limiting for batch dispatch
 *   - `translation::prompts`: System/user prompt assembly
 *   - `translation::cache`: Content-addressed translation cache
 *   - `translation::session`: Resumable job snapshots
 * - `providers`: Provider abstraction, registry, and adapters
 * - `storage`: Cache and session stores (memory and SQLite)
 * - `orchestrator`: Per-file and multi-file job orchestration
 * - `app_controller`: CLI glue
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod glossary;
pub mod language_utils;
pub mod orchestrator;
pub mod providers;
pub mod retry;
pub mod storage;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{AppConfig, BatcherConfig, BatcherOverrides, TranslateMode};
pub use errors::{ErrorKind, TranslationError};
pub use glossary::GlossaryItem;
pub use orchestrator::{Orchestrator, ProgressEvent, SubtitleFile, TranslateOptions};
pub use providers::{Provider, ProviderRegistry, TranslationRequest, TranslationResult};
pub use retry::{RetryOptions, with_retry};
pub use subtitle_processor::{Subtitle, SubtitleFormat, SubtitleLine};
pub use translation::{BatchTranslator, TranslationBatch, TranslationCache};
