/*!
 * Translation engine for subtitle batching.
 *
 * This module contains the core batching and dispatch machinery:
 *
 * - `batch`: splitting lines into batches, context fill, per-batch execution
 * - `scheduler`: rate limiting for batch dispatch
 * - `prompts`: system/user prompt assembly
 * - `cache`: content-addressed translation cache
 * - `session`: resumable job snapshots
 */

// Re-export main types for easier usage
pub use self::batch::{BatchStatus, BatchTranslator, TranslationBatch, create_batches, split_translation};
pub use self::cache::{TranslationCache, cache_key};
pub use self::scheduler::RateLimiter;
pub use self::session::TranslationSession;

// Submodules
pub mod batch;
pub mod cache;
pub mod prompts;
pub mod scheduler;
pub mod session;
