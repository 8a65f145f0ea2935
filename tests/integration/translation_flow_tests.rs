/*!
 * End-to-end batch translation tests against mock providers
 */

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use subtrans::app_config::BatcherConfig;
use subtrans::errors::ErrorKind;
use subtrans::providers::mock::MockProvider;
use subtrans::storage::MemoryCacheStore;
use subtrans::translation::batch::BatchTranslator;
use subtrans::translation::cache::TranslationCache;
use subtrans::translation::prompts::RESEARCH_SYSTEM_PROMPT;

use crate::common::{FailMatchingProvider, ResearchFailingProvider, make_lines};

fn memory_cache() -> TranslationCache {
    TranslationCache::new(Arc::new(MemoryCacheStore::new()))
}

fn small_batches() -> BatcherConfig {
    BatcherConfig {
        max_lines_per_batch: 3,
        concurrency: 2,
        max_retries: 3,
        ..BatcherConfig::default()
    }
}

#[tokio::test]
async fn test_translateLines_echoProvider_translatesEverything() {
    let lines = make_lines(&["one", "two", "three", "four", "five", "six", "seven"]);
    let translator = BatchTranslator::new(
        Arc::new(MockProvider::echo()),
        small_batches(),
        memory_cache(),
        "en",
        "fr",
    );

    let results = translator.translate_lines(&lines).await.unwrap();
    assert_eq!(results.len(), 7);
    for (line, original) in results.iter().zip(&lines) {
        // The echo provider returns the source text, so translations mirror it
        assert_eq!(line.translated.as_deref(), Some(original.text.as_str()));
        assert_eq!(line.text, original.text);
    }
}

#[tokio::test]
async fn test_translateLines_emptyLines_neverReachProvider() {
    let provider = Arc::new(MockProvider::echo());
    let lines = make_lines(&["hello", "", "   ", "world"]);
    let translator = BatchTranslator::new(
        provider.clone(),
        small_batches(),
        memory_cache(),
        "en",
        "fr",
    );

    let results = translator.translate_lines(&lines).await.unwrap();
    assert_eq!(results[1].translated.as_deref(), Some(""));
    assert_eq!(results[2].translated.as_deref(), Some(""));
    assert_eq!(results[0].translated.as_deref(), Some("hello"));
    assert_eq!(results[3].translated.as_deref(), Some("world"));
    // Two non-empty lines fit one batch: exactly one provider call
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_translateLines_allEmpty_skipsProviderEntirely() {
    let provider = Arc::new(MockProvider::echo());
    let lines = make_lines(&["", "  "]);
    let translator = BatchTranslator::new(
        provider.clone(),
        small_batches(),
        memory_cache(),
        "en",
        "fr",
    );

    let results = translator.translate_lines(&lines).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_translateLines_429_isRetriedUntilSuccess() {
    // Fails twice with 429, then succeeds; RATE_LIMIT allows 5 retries
    let provider = Arc::new(MockProvider::fail_times(429, 2));
    let lines = make_lines(&["hello", "world"]);
    let config = BatcherConfig {
        max_retries: 5,
        ..small_batches()
    };
    let translator = BatchTranslator::new(provider.clone(), config, memory_cache(), "en", "fr");

    let results = translator.translate_lines(&lines).await.unwrap();
    assert!(results.iter().all(|l| l.translated.is_some()));
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_translateLines_persistent429_exhaustsFiveRetries() {
    let provider = Arc::new(MockProvider::failing_with_status(429));
    let lines = make_lines(&["hello"]);
    let config = BatcherConfig {
        max_retries: 5,
        ..small_batches()
    };
    let translator = BatchTranslator::new(provider.clone(), config, memory_cache(), "en", "fr");

    // The batch fails but the file is still returned with the line untranslated
    let results = translator.translate_lines(&lines).await.unwrap();
    assert!(results[0].translated.is_none());
    assert_eq!(results[0].text, "hello");
    // Initial attempt + 5 retries
    assert_eq!(provider.request_count(), 6);
}

#[tokio::test]
async fn test_translateLines_failedBatch_doesNotAbortSiblings() {
    // Batch 2 (lines four..six) contains the marker and fails with AUTH
    let provider = Arc::new(FailMatchingProvider::new("FAILME"));
    let lines = make_lines(&["one", "two", "three", "FAILME", "five", "six", "seven"]);
    let translator = BatchTranslator::new(
        provider.clone(),
        small_batches(),
        memory_cache(),
        "en",
        "fr",
    );

    let results = translator.translate_lines(&lines).await.unwrap();

    // Lines of the failed batch stay untranslated, original text preserved
    assert!(results[3].translated.is_none());
    assert!(results[4].translated.is_none());
    assert!(results[5].translated.is_none());
    assert_eq!(results[3].text, "FAILME");

    // Sibling batches completed
    assert_eq!(results[0].translated.as_deref(), Some("one"));
    assert_eq!(results[6].translated.as_deref(), Some("seven"));
}

#[tokio::test]
async fn test_translateLines_cacheHit_skipsProvider() {
    let cache = memory_cache();
    let lines = make_lines(&["hello", "world"]);

    let first_provider = Arc::new(MockProvider::echo());
    let translator = BatchTranslator::new(
        first_provider.clone(),
        small_batches(),
        cache.clone(),
        "en",
        "fr",
    );
    translator.translate_lines(&lines).await.unwrap();
    assert_eq!(first_provider.request_count(), 1);

    // Same cache, fresh provider: everything comes from the cache
    let second_provider = Arc::new(MockProvider::echo());
    let translator = BatchTranslator::new(
        second_provider.clone(),
        small_batches(),
        cache,
        "en",
        "fr",
    );
    let results = translator.translate_lines(&lines).await.unwrap();
    assert_eq!(second_provider.request_count(), 0);
    assert_eq!(results[0].translated.as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_translateLines_failingCacheStore_stillTranslates() {
    let provider = Arc::new(MockProvider::echo());
    let cache = TranslationCache::new(Arc::new(crate::common::FailingCacheStore));
    let lines = make_lines(&["hello"]);
    let translator = BatchTranslator::new(provider, small_batches(), cache, "en", "fr");

    let results = translator.translate_lines(&lines).await.unwrap();
    assert_eq!(results[0].translated.as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_tacticLite_runsResearchPassFirst() {
    let provider = Arc::new(MockProvider::echo());
    let config = BatcherConfig {
        tactic_lite: true,
        ..small_batches()
    };
    let lines = make_lines(&["hello", "world"]);
    let translator = BatchTranslator::new(provider.clone(), config, memory_cache(), "en", "fr");

    let results = translator.translate_lines(&lines).await.unwrap();
    assert!(results.iter().all(|l| l.translated.is_some()));

    // One research call plus one translation call
    assert_eq!(provider.request_count(), 2);
    let requests = provider.requests();
    assert_eq!(requests[0].system_prompt.as_deref(), Some(RESEARCH_SYSTEM_PROMPT));
    assert_eq!(requests[0].temperature, Some(0.3));
    assert!(requests[1].system_prompt.as_deref().unwrap().contains("subtitle translator"));
}

#[tokio::test]
async fn test_tacticLite_skippedForNonResearchProviders() {
    let provider = Arc::new(MockProvider::echo().without_research());
    let config = BatcherConfig {
        tactic_lite: true,
        ..small_batches()
    };
    let lines = make_lines(&["hello"]);
    let translator = BatchTranslator::new(provider.clone(), config, memory_cache(), "en", "fr");

    translator.translate_lines(&lines).await.unwrap();
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tacticLite_researchFailure_isNonFatal() {
    let provider = Arc::new(ResearchFailingProvider::new());
    let config = BatcherConfig {
        tactic_lite: true,
        ..small_batches()
    };
    let lines = make_lines(&["hello", "world"]);
    let translator = BatchTranslator::new(provider.clone(), config, memory_cache(), "en", "fr");

    let results = translator.translate_lines(&lines).await.unwrap();
    assert!(results.iter().all(|l| l.translated.is_some()));
}

#[tokio::test]
async fn test_translateLines_cancellation_propagatesCancelled() {
    let cancel = CancellationToken::new();
    let provider = Arc::new(MockProvider::slow(5_000));
    let lines = make_lines(&["hello", "world"]);
    let translator = BatchTranslator::new(
        provider,
        small_batches(),
        memory_cache(),
        "en",
        "fr",
    )
    .with_cancel(cancel.clone());

    let handle = tokio::spawn(async move { translator.translate_lines(&lines).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = handle.await.unwrap();
    assert_eq!(result.unwrap_err().kind, ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_translateLines_systemPrompt_carriesContextSections() {
    let provider = Arc::new(MockProvider::echo());
    let config = BatcherConfig {
        max_lines_per_batch: 2,
        concurrency: 1,
        ..BatcherConfig::default()
    };
    let lines = make_lines(&["one", "two", "three", "four"]);
    let translator = BatchTranslator::new(provider.clone(), config, memory_cache(), "en", "fr");

    translator.translate_lines(&lines).await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    // First batch sees only future context; second sees previous context
    let first_system = requests[0].system_prompt.as_deref().unwrap();
    assert!(first_system.contains("FUTURE CONTEXT:\nthree\nfour"));
    assert!(!first_system.contains("PREVIOUS CONTEXT:"));

    let second_system = requests[1].system_prompt.as_deref().unwrap();
    assert!(second_system.contains("PREVIOUS CONTEXT:"));
}
