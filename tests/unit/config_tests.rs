/*!
 * Tests for configuration defaults and layered merging
 */

use subtrans::app_config::{AppConfig, BatcherConfig, BatcherOverrides, BeforeContextMode, TranslateMode};
use subtrans::providers::RateLimitSchema;

fn schema() -> RateLimitSchema {
    RateLimitSchema {
        max_concurrency: 4,
        max_requests_per_minute: 120,
        recommended_batch_size: 8,
        recommended_temperature: 0.2,
    }
}

#[test]
fn test_defaults_matchEngineExpectations() {
    let config = BatcherConfig::default();
    assert_eq!(config.max_chars_per_batch, 3000);
    assert_eq!(config.max_lines_per_batch, 15);
    assert_eq!(config.line_separator, "\n%%\n");
    assert_eq!(config.context_lines, 2);
    assert_eq!(config.concurrency, 20);
    assert_eq!(config.max_requests_per_second, 0);
    assert_eq!(config.max_retries, 3);
    assert!(config.rich_text);
    assert!(!config.tactic_lite);
    assert!(config.enable_context_caching);
    assert_eq!(config.before_context, BeforeContextMode::Auto);
}

#[test]
fn test_effective_providerSchema_overridesDefaults() {
    let config = BatcherConfig::effective(Some(&schema()), &BatcherOverrides::default());
    assert_eq!(config.concurrency, 4);
    assert_eq!(config.max_requests_per_second, 2); // 120 rpm
    assert_eq!(config.max_lines_per_batch, 8);
    // Untouched knobs keep their defaults
    assert_eq!(config.max_chars_per_batch, 3000);
}

#[test]
fn test_effective_withoutSchema_getsConservativeRps() {
    let config = BatcherConfig::effective(None, &BatcherOverrides::default());
    assert_eq!(config.max_requests_per_second, 20); // 1200 rpm fallback
    assert_eq!(config.concurrency, 20);
}

#[test]
fn test_effective_userOverrides_winOverSchema() {
    let overrides = BatcherOverrides {
        concurrency: Some(2),
        max_lines_per_batch: Some(5),
        tactic_lite: Some(true),
        ..BatcherOverrides::default()
    };
    let config = BatcherConfig::effective(Some(&schema()), &overrides);

    assert_eq!(config.concurrency, 2);
    assert_eq!(config.max_lines_per_batch, 5);
    assert!(config.tactic_lite);
    // Fields the user did not set still come from the schema
    assert_eq!(config.max_requests_per_second, 2);
}

#[test]
fn test_effective_unsetOverrideFields_haveNoEffect() {
    let overrides = BatcherOverrides::default();
    let config = BatcherConfig::effective(Some(&schema()), &overrides);
    assert_eq!(config.concurrency, 4);
    assert!(config.rich_text);
}

#[test]
fn test_appConfig_parsesPartialJson() {
    let json = r#"{
        "target_language": "fr",
        "mode": "bilingual",
        "provider": { "model": "test-model" },
        "batcher": { "concurrency": 3 }
    }"#;
    let config: AppConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.source_language, "auto");
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.mode, TranslateMode::Bilingual);
    assert_eq!(config.provider.model, "test-model");
    assert_eq!(config.batcher.concurrency, Some(3));
    assert!(config.batcher.max_retries.is_none());
}

#[test]
fn test_batcherConfig_serdeRoundTrip() {
    let config = BatcherConfig {
        tactic_lite: true,
        max_requests_per_second: 7,
        ..BatcherConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let restored: BatcherConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.tactic_lite, config.tactic_lite);
    assert_eq!(restored.max_requests_per_second, 7);
    assert_eq!(restored.line_separator, "\n%%\n");
}
