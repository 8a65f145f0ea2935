/*!
 * Application and batcher configuration.
 *
 * The batcher's knobs are resolved in three layers: built-in defaults are
 * overlaid by the selected provider's declared rate-limit schema, which in
 * turn is overlaid by explicit user overrides. User values win only on the
 * fields the user actually set, which is why overrides are a separate struct
 * of optional fields.
 */

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::glossary::GlossaryItem;
use crate::providers::RateLimitSchema;

/// Log verbosity for the CLI.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the log crate's filter.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Output mode for translated subtitles.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranslateMode {
    /// Replace the original text with the translation
    #[default]
    TranslateOnly,
    /// Keep the original above the translation
    Bilingual,
}

impl std::fmt::Display for TranslateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TranslateOnly => write!(f, "translate_only"),
            Self::Bilingual => write!(f, "bilingual"),
        }
    }
}

/// Strategy for the "before" context under concurrent execution.
///
/// `Auto` prefers the preceding batch's translation and silently falls back
/// to its original text when that batch has not completed yet. `Disabled`
/// never fills "before" context, trading context quality for consistency.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BeforeContextMode {
    #[default]
    Auto,
    Disabled,
}

fn default_max_chars_per_batch() -> usize {
    3000
}

fn default_max_lines_per_batch() -> usize {
    15
}

fn default_line_separator() -> String {
    "\n%%\n".to_string()
}

fn default_context_lines() -> usize {
    2
}

fn default_concurrency() -> usize {
    20
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

/// Fully resolved batcher configuration, immutable per translation run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatcherConfig {
    /// Maximum characters per batch (separator counted per line)
    #[serde(default = "default_max_chars_per_batch")]
    pub max_chars_per_batch: usize,

    /// Maximum lines per batch
    #[serde(default = "default_max_lines_per_batch")]
    pub max_lines_per_batch: usize,

    /// Separator used to join and re-split batch lines
    #[serde(default = "default_line_separator")]
    pub line_separator: String,

    /// Number of surrounding lines used as context on each side
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// Maximum batches in flight simultaneously
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum dispatch starts per second (0 = disabled)
    #[serde(default)]
    pub max_requests_per_second: u32,

    /// Retry cap handed to the retry executor per provider call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Instruct the provider to preserve embedded markup
    #[serde(default = "default_true")]
    pub rich_text: bool,

    /// Two-phase research mode for research-capable providers
    #[serde(default)]
    pub tactic_lite: bool,

    /// Ask the provider to reuse cached prompt context when supported
    #[serde(default = "default_true")]
    pub enable_context_caching: bool,

    /// Behavior of the "before" context under concurrency
    #[serde(default)]
    pub before_context: BeforeContextMode,

    /// Custom system prompt template; the built-in one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_template: Option<String>,

    /// Custom user prompt template; the built-in one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt_template: Option<String>,

    /// Terminology injected into prompts when matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub glossary: Vec<GlossaryItem>,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_chars_per_batch: default_max_chars_per_batch(),
            max_lines_per_batch: default_max_lines_per_batch(),
            line_separator: default_line_separator(),
            context_lines: default_context_lines(),
            concurrency: default_concurrency(),
            max_requests_per_second: 0,
            max_retries: default_max_retries(),
            rich_text: true,
            tactic_lite: false,
            enable_context_caching: true,
            before_context: BeforeContextMode::default(),
            system_prompt_template: None,
            user_prompt_template: None,
            glossary: Vec::new(),
        }
    }
}

/// User-set batcher overrides. Only `Some` fields take effect.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BatcherOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars_per_batch: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lines_per_batch: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_lines: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests_per_second: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_text: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tactic_lite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_context_caching: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_context: Option<BeforeContextMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary: Option<Vec<GlossaryItem>>,
}

impl BatcherConfig {
    /// Resolve the effective configuration for a provider.
    ///
    /// Layering: built-in defaults, then the provider's declared rate-limit
    /// schema (concurrency, requests per second, recommended batch size),
    /// then user overrides on the fields actually set. A provider without a
    /// schema still gets a conservative 20 rps ceiling rather than unlimited
    /// dispatch.
    pub fn effective(schema: Option<&RateLimitSchema>, overrides: &BatcherOverrides) -> Self {
        let mut config = Self::default();

        config.concurrency = schema.map(|s| s.max_concurrency).unwrap_or(config.concurrency);
        config.max_requests_per_second = schema.map(|s| s.max_requests_per_minute).unwrap_or(1200) / 60;
        config.max_lines_per_batch = schema
            .map(|s| s.recommended_batch_size)
            .unwrap_or(config.max_lines_per_batch);

        if let Some(v) = overrides.max_chars_per_batch {
            config.max_chars_per_batch = v;
        }
        if let Some(v) = overrides.max_lines_per_batch {
            config.max_lines_per_batch = v;
        }
        if let Some(v) = &overrides.line_separator {
            config.line_separator = v.clone();
        }
        if let Some(v) = overrides.context_lines {
            config.context_lines = v;
        }
        if let Some(v) = overrides.concurrency {
            config.concurrency = v;
        }
        if let Some(v) = overrides.max_requests_per_second {
            config.max_requests_per_second = v;
        }
        if let Some(v) = overrides.max_retries {
            config.max_retries = v;
        }
        if let Some(v) = overrides.rich_text {
            config.rich_text = v;
        }
        if let Some(v) = overrides.tactic_lite {
            config.tactic_lite = v;
        }
        if let Some(v) = overrides.enable_context_caching {
            config.enable_context_caching = v;
        }
        if let Some(v) = overrides.before_context {
            config.before_context = v;
        }
        if let Some(v) = &overrides.system_prompt_template {
            config.system_prompt_template = Some(v.clone());
        }
        if let Some(v) = &overrides.user_prompt_template {
            config.user_prompt_template = Some(v.clone());
        }
        if let Some(v) = &overrides.glossary {
            config.glossary = v.clone();
        }

        config
    }
}

fn default_provider_id() -> String {
    "chat".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Connection settings for the configured provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderSettings {
    /// Registry id for the provider instance
    #[serde(default = "default_provider_id")]
    pub id: String,

    /// Base URL of an OpenAI-compatible chat completions service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key, may be empty for local servers
    #[serde(default)]
    pub api_key: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Declared rate limits; a built-in default schema when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitSchema>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            id: default_provider_id(),
            endpoint: default_endpoint(),
            api_key: String::new(),
            model: default_model(),
            rate_limit: None,
        }
    }
}

/// Top-level application configuration loaded from a JSON file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Source language code (ISO, or "auto")
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Output mode
    #[serde(default)]
    pub mode: TranslateMode,

    /// Provider connection settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Batcher overrides applied on top of provider limits
    #[serde(default)]
    pub batcher: BatcherOverrides,

    /// Path to a glossary file (text or JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_path: Option<String>,

    /// Sampling temperature for translation calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Log verbosity
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_source_language() -> String {
    "auto".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            target_language: default_target_language(),
            mode: TranslateMode::default(),
            provider: ProviderSettings::default(),
            batcher: BatcherOverrides::default(),
            glossary_path: None,
            temperature: None,
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load from a file if it exists, otherwise defaults.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
