/*!
 * Provider abstraction for translation backends.
 *
 * A [`Provider`] is any async capability that turns a [`TranslationRequest`]
 * into a [`TranslationResult`], failing with a classified
 * [`TranslationError`]. Providers are held in an explicit
 * [`ProviderRegistry`] constructed once per process and passed by reference;
 * there is no global registry.
 */

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::TranslationError;

pub mod mock;
pub mod openai_compat;

/// A single translation request handed to a provider.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// Text to translate; for chat providers this is the rendered user prompt
    pub text: String,
    /// Source language code ("auto" = detect)
    pub source: String,
    /// Target language code
    pub target: String,
    /// System prompt for chat providers; plain APIs ignore it
    pub system_prompt: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Ask the provider to reuse cached prompt context when supported
    pub context_caching: bool,
    /// Cooperative cancellation
    pub cancel: CancellationToken,
}

impl TranslationRequest {
    /// Create a request with only the required fields set.
    pub fn new(text: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            target: target.into(),
            system_prompt: None,
            temperature: None,
            context_caching: false,
            cancel: CancellationToken::new(),
        }
    }
}

/// Token counts reported by a provider, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

/// Result of a successful provider call.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    /// Raw translated text as returned by the provider
    pub text: String,
    /// Token usage, when the provider reports it
    pub tokens: Option<TokenUsage>,
}

/// Rate limits and tuning a provider declares about itself.
///
/// Merged underneath user overrides when resolving the effective batcher
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitSchema {
    /// Maximum parallel requests the provider tolerates
    pub max_concurrency: usize,
    /// Requests-per-minute ceiling
    pub max_requests_per_minute: u32,
    /// Recommended lines per batch
    pub recommended_batch_size: usize,
    /// Recommended sampling temperature for translation
    pub recommended_temperature: f32,
}

/// Descriptive metadata registered alongside a provider instance.
#[derive(Debug, Clone)]
pub struct ProviderSchema {
    /// Registry id
    pub id: String,
    /// Display name
    pub name: String,
    /// Declared rate limits, if any
    pub rate_limit: Option<RateLimitSchema>,
}

/// Common capability trait for all translation backends.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Registry id of this provider instance.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str {
        self.id()
    }

    /// Whether this provider can answer the free-form research pre-pass.
    /// Plain translation APIs return false and skip the research phase.
    fn supports_research_prompt(&self) -> bool {
        false
    }

    /// Translate one request.
    async fn translate(&self, request: TranslationRequest) -> Result<TranslationResult, TranslationError>;
}

struct RegistryEntry {
    schema: ProviderSchema,
    provider: Arc<dyn Provider>,
}

/// Explicit provider registry, dependency-injected into the orchestrator.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its schema id, replacing any previous entry.
    pub fn register(&mut self, schema: ProviderSchema, provider: Arc<dyn Provider>) {
        self.entries.insert(schema.id.clone(), RegistryEntry { schema, provider });
    }

    /// Look up a provider instance.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.entries.get(id).map(|e| e.provider.clone())
    }

    /// Look up a provider's declared schema.
    pub fn schema(&self, id: &str) -> Option<&ProviderSchema> {
        self.entries.get(id).map(|e| &e.schema)
    }

    /// All registered schemas.
    pub fn list(&self) -> Vec<&ProviderSchema> {
        self.entries.values().map(|e| &e.schema).collect()
    }

    /// Whether an id is registered.
    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }
}
