/*!
 * OpenAI-compatible chat completions provider.
 *
 * Speaks the request/response shape shared by OpenAI, DeepSeek, LM Studio,
 * and most self-hosted gateways. HTTP failures are converted into classified
 * [`TranslationError`]s at this boundary so the retry executor can apply the
 * right policy.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, TranslationError};
use crate::providers::{
    Provider, ProviderSchema, RateLimitSchema, TokenUsage, TranslationRequest, TranslationResult,
};

/// Chat message in the OpenAI wire shape.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug)]
pub struct OpenAiCompatProvider {
    /// Registry id
    id: String,
    /// Display name
    name: String,
    /// HTTP client with pooling and timeouts
    client: Client,
    /// Base URL of the service
    endpoint: String,
    /// API key, may be empty for local servers
    api_key: String,
    /// Model name sent with every request
    model: String,
}

impl OpenAiCompatProvider {
    /// Create a new client for the given endpoint and model.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(20)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Schema describing this provider, with declared rate limits.
    pub fn schema(&self, rate_limit: Option<RateLimitSchema>) -> ProviderSchema {
        ProviderSchema {
            id: self.id.clone(),
            name: self.name.clone(),
            rate_limit: rate_limit.or_else(|| {
                Some(RateLimitSchema {
                    max_concurrency: 8,
                    max_requests_per_minute: 600,
                    recommended_batch_size: 15,
                    recommended_temperature: 0.3,
                })
            }),
        }
    }

    fn chat_completions_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    fn classify_transport_error(&self, error: reqwest::Error) -> TranslationError {
        if error.is_timeout() || error.is_connect() {
            TranslationError::new(
                ErrorKind::Network,
                format!("{} request failed: {}", self.name, error),
            )
        } else {
            TranslationError::from_message(format!("{} request failed: {}", self.name, error))
        }
    }
}

fn header_u64(headers: &header::HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn header_string(headers: &header::HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(|s| s.to_string())
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn supports_research_prompt(&self) -> bool {
        true
    }

    async fn translate(&self, request: TranslationRequest) -> Result<TranslationResult, TranslationError> {
        let url = self.chat_completions_url();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.text.clone(),
        });

        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
        };

        debug!("POST {} (model {})", url, self.model);

        let mut http_request = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            http_request = http_request.bearer_auth(&self.api_key);
        }

        let response = tokio::select! {
            _ = request.cancel.cancelled() => return Err(TranslationError::cancelled()),
            result = http_request.send() => result.map_err(|e| self.classify_transport_error(e))?,
        };

        let status: StatusCode = response.status();
        if !status.is_success() {
            let retry_after = header_u64(response.headers(), "retry-after");
            let request_id = header_string(response.headers(), "x-request-id");
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("{} API error ({}): {}", self.name, status, error_text);

            let mut err = TranslationError::from_status(
                status.as_u16(),
                format!("{} API error ({}): {}", self.name, status, error_text),
            );
            err.retry_after_secs = retry_after;
            err.request_id = request_id;
            return Err(err);
        }

        let parsed: ChatResponse = tokio::select! {
            _ = request.cancel.cancelled() => return Err(TranslationError::cancelled()),
            result = response.json::<ChatResponse>() => result.map_err(|e| {
                TranslationError::new(
                    ErrorKind::Parse,
                    format!("Failed to parse {} response: {}", self.name, e),
                )
            })?,
        };

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            TranslationError::new(
                ErrorKind::Parse,
                format!("{} returned an empty choices array", self.name),
            )
        })?;

        let tokens = parsed.usage.map(|u| TokenUsage {
            input: u.prompt_tokens,
            output: u.completion_tokens,
        });

        Ok(TranslationResult {
            text: choice.message.content,
            tokens,
        })
    }
}
