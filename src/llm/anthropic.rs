use super::{ContentBlock, LlmError, ModelClient, ModelRequest, ModelResponse};
use crate::llm::usage::{Pricing, TokenUsage, UsageTracker};
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Requests allowed in flight at once across every clone of a client.
pub const MAX_IN_FLIGHT: usize = 10;

/// Retries on top of the first attempt for throttled or overloaded responses.
const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Supported Claude models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Model {
    /// Claude Haiku 4.5
    #[default]
    Haiku,
    /// Claude Sonnet 4.5
    Sonnet,
}

impl Model {
    pub fn id(self) -> &'static str {
        match self {
            Model::Haiku => "claude-haiku-4-5",
            Model::Sonnet => "claude-sonnet-4-5",
        }
    }

    pub fn pricing(self) -> Pricing {
        Pricing::for_model(self.id())
    }
}

/// Messages API client.
///
/// Cloning is cheap; clones share the HTTP connection pool, the in-flight
/// limiter and the usage tracker.
#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: Model,
    base_url: String,
    permits: Arc<Semaphore>,
    usage: UsageTracker,
    retry_backoff: Duration,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: Model, usage: UsageTracker) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            permits: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
            usage,
            retry_backoff: RETRY_BACKOFF,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Base delay between retries; the n-th retry waits n times this.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn model(&self) -> Model {
        self.model
    }

    fn request_body(&self, request: &ModelRequest) -> Value {
        let system = if request.cache_system {
            json!([{
                "type": "text",
                "text": request.system,
                "cache_control": {"type": "ephemeral"},
            }])
        } else {
            json!(request.system)
        };

        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|message| {
                let content: Vec<&ContentBlock> = message
                    .content
                    .iter()
                    .filter(|block| !matches!(block, ContentBlock::Unsupported))
                    .collect();
                json!({"role": message.role, "content": content})
            })
            .collect();

        let mut body = json!({
            "model": self.model.id(),
            "max_tokens": request.max_tokens,
            "system": system,
            "messages": messages,
        });

        if !request.tools.is_empty() {
            body["tools"] = json!(request.tools);
        }

        body
    }

    async fn post_once(&self, body: &Value) -> Result<(u16, String), LlmError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        debug!("Claude request to {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }
}

fn is_retryable(status: u16) -> bool {
    status == 429 || status == 529 || (500..600).contains(&status)
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LlmError::Network("request limiter closed".to_string()))?;

        let body = self.request_body(request);
        let mut attempt = 0;

        loop {
            let outcome = self.post_once(&body).await;
            let retryable = match &outcome {
                Ok((status, _)) => is_retryable(*status),
                Err(_) => true,
            };

            if retryable && attempt < MAX_RETRIES {
                attempt += 1;
                match &outcome {
                    Ok((status, _)) => warn!("Claude returned {}, retry {}/{}", status, attempt, MAX_RETRIES),
                    Err(e) => warn!("{}, retry {}/{}", e, attempt, MAX_RETRIES),
                }
                tokio::time::sleep(self.retry_backoff * attempt).await;
                continue;
            }

            let (status, text) = outcome?;
            return match status {
                200 => {
                    let response: ModelResponse = serde_json::from_str(&text)
                        .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
                    self.usage
                        .add(TokenUsage::from_api(&response.usage, self.model.pricing()));
                    Ok(response)
                }
                401 | 403 => Err(LlmError::Auth),
                429 => Err(LlmError::RateLimited {
                    attempts: attempt + 1,
                }),
                _ => Err(LlmError::Api {
                    status,
                    message: error_message(&text),
                }),
            };
        }
    }
}

/// Pulls `error.message` out of an API error body, else returns the body verbatim.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}
