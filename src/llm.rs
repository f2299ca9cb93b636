//! Content generation service
//!
//! Stages see only the `ContentGenerator` trait. The HTTP implementation talks
//! to an OpenAI-compatible chat completions endpoint; retries with exponential
//! backoff wrap any implementation and only fire for transient failures.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GeneratorConfig;

#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited by content service")]
    RateLimited,

    #[error("content service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed service response: {0}")]
    Malformed(String),

    #[error("content service not configured: {0}")]
    NotConfigured(String),
}

impl GeneratorError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Malformed(_) | Self::NotConfigured(_) => false,
        }
    }
}

/// A text-generation service: prompt in, raw text out
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct HttpGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
    api_key: String,
}

impl HttpGenerator {
    pub fn from_config(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let api_key = config.api_key().ok_or_else(|| {
            GeneratorError::NotConfigured(format!("environment variable {} is not set", config.api_key_env))
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GeneratorError::Transport(e.to_string()))?;
        Ok(Self { client, config, api_key })
    }
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout
                } else {
                    GeneratorError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeneratorError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GeneratorError::Malformed("response has no message content".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            min_delay: Duration::from_millis(config.min_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms.max(config.min_backoff_ms)),
        }
    }

    /// Single attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

/// Call the generator, retrying transient failures per `policy`
pub async fn generate_with_retry(
    generator: &dyn ContentGenerator,
    prompt: &str,
    policy: RetryPolicy,
) -> Result<String, GeneratorError> {
    (|| generator.generate(prompt))
        .retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .when(GeneratorError::is_transient)
        .notify(|err: &GeneratorError, delay: Duration| {
            warn!(error = %err, delay_ms = delay.as_millis() as u64, "transient generation failure, retrying");
        })
        .await
}

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").ok())
        .as_ref()
}

/// Pull the JSON payload out of a model reply.
///
/// Order: fenced code block, outermost `{...}`, outermost `[...]`, then the
/// trimmed text unchanged.
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if text.contains("```") {
        if let Some(body) = fence_pattern()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
        {
            debug!("extracted JSON from fenced block");
            return body.as_str().trim();
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if end > start {
                return &text[start..=end];
            }
        }
    }

    text
}
