//! Anthropic provider implementation (single-shot messages call).

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::prompt;
use crate::{PortError, PortResult};

use super::api_error_message;
use super::traits::{ConversionRequest, FragmentStream, Provider, ProviderKind};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2000;
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic provider.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key sent in the `x-api-key` header
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Messages endpoint URL
    pub endpoint: String,
    /// Deadline covering the whole call (0 = none)
    pub request_timeout: Duration,
}

impl AnthropicConfig {
    /// Create a new config with the given API key and default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        AnthropicConfig {
            api_key: api_key.into(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            endpoint: ANTHROPIC_API_URL.to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Anthropic messages provider. Returns the complete generated text in a
/// single call; the gateway wraps it as a sequence of exactly one fragment.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Create a provider from the given configuration.
    pub fn new(config: AnthropicConfig) -> PortResult<Self> {
        let mut builder = Client::builder();
        if config.request_timeout.as_secs() > 0 {
            builder = builder.timeout(config.request_timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PortError::Config(format!("failed to build http client: {e}")))?;
        Ok(AnthropicProvider { config, client })
    }
}

impl Provider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn submit(&self, request: &ConversionRequest) -> PortResult<FragmentStream> {
        if self.config.api_key.trim().is_empty() {
            return Err(PortError::Config("ANTHROPIC_API_KEY is empty".into()));
        }

        let max_tokens = effective_max_tokens(request.max_output_tokens);

        let body = json!({
            "model": self.config.model,
            "max_tokens": max_tokens,
            "system": prompt::system_message(),
            "messages": [
                { "role": "user", "content": prompt::user_message(&request.source_text) },
            ],
        });

        debug!(model = %self.config.model, max_tokens, "submitting single-shot completion");
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .map_err(|e| PortError::Request(format!("anthropic call failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| PortError::Request(format!("anthropic response read failed: {e}")))?;
        if !status.is_success() {
            return Err(PortError::Request(format!(
                "anthropic returned {status}: {}",
                api_error_message(&text)
            )));
        }

        let message = parse_message_text(&text)?;
        Ok(Box::new(std::iter::once(Ok(message))))
    }
}

/// The messages API requires an explicit output-token ceiling; an unset
/// request ceiling falls back to the default.
fn effective_max_tokens(requested: u32) -> u32 {
    if requested == 0 { DEFAULT_MAX_OUTPUT_TOKENS } else { requested }
}

/// Pull the generated text out of a messages API response body.
fn parse_message_text(body: &str) -> PortResult<String> {
    #[derive(Deserialize)]
    struct MessageResponse {
        content: Vec<ContentBlock>,
    }
    #[derive(Deserialize)]
    struct ContentBlock {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        text: Option<String>,
    }

    let response: MessageResponse = serde_json::from_str(body)
        .map_err(|e| PortError::Request(format!("malformed anthropic response: {e}")))?;
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| PortError::Request("anthropic response has no text block".into()))
}
