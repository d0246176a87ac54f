//! OpenAI provider implementation (streaming chat completions).

use std::io::{BufRead, BufReader};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::prompt;
use crate::{PortError, PortResult};

use super::api_error_message;
use super::traits::{ConversionRequest, Fragment, FragmentStream, Provider, ProviderKind};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Completions endpoint URL
    pub endpoint: String,
    /// Deadline covering the whole call, stream included (0 = none)
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    /// Create a new config with the given API key and default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        OpenAiConfig {
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            endpoint: OPENAI_API_URL.to_string(),
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

/// OpenAI chat-completions provider. Yields generated text incrementally:
/// each SSE delta becomes one fragment.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Create a provider from the given configuration.
    pub fn new(config: OpenAiConfig) -> PortResult<Self> {
        let mut builder = Client::builder();
        if config.request_timeout.as_secs() > 0 {
            builder = builder.timeout(config.request_timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PortError::Config(format!("failed to build http client: {e}")))?;
        Ok(OpenAiProvider { config, client })
    }
}

impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gpt
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn submit(&self, request: &ConversionRequest) -> PortResult<FragmentStream> {
        if self.config.api_key.trim().is_empty() {
            return Err(PortError::Config("OPENAI_API_KEY is empty".into()));
        }

        let body = json!({
            "model": self.config.model,
            "stream": true,
            "messages": [
                { "role": "system", "content": prompt::system_message() },
                { "role": "user", "content": prompt::user_message(&request.source_text) },
            ],
        });

        debug!(model = %self.config.model, "submitting streaming completion");
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| PortError::Request(format!("openai call failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(PortError::Request(format!(
                "openai returned {status}: {}",
                api_error_message(&text)
            )));
        }

        Ok(Box::new(SseFragments::new(BufReader::new(response))))
    }
}

/// Parse one SSE `data:` payload into an optional text delta.
///
/// Chunks that carry no text (role announcements, finish markers) yield
/// `Ok(None)`; a payload that does not match the expected shape is an error.
fn parse_stream_chunk(data: &str) -> PortResult<Option<String>> {
    #[derive(Deserialize)]
    struct StreamChunk {
        choices: Vec<StreamChoice>,
    }
    #[derive(Deserialize)]
    struct StreamChoice {
        #[serde(default)]
        delta: Delta,
    }
    #[derive(Deserialize, Default)]
    struct Delta {
        #[serde(default)]
        content: Option<String>,
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| PortError::Request(format!("malformed stream chunk: {e}")))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|s| !s.is_empty()))
}

/// Iterator over SSE text deltas. Finite and not restartable; the first
/// transport or parse failure ends the sequence.
struct SseFragments<R: BufRead> {
    lines: std::io::Lines<R>,
    done: bool,
}

impl<R: BufRead> SseFragments<R> {
    fn new(reader: R) -> Self {
        SseFragments { lines: reader.lines(), done: false }
    }
}

impl<R: BufRead> Iterator for SseFragments<R> {
    type Item = PortResult<Fragment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(PortError::Request(format!(
                        "transport failure mid-stream: {e}"
                    ))));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data.trim() == "[DONE]" {
                self.done = true;
                return None;
            }
            match parse_stream_chunk(data) {
                Ok(Some(delta)) => return Some(Ok(delta)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_config_builder() {
        let config = OpenAiConfig::new("sk-test")
            .with_model("gpt-4o-mini")
            .with_timeout(Duration::from_secs(60));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.endpoint, OPENAI_API_URL);
    }

    #[test]
    fn test_parse_stream_chunk_with_content() {
        let data = r#"{"choices":[{"delta":{"content":"int main"}}]}"#;
        assert_eq!(parse_stream_chunk(data).unwrap(), Some("int main".to_string()));
    }

    #[test]
    fn test_parse_stream_chunk_role_only() {
        let data = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_stream_chunk(data).unwrap(), None);
    }

    #[test]
    fn test_parse_stream_chunk_malformed() {
        assert!(parse_stream_chunk("not json").is_err());
    }

    #[test]
    fn test_sse_fragments_in_order_until_done() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"#include\"}}]}\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" <iostream>\"}}]}\n",
            "\n",
            "data: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
        );
        let fragments: Vec<_> = SseFragments::new(Cursor::new(body))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(fragments, vec!["#include", " <iostream>"]);
    }

    #[test]
    fn test_sse_fragments_malformed_chunk_ends_stream() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: {broken\n";
        let mut iter = SseFragments::new(Cursor::new(body));
        assert_eq!(iter.next().unwrap().unwrap(), "ok");
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_empty_key_fails_before_any_call() {
        let provider = OpenAiProvider::new(OpenAiConfig::new("")).unwrap();
        let request = ConversionRequest::new("print(1)", ProviderKind::Gpt, 0);
        match provider.submit(&request) {
            Err(PortError::Config(_)) => {}
            Err(other) => panic!("expected config error, got {other}"),
            Ok(_) => panic!("expected config error, got a stream"),
        }
    }
}
