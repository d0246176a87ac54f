//! Unified provider abstraction over the generative backends.
//!
//! This module presents a single `Provider` trait covering the two calling
//! styles: incremental streaming (OpenAI) and single-shot (Anthropic).

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod traits;

use serde::Deserialize;
use std::time::Duration;

use crate::PortResult;
use crate::core::Credentials;

// Re-export key types
pub use anthropic::{AnthropicConfig, AnthropicProvider, DEFAULT_ANTHROPIC_MODEL};
pub use mock::{ScriptedConfig, ScriptedProvider};
pub use openai::{DEFAULT_OPENAI_MODEL, OpenAiConfig, OpenAiProvider};
pub use traits::{ConversionRequest, Fragment, FragmentStream, Provider, ProviderKind};

/// Construct the provider for the given identity, pulling its credential out
/// of `credentials`. Fails before any network interaction when the credential
/// is absent.
pub fn build_provider(
    kind: ProviderKind,
    credentials: &Credentials,
    request_timeout: Duration,
) -> PortResult<Box<dyn Provider>> {
    match kind {
        ProviderKind::Gpt => {
            let key = credentials.require_openai()?;
            let config = OpenAiConfig::new(key).with_timeout(request_timeout);
            Ok(Box::new(OpenAiProvider::new(config)?))
        }
        ProviderKind::Claude => {
            let key = credentials.require_anthropic()?;
            let config = AnthropicConfig::new(key).with_timeout(request_timeout);
            Ok(Box::new(AnthropicProvider::new(config)?))
        }
    }
}

/// Extract a human-readable message from a provider error payload, falling
/// back to the raw body.
pub(crate) fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        error: ApiErrorBody,
    }
    #[derive(Deserialize)]
    struct ApiErrorBody {
        message: String,
    }
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
