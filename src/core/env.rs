//! Harness configuration: credential loading from the hosting environment.

use crate::{PortError, PortResult};

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// API credentials for the generative backends.
///
/// Loaded once at startup; absence of a key for a selected provider is a
/// fatal configuration error raised before any network interaction.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl Credentials {
    /// Load credentials from the environment, reading a `.env` file first
    /// when one is present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Credentials {
            openai_api_key: read_var(OPENAI_KEY_VAR),
            anthropic_api_key: read_var(ANTHROPIC_KEY_VAR),
        }
    }

    pub fn require_openai(&self) -> PortResult<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| PortError::Config(format!("{OPENAI_KEY_VAR} not set")))
    }

    pub fn require_anthropic(&self) -> PortResult<&str> {
        self.anthropic_api_key
            .as_deref()
            .ok_or_else(|| PortError::Config(format!("{ANTHROPIC_KEY_VAR} not set")))
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_a_config_error() {
        let credentials = Credentials::default();
        match credentials.require_openai() {
            Err(PortError::Config(msg)) => assert!(msg.contains(OPENAI_KEY_VAR)),
            other => panic!("expected config error, got {other:?}"),
        }
        assert!(credentials.require_anthropic().is_err());
    }

    #[test]
    fn test_present_keys_are_returned() {
        let credentials = Credentials {
            openai_api_key: Some("sk-openai".into()),
            anthropic_api_key: Some("sk-ant".into()),
        };
        assert_eq!(credentials.require_openai().unwrap(), "sk-openai");
        assert_eq!(credentials.require_anthropic().unwrap(), "sk-ant");
    }
}
