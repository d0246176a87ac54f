//! Scripted provider for testing.

use crate::{PortError, PortResult};

use super::traits::{ConversionRequest, FragmentStream, Provider, ProviderKind};

/// Configuration for scripted provider responses.
#[derive(Debug, Clone)]
pub struct ScriptedConfig {
    /// Identity to report
    pub kind: ProviderKind,
    /// Name to report
    pub name: String,
    /// Model to report
    pub model: String,
    /// Fragments to yield, in order
    pub fragments: Vec<String>,
    /// Whether submit should fail before yielding anything
    pub submit_fails: bool,
    /// Whether the stream should fail after the scripted fragments
    pub fail_mid_stream: bool,
}

impl ScriptedConfig {
    /// Create a new scripted config for the given identity.
    pub fn new(kind: ProviderKind) -> Self {
        ScriptedConfig {
            kind,
            name: "scripted".to_string(),
            model: "scripted-1.0".to_string(),
            fragments: Vec::new(),
            submit_fails: false,
            fail_mid_stream: false,
        }
    }

    /// Set the fragments to yield.
    pub fn with_fragments(mut self, fragments: Vec<String>) -> Self {
        self.fragments = fragments;
        self
    }

    /// Make submit fail before any fragment is produced.
    pub fn submit_fails(mut self) -> Self {
        self.submit_fails = true;
        self
    }

    /// Make the stream fail after the scripted fragments.
    pub fn fail_mid_stream(mut self) -> Self {
        self.fail_mid_stream = true;
        self
    }
}

/// Scripted provider for unit testing.
///
/// Yields configured fragments without touching the network.
pub struct ScriptedProvider {
    config: ScriptedConfig,
}

impl ScriptedProvider {
    /// Create a new scripted provider with the given configuration.
    pub fn new(config: ScriptedConfig) -> Self {
        ScriptedProvider { config }
    }

    /// Scripted provider that yields the given text as a single fragment.
    pub fn single_shot(kind: ProviderKind, text: impl Into<String>) -> Self {
        Self::new(ScriptedConfig::new(kind).with_fragments(vec![text.into()]))
    }
}

impl Provider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.config.kind
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn submit(&self, _request: &ConversionRequest) -> PortResult<FragmentStream> {
        if self.config.submit_fails {
            return Err(PortError::Request("scripted submit failure".into()));
        }
        let fragments = self.config.fragments.clone().into_iter().map(Ok);
        if self.config.fail_mid_stream {
            Ok(Box::new(fragments.chain(std::iter::once(Err(
                PortError::Request("scripted mid-stream failure".into()),
            )))))
        } else {
            Ok(Box::new(fragments))
        }
    }
}
