//! Provider trait and request types for the unified provider abstraction.

use serde::{Deserialize, Serialize};

use crate::PortResult;

/// Identity of a generative backend. Closed set: selection is dispatched
/// through the `Provider` trait, never through strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions (streaming style).
    Gpt,
    /// Anthropic messages (single-shot style).
    Claude,
}

impl ProviderKind {
    /// Short identifier used in artifact filenames and logs.
    pub fn short(&self) -> &'static str {
        match self {
            ProviderKind::Gpt => "gpt",
            ProviderKind::Claude => "claude",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short())
    }
}

/// One conversion request. Immutable once constructed, consumed once.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Original Python source to be ported.
    pub source_text: String,
    /// Which backend this request targets.
    pub provider: ProviderKind,
    /// Output-token ceiling. Only the single-shot (Claude) style uses it;
    /// the streaming style ignores it.
    pub max_output_tokens: u32,
}

impl ConversionRequest {
    pub fn new(source_text: impl Into<String>, provider: ProviderKind, max_output_tokens: u32) -> Self {
        ConversionRequest {
            source_text: source_text.into(),
            provider,
            max_output_tokens,
        }
    }
}

/// An incremental chunk of generated text. Ordering is arrival order; there
/// are no boundary semantics beyond that.
pub type Fragment = String;

/// Lazy, finite, non-restartable sequence of fragments. Consuming it blocks
/// the calling thread between arrivals; a failure item ends the sequence and
/// discards whatever was already produced.
pub type FragmentStream = Box<dyn Iterator<Item = PortResult<Fragment>>>;

/// Unified trait over the heterogeneous backend calling styles.
///
/// Implementations are constructed once with their credentials and passed by
/// reference into call sites; there is no ambient client state.
pub trait Provider {
    /// Backend identity.
    fn kind(&self) -> ProviderKind;

    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Submit a conversion request and return the fragment sequence.
    ///
    /// For the single-shot style the sequence holds exactly one fragment.
    /// Any failure (auth, transport, error payload, malformed shape) is
    /// surfaced immediately; there is no retry or partial-result recovery.
    fn submit(&self, request: &ConversionRequest) -> PortResult<FragmentStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_short_names() {
        assert_eq!(ProviderKind::Gpt.short(), "gpt");
        assert_eq!(ProviderKind::Claude.short(), "claude");
        assert_eq!(ProviderKind::Claude.to_string(), "claude");
    }

    #[test]
    fn test_kind_serde_roundtrip() {
        let json = serde_json::to_string(&ProviderKind::Gpt).unwrap();
        assert_eq!(json, "\"gpt\"");
        let back: ProviderKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProviderKind::Gpt);
    }

    #[test]
    fn test_request_construction() {
        let req = ConversionRequest::new("print(1)", ProviderKind::Claude, 2000);
        assert_eq!(req.provider, ProviderKind::Claude);
        assert_eq!(req.max_output_tokens, 2000);
        assert_eq!(req.source_text, "print(1)");
    }
}
