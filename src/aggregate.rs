//! Fragment aggregation and normalization of generated output.

use tracing::debug;

use crate::provider::{FragmentStream, ProviderKind};
use crate::{PortError, PortResult, now_rfc3339};

/// Opening code-fence marker the models are prompted to emit.
const OPEN_MARKER: &str = "```cpp";
/// Closing code-fence marker.
const CLOSE_MARKER: &str = "```";

/// Aggregated output of one backend call.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Concatenation of all fragments, in arrival order.
    pub raw_text: String,
    /// Candidate C++ source derived from `raw_text` by `normalize`.
    pub code: String,
    /// Backend that produced the text.
    pub provider: ProviderKind,
    /// RFC3339 timestamp of aggregation.
    pub produced_at: String,
}

/// Drain a fragment sequence into a `ConversionResult`, forwarding each
/// fragment to `observer` for progressive display.
///
/// The observer call is a side effect only; it does not alter the result. A
/// failed fragment aborts the whole conversion and discards everything
/// already aggregated.
pub fn drain<F>(stream: FragmentStream, provider: ProviderKind, mut observer: F) -> PortResult<ConversionResult>
where
    F: FnMut(&str),
{
    let mut raw_text = String::new();
    for fragment in stream {
        let fragment = fragment?;
        observer(&fragment);
        raw_text.push_str(&fragment);
    }
    if raw_text.is_empty() {
        return Err(PortError::Request(format!(
            "provider {provider} produced no output"
        )));
    }
    debug!(provider = %provider, raw_chars = raw_text.len(), "aggregation complete");
    let code = normalize(&raw_text);
    Ok(ConversionResult { raw_text, code, provider, produced_at: now_rfc3339() })
}

/// Strip the literal fence markers wherever they occur and trim surrounding
/// whitespace.
///
/// This is a textual strip, not a parse: text without markers, or with
/// markers in unexpected positions, passes through unchanged apart from
/// trimming. Whether the result is well-formed C++ is only discovered at the
/// compile stage.
pub fn normalize(raw: &str) -> String {
    raw.replace(OPEN_MARKER, "")
        .replace(CLOSE_MARKER, "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ConversionRequest, Provider, ScriptedConfig, ScriptedProvider};

    #[test]
    fn test_normalize_fenced_block() {
        let raw = "```cpp\nint main(){return 0;}\n```";
        assert_eq!(normalize(raw), "int main(){return 0;}");
    }

    #[test]
    fn test_normalize_removes_markers_anywhere() {
        let raw = "prefix ```cpp mid ``` suffix ```cpp";
        let code = normalize(raw);
        assert!(!code.contains("```"));
        assert_eq!(code, "prefix  mid  suffix");
    }

    #[test]
    fn test_normalize_without_markers_only_trims() {
        assert_eq!(normalize("  int x = 1;\n\n"), "int x = 1;");
    }

    #[test]
    fn test_normalize_has_no_surrounding_whitespace() {
        for raw in ["\n\n```cpp\nx\n```\n\n", "   x   ", "x"] {
            let code = normalize(raw);
            assert_eq!(code, code.trim());
        }
    }

    fn submit(provider: &ScriptedProvider) -> crate::provider::FragmentStream {
        let request = ConversionRequest::new("print(1)", provider.kind(), 0);
        provider.submit(&request).unwrap()
    }

    #[test]
    fn test_drain_concatenates_and_observes() {
        let provider = ScriptedProvider::new(
            ScriptedConfig::new(ProviderKind::Gpt)
                .with_fragments(vec!["```cpp\n".into(), "int main(){}".into(), "\n```".into()]),
        );
        let mut seen = Vec::new();
        let result = drain(submit(&provider), ProviderKind::Gpt, |f| seen.push(f.to_string())).unwrap();
        assert_eq!(seen, vec!["```cpp\n", "int main(){}", "\n```"]);
        assert_eq!(result.raw_text, "```cpp\nint main(){}\n```");
        assert_eq!(result.code, "int main(){}");
        assert_eq!(result.provider, ProviderKind::Gpt);
        assert!(!result.produced_at.is_empty());
    }

    #[test]
    fn test_drain_mid_stream_failure_discards_partial() {
        let provider = ScriptedProvider::new(
            ScriptedConfig::new(ProviderKind::Claude)
                .with_fragments(vec!["partial".into()])
                .fail_mid_stream(),
        );
        let result = drain(submit(&provider), ProviderKind::Claude, |_| {});
        assert!(result.is_err());
    }

    #[test]
    fn test_drain_empty_stream_is_an_error() {
        let provider = ScriptedProvider::new(ScriptedConfig::new(ProviderKind::Gpt));
        let result = drain(submit(&provider), ProviderKind::Gpt, |_| {});
        assert!(result.is_err());
    }
}
