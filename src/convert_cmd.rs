//! End-to-end conversion pipeline: submit, aggregate, persist, compile, run.

use std::io::Write as _;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::info;

use crate::aggregate;
use crate::artifact::{ArtifactStore, DEFAULT_ARTIFACT_DIR};
use crate::core::Credentials;
use crate::engine::{
    InterpreterConfig, PortOutcome, ReferenceOutcome, ReferenceSandbox, Toolchain, ToolchainConfig,
};
use crate::provider::{ConversionRequest, ProviderKind, build_provider};
use crate::{CommonMeta, ConvertReport, PortResult, collect_system_info, now_rfc3339, sha256_hex, write_json};

/// Options for one conversion-and-verify invocation.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Original Python source
    pub source: String,
    /// Providers to convert with, attempted in order
    pub providers: Vec<ProviderKind>,
    /// Output-token ceiling (single-shot style only)
    pub max_output_tokens: u32,
    /// Directory artifacts are persisted under
    pub artifact_dir: PathBuf,
    /// Toolchain settings for the compile and execute stages
    pub toolchain: ToolchainConfig,
    /// Interpreter settings for the optional baseline run
    pub interpreter: InterpreterConfig,
    /// Run the compiled binary after a successful compile
    pub run_binary: bool,
    /// Also run the original source for a baseline
    pub run_reference: bool,
    /// Echo fragments to stderr as they arrive
    pub echo_stream: bool,
    /// Deadline for each provider call
    pub request_timeout: Duration,
    /// Write machine-readable JSON reports to this file
    pub json_out: Option<PathBuf>,
}

impl ConvertOptions {
    pub fn new(source: impl Into<String>, providers: Vec<ProviderKind>) -> Self {
        ConvertOptions {
            source: source.into(),
            providers,
            max_output_tokens: 2000,
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            toolchain: ToolchainConfig::default(),
            interpreter: InterpreterConfig::default(),
            run_binary: true,
            run_reference: false,
            echo_stream: false,
            request_timeout: Duration::from_secs(300),
            json_out: None,
        }
    }
}

/// Run the pipeline for each selected provider, strictly one at a time.
///
/// A failure in one provider's path aborts the invocation before the next
/// provider is attempted; there is no isolation between attempts.
pub fn run(options: &ConvertOptions, credentials: &Credentials) -> PortResult<()> {
    let store = ArtifactStore::new(&options.artifact_dir);
    let toolchain = Toolchain::new(options.toolchain.clone());
    if let Some(version) = toolchain.detect_version() {
        info!(compiler = %version, "toolchain detected");
    }

    // Baseline first, so a slow generation does not delay the comparison text.
    let reference: Option<ReferenceOutcome> = if options.run_reference {
        let sandbox = ReferenceSandbox::new(options.interpreter.clone());
        Some(sandbox.run(&options.source))
    } else {
        None
    };

    // Credentials for every selected provider are resolved up front: a
    // missing key must surface before the first request is submitted.
    let mut providers = Vec::with_capacity(options.providers.len());
    for &kind in &options.providers {
        providers.push(build_provider(kind, credentials, options.request_timeout)?);
    }

    let mut reports: Vec<ConvertReport> = Vec::new();
    for provider in &providers {
        let kind = provider.kind();
        info!(provider = %kind, model = provider.model(), "starting conversion");

        let request = ConversionRequest::new(options.source.clone(), kind, options.max_output_tokens);
        let start = Instant::now();
        let stream = provider.submit(&request)?;
        let echo = options.echo_stream;
        let result = aggregate::drain(stream, kind, |fragment| {
            if echo {
                eprint!("{fragment}");
                let _ = std::io::stderr().flush();
            }
        })?;
        if echo {
            eprintln!();
        }
        let generation_time_ms = start.elapsed().as_millis();

        let artifact_path = store.write(&result.code, kind)?;
        let outcome = if options.run_binary {
            toolchain.verify(&artifact_path)?
        } else {
            PortOutcome { compile: toolchain.compile(&artifact_path)?, execution: None }
        };

        println!(
            "[{kind}] generated {} chars in {generation_time_ms}ms -> {}",
            result.code.len(),
            artifact_path.display()
        );
        if outcome.compile.success {
            println!(
                "[{kind}] compile: ok ({}ms)",
                outcome.compile.compile_time_ms
            );
        } else {
            println!(
                "[{kind}] compile: failed (exit {})",
                outcome.compile.exit_code
            );
        }
        match &outcome.execution {
            Some(run) => {
                println!("[{kind}] run: exit {} ({}ms)", run.exit_code, run.run_time_ms);
            }
            None => println!("[{kind}] run: skipped"),
        }
        println!("{}", outcome.user_visible());

        if let Some(baseline) = &reference {
            match &baseline.error {
                Some(error) => println!("[reference] error: {error}"),
                None => println!("[reference]\n{}", baseline.stdout),
            }
        }

        let meta = CommonMeta {
            name: "convert".to_string(),
            timestamp: now_rfc3339(),
            provider: kind,
            model: provider.model().to_string(),
            artifact_path: artifact_path.clone(),
            cli_args: std::env::args().collect(),
            artifact_sha256: Some(sha256_hex(result.code.as_bytes())),
            source_sha256: Some(sha256_hex(options.source.as_bytes())),
        };
        reports.push(ConvertReport {
            meta,
            raw_chars: result.raw_text.len(),
            code_chars: result.code.len(),
            generation_time_ms,
            compile: outcome.compile,
            execution: outcome.execution,
            reference: reference.clone(),
            system: Some(collect_system_info()),
        });
    }

    if let Some(json_path) = &options.json_out {
        write_json(json_path, &reports)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PortError;
    use tempfile::tempdir;

    #[test]
    fn test_missing_second_key_fails_before_any_submit() {
        let dir = tempdir().unwrap();
        let mut options =
            ConvertOptions::new("print(1)", vec![ProviderKind::Gpt, ProviderKind::Claude]);
        options.artifact_dir = dir.path().join("artifacts");
        let credentials = Credentials {
            openai_api_key: Some("sk-test".into()),
            anthropic_api_key: None,
        };

        let result = run(&options, &credentials);
        assert!(matches!(result, Err(PortError::Config(_))));
        // no request was submitted and nothing reached the store
        assert!(!options.artifact_dir.exists());
    }
}
