//! Reference execution of the original Python source.
//!
//! The original program is run by the scripting interpreter in a child
//! process with piped stdio; the harness's own output streams are never
//! redirected. The temporary source file is an RAII resource released on
//! every exit path. No comparison against the compiled artifact's output is
//! performed here; equivalence judgment is left to the caller.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{PortError, PortResult};

use super::toolchain::run_captured;

/// Configuration for the reference interpreter.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Path to the interpreter binary
    pub interpreter: PathBuf,
    /// Timeout for one reference run (0 = none)
    pub run_timeout: Duration,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            interpreter: PathBuf::from("python3"),
            run_timeout: Duration::from_secs(300),
        }
    }
}

impl InterpreterConfig {
    /// Create a new config with the given interpreter path.
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        InterpreterConfig { interpreter: interpreter.into(), ..Default::default() }
    }

    /// Set the run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }
}

/// Baseline output of the original source, for manual comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceOutcome {
    /// Captured standard output of the interpreter
    pub stdout: String,
    /// Descriptive error text when evaluation failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the untransformed source in an isolated interpreter process.
pub struct ReferenceSandbox {
    config: InterpreterConfig,
}

impl ReferenceSandbox {
    /// Create a sandbox with the given configuration.
    pub fn new(config: InterpreterConfig) -> Self {
        ReferenceSandbox { config }
    }

    /// Sandbox with the default interpreter.
    pub fn default_sandbox() -> Self {
        Self::new(InterpreterConfig::default())
    }

    /// Detect the interpreter version, if available.
    pub fn detect_version(&self) -> Option<String> {
        Command::new(&self.config.interpreter)
            .arg("--version")
            .output()
            .ok()
            .filter(|o| o.status.success())
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Evaluate `source` and return its baseline output.
    ///
    /// Never panics and never propagates an error past this boundary: any
    /// failure (interpreter missing, evaluation raised, timeout) lands in the
    /// outcome's `error` field.
    pub fn run(&self, source: &str) -> ReferenceOutcome {
        match self.try_run(source) {
            Ok(outcome) => outcome,
            Err(e) => ReferenceOutcome { stdout: String::new(), error: Some(e.to_string()) },
        }
    }

    fn try_run(&self, source: &str) -> PortResult<ReferenceOutcome> {
        let mut file = tempfile::Builder::new()
            .prefix("reference")
            .suffix(".py")
            .tempfile()
            .map_err(|e| PortError::Message(format!("failed to create temp source: {e}")))?;
        file.write_all(source.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| PortError::Message(format!("failed to write temp source: {e}")))?;

        let mut cmd = Command::new(&self.config.interpreter);
        cmd.arg(file.path());

        info!(interpreter = %self.config.interpreter.display(), "running reference source");
        let captured = run_captured(cmd, self.config.run_timeout)?;

        if captured.exit_code != 0 {
            let error = if captured.stderr.trim().is_empty() {
                format!("reference run exited with code {}", captured.exit_code)
            } else {
                captured.stderr
            };
            return Ok(ReferenceOutcome { stdout: captured.stdout, error: Some(error) });
        }
        Ok(ReferenceOutcome { stdout: captured.stdout, error: None })
    }
}
