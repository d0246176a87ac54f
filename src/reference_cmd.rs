//! Standalone baseline run of the original source.

use std::path::PathBuf;

use crate::engine::{InterpreterConfig, ReferenceSandbox};
use crate::{PortResult, ReferenceReport, collect_system_info, now_rfc3339, sha256_hex, write_json};

/// Run the reference interpreter against `source` and print the baseline.
pub fn run(
    source: &str,
    interpreter: InterpreterConfig,
    json_out: Option<PathBuf>,
) -> PortResult<()> {
    let sandbox = ReferenceSandbox::new(interpreter);
    let interpreter_version = sandbox.detect_version();
    let outcome = sandbox.run(source);

    match &outcome.error {
        Some(error) => println!("[reference] error: {error}"),
        None => print!("{}", outcome.stdout),
    }

    if let Some(json_path) = &json_out {
        let report = ReferenceReport {
            name: "reference".to_string(),
            timestamp: now_rfc3339(),
            source_sha256: Some(sha256_hex(source.as_bytes())),
            interpreter_version,
            outcome,
            system: Some(collect_system_info()),
        };
        write_json(json_path, &report)?;
    }
    Ok(())
}
