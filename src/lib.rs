pub mod aggregate;
pub mod artifact;
pub mod convert_cmd;
pub mod core;
pub mod engine;
pub mod prompt;
pub mod provider;
pub mod reference_cmd;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::engine::{CompileOutcome, ExecutionOutcome, ReferenceOutcome};
use crate::provider::ProviderKind;

#[derive(Debug, Error)]
pub enum PortError {
    /// Missing or invalid credential / harness configuration. Raised before
    /// any network call; fatal to startup, never to an individual conversion.
    #[error("configuration error: {0}")]
    Config(String),
    /// Provider call failure: auth, transport, error payload, malformed
    /// response shape. Aborts the current conversion, no retry.
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type PortResult<T> = Result<T, PortError>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SystemInfo {
    pub cpu_model: Option<String>,
    pub cpu_cores_logical: Option<usize>,
    pub cpu_cores_physical: Option<usize>,
    pub total_ram_bytes: Option<u64>,
    pub os: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonMeta {
    pub name: String,
    pub timestamp: String,
    pub provider: ProviderKind,
    pub model: String,
    pub artifact_path: PathBuf,
    pub cli_args: Vec<String>,
    pub artifact_sha256: Option<String>,
    pub source_sha256: Option<String>,
}

/// Report for one provider's convert-persist-compile-execute cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertReport {
    #[serde(flatten)]
    pub meta: CommonMeta,
    pub raw_chars: usize,
    pub code_chars: usize,
    pub generation_time_ms: u128,
    pub compile: CompileOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceOutcome>,
    pub system: Option<SystemInfo>,
}

/// Report for a standalone reference run of the original source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceReport {
    pub name: String,
    pub timestamp: String,
    pub source_sha256: Option<String>,
    pub interpreter_version: Option<String>,
    pub outcome: ReferenceOutcome,
    pub system: Option<SystemInfo>,
}

// Shared helpers
pub fn collect_system_info() -> SystemInfo {
    use sysinfo::System;
    let mut sys = System::new_all();
    sys.refresh_all();
    let cpu_model = sys.cpus().first().map(|c| c.brand().to_string());
    let cpu_cores_logical = Some(sys.cpus().len());
    let cpu_cores_physical = sys.physical_core_count();
    let total_ram_bytes = Some(sys.total_memory());
    let os = System::name();
    SystemInfo { cpu_model, cpu_cores_logical, cpu_cores_physical, total_ram_bytes, os }
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".to_string())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

pub fn write_json<T: serde::Serialize>(path: &std::path::Path, value: &T) -> PortResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| PortError::Message(e.to_string()))?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(|e| PortError::Message(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| PortError::Message(e.to_string()))
}
