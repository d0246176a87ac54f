//! Compile-execute and reference evaluation stages.
//!
//! `Toolchain` turns a persisted artifact into an observed execution result;
//! `ReferenceSandbox` runs the original source for a baseline. Neither stage
//! applies OS-level isolation: the compiler, the produced binary, and the
//! interpreter run with the harness's ambient permissions, bounded only by
//! the configured per-stage timeout.

pub mod reference;
pub mod toolchain;

// Re-export key types
pub use reference::{InterpreterConfig, ReferenceOutcome, ReferenceSandbox};
pub use toolchain::{
    CompileOutcome, ExecutionOutcome, PortOutcome, Toolchain, ToolchainConfig,
};
