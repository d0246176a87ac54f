//! Core harness configuration.

pub mod env;

// Re-export key types for convenience
pub use env::{ANTHROPIC_KEY_VAR, Credentials, OPENAI_KEY_VAR};
