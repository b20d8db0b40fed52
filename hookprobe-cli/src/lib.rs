//! Hookprobe - Claude Code hook probe CLI library.
//!
//! The binary is a thin shell: clap definitions, the stdin→stdout probe
//! plumbing, and the `resolve` debugging lookup. Everything the probes
//! actually do lives in `hookprobe-common`.

pub mod cli;
pub mod resolve;
pub mod runtime;

pub use cli::{Cli, Commands};

// Re-export the core library under the binary's name.
pub use hookprobe_common::*;
