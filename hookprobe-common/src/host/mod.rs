//! Claude Code hook protocol types.
//!
//! Input and output shapes for the host's hook contract: one JSON object
//! on stdin per invocation, one JSON object on stdout. Inputs are lenient
//! (every field optional); outputs carry exactly the camelCase fields the
//! host understands.

mod input;
mod output;

pub use input::HookInvocation;
pub use output::{
    HookResponse, HookSpecificOutput, PermissionDecision, PostToolUseOutput, PreToolUseOutput,
};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hook lifecycle points the probes attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookEvent {
    /// Runs before the tool call; may allow or deny it.
    PreToolUse,
    /// Runs after the tool call; may add context to the result.
    PostToolUse,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookEvent::PreToolUse => write!(f, "PreToolUse"),
            HookEvent::PostToolUse => write!(f, "PostToolUse"),
        }
    }
}
