//! Claude Code hook input types.
//!
//! The host writes one JSON object to the hook's stdin. Probes only ever
//! need a handful of fields, and a hook must keep working when the host
//! adds or omits fields, so everything here is optional and unknown keys
//! are ignored.

use serde::{Deserialize, Serialize};

/// One hook invocation as delivered by the host on stdin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInvocation {
    /// Session identifier, when the host provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Working directory of the invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    /// Hook event name ("PreToolUse", "PostToolUse", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_event_name: Option<String>,

    /// Name of the tool the call concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Tool input payload; shape depends on the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,

    /// Identifier tying PreToolUse and PostToolUse of one call together.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
}

impl HookInvocation {
    /// The skill named in `tool_input.skill`, if any.
    pub fn skill(&self) -> Option<&str> {
        self.tool_input.as_ref()?.get("skill")?.as_str()
    }
}
