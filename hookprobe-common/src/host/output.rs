//! Claude Code hook output types.
//!
//! These types represent the JSON output format that Claude Code expects
//! from hooks. A probe always answers with `continue: true`; what varies
//! is whether the response is suppressed, carries a report in `message`,
//! or carries a structured decision in `hookSpecificOutput`.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Common output structure for all hooks.
///
/// This follows the Claude Code hook output format:
/// - `continue`: Whether the host should continue after hook execution (default: true)
/// - `suppressOutput`: Hide this response from the transcript
/// - `message`: Free-form report payload shown to the user
/// - `systemMessage`: Message injected into the model's context
/// - `hookSpecificOutput`: Hook-type-specific output fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    /// Whether to continue execution (default: true).
    #[serde(default = "default_continue", rename = "continue")]
    pub continue_execution: bool,

    /// Whether to suppress output display.
    #[serde(default, skip_serializing_if = "is_false")]
    pub suppress_output: bool,

    /// Free-form report payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// System message to inject into context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    /// Hook-specific output fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

fn default_continue() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Default for HookResponse {
    fn default() -> Self {
        Self {
            continue_execution: true,
            suppress_output: false,
            message: None,
            system_message: None,
            hook_specific_output: None,
        }
    }
}

impl HookResponse {
    /// Create a response that lets the host proceed with nothing to say.
    pub fn proceed() -> Self {
        Self {
            continue_execution: true,
            ..Default::default()
        }
    }

    /// Create the suppressed no-op response.
    ///
    /// This is what a probe answers when the invocation is not one it
    /// inspects, and what the driver answers when a probe fails
    /// unexpectedly: the host continues and nothing appears in the
    /// transcript.
    pub fn silent() -> Self {
        Self {
            continue_execution: true,
            suppress_output: true,
            ..Default::default()
        }
    }

    /// Create a response carrying a report in `message`.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            continue_execution: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create a PreToolUse permission decision (Claude Code format).
    ///
    /// Per the Claude Code hook docs, PreToolUse gating uses
    /// `hookSpecificOutput.permissionDecision` with
    /// `permissionDecisionReason` as the explanation, and `continue: true`
    /// so the JSON is parsed (exit code 0).
    pub fn pre_tool_use(decision: PermissionDecision, reason: impl Into<String>) -> Self {
        Self {
            continue_execution: true,
            hook_specific_output: Some(HookSpecificOutput::PreToolUse(PreToolUseOutput {
                permission_decision: Some(decision),
                permission_decision_reason: Some(reason.into()),
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    /// Create a PostToolUse response injecting additional context.
    pub fn post_tool_use_context(context: impl Into<String>) -> Self {
        Self {
            continue_execution: true,
            hook_specific_output: Some(HookSpecificOutput::PostToolUse(PostToolUseOutput {
                additional_context: Some(context.into()),
            })),
            ..Default::default()
        }
    }

    /// Add a system message to the response.
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    /// Suppress output display.
    pub fn with_suppress_output(mut self) -> Self {
        self.suppress_output = true;
        self
    }

    /// The permission decision carried by this response, if any.
    pub fn permission_decision(&self) -> Option<PermissionDecision> {
        match &self.hook_specific_output {
            Some(HookSpecificOutput::PreToolUse(output)) => output.permission_decision,
            _ => None,
        }
    }

    /// The additional context carried by this response, if any.
    pub fn additional_context(&self) -> Option<&str> {
        match &self.hook_specific_output {
            Some(HookSpecificOutput::PreToolUse(output)) => output.additional_context.as_deref(),
            Some(HookSpecificOutput::PostToolUse(output)) => output.additional_context.as_deref(),
            None => None,
        }
    }
}

/// Hook-specific output fields based on hook type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hookEventName")]
pub enum HookSpecificOutput {
    /// PreToolUse hook-specific output.
    PreToolUse(PreToolUseOutput),
    /// PostToolUse hook-specific output.
    PostToolUse(PostToolUseOutput),
}

/// PreToolUse hook-specific output for permission decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PreToolUseOutput {
    /// Permission decision: "allow" or "deny".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<PermissionDecision>,

    /// Reason for the permission decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,

    /// Additional context to provide alongside the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

/// Permission decision options for PreToolUse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    /// Allow the tool call to proceed.
    Allow,
    /// Deny the tool call.
    Deny,
}

impl fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionDecision::Allow => write!(f, "allow"),
            PermissionDecision::Deny => write!(f, "deny"),
        }
    }
}

/// PostToolUse hook-specific output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostToolUseOutput {
    /// Additional context to provide to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}
