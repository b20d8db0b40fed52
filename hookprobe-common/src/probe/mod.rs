//! Diagnostic probes and the driver that runs them.
//!
//! Every probe is a parameterization of one shape: decode the invocation,
//! record prior state, resolve a plugin root, mutate the search path for
//! the duration of one import attempt, classify the outcome, emit one
//! report. The driver owns the outer contract so no probe can get it
//! wrong: undecodable input produces nothing at all, filtered-out
//! invocations produce the suppressed no-op envelope, and unexpected
//! failures are logged and converted into a permissive continue. A broken
//! probe must never block the host.

mod compare;
mod fallthrough;
mod guard;
mod shadow;
mod stale;

pub use compare::BootstrapCompareProbe;
pub use fallthrough::WalkUpFallthroughProbe;
pub use guard::ImportGuardProbe;
pub use shadow::ShadowPackageProbe;
pub use stale::StaleModuleProbe;

use crate::context::ResolutionContext;
use crate::error::ProbeError;
use crate::forensics::ProbeLog;
use crate::host::{HookEvent, HookInvocation, HookResponse};
use crate::registry::PluginId;

/// Plugin exercised by the bootstrap probes.
pub const PROBE_PLUGIN_ID: &str = "base-plugin@plugin-import-error";

/// Payload subdirectory carrying importable source inside the plugin.
pub const PAYLOAD_DIR: &str = "python";

/// Module the plugin payload is known to provide.
pub const TARGET_MODULE: &str = "base_module";

/// Skill names whose tool calls the gating and stale probes inspect.
pub const WATCHED_SKILLS: [&str; 2] = ["favorite-color", "import-plugin:favorite-color"];

/// Host issue tracking the shared-state defect.
pub const TRACKING_ISSUE: &str = "github.com/anthropics/claude-code/issues/23089";

/// A single diagnostic probe.
pub trait Probe {
    /// Stable name used in log lines and subcommand wiring.
    fn name(&self) -> &'static str;

    /// The lifecycle point this probe is meant to run at.
    fn hook_event(&self) -> HookEvent;

    /// Whether this invocation is one the probe inspects. Defaults to
    /// inspecting everything.
    fn applies_to(&self, invocation: &HookInvocation) -> bool {
        let _ = invocation;
        true
    }

    /// Run the probe body.
    ///
    /// Resolution and import failures are the probe's subject matter and
    /// must be classified into the response; only genuinely unexpected
    /// failures should escape as `ProbeError`.
    fn run(
        &self,
        invocation: &HookInvocation,
        ctx: &mut ResolutionContext,
        log: &dyn ProbeLog,
    ) -> Result<HookResponse, ProbeError>;
}

/// What the driver decided to emit.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeReply {
    /// Undecodable input: emit nothing at all.
    Silent,
    /// Emit exactly this envelope.
    Respond(HookResponse),
}

impl ProbeReply {
    /// The response to emit, if any.
    pub fn response(&self) -> Option<&HookResponse> {
        match self {
            ProbeReply::Silent => None,
            ProbeReply::Respond(response) => Some(response),
        }
    }
}

/// The bootstrap probes' plugin identifier as a typed value.
pub(crate) fn probe_plugin_id() -> PluginId {
    PluginId::new("base-plugin", "plugin-import-error")
}

/// Whether an invocation's skill is one the watched-skill probes inspect.
pub(crate) fn watches_skill(invocation: &HookInvocation) -> bool {
    invocation
        .skill()
        .is_some_and(|skill| WATCHED_SKILLS.contains(&skill))
}

/// Drive one probe invocation end to end.
///
/// `raw_input` is the hook's entire stdin. The caller decides where the
/// context and log come from; the driver decides what the host sees.
pub fn drive(
    probe: &dyn Probe,
    raw_input: &str,
    ctx: &mut ResolutionContext,
    log: &dyn ProbeLog,
) -> ProbeReply {
    let raw = raw_input.trim();
    if raw.is_empty() {
        tracing::debug!(probe = probe.name(), "empty hook input, staying quiet");
        return ProbeReply::Silent;
    }

    let invocation: HookInvocation = match serde_json::from_str(raw) {
        Ok(invocation) => invocation,
        Err(err) => {
            tracing::debug!(probe = probe.name(), %err, "undecodable hook input, staying quiet");
            return ProbeReply::Silent;
        }
    };

    if !probe.applies_to(&invocation) {
        return ProbeReply::Respond(HookResponse::silent());
    }

    match probe.run(&invocation, ctx, log) {
        Ok(response) => ProbeReply::Respond(response),
        Err(err) => {
            log.record(&format!(
                "{} FATAL: {}",
                probe.name().to_ascii_uppercase(),
                err
            ));
            tracing::error!(probe = probe.name(), %err, "probe failed, continuing permissively");
            ProbeReply::Respond(HookResponse::silent())
        }
    }
}
