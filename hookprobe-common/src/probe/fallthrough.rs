//! PreToolUse probe: reproduce the walk-up fallthrough on demand.
//!
//! Starts the marker search from a directory chosen to have no
//! `.claude-plugin` anywhere above it, then does exactly what the legacy
//! bootstrap did with the result: join the payload subdirectory onto
//! whatever came back and put it on the search path. With no marker the
//! walk-up lands on the filesystem root, the joined path does not exist,
//! and the import fails with an error naming the module instead of the
//! real cause.

use std::path::PathBuf;

use serde::Serialize;

use crate::context::{ResolutionContext, SearchPriority};
use crate::error::ProbeError;
use crate::forensics::ProbeLog;
use crate::host::{HookEvent, HookInvocation, HookResponse};
use crate::loader;
use crate::probe::{Probe, PAYLOAD_DIR, TARGET_MODULE};
use crate::walkup;

/// Start directory used when the caller does not pick one. Deliberately
/// outside any plugin checkout.
const DEFAULT_START: &str = "/tmp/no-plugin-marker-here";

const EXPLANATION_REPRODUCED: &str = "The marker search ran out of parent directories and silently treated the \
     filesystem root as the plugin root. The injected search path entry points at a \
     directory that does not exist, so the import fails with an error naming the module \
     instead of the real cause. The walk-up result must be an explicit not-found outcome, \
     not a root-shaped sentinel.";

const EXPLANATION_MARKER_PRESENT: &str = "A .claude-plugin marker was found above the start directory, so the walk-up \
     terminated before reaching the filesystem root. Re-run from a directory outside any \
     plugin checkout to reproduce the fallthrough.";

const EXPLANATION_ROOT_PAYLOAD: &str = "The walk-up fell through to the filesystem root, and the joined payload path \
     happens to exist there, so the import went through anyway. The silent fallthrough is \
     still the defect; this machine just cannot show the failing half.";

/// The fallthrough demonstration probe.
pub struct WalkUpFallthroughProbe {
    start_dir: PathBuf,
    target_module: String,
}

impl WalkUpFallthroughProbe {
    /// Demonstrate the fallthrough from the default bare start directory.
    pub fn new() -> Self {
        Self {
            start_dir: PathBuf::from(DEFAULT_START),
            target_module: TARGET_MODULE.to_string(),
        }
    }

    /// Start the walk-up from `dir` instead.
    pub fn with_start_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = dir.into();
        self
    }
}

impl Default for WalkUpFallthroughProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for WalkUpFallthroughProbe {
    fn name(&self) -> &'static str {
        "walkup-fallthrough"
    }

    fn hook_event(&self) -> HookEvent {
        HookEvent::PreToolUse
    }

    fn run(
        &self,
        _invocation: &HookInvocation,
        ctx: &mut ResolutionContext,
        log: &dyn ProbeLog,
    ) -> Result<HookResponse, ProbeError> {
        let pid = std::process::id();
        log.record(&format!(
            "WALKUP-FALLTHROUGH pid={pid} start={}",
            self.start_dir.display()
        ));

        let outcome = walkup::find_plugin_root(&self.start_dir);
        let legacy = outcome.legacy_root().to_path_buf();
        let would_inject = legacy.join(PAYLOAD_DIR);
        let path_exists = would_inject.is_dir();

        // Inject first, ask questions never: that is the legacy behavior
        // under demonstration.
        let result = ctx.with_scoped_entry(&would_inject, SearchPriority::Front, |ctx| {
            loader::import_module(ctx, &self.target_module)
        });

        let fell_through = outcome.fell_through();
        let bug_reproduced = fell_through && result.is_err();
        log.record(&format!(
            "WALKUP-FALLTHROUGH pid={pid} fell_through={fell_through} import_ok={} \
             would_inject={}",
            result.is_ok(),
            would_inject.display()
        ));

        let explanation = if !fell_through {
            EXPLANATION_MARKER_PRESENT
        } else if result.is_ok() {
            EXPLANATION_ROOT_PAYLOAD
        } else {
            EXPLANATION_REPRODUCED
        };

        let payload = FallthroughPayload {
            bug_demo: "silent walk-up fallthrough to the filesystem root",
            started_from: self.start_dir.display().to_string(),
            walked_up_to: legacy.display().to_string(),
            fell_through_to_root: fell_through,
            would_inject_path: would_inject.display().to_string(),
            path_exists,
            import_error: result.as_ref().err().map(|err| err.to_string()),
            bug_reproduced,
            explanation,
        };
        let message = serde_json::to_string_pretty(&payload)?;
        Ok(HookResponse::with_message(message))
    }
}

#[derive(Debug, Serialize)]
struct FallthroughPayload {
    bug_demo: &'static str,
    started_from: String,
    walked_up_to: String,
    fell_through_to_root: bool,
    would_inject_path: String,
    path_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    import_error: Option<String>,
    bug_reproduced: bool,
    explanation: &'static str,
}
