//! PreToolUse probe: demonstrate stale package pinning.
//!
//! Two roots carry the same package name. The shadow root's copy lacks
//! the submodule; the real root's copy has it. With the shadow ahead on
//! the search path a deep import fails, and because the failed attempt
//! still cached the owning package, removing the shadow root afterwards
//! changes nothing. Only purging the namespace from the module cache
//! lets the real root win. Three attempts, narrated in order.

use std::path::{Path, PathBuf};

use serde::Serialize;
use ulid::Ulid;

use crate::context::{ResolutionContext, SearchPriority};
use crate::error::{ImportError, ProbeError};
use crate::forensics::ProbeLog;
use crate::host::{HookEvent, HookInvocation, HookResponse};
use crate::loader::{self, Import};
use crate::probe::Probe;

const NAMESPACE: &str = "lib";
const SUBMODULE: &str = "config_cache";

const STEP_SHADOWED: &str = "import with the shadow root ahead of the real root";
const STEP_PATH_EDITED: &str = "import again after removing the shadow root from the search path";
const STEP_PURGED: &str = "import again after purging the namespace from the module cache";

const EXPLAIN_SHADOWED: &str = "the shadow root's package wins the search and has no such submodule";
const EXPLAIN_PATH_EDITED: &str = "the failed attempt cached the owning package, and that entry still pins the shadow \
     directory; editing the search path cannot reach past it";
const EXPLAIN_PURGED: &str = "with the pinned entry gone, resolution restarts from the live search path and finds \
     the real package";

const SUMMARY: &str = "A failed deep import still caches the owning package. From then on the cache, not \
     the search path, decides where that namespace resolves, until the namespace is \
     purged.";

/// The package shadowing demonstration probe.
pub struct ShadowPackageProbe {
    shadow_root: Option<PathBuf>,
    real_root: Option<PathBuf>,
}

impl ShadowPackageProbe {
    /// Demonstrate against a self-seeded fixture in a scratch directory,
    /// removed again after the run.
    pub fn new() -> Self {
        Self {
            shadow_root: None,
            real_root: None,
        }
    }

    /// Demonstrate against prepared roots instead of a scratch fixture.
    pub fn with_roots(shadow_root: impl Into<PathBuf>, real_root: impl Into<PathBuf>) -> Self {
        Self {
            shadow_root: Some(shadow_root.into()),
            real_root: Some(real_root.into()),
        }
    }
}

impl Default for ShadowPackageProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for ShadowPackageProbe {
    fn name(&self) -> &'static str {
        "shadow-package"
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
        let target = format!("{NAMESPACE}.{SUBMODULE}");

        let scratch;
        let (shadow_root, real_root) = match (self.shadow_root.clone(), self.real_root.clone()) {
            (Some(shadow), Some(real)) => {
                scratch = None;
                (shadow, real)
            }
            _ => {
                let dir = std::env::temp_dir().join(format!("hookprobe-shadow-{}", Ulid::new()));
                let roots = seed_fixture(&dir)?;
                scratch = Some(dir);
                roots
            }
        };

        log.record(&format!(
            "SHADOW-PACKAGE pid={pid} shadow={} real={}",
            shadow_root.display(),
            real_root.display()
        ));

        // The probe owns this namespace for the duration of the run.
        let prior = ctx.modules_mut().purge_namespace(NAMESPACE);
        if !prior.is_empty() {
            log.record(&format!(
                "SHADOW-PACKAGE pid={pid} purged prior cache entries: [{}]",
                prior.join(", ")
            ));
        }

        let inserted_real = ctx
            .search_path_mut()
            .insert(&real_root, SearchPriority::Back);
        ctx.search_path_mut()
            .insert(&shadow_root, SearchPriority::Front);

        let first = loader::import_module(ctx, &target);
        ctx.search_path_mut().remove(&shadow_root);
        let second = loader::import_module(ctx, &target);
        let purged = ctx.modules_mut().purge_namespace(NAMESPACE);
        let third = loader::import_module(ctx, &target);

        log.record(&format!(
            "SHADOW-PACKAGE pid={pid} shadowed_ok={} pinned_ok={} purged=[{}] final_ok={}",
            first.is_ok(),
            second.is_ok(),
            purged.join(", "),
            third.is_ok()
        ));

        let pin_demonstrated = first.is_err() && second.is_err() && third.is_ok();
        let payload = ShadowPayload {
            bug_demo: "stale package pinning survives search path edits",
            shadow_root: shadow_root.display().to_string(),
            real_root: real_root.display().to_string(),
            target,
            attempts: vec![
                attempt(STEP_SHADOWED, EXPLAIN_SHADOWED, &first),
                attempt(STEP_PATH_EDITED, EXPLAIN_PATH_EDITED, &second),
                attempt(STEP_PURGED, EXPLAIN_PURGED, &third),
            ],
            pin_demonstrated,
            summary: SUMMARY,
        };

        // Leave no fixture paths behind in the shared context.
        ctx.modules_mut().purge_namespace(NAMESPACE);
        if inserted_real {
            ctx.search_path_mut().remove(&real_root);
        }
        if let Some(scratch) = scratch {
            let _ = std::fs::remove_dir_all(&scratch);
        }

        let message = serde_json::to_string_pretty(&payload)?;
        Ok(HookResponse::with_message(message))
    }
}

/// Build the two-root fixture under `scratch`: a shadow copy of the
/// package with no submodule, and a real copy with it.
fn seed_fixture(scratch: &Path) -> Result<(PathBuf, PathBuf), ProbeError> {
    let shadow_root = scratch.join("shadow_root");
    let real_root = scratch.join("real_root");
    let build = || -> std::io::Result<()> {
        let shadow_pkg = shadow_root.join(NAMESPACE);
        std::fs::create_dir_all(&shadow_pkg)?;
        std::fs::write(shadow_pkg.join("__init__.py"), "")?;

        let real_pkg = real_root.join(NAMESPACE);
        std::fs::create_dir_all(&real_pkg)?;
        std::fs::write(real_pkg.join("__init__.py"), "")?;
        std::fs::write(
            real_pkg.join(format!("{SUBMODULE}.py")),
            "FAVORITE_COLOR = \"blue\"\n",
        )?;
        Ok(())
    };
    build().map_err(|e| {
        ProbeError::Fixture(format!(
            "shadow fixture under '{}': {e}",
            scratch.display()
        ))
    })?;
    Ok((shadow_root, real_root))
}

fn attempt(
    step: &'static str,
    explanation: &'static str,
    result: &Result<Import, ImportError>,
) -> ShadowAttempt {
    ShadowAttempt {
        step,
        succeeded: result.is_ok(),
        resolved_file: result
            .as_ref()
            .ok()
            .map(|import| import.module.file.display().to_string()),
        error: result.as_ref().err().map(|err| err.to_string()),
        explanation,
    }
}

#[derive(Debug, Serialize)]
struct ShadowPayload {
    bug_demo: &'static str,
    shadow_root: String,
    real_root: String,
    target: String,
    attempts: Vec<ShadowAttempt>,
    pin_demonstrated: bool,
    summary: &'static str,
}

#[derive(Debug, Serialize)]
struct ShadowAttempt {
    step: &'static str,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    explanation: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::context::LoadedModule;
    use crate::forensics::RecordingProbeLog;

    fn prepare_roots(base: &Path) -> (PathBuf, PathBuf) {
        seed_fixture(base).unwrap()
    }

    fn message_payload(response: &HookResponse) -> serde_json::Value {
        serde_json::from_str(response.message.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn test_demonstrates_pin_with_prepared_roots() {
        let dir = TempDir::new().unwrap();
        let (shadow, real) = prepare_roots(dir.path());

        let probe = ShadowPackageProbe::with_roots(&shadow, &real);
        let mut ctx = ResolutionContext::new();
        let log = RecordingProbeLog::new();

        let response = probe.run(&HookInvocation::default(), &mut ctx, &log).unwrap();
        let payload = message_payload(&response);

        assert_eq!(payload["pin_demonstrated"], true);
        let attempts = payload["attempts"].as_array().unwrap();
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0]["succeeded"], false);
        assert!(attempts[0]["error"]
            .as_str()
            .unwrap()
            .contains("has no submodule 'config_cache'"));
        assert_eq!(attempts[1]["succeeded"], false);
        assert_eq!(attempts[2]["succeeded"], true);
        assert!(attempts[2]["resolved_file"]
            .as_str()
            .unwrap()
            .starts_with(&real.display().to_string()));
    }

    #[test]
    fn test_pinned_attempt_blames_the_shadow_directory() {
        let dir = TempDir::new().unwrap();
        let (shadow, real) = prepare_roots(dir.path());

        let probe = ShadowPackageProbe::with_roots(&shadow, &real);
        let mut ctx = ResolutionContext::new();
        let log = RecordingProbeLog::new();

        let response = probe.run(&HookInvocation::default(), &mut ctx, &log).unwrap();
        let payload = message_payload(&response);

        // The second failure names the shadow package dir even though the
        // shadow root is no longer on the search path.
        let pinned_error = payload["attempts"][1]["error"].as_str().unwrap();
        assert!(pinned_error.contains(&shadow.join(NAMESPACE).display().to_string()));
    }

    #[test]
    fn test_context_is_left_clean() {
        let dir = TempDir::new().unwrap();
        let (shadow, real) = prepare_roots(dir.path());

        let probe = ShadowPackageProbe::with_roots(&shadow, &real);
        let mut ctx = ResolutionContext::new();
        let log = RecordingProbeLog::new();

        probe.run(&HookInvocation::default(), &mut ctx, &log).unwrap();

        assert!(ctx.search_path().is_empty());
        assert!(ctx.modules().names_under(NAMESPACE).is_empty());
    }

    #[test]
    fn test_preexisting_namespace_is_purged_first() {
        let dir = TempDir::new().unwrap();
        let (shadow, real) = prepare_roots(dir.path());

        let probe = ShadowPackageProbe::with_roots(&shadow, &real);
        let mut ctx = ResolutionContext::new();
        ctx.modules_mut().insert(LoadedModule {
            name: NAMESPACE.to_string(),
            file: dir.path().join("elsewhere/lib/__init__.py"),
            package_dir: Some(dir.path().join("elsewhere/lib")),
            search_root: dir.path().join("elsewhere"),
            loaded_by: 1,
        });
        let log = RecordingProbeLog::new();

        let response = probe.run(&HookInvocation::default(), &mut ctx, &log).unwrap();
        let payload = message_payload(&response);

        // A leftover cache entry for the namespace must not rescue the
        // shadowed attempt.
        assert_eq!(payload["attempts"][0]["succeeded"], false);
        assert_eq!(payload["pin_demonstrated"], true);
        assert!(log.contains("purged prior cache entries"));
    }

    #[test]
    fn test_self_seeded_scratch_is_removed() {
        let probe = ShadowPackageProbe::new();
        let mut ctx = ResolutionContext::new();
        let log = RecordingProbeLog::new();

        let response = probe.run(&HookInvocation::default(), &mut ctx, &log).unwrap();
        let payload = message_payload(&response);

        assert_eq!(payload["pin_demonstrated"], true);
        let shadow_root = PathBuf::from(payload["shadow_root"].as_str().unwrap());
        assert!(!shadow_root.exists());
        assert!(ctx.search_path().is_empty());
    }

    #[test]
    fn test_applies_to_everything() {
        let probe = ShadowPackageProbe::new();
        assert!(probe.applies_to(&HookInvocation::default()));
        assert_eq!(probe.hook_event(), HookEvent::PreToolUse);
    }
}
