//! PostToolUse probe: detect modules left behind by an earlier invocation.
//!
//! Runs after the tool call of a watched skill and inspects the module
//! cache it was handed. Anything already resident under the watched
//! namespace was put there before this probe did anything, so membership
//! alone is evidence of state shared across hook invocations. The probe
//! performs no import of its own; it only observes and narrates.

use crate::context::ResolutionContext;
use crate::error::ProbeError;
use crate::forensics::ProbeLog;
use crate::host::{HookEvent, HookInvocation, HookResponse};
use crate::probe::{watches_skill, Probe, TRACKING_ISSUE};

/// Namespace whose cache residue indicates cross-invocation sharing.
const DEFAULT_NAMESPACE: &str = "lib";

/// Submodule whose presence makes the leak unambiguous.
const CONFIG_CACHE_SUBMODULE: &str = "config_cache";

/// The stale-module detector.
pub struct StaleModuleProbe {
    namespace: String,
}

impl StaleModuleProbe {
    /// Watch the default `lib` namespace.
    pub fn new() -> Self {
        Self::watching(DEFAULT_NAMESPACE)
    }

    /// Watch a specific namespace.
    pub fn watching(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl Default for StaleModuleProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for StaleModuleProbe {
    fn name(&self) -> &'static str {
        "stale-modules"
    }

    fn hook_event(&self) -> HookEvent {
        HookEvent::PostToolUse
    }

    fn applies_to(&self, invocation: &HookInvocation) -> bool {
        watches_skill(invocation)
    }

    fn run(
        &self,
        _invocation: &HookInvocation,
        ctx: &mut ResolutionContext,
        log: &dyn ProbeLog,
    ) -> Result<HookResponse, ProbeError> {
        let pid = std::process::id();
        let submodule = format!("{}.{}", self.namespace, CONFIG_CACHE_SUBMODULE);

        log.record(&format!(
            "STALE-MODULES pid={} cache[{}]={} cache[{}]={}",
            pid,
            self.namespace,
            ctx.modules().contains(&self.namespace),
            submodule,
            ctx.modules().contains(&submodule),
        ));

        let resident = ctx.modules().names_under(&self.namespace);
        if resident.is_empty() {
            log.record(&format!(
                "STALE-MODULES pid={pid} clean: no stale modules (separate process)"
            ));
            return Ok(HookResponse::silent());
        }

        // Whatever is resident got there before this probe ran; the probe
        // itself never imports anything.
        let witness = resident
            .first()
            .and_then(|name| ctx.modules().get(name))
            .cloned();
        let origin = match &witness {
            Some(module) => {
                let package_dir = module
                    .package_dir
                    .as_ref()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string());
                format!(
                    "{} resolves to {} with package dir {}, loaded by pid {}",
                    module.name,
                    module.file.display(),
                    package_dir,
                    module.loaded_by,
                )
            }
            None => "(no cache entry readable)".to_string(),
        };

        let message = format!(
            "STALE MODULE DETECTED in PostToolUse (pid={pid}): [{}] already present in the \
             module cache from a prior hook invocation. {origin}. Context {} was created by \
             pid {}. This confirms state sharing across hook invocations of the same tool \
             call. See: {TRACKING_ISSUE}",
            resident.join(", "),
            ctx.context_id(),
            ctx.created_by(),
        );
        log.record(&format!(
            "STALE-MODULES pid={pid} STATE SHARING CONFIRMED: [{}]",
            resident.join(", ")
        ));

        Ok(HookResponse::post_tool_use_context(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use crate::context::LoadedModule;
    use crate::forensics::RecordingProbeLog;
    use crate::probe::drive;

    fn watched_invocation() -> HookInvocation {
        serde_json::from_str(
            r#"{
                "hook_event_name": "PostToolUse",
                "tool_name": "Skill",
                "tool_input": {"skill": "favorite-color"}
            }"#,
        )
        .unwrap()
    }

    fn leaked_module(name: &str, loaded_by: u32) -> LoadedModule {
        LoadedModule {
            name: name.to_string(),
            file: PathBuf::from("/plugins/base-plugin/python/lib/__init__.py"),
            package_dir: Some(PathBuf::from("/plugins/base-plugin/python/lib")),
            search_root: PathBuf::from("/plugins/base-plugin/python"),
            loaded_by,
        }
    }

    #[test]
    fn test_applies_only_to_watched_skills() {
        let probe = StaleModuleProbe::new();
        assert!(probe.applies_to(&watched_invocation()));

        let other: HookInvocation =
            serde_json::from_str(r#"{"tool_input": {"skill": "something-else"}}"#).unwrap();
        assert!(!probe.applies_to(&other));
        assert!(!probe.applies_to(&HookInvocation::default()));
    }

    #[test]
    fn test_clean_cache_stays_silent() {
        let probe = StaleModuleProbe::new();
        let mut ctx = ResolutionContext::new();
        let log = RecordingProbeLog::new();

        let response = probe.run(&watched_invocation(), &mut ctx, &log).unwrap();
        assert_eq!(response, HookResponse::silent());
        assert!(log.contains("clean: no stale modules"));
    }

    #[test]
    fn test_resident_namespace_is_reported() {
        let probe = StaleModuleProbe::new();
        let mut ctx = ResolutionContext::new();
        let foreign_pid = std::process::id().wrapping_add(1);
        ctx.modules_mut().insert(leaked_module("lib", foreign_pid));
        ctx.modules_mut()
            .insert(leaked_module("lib.config_cache", foreign_pid));
        let log = RecordingProbeLog::new();

        let response = probe.run(&watched_invocation(), &mut ctx, &log).unwrap();
        let context = response.additional_context().unwrap();
        assert!(context.contains("STALE MODULE DETECTED"));
        assert!(context.contains("lib, lib.config_cache"));
        assert!(context.contains(&format!("loaded by pid {foreign_pid}")));
        assert!(context.contains(TRACKING_ISSUE));
        assert!(!response.suppress_output);
        assert!(log.contains("STATE SHARING CONFIRMED"));
    }

    #[test]
    fn test_submodule_alone_still_detected() {
        let probe = StaleModuleProbe::new();
        let mut ctx = ResolutionContext::new();
        ctx.modules_mut()
            .insert(leaked_module("lib.config_cache", std::process::id()));
        let log = RecordingProbeLog::new();

        let response = probe.run(&watched_invocation(), &mut ctx, &log).unwrap();
        assert!(response
            .additional_context()
            .unwrap()
            .contains("lib.config_cache"));
    }

    #[test]
    fn test_sibling_namespaces_do_not_trigger() {
        let probe = StaleModuleProbe::new();
        let mut ctx = ResolutionContext::new();
        ctx.modules_mut()
            .insert(leaked_module("library", std::process::id()));
        let log = RecordingProbeLog::new();

        let response = probe.run(&watched_invocation(), &mut ctx, &log).unwrap();
        assert_eq!(response, HookResponse::silent());
    }

    #[test]
    fn test_custom_namespace() {
        let probe = StaleModuleProbe::watching("base_module");
        let mut ctx = ResolutionContext::new();
        ctx.modules_mut().insert(LoadedModule {
            name: "base_module".to_string(),
            file: PathBuf::from("/payload/base_module.py"),
            package_dir: None,
            search_root: PathBuf::from("/payload"),
            loaded_by: std::process::id(),
        });
        let log = RecordingProbeLog::new();

        let response = probe.run(&watched_invocation(), &mut ctx, &log).unwrap();
        assert!(response
            .additional_context()
            .unwrap()
            .contains("base_module"));
    }

    #[test]
    fn test_driven_end_to_end_with_filtering() {
        let probe = StaleModuleProbe::new();
        let mut ctx = ResolutionContext::new();
        let log = RecordingProbeLog::new();

        let filtered = drive(
            &probe,
            r#"{"tool_input": {"skill": "unrelated"}}"#,
            &mut ctx,
            &log,
        );
        assert_eq!(filtered.response(), Some(&HookResponse::silent()));
        // No probe body ran for the filtered invocation.
        assert!(log.lines().is_empty());
    }
}
