//! PreToolUse probe: run both bootstrap strategies side by side.
//!
//! One invocation, two resolutions of the same plugin: the legacy
//! marker walk-up from the current directory, and the registry lookup.
//! Each side gets its own scoped import attempt, and the response is a
//! pretty-printed comparison a human can paste into a defect report.
//! Nothing here denies; the point is the contrast.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::context::{ResolutionContext, SearchPriority};
use crate::error::{ProbeError, ResolveError};
use crate::forensics::ProbeLog;
use crate::host::{HookEvent, HookInvocation, HookResponse};
use crate::loader::{self, OutcomeClass};
use crate::probe::{probe_plugin_id, Probe, PAYLOAD_DIR, TARGET_MODULE};
use crate::registry::{self, PluginId};
use crate::walkup;

const COMPARISON_TEST: &str = "walk-up vs registry bootstrap comparison";

const SUMMARY: &str = "Walk-up succeeds only when a .claude-plugin marker sits in an ancestor \
     of the start directory; with no marker it silently falls through to the filesystem root \
     (see the walkup-fallthrough probe). Registry-based bootstrap is deterministic regardless \
     of where the process runs.";

/// The strategy comparison probe.
pub struct BootstrapCompareProbe {
    registry_path: Option<PathBuf>,
    start_dir: Option<PathBuf>,
    plugin_id: PluginId,
    target_module: String,
}

impl BootstrapCompareProbe {
    /// Compare the default plugin, walking up from the invocation cwd and
    /// resolving through the per-user registry.
    pub fn new() -> Self {
        Self {
            registry_path: None,
            start_dir: None,
            plugin_id: probe_plugin_id(),
            target_module: TARGET_MODULE.to_string(),
        }
    }

    /// Resolve against a specific registry file.
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    /// Start the walk-up somewhere other than the invocation cwd.
    pub fn with_start_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(dir.into());
        self
    }

    fn walkup_attempt(
        &self,
        start: &Path,
        ctx: &mut ResolutionContext,
        log: &dyn ProbeLog,
    ) -> WalkUpReport {
        let pid = std::process::id();
        let outcome = walkup::find_plugin_root(start);
        let legacy = outcome.legacy_root().to_path_buf();

        if outcome.fell_through() {
            let would_inject = legacy.join(PAYLOAD_DIR);
            log.record(&format!(
                "IMPORT-COMPARE pid={pid} walk-up fell through to {}",
                legacy.display()
            ));
            return WalkUpReport {
                method: "walk-up",
                started_from: start.display().to_string(),
                plugin_root: legacy.display().to_string(),
                fell_through_to_root: true,
                import_succeeded: false,
                outcome: OutcomeClass::ExpectedFailure,
                module_file: None,
                error: Some(format!(
                    "walk-up fell through to the filesystem root; would inject {} into the \
                     search path",
                    would_inject.display()
                )),
            };
        }

        let payload_dir = legacy.join(PAYLOAD_DIR);
        // The legacy bootstrap never checked whether the payload exists
        // before putting it on the path; neither does this side.
        let result = ctx.with_scoped_entry(&payload_dir, SearchPriority::Front, |ctx| {
            loader::import_module(ctx, &self.target_module)
        });
        log.record(&format!(
            "IMPORT-COMPARE pid={pid} walk-up root={} import_ok={}",
            legacy.display(),
            result.is_ok()
        ));

        WalkUpReport {
            method: "walk-up",
            started_from: start.display().to_string(),
            plugin_root: legacy.display().to_string(),
            fell_through_to_root: false,
            import_succeeded: result.is_ok(),
            outcome: OutcomeClass::of_import(&result),
            module_file: result
                .as_ref()
                .ok()
                .map(|import| import.module.file.display().to_string()),
            error: result.as_ref().err().map(|err| err.to_string()),
        }
    }

    fn registry_attempt(
        &self,
        ctx: &mut ResolutionContext,
        log: &dyn ProbeLog,
    ) -> Result<RegistryReport, ProbeError> {
        let pid = std::process::id();
        let Some(registry_path) = self
            .registry_path
            .clone()
            .or_else(registry::user_registry_path)
        else {
            return Ok(RegistryReport {
                method: "registry",
                install_path: None,
                import_succeeded: false,
                outcome: OutcomeClass::ExpectedFailure,
                module_file: None,
                error: Some("cannot locate the plugin registry: no home directory".to_string()),
                available_plugins: None,
                note: None,
            });
        };

        match registry::resolve_install_path(&registry_path, &self.plugin_id) {
            Ok(install) => {
                let payload_dir = install.join(PAYLOAD_DIR);
                let result = loader::import_from_payload(ctx, &payload_dir, &self.target_module);
                log.record(&format!(
                    "IMPORT-COMPARE pid={pid} registry install={} import_ok={}",
                    install.display(),
                    result.is_ok()
                ));
                Ok(RegistryReport {
                    method: "registry",
                    install_path: Some(install.display().to_string()),
                    import_succeeded: result.is_ok(),
                    outcome: OutcomeClass::of_import(&result),
                    module_file: result
                        .as_ref()
                        .ok()
                        .map(|import| import.module.file.display().to_string()),
                    error: result.as_ref().err().map(|err| err.to_string()),
                    available_plugins: None,
                    note: None,
                })
            }
            Err(err) => match err {
                ResolveError::RegistryNotFound { .. } => {
                    log.record(&format!("IMPORT-COMPARE pid={pid} registry: {err}"));
                    Ok(RegistryReport {
                        method: "registry",
                        install_path: None,
                        import_succeeded: false,
                        outcome: OutcomeClass::ExpectedFailure,
                        module_file: None,
                        error: Some(err.to_string()),
                        available_plugins: None,
                        note: Some(
                            "expected when the plugin-import-error marketplace is not installed"
                                .to_string(),
                        ),
                    })
                }
                ResolveError::PluginNotRegistered { ref known, .. } => {
                    log.record(&format!("IMPORT-COMPARE pid={pid} registry: {err}"));
                    Ok(RegistryReport {
                        method: "registry",
                        install_path: None,
                        import_succeeded: false,
                        outcome: OutcomeClass::ExpectedFailure,
                        module_file: None,
                        available_plugins: Some(known.clone()),
                        error: Some(err.to_string()),
                        note: Some("install the plugin to exercise this path".to_string()),
                    })
                }
                ResolveError::RegistryMalformed { .. } => Err(err.into()),
            },
        }
    }
}

impl Default for BootstrapCompareProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for BootstrapCompareProbe {
    fn name(&self) -> &'static str {
        "import-compare"
    }

    fn hook_event(&self) -> HookEvent {
        HookEvent::PreToolUse
    }

    fn run(
        &self,
        invocation: &HookInvocation,
        ctx: &mut ResolutionContext,
        log: &dyn ProbeLog,
    ) -> Result<HookResponse, ProbeError> {
        let pid = std::process::id();
        log.record(&format!(
            "IMPORT-COMPARE pid={} cache[{}]={}",
            pid,
            self.target_module,
            ctx.modules().contains(&self.target_module)
        ));

        let start = self
            .start_dir
            .clone()
            .or_else(|| invocation.cwd.as_ref().map(PathBuf::from))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("/"));

        let walkup = self.walkup_attempt(&start, ctx, log);
        let registry = self.registry_attempt(ctx, log)?;

        let payload = ComparePayload {
            test: COMPARISON_TEST,
            walkup,
            registry,
            summary: SUMMARY,
        };
        let message = serde_json::to_string_pretty(&payload)?;
        Ok(HookResponse::with_message(message))
    }
}

#[derive(Debug, Serialize)]
struct ComparePayload {
    test: &'static str,
    walkup: WalkUpReport,
    registry: RegistryReport,
    summary: &'static str,
}

#[derive(Debug, Serialize)]
struct WalkUpReport {
    method: &'static str,
    started_from: String,
    plugin_root: String,
    fell_through_to_root: bool,
    import_succeeded: bool,
    outcome: OutcomeClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    module_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegistryReport {
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    install_path: Option<String>,
    import_succeeded: bool,
    outcome: OutcomeClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    module_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_plugins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}
