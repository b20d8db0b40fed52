//! PreToolUse probe: gate the tool call on plugin import health.
//!
//! The fixed bootstrap runs before the tool call: resolve the plugin
//! through the install registry, put its payload on the search path for
//! one import attempt, and decide. A healthy import allows the call; any
//! resolution or import failure denies it with the forensic narrative a
//! defect report needs. A malformed registry is nobody's expected state
//! and bubbles out for the driver's permissive fallback instead.

use std::path::PathBuf;

use crate::context::ResolutionContext;
use crate::error::{ProbeError, ResolveError};
use crate::forensics::ProbeLog;
use crate::host::{HookEvent, HookInvocation, HookResponse, PermissionDecision};
use crate::loader;
use crate::probe::{
    probe_plugin_id, watches_skill, Probe, PAYLOAD_DIR, TARGET_MODULE, TRACKING_ISSUE,
};
use crate::registry::{self, PluginId};

/// The registry-bootstrap gate.
pub struct ImportGuardProbe {
    registry_path: Option<PathBuf>,
    plugin_id: PluginId,
    target_module: String,
}

impl ImportGuardProbe {
    /// Gate on the default plugin and target module, resolving through
    /// the per-user registry.
    pub fn new() -> Self {
        Self {
            registry_path: None,
            plugin_id: probe_plugin_id(),
            target_module: TARGET_MODULE.to_string(),
        }
    }

    /// Resolve against a specific registry file.
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    /// Gate a different plugin.
    pub fn with_plugin_id(mut self, id: PluginId) -> Self {
        self.plugin_id = id;
        self
    }

    /// Attempt a different target module.
    pub fn with_target_module(mut self, module: impl Into<String>) -> Self {
        self.target_module = module.into();
        self
    }
}

impl Default for ImportGuardProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for ImportGuardProbe {
    fn name(&self) -> &'static str {
        "import-guard"
    }

    fn hook_event(&self) -> HookEvent {
        HookEvent::PreToolUse
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
        let prior_cached = ctx.modules().contains(&self.target_module);
        log.record(&format!(
            "IMPORT-GUARD pid={} plugin={} cache[{}]={}",
            pid, self.plugin_id, self.target_module, prior_cached
        ));

        let Some(registry_path) = self
            .registry_path
            .clone()
            .or_else(registry::user_registry_path)
        else {
            log.record(&format!("IMPORT-GUARD pid={pid} deny: no home directory"));
            return Ok(HookResponse::pre_tool_use(
                PermissionDecision::Deny,
                format!("cannot locate the plugin registry: no home directory (pid={pid})"),
            ));
        };

        let install = match registry::resolve_install_path(&registry_path, &self.plugin_id) {
            Ok(install) => install,
            Err(err) => {
                return match err {
                    ResolveError::RegistryNotFound { .. } => {
                        log.record(&format!("IMPORT-GUARD pid={pid} deny: {err}"));
                        Ok(HookResponse::pre_tool_use(
                            PermissionDecision::Deny,
                            format!(
                                "plugin bootstrap failed before the tool call (pid={pid}): \
                                 {err}. The registry resolver does not guess when the \
                                 registry is absent; install the plugin first."
                            ),
                        ))
                    }
                    ResolveError::PluginNotRegistered { ref known, .. } => {
                        let known_list = if known.is_empty() {
                            "(none)".to_string()
                        } else {
                            known.join(", ")
                        };
                        log.record(&format!("IMPORT-GUARD pid={pid} deny: {err}"));
                        Ok(HookResponse::pre_tool_use(
                            PermissionDecision::Deny,
                            format!(
                                "plugin bootstrap failed before the tool call (pid={pid}): \
                                 {err}. Registered plugins: {known_list}."
                            ),
                        ))
                    }
                    ResolveError::RegistryMalformed { .. } => Err(err.into()),
                };
            }
        };

        let payload_dir = install.join(PAYLOAD_DIR);
        match loader::import_from_payload(ctx, &payload_dir, &self.target_module) {
            Ok(import) => {
                let freshness = if import.fresh {
                    "fresh load".to_string()
                } else {
                    format!(
                        "already cached before this invocation, loaded by pid {}",
                        import.module.loaded_by
                    )
                };
                log.record(&format!(
                    "IMPORT-GUARD pid={pid} allow: {} fresh={}",
                    self.target_module, import.fresh
                ));
                Ok(HookResponse::pre_tool_use(
                    PermissionDecision::Allow,
                    format!(
                        "plugin '{}' importable: {} resolved to {} ({freshness})",
                        self.plugin_id,
                        self.target_module,
                        import.module.file.display(),
                    ),
                ))
            }
            Err(err) => {
                log.record(&format!("IMPORT-GUARD pid={pid} deny: {err}"));
                Ok(HookResponse::pre_tool_use(
                    PermissionDecision::Deny,
                    format!(
                        "plugin import failed before the tool call (pid={pid}): {err}. \
                         Install path {} came from the registry; cache[{}] before the \
                         attempt was {prior_cached}. See: {TRACKING_ISSUE}",
                        install.display(),
                        self.target_module,
                    ),
                ))
            }
        }
    }
}
