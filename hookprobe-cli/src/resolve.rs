//! The `resolve` subcommand: a registry lookup without a probe around it.
//!
//! Human-facing, so unlike the probe subcommands it exits 1 on failure
//! and prints the error to stderr.

use std::path::PathBuf;

use hookprobe_common::registry::{self, PluginId};

/// Resolve `plugin_id` through the registry and print the result as JSON.
pub fn run_resolve(plugin_id: &str, registry_path: Option<PathBuf>) -> i32 {
    match resolve(plugin_id, registry_path) {
        Ok(report) => {
            println!("{}", report);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn resolve(plugin_id: &str, registry_path: Option<PathBuf>) -> Result<String, String> {
    let id: PluginId = plugin_id.parse().map_err(|e| format!("{}", e))?;
    let registry_path = registry_path
        .or_else(registry::user_registry_path)
        .ok_or_else(|| "cannot locate the plugin registry: no home directory".to_string())?;
    let install =
        registry::resolve_install_path(&registry_path, &id).map_err(|e| format!("{}", e))?;

    let report = serde_json::json!({
        "pluginId": id.as_str(),
        "installPath": install,
        "registry": registry_path,
    });
    serde_json::to_string_pretty(&report).map_err(|e| format!("{}", e))
}
