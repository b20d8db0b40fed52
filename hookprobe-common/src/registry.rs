//! Installed-plugin registry access.
//!
//! The host's installer maintains `installed_plugins.json` under
//! `~/.claude/plugins/`, mapping each plugin identifier
//! (`name@marketplace`) to its installation records. This is the
//! deterministic source of truth the fixed bootstrap reads. Unlike a
//! best-effort cache, an absent registry is an error here: resolution must
//! never silently degrade into guessing from the filesystem.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParsePluginIdError, ResolveError};

/// Name of the registry file.
pub const REGISTRY_FILE_NAME: &str = "installed_plugins.json";

/// Directory under the user's home holding host configuration.
const CLAUDE_DIR: &str = ".claude";

/// Subdirectory holding plugin installs, the registry, and our log.
const PLUGINS_SUBDIR: &str = "plugins";

/// How many known identifiers a not-registered error carries.
const MAX_KNOWN_IN_ERROR: usize = 5;

/// The host's per-user plugin directory (`~/.claude/plugins`).
pub fn user_plugins_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CLAUDE_DIR).join(PLUGINS_SUBDIR))
}

/// The per-user registry path (`~/.claude/plugins/installed_plugins.json`).
pub fn user_registry_path() -> Option<PathBuf> {
    user_plugins_dir().map(|dir| dir.join(REGISTRY_FILE_NAME))
}

/// A plugin identifier in `name@marketplace` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    /// Build an identifier from its two halves. Callers supply non-empty
    /// halves; parse untrusted strings with `FromStr` instead.
    pub fn new(name: impl Into<String>, marketplace: impl Into<String>) -> Self {
        Self(format!("{}@{}", name.into(), marketplace.into()))
    }

    /// The full identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The plugin name (before the `@`).
    pub fn name(&self) -> &str {
        match self.0.split_once('@') {
            Some((name, _)) => name,
            None => &self.0,
        }
    }

    /// The marketplace the plugin was installed from (after the `@`).
    pub fn marketplace(&self) -> &str {
        match self.0.split_once('@') {
            Some((_, marketplace)) => marketplace,
            None => "",
        }
    }
}

impl FromStr for PluginId {
    type Err = ParsePluginIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('@') {
            Some((name, marketplace)) if !name.is_empty() && !marketplace.is_empty() => {
                Ok(Self(s.to_string()))
            }
            _ => Err(ParsePluginIdError(s.to_string())),
        }
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One installation of a plugin, as recorded by the host installer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallRecord {
    /// Absolute path of the installed payload.
    #[serde(rename = "installPath")]
    pub install_path: PathBuf,

    /// Installer-reported version, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The parsed plugin registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginRegistry {
    /// Plugin identifier to installation records, newest first.
    #[serde(default)]
    pub plugins: BTreeMap<String, Vec<InstallRecord>>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// Load the registry from `path`.
    ///
    /// An absent file is `RegistryNotFound`; an unreadable or unparsable
    /// file is `RegistryMalformed`. There is no empty-registry fallback.
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        if !path.exists() {
            return Err(ResolveError::RegistryNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents =
            std::fs::read_to_string(path).map_err(|e| ResolveError::RegistryMalformed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        serde_json::from_str(&contents).map_err(|e| ResolveError::RegistryMalformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save the registry to `path` (pretty-printed, for fixtures).
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to serialize {}: {}", REGISTRY_FILE_NAME, e),
            )
        })?;
        std::fs::write(path, contents)
    }

    /// Add an install record for `id`, newest first.
    pub fn add_install(&mut self, id: &PluginId, record: InstallRecord) {
        self.plugins
            .entry(id.as_str().to_string())
            .or_default()
            .insert(0, record);
    }

    /// Whether `id` has at least one usable install record.
    pub fn contains(&self, id: &PluginId) -> bool {
        self.plugins
            .get(id.as_str())
            .is_some_and(|records| !records.is_empty())
    }

    /// The first install path recorded for `id`.
    ///
    /// An entry with zero records resolves like a missing entry: there is
    /// nothing to bootstrap from either way.
    pub fn first_install_path(&self, id: &PluginId) -> Result<&Path, ResolveError> {
        match self
            .plugins
            .get(id.as_str())
            .and_then(|records| records.first())
        {
            Some(record) => Ok(&record.install_path),
            None => Err(ResolveError::PluginNotRegistered {
                plugin_id: id.to_string(),
                known: self.known_ids(),
            }),
        }
    }

    /// A few identifiers the registry does know, for error reports.
    fn known_ids(&self) -> Vec<String> {
        self.plugins
            .keys()
            .take(MAX_KNOWN_IN_ERROR)
            .cloned()
            .collect()
    }
}

/// Resolve `id` to its first install path via the registry at `registry_path`.
///
/// This is the whole fixed strategy: read the registry, look up the id,
/// take the newest record's path. No directory walking, no dependence on
/// where the calling process happens to live.
pub fn resolve_install_path(registry_path: &Path, id: &PluginId) -> Result<PathBuf, ResolveError> {
    let registry = PluginRegistry::load(registry_path)?;
    let path = registry.first_install_path(id)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn sample_registry_json() -> &'static str {
        r#"{
            "plugins": {
                "base-plugin@plugin-import-error": [
                    {"installPath": "/plugins/base-plugin", "version": "1.0.0"}
                ],
                "other-plugin@main": [
                    {"installPath": "/plugins/other-new"},
                    {"installPath": "/plugins/other-old"}
                ]
            }
        }"#
    }

    #[test]
    fn test_plugin_id_parse() {
        let id: PluginId = "base-plugin@plugin-import-error".parse().unwrap();
        assert_eq!(id.name(), "base-plugin");
        assert_eq!(id.marketplace(), "plugin-import-error");
        assert_eq!(id.to_string(), "base-plugin@plugin-import-error");
    }

    #[test]
    fn test_plugin_id_rejects_bad_forms() {
        assert!("no-marketplace".parse::<PluginId>().is_err());
        assert!("@market".parse::<PluginId>().is_err());
        assert!("name@".parse::<PluginId>().is_err());
        assert!("".parse::<PluginId>().is_err());
    }

    #[test]
    fn test_load_parses_install_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REGISTRY_FILE_NAME);
        std::fs::write(&path, sample_registry_json()).unwrap();

        let registry = PluginRegistry::load(&path).unwrap();
        let id: PluginId = "base-plugin@plugin-import-error".parse().unwrap();
        assert!(registry.contains(&id));
        let install = registry.first_install_path(&id).unwrap();
        assert_eq!(install, Path::new("/plugins/base-plugin"));
    }

    #[test]
    fn test_first_install_path_takes_newest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REGISTRY_FILE_NAME);
        std::fs::write(&path, sample_registry_json()).unwrap();

        let registry = PluginRegistry::load(&path).unwrap();
        let id: PluginId = "other-plugin@main".parse().unwrap();
        let install = registry.first_install_path(&id).unwrap();
        assert_eq!(install, Path::new("/plugins/other-new"));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REGISTRY_FILE_NAME);
        let err = PluginRegistry::load(&path).unwrap_err();
        assert!(matches!(err, ResolveError::RegistryNotFound { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REGISTRY_FILE_NAME);
        std::fs::write(&path, "{not valid json").unwrap();
        let err = PluginRegistry::load(&path).unwrap_err();
        assert!(matches!(err, ResolveError::RegistryMalformed { .. }));
    }

    #[test]
    fn test_unknown_plugin_reports_known_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REGISTRY_FILE_NAME);
        std::fs::write(&path, sample_registry_json()).unwrap();

        let registry = PluginRegistry::load(&path).unwrap();
        let id: PluginId = "missing@nowhere".parse().unwrap();
        match registry.first_install_path(&id) {
            Err(ResolveError::PluginNotRegistered { plugin_id, known }) => {
                assert_eq!(plugin_id, "missing@nowhere");
                assert_eq!(known.len(), 2);
                assert!(known.contains(&"base-plugin@plugin-import-error".to_string()));
            }
            other => panic!("expected PluginNotRegistered, got {other:?}"),
        }
    }

    #[test]
    fn test_known_ids_are_capped() {
        let mut registry = PluginRegistry::new();
        for i in 0..8 {
            let id: PluginId = format!("plugin-{i}@market").parse().unwrap();
            registry.add_install(
                &id,
                InstallRecord {
                    install_path: PathBuf::from(format!("/plugins/{i}")),
                    version: None,
                },
            );
        }
        let id: PluginId = "missing@nowhere".parse().unwrap();
        match registry.first_install_path(&id) {
            Err(ResolveError::PluginNotRegistered { known, .. }) => {
                assert_eq!(known.len(), MAX_KNOWN_IN_ERROR);
            }
            other => panic!("expected PluginNotRegistered, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_record_list_is_not_registered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REGISTRY_FILE_NAME);
        std::fs::write(&path, r#"{"plugins": {"hollow@market": []}}"#).unwrap();

        let registry = PluginRegistry::load(&path).unwrap();
        let id: PluginId = "hollow@market".parse().unwrap();
        assert!(!registry.contains(&id));
        assert!(matches!(
            registry.first_install_path(&id),
            Err(ResolveError::PluginNotRegistered { .. })
        ));
    }

    #[test]
    fn test_save_uses_camel_case_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REGISTRY_FILE_NAME);
        let mut registry = PluginRegistry::new();
        let id: PluginId = "base-plugin@plugin-import-error".parse().unwrap();
        registry.add_install(
            &id,
            InstallRecord {
                install_path: PathBuf::from("/plugins/base-plugin"),
                version: Some("1.0.0".to_string()),
            },
        );
        registry.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"installPath\""));
        assert!(!written.contains("install_path"));

        let reloaded = PluginRegistry::load(&path).unwrap();
        assert!(reloaded.contains(&id));
    }

    #[test]
    fn test_resolve_install_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REGISTRY_FILE_NAME);
        std::fs::write(&path, sample_registry_json()).unwrap();

        let id: PluginId = "base-plugin@plugin-import-error".parse().unwrap();
        let install = resolve_install_path(&path, &id).unwrap();
        assert_eq!(install, PathBuf::from("/plugins/base-plugin"));
    }

    #[test]
    fn test_user_registry_path_shape() {
        if let Some(path) = user_registry_path() {
            assert!(path.ends_with(".claude/plugins/installed_plugins.json"));
        }
    }
}
