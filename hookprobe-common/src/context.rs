//! Explicit resolution context: the process state under diagnosis.
//!
//! A plugin-hosting runtime keeps one module search path and one module
//! cache per process. When the host runs two hook invocations in the same
//! process, both see the same state; when it isolates them, each starts
//! fresh. This module models that state as a value the caller constructs
//! and hands to every resolver and probe call, so sharing between
//! invocations is something a test can set up directly instead of
//! something only observable inside a live host.
//!
//! Contexts serialize to JSON. A snapshot file written by one invocation
//! and read by the next is how the CLI reproduces "same process" behavior
//! across genuinely separate processes; the pid stamps on the context and
//! on every cached module make the handover visible.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::ProbeError;

/// Insertion priority for search path entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPriority {
    /// Consulted before every existing entry.
    Front,
    /// Consulted after every existing entry.
    Back,
}

/// Ordered directories consulted first-match-wins during import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchPath {
    entries: Vec<PathBuf>,
}

impl SearchPath {
    /// Create an empty search path.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a search path from entries, front to back.
    pub fn from_entries(entries: Vec<PathBuf>) -> Self {
        Self { entries }
    }

    /// Insert `dir` at the given priority.
    ///
    /// Returns false and leaves the path untouched when the entry is
    /// already present, matching the runtime's de-duplicating insert.
    pub fn insert(&mut self, dir: impl Into<PathBuf>, priority: SearchPriority) -> bool {
        let dir = dir.into();
        if self.entries.contains(&dir) {
            return false;
        }
        match priority {
            SearchPriority::Front => self.entries.insert(0, dir),
            SearchPriority::Back => self.entries.push(dir),
        }
        true
    }

    /// Remove `dir`. Returns whether it was present.
    pub fn remove(&mut self, dir: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != dir);
        self.entries.len() != before
    }

    /// Whether `dir` is on the path.
    pub fn contains(&self, dir: &Path) -> bool {
        self.entries.iter().any(|entry| entry == dir)
    }

    /// The entries in consultation order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the path has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A module registered in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedModule {
    /// Dotted module name.
    pub name: String,

    /// Source file backing the module (the module file itself, or the
    /// package's init file).
    pub file: PathBuf,

    /// Package directory, for package modules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_dir: Option<PathBuf>,

    /// Search path entry that supplied the module.
    pub search_root: PathBuf,

    /// Pid of the process that performed the load.
    pub loaded_by: u32,
}

impl LoadedModule {
    /// Whether this entry is a package (owns submodule lookups).
    pub fn is_package(&self) -> bool {
        self.package_dir.is_some()
    }
}

/// Process-wide memo of already-loaded modules, keyed by dotted name.
///
/// Consulted before any search path lookup. Entries persist until purged,
/// which is what lets a package loaded during one invocation pin its
/// directory for every later import in the same context, even after the
/// search path entry that supplied it is gone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleCache {
    modules: BTreeMap<String, LoadedModule>,
}

fn in_namespace(name: &str, namespace: &str) -> bool {
    name == namespace
        || name
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('.'))
}

impl ModuleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Whether `name` is cached.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// The cached entry for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&LoadedModule> {
        self.modules.get(name)
    }

    /// Register `module` under its name, returning any entry it replaced.
    pub fn insert(&mut self, module: LoadedModule) -> Option<LoadedModule> {
        self.modules.insert(module.name.clone(), module)
    }

    /// Cached names equal to `namespace` or nested beneath it, in order.
    pub fn names_under(&self, namespace: &str) -> Vec<String> {
        self.modules
            .keys()
            .filter(|name| in_namespace(name, namespace))
            .cloned()
            .collect()
    }

    /// Remove `namespace` and everything beneath it, returning the names
    /// that were dropped.
    pub fn purge_namespace(&mut self, namespace: &str) -> Vec<String> {
        let doomed = self.names_under(namespace);
        for name in &doomed {
            self.modules.remove(name);
        }
        doomed
    }

    /// All cached names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Number of cached modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// The state one host process shares across everything it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionContext {
    /// Identity of this context, for telling two snapshots apart.
    context_id: Ulid,

    /// Pid of the process that created the context.
    created_by: u32,

    search_path: SearchPath,

    modules: ModuleCache,
}

impl ResolutionContext {
    /// Create a fresh, empty context owned by the current process.
    pub fn new() -> Self {
        Self {
            context_id: Ulid::new(),
            created_by: std::process::id(),
            search_path: SearchPath::new(),
            modules: ModuleCache::new(),
        }
    }

    /// The context identity.
    pub fn context_id(&self) -> Ulid {
        self.context_id
    }

    /// Pid of the creating process.
    pub fn created_by(&self) -> u32 {
        self.created_by
    }

    /// True when the context was created by a different process, the
    /// signature of state handed over from a prior invocation.
    pub fn is_foreign(&self) -> bool {
        self.created_by != std::process::id()
    }

    /// The search path.
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// The search path, mutably.
    pub fn search_path_mut(&mut self) -> &mut SearchPath {
        &mut self.search_path
    }

    /// The module cache.
    pub fn modules(&self) -> &ModuleCache {
        &self.modules
    }

    /// The module cache, mutably.
    pub fn modules_mut(&mut self) -> &mut ModuleCache {
        &mut self.modules
    }

    /// Run `f` with `dir` present on the search path, removing it
    /// afterwards unless it was already there.
    ///
    /// Removal happens on every exit path of `f`; cache entries created
    /// while the entry was live stay behind. That asymmetry is the point:
    /// it is how a short-lived path injection leaves a long-lived pin.
    pub fn with_scoped_entry<T>(
        &mut self,
        dir: &Path,
        priority: SearchPriority,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let inserted = self.search_path.insert(dir, priority);
        let result = f(self);
        if inserted {
            self.search_path.remove(dir);
        }
        result
    }

    /// Load a snapshot from `path`, or start fresh when no file exists.
    pub fn load_or_new(path: &Path) -> Result<Self, ProbeError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProbeError::snapshot(path, e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| ProbeError::snapshot(path, e.to_string()))
    }

    /// Write the snapshot to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ProbeError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ProbeError::snapshot(path, e.to_string()))?;
            }
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ProbeError::snapshot(path, e.to_string()))?;
        std::fs::write(path, contents).map_err(|e| ProbeError::snapshot(path, e.to_string()))
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn module(name: &str) -> LoadedModule {
        LoadedModule {
            name: name.to_string(),
            file: PathBuf::from(format!("/src/{}.py", name.replace('.', "/"))),
            package_dir: None,
            search_root: PathBuf::from("/src"),
            loaded_by: std::process::id(),
        }
    }

    #[test]
    fn test_search_path_front_and_back() {
        let mut path = SearchPath::new();
        assert!(path.insert("/b", SearchPriority::Back));
        assert!(path.insert("/a", SearchPriority::Front));
        assert!(path.insert("/c", SearchPriority::Back));

        let entries: Vec<_> = path.iter().collect();
        assert_eq!(
            entries,
            vec![Path::new("/a"), Path::new("/b"), Path::new("/c")]
        );
    }

    #[test]
    fn test_search_path_insert_deduplicates() {
        let mut path = SearchPath::new();
        assert!(path.insert("/a", SearchPriority::Front));
        assert!(!path.insert("/a", SearchPriority::Front));
        assert!(!path.insert("/a", SearchPriority::Back));
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_search_path_remove() {
        let mut path = SearchPath::new();
        path.insert("/a", SearchPriority::Back);
        assert!(path.remove(Path::new("/a")));
        assert!(!path.remove(Path::new("/a")));
        assert!(path.is_empty());
    }

    #[test]
    fn test_cache_names_under() {
        let mut cache = ModuleCache::new();
        cache.insert(module("lib"));
        cache.insert(module("lib.config_cache"));
        cache.insert(module("library"));
        cache.insert(module("other"));

        assert_eq!(cache.names_under("lib"), vec!["lib", "lib.config_cache"]);
        assert_eq!(cache.names_under("library"), vec!["library"]);
        assert!(cache.names_under("missing").is_empty());
    }

    #[test]
    fn test_cache_purge_namespace() {
        let mut cache = ModuleCache::new();
        cache.insert(module("lib"));
        cache.insert(module("lib.config_cache"));
        cache.insert(module("other"));

        let purged = cache.purge_namespace("lib");
        assert_eq!(purged, vec!["lib", "lib.config_cache"]);
        assert!(!cache.contains("lib"));
        assert!(cache.contains("other"));
    }

    #[test]
    fn test_fresh_context_is_not_foreign() {
        let ctx = ResolutionContext::new();
        assert!(!ctx.is_foreign());
        assert_eq!(ctx.created_by(), std::process::id());
    }

    #[test]
    fn test_scoped_entry_is_removed_after() {
        let mut ctx = ResolutionContext::new();
        let dir = Path::new("/payload/python");

        let seen = ctx.with_scoped_entry(dir, SearchPriority::Front, |ctx| {
            ctx.search_path().contains(dir)
        });
        assert!(seen);
        assert!(!ctx.search_path().contains(dir));
    }

    #[test]
    fn test_scoped_entry_leaves_preexisting_alone() {
        let mut ctx = ResolutionContext::new();
        let dir = Path::new("/payload/python");
        ctx.search_path_mut().insert(dir, SearchPriority::Back);

        ctx.with_scoped_entry(dir, SearchPriority::Front, |_| ());
        assert!(ctx.search_path().contains(dir));
        assert_eq!(ctx.search_path().len(), 1);
    }

    #[test]
    fn test_cache_survives_scoped_entry() {
        let mut ctx = ResolutionContext::new();
        let dir = Path::new("/payload/python");
        ctx.with_scoped_entry(dir, SearchPriority::Front, |ctx| {
            ctx.modules_mut().insert(module("lib"));
        });
        assert!(ctx.modules().contains("lib"));
        assert!(!ctx.search_path().contains(dir));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("context.json");

        let mut ctx = ResolutionContext::new();
        ctx.search_path_mut().insert("/src", SearchPriority::Back);
        ctx.modules_mut().insert(module("lib"));
        ctx.save(&path).unwrap();

        let loaded = ResolutionContext::load_or_new(&path).unwrap();
        assert_eq!(loaded, ctx);
        assert!(loaded.modules().contains("lib"));
    }

    #[test]
    fn test_load_or_new_without_file_is_fresh() {
        let dir = TempDir::new().unwrap();
        let ctx = ResolutionContext::load_or_new(&dir.path().join("absent.json")).unwrap();
        assert!(ctx.modules().is_empty());
        assert!(ctx.search_path().is_empty());
    }

    #[test]
    fn test_load_or_new_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("context.json");
        std::fs::write(&path, "{broken").unwrap();
        let err = ResolutionContext::load_or_new(&path).unwrap_err();
        assert!(matches!(err, ProbeError::Snapshot { .. }));
    }

    #[test]
    fn test_snapshot_uses_camel_case_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("context.json");
        let mut ctx = ResolutionContext::new();
        ctx.modules_mut().insert(module("lib"));
        ctx.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"contextId\""));
        assert!(written.contains("\"createdBy\""));
        assert!(written.contains("\"searchRoot\""));
        assert!(written.contains("\"loadedBy\""));
    }
}
