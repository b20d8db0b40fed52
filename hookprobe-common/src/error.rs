//! Error types for the hookprobe crates.
//!
//! The split matters more than the variants: `ResolveError` and
//! `ImportError` are the expected failure class (the phenomena the probes
//! exist to observe and narrate), while anything that reaches the probe
//! driver as a `ProbeError` is unexpected and gets converted into a
//! permissive continue response so a probe can never block the host.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ProbeError.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Main error type for probe execution.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// IO error during stdin/stdout or filesystem operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Registry resolution failure a probe chose not to classify itself.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Context snapshot could not be read or written.
    #[error("context snapshot error at '{path}': {message}")]
    Snapshot {
        /// The snapshot file involved.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Probe fixture could not be prepared.
    #[error("fixture error: {0}")]
    Fixture(String),
}

impl ProbeError {
    /// Create a Snapshot error.
    pub fn snapshot(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Snapshot {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Failures while resolving a plugin identifier through the install registry.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The registry file does not exist at its expected location.
    #[error("plugin registry not found: {path}")]
    RegistryNotFound {
        /// Where the registry was expected.
        path: PathBuf,
    },

    /// The registry file exists but could not be read or parsed.
    #[error("plugin registry at '{path}' is unreadable: {message}")]
    RegistryMalformed {
        /// The registry file involved.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The identifier has no usable entry in the registry.
    #[error("plugin not installed: {plugin_id}")]
    PluginNotRegistered {
        /// The identifier that was looked up.
        plugin_id: String,
        /// A few identifiers the registry does know, for the report.
        known: Vec<String>,
    },
}

/// Failures while importing a module through a resolution context.
#[derive(Debug, Error)]
pub enum ImportError {
    /// No search path entry supplies the module.
    #[error("no module named '{module}' (searched {} entries)", .searched.len())]
    ModuleNotFound {
        /// The name that could not be found.
        module: String,
        /// The search path entries consulted, in order.
        searched: Vec<PathBuf>,
    },

    /// The owning package exists but lacks the requested submodule.
    #[error("no module named '{module}': package '{package}' at '{package_dir}' has no submodule '{missing}'")]
    SubmoduleNotFound {
        /// The full dotted name that was requested.
        module: String,
        /// The package that owned the lookup.
        package: String,
        /// The segment that was missing.
        missing: String,
        /// The directory that was searched, and only that directory.
        package_dir: PathBuf,
    },

    /// A dotted name descends through something that is not a package.
    #[error("no module named '{module}': '{parent}' is not a package")]
    NotAPackage {
        /// The full dotted name that was requested.
        module: String,
        /// The plain module the name tried to descend through.
        parent: String,
    },

    /// The resolved plugin payload directory does not exist.
    #[error("plugin path does not exist: {path}")]
    PayloadMissing {
        /// The payload directory that was resolved.
        path: PathBuf,
    },
}

/// A plugin identifier string was not in `name@marketplace` form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid plugin id '{0}': expected name@marketplace")]
pub struct ParsePluginIdError(pub String);
