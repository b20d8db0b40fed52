//! Hookprobe - plugin import diagnostics core library.
//!
//! This crate provides the resolution context under diagnosis, the two
//! plugin bootstrap strategies (marker walk-up and registry lookup), a
//! module import simulation over that context, and the probes that
//! narrate what they observe from inside Claude Code hook invocations.

pub mod context;
pub mod error;
pub mod forensics;
pub mod host;
pub mod loader;
pub mod probe;
pub mod registry;
pub mod walkup;

pub use context::{LoadedModule, ModuleCache, ResolutionContext, SearchPath, SearchPriority};
pub use error::{ImportError, ProbeError, ResolveError};
pub use forensics::{FileProbeLog, NullProbeLog, ProbeLog};
pub use host::{HookEvent, HookInvocation, HookResponse, PermissionDecision};
pub use probe::{drive, Probe, ProbeReply};
pub use registry::{PluginId, PluginRegistry};
