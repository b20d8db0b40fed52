//! CLI definition for the hookprobe command-line interface.
//!
//! One subcommand per probe, matching the probe's registered name, plus
//! the human-facing `resolve` lookup. Global flags cover the context
//! snapshot and the forensic log; everything else a probe needs arrives
//! on stdin.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Hookprobe - plugin import diagnostics
///
/// Claude Code hook probes that diagnose whether plugin imports share
/// process state across hook invocations.
#[derive(Parser, Debug)]
#[command(name = "hookprobe")]
#[command(version)]
#[command(about = "Diagnostic probes for plugin import failures in Claude Code hooks")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Context snapshot file shared between invocations (defaults to
    /// $HOOKPROBE_STATE when set; no snapshot otherwise)
    #[arg(long, global = true, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Forensic log file (default: ~/.claude/plugins/hookprobe.log)
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Disable the forensic log
    #[arg(long, global = true)]
    pub no_log: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Gate the tool call on a registry-resolved plugin import (PreToolUse)
    ImportGuard {
        /// Registry file to resolve against (default: the per-user registry)
        #[arg(long, value_name = "FILE")]
        registry: Option<PathBuf>,
    },
    /// Run the walk-up and registry bootstraps side by side (PreToolUse)
    ImportCompare {
        /// Registry file to resolve against (default: the per-user registry)
        #[arg(long, value_name = "FILE")]
        registry: Option<PathBuf>,
        /// Directory to start the walk-up from (default: invocation cwd)
        #[arg(long, value_name = "DIR")]
        start_dir: Option<PathBuf>,
    },
    /// Demonstrate the silent walk-up fallthrough to the filesystem root (PreToolUse)
    WalkupFallthrough {
        /// Directory to start the walk-up from
        #[arg(long, value_name = "DIR")]
        start_dir: Option<PathBuf>,
    },
    /// Demonstrate stale package pinning across search path edits (PreToolUse)
    ShadowPackage {
        /// Prepared shadow root holding the incomplete package copy
        #[arg(long, value_name = "DIR", requires = "real_root")]
        shadow_root: Option<PathBuf>,
        /// Prepared real root holding the complete package copy
        #[arg(long, value_name = "DIR", requires = "shadow_root")]
        real_root: Option<PathBuf>,
    },
    /// Report modules left in the cache by a prior invocation (PostToolUse)
    StaleModules {
        /// Namespace to watch
        #[arg(long, default_value = "lib", value_name = "NAME")]
        module: String,
    },
    /// Resolve a plugin id through the registry and print the install path
    Resolve {
        /// Plugin identifier (name@marketplace)
        plugin_id: String,
        /// Registry file to resolve against (default: the per-user registry)
        #[arg(long, value_name = "FILE")]
        registry: Option<PathBuf>,
    },
}
