//! Hookprobe CLI - diagnostic probes for plugin import failures.
//!
//! Commands:
//! - `hookprobe import-guard`: PreToolUse gate on a registry-resolved import
//! - `hookprobe import-compare`: walk-up vs registry bootstrap, side by side
//! - `hookprobe walkup-fallthrough`: demonstrate the silent fallthrough
//! - `hookprobe shadow-package`: demonstrate stale package pinning
//! - `hookprobe stale-modules`: PostToolUse report of cache state left by a
//!   prior invocation
//! - `hookprobe resolve <id>`: registry lookup, human-facing
//!
//! Probe subcommands read one hook invocation JSON object from stdin,
//! write one response object to stdout, and always exit 0; a probe must
//! never fail the hook that invoked it. `resolve` exits 1 on failure.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hookprobe::probe::{
    BootstrapCompareProbe, ImportGuardProbe, ShadowPackageProbe, StaleModuleProbe,
    WalkUpFallthroughProbe,
};
use hookprobe::runtime::{run_probe, RunOptions};
use hookprobe::{resolve, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level
    let filter = if cli.debug {
        EnvFilter::new("hookprobe=debug,hookprobe_common=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = dispatch_command(cli);
    std::process::exit(exit_code);
}

/// Dispatch a parsed CLI to the appropriate command handler.
fn dispatch_command(cli: Cli) -> i32 {
    let options = RunOptions {
        state_file: cli.state_file,
        log_file: cli.log_file,
        no_log: cli.no_log,
    };
    match cli.command {
        Commands::ImportGuard { registry } => {
            let mut probe = ImportGuardProbe::new();
            if let Some(path) = registry {
                probe = probe.with_registry_path(path);
            }
            run_probe(&probe, &options)
        }
        Commands::ImportCompare {
            registry,
            start_dir,
        } => {
            let mut probe = BootstrapCompareProbe::new();
            if let Some(path) = registry {
                probe = probe.with_registry_path(path);
            }
            if let Some(dir) = start_dir {
                probe = probe.with_start_dir(dir);
            }
            run_probe(&probe, &options)
        }
        Commands::WalkupFallthrough { start_dir } => {
            let mut probe = WalkUpFallthroughProbe::new();
            if let Some(dir) = start_dir {
                probe = probe.with_start_dir(dir);
            }
            run_probe(&probe, &options)
        }
        Commands::ShadowPackage {
            shadow_root,
            real_root,
        } => {
            let probe = match (shadow_root, real_root) {
                (Some(shadow), Some(real)) => ShadowPackageProbe::with_roots(shadow, real),
                _ => ShadowPackageProbe::new(),
            };
            run_probe(&probe, &options)
        }
        Commands::StaleModules { module } => {
            run_probe(&StaleModuleProbe::watching(module), &options)
        }
        Commands::Resolve {
            plugin_id,
            registry,
        } => resolve::run_resolve(&plugin_id, registry),
    }
}
