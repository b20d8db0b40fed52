//! Probe execution plumbing shared by every probe subcommand.
//!
//! Reads one hook invocation from stdin, loads the shared resolution
//! context (when a snapshot file is configured), drives the probe, writes
//! the snapshot back, and prints the response envelope. Probe subcommands
//! always exit 0; a diagnostic must never fail the hook that invoked it.

use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use hookprobe_common::forensics::{self, FileProbeLog, NullProbeLog, ProbeLog};
use hookprobe_common::probe::{drive, Probe};
use hookprobe_common::ResolutionContext;

/// Environment variable naming the context snapshot file.
pub const STATE_ENV: &str = "HOOKPROBE_STATE";

/// Wiring shared by every probe subcommand.
pub struct RunOptions {
    /// Context snapshot file, when invocations should share state.
    pub state_file: Option<PathBuf>,
    /// Forensic log destination override.
    pub log_file: Option<PathBuf>,
    /// Disable the forensic log.
    pub no_log: bool,
}

impl RunOptions {
    /// The snapshot file to use: the explicit flag, else `$HOOKPROBE_STATE`.
    fn state_file(&self) -> Option<PathBuf> {
        self.state_file
            .clone()
            .or_else(|| std::env::var_os(STATE_ENV).map(PathBuf::from))
    }

    /// The forensic sink: the explicit flag, else the per-user default,
    /// else nothing.
    fn log(&self) -> Box<dyn ProbeLog> {
        if self.no_log {
            return Box::new(NullProbeLog);
        }
        match self.log_file.clone().or_else(forensics::default_log_path) {
            Some(path) => Box::new(FileProbeLog::open(&path)),
            None => Box::new(NullProbeLog),
        }
    }
}

/// Run `probe` over stdin and print the response envelope.
pub fn run_probe(probe: &dyn Probe, options: &RunOptions) -> i32 {
    if io::stdin().is_terminal() {
        eprintln!(
            "{}: expects a hook invocation JSON object on stdin",
            probe.name()
        );
        return 0;
    }

    let mut raw = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut raw) {
        tracing::error!("stdin read failed: {}", e);
        return 0;
    }
    tracing::debug!(probe = probe.name(), "input: {}", raw.trim());

    let state_file = options.state_file();
    let mut ctx = load_context(state_file.as_deref());
    let log = options.log();

    let reply = drive(probe, &raw, &mut ctx, log.as_ref());

    if let Some(path) = &state_file {
        if let Err(e) = ctx.save(path) {
            tracing::warn!("could not persist context snapshot: {}", e);
        }
    }

    if let Some(response) = reply.response() {
        match serde_json::to_string(response) {
            Ok(json) => {
                let mut stdout = io::stdout();
                let _ = stdout.write_all(json.as_bytes());
                let _ = stdout.write_all(b"\n");
            }
            Err(e) => tracing::error!("could not serialize response: {}", e),
        }
    }
    0
}

/// Load the shared context, or start fresh when there is no snapshot or
/// the snapshot is unusable. A corrupt snapshot must not take the probe
/// down with it.
fn load_context(path: Option<&Path>) -> ResolutionContext {
    let Some(path) = path else {
        return ResolutionContext::new();
    };
    match ResolutionContext::load_or_new(path) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::warn!("unusable context snapshot, starting fresh: {}", e);
            ResolutionContext::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_load_context_without_snapshot_is_fresh() {
        let ctx = load_context(None);
        assert!(ctx.modules().is_empty());
        assert!(!ctx.is_foreign());
    }

    #[test]
    fn test_load_context_roundtrips_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let saved = ResolutionContext::new();
        saved.save(&path).unwrap();

        let loaded = load_context(Some(&path));
        assert_eq!(loaded.context_id(), saved.context_id());
    }

    #[test]
    fn test_load_context_survives_garbage_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{broken").unwrap();

        let ctx = load_context(Some(&path));
        assert!(ctx.modules().is_empty());
    }

    #[test]
    #[serial]
    fn test_state_file_flag_beats_environment() {
        std::env::set_var(STATE_ENV, "/tmp/from-env.json");
        let options = RunOptions {
            state_file: Some(PathBuf::from("/tmp/from-flag.json")),
            log_file: None,
            no_log: false,
        };
        assert_eq!(
            options.state_file(),
            Some(PathBuf::from("/tmp/from-flag.json"))
        );
        std::env::remove_var(STATE_ENV);
    }

    #[test]
    #[serial]
    fn test_state_file_falls_back_to_environment() {
        std::env::set_var(STATE_ENV, "/tmp/from-env.json");
        let options = RunOptions {
            state_file: None,
            log_file: None,
            no_log: false,
        };
        assert_eq!(
            options.state_file(),
            Some(PathBuf::from("/tmp/from-env.json"))
        );

        std::env::remove_var(STATE_ENV);
        assert_eq!(options.state_file(), None);
    }
}
