//! Best-effort forensic logging.
//!
//! Probes narrate what they saw before and after acting so a defect
//! report can quote the sequence of events. The sink is a capability
//! handed to each probe rather than a file the probe opens itself, which
//! keeps probes testable and keeps logging from ever becoming
//! load-bearing: every implementation swallows its own failures.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use crate::registry;

/// Name of the forensic log file, kept beside the plugin registry.
pub const LOG_FILE_NAME: &str = "hookprobe.log";

/// Timestamp format for log lines.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// The default log destination (`~/.claude/plugins/hookprobe.log`).
pub fn default_log_path() -> Option<PathBuf> {
    registry::user_plugins_dir().map(|dir| dir.join(LOG_FILE_NAME))
}

/// Sink for forensic log lines.
pub trait ProbeLog {
    /// Append one message. Implementations must swallow failures.
    fn record(&self, message: &str);
}

/// Append-only file sink.
///
/// A file that cannot be opened degrades the sink to a no-op instead of
/// failing construction; a probe keeps working without its log. Each
/// line is prefixed with a UTC timestamp.
pub struct FileProbeLog {
    file: Option<Mutex<File>>,
}

impl FileProbeLog {
    /// Open `path` for appending.
    pub fn open(path: &Path) -> Self {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
            .map(Mutex::new);
        if file.is_none() {
            tracing::debug!(path = %path.display(), "forensic log unavailable");
        }
        Self { file }
    }

    /// Whether the sink actually has a file behind it.
    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }
}

impl ProbeLog for FileProbeLog {
    fn record(&self, message: &str) {
        let Some(file) = &self.file else {
            return;
        };
        let line = format!("{} {}\n", Utc::now().format(TIMESTAMP_FORMAT), message);
        if let Ok(mut file) = file.lock() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }
}

/// Sink that discards everything.
pub struct NullProbeLog;

impl ProbeLog for NullProbeLog {
    fn record(&self, _message: &str) {}
}

/// Sink that keeps messages in memory, for tests and embedders.
///
/// Messages are stored without the timestamp prefix so assertions can
/// match on content alone.
#[derive(Debug, Default)]
pub struct RecordingProbeLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingProbeLog {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    /// Whether any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl ProbeLog for RecordingProbeLog {
    fn record(&self, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }
}
