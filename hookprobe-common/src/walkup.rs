//! Marker-based plugin root discovery, the legacy resolution strategy.
//!
//! The legacy bootstrap located its plugin root by walking from the hook
//! file's directory toward the filesystem root, looking for a
//! `.claude-plugin` marker. The walk here returns an explicit outcome, so
//! exhausting the ancestor chain can never be mistaken for finding a
//! root. The original silent fall-through survives only as the
//! [`WalkUpOutcome::legacy_root`] view, which the demonstration probes
//! use deliberately to show what it breaks.

use std::path::{Path, PathBuf};

/// Marker entry whose presence designates a plugin root.
pub const PLUGIN_MARKER: &str = ".claude-plugin";

/// Result of an ascent search for a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkUpOutcome {
    /// The marker exists at an ancestor `hops` levels above the start
    /// (zero means the start directory itself).
    Found {
        /// The directory carrying the marker.
        root: PathBuf,
        /// Ancestor steps taken to reach it.
        hops: usize,
    },
    /// No directory in the ancestor chain carries the marker.
    NotFound {
        /// Where the walk ran out of parents (the filesystem root for
        /// absolute starts).
        stopped_at: PathBuf,
    },
}

impl WalkUpOutcome {
    /// The discovered plugin root, if any.
    pub fn root(&self) -> Option<&Path> {
        match self {
            WalkUpOutcome::Found { root, .. } => Some(root),
            WalkUpOutcome::NotFound { .. } => None,
        }
    }

    /// True when the walk exhausted the ancestor chain without a match.
    pub fn fell_through(&self) -> bool {
        matches!(self, WalkUpOutcome::NotFound { .. })
    }

    /// The directory the legacy resolver would have used: the marker
    /// directory on success, otherwise wherever the walk stopped.
    ///
    /// Joining payload subdirectories against the fall-through value is
    /// exactly the legacy defect: it produces paths like `/python` that
    /// exist nowhere on disk.
    pub fn legacy_root(&self) -> &Path {
        match self {
            WalkUpOutcome::Found { root, .. } => root,
            WalkUpOutcome::NotFound { stopped_at } => stopped_at,
        }
    }
}

/// Search upward from `start` for a directory containing `marker`.
///
/// The walk is lexical: `start` does not need to exist, and nonexistent
/// ancestors simply never match. It terminates after at most the depth of
/// `start` steps.
pub fn find_marker_root(start: &Path, marker: &str) -> WalkUpOutcome {
    let mut dir = start;
    let mut hops = 0usize;
    loop {
        if dir.join(marker).exists() {
            return WalkUpOutcome::Found {
                root: dir.to_path_buf(),
                hops,
            };
        }
        match dir.parent() {
            Some(parent) => {
                dir = parent;
                hops += 1;
            }
            None => {
                return WalkUpOutcome::NotFound {
                    stopped_at: dir.to_path_buf(),
                }
            }
        }
    }
}

/// Search upward from `start` for the plugin marker.
pub fn find_plugin_root(start: &Path) -> WalkUpOutcome {
    find_marker_root(start, PLUGIN_MARKER)
}
