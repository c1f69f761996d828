//! Progress snapshot persistence.
//!
//! The snapshot is the resumable unit of work: discovered calls plus the set
//! of call IDs whose transcripts are already on disk. It lives for the
//! duration of one run and is deleted once the run completes successfully.
//!
//! Loading is infallible from the caller's perspective: a missing or
//! corrupt snapshot degrades to an empty one (logged), so a bad checkpoint
//! can never wedge the pipeline. Saving is fatal on failure, since silently
//! skipping a checkpoint would defeat the resume guarantee. Writes go
//! through a temp file and atomic rename so a crash mid-save leaves the
//! previous snapshot intact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::Call;

use super::SnapshotError;

/// Snapshot schema version, bumped on breaking layout changes.
const SCHEMA_VERSION: &str = "1.0.0";

/// Durable checkpoint of discovery and fetch progress.
///
/// Invariant: `fetched_ids` is a subset of the discovered call IDs. The
/// in-memory representation is a genuine set; it serializes as a JSON array
/// at the storage boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressSnapshot {
    schema_version: String,
    created_at: i64,
    updated_at: i64,
    discovered_calls: Vec<Call>,
    fetched_ids: BTreeSet<String>,
}

impl ProgressSnapshot {
    /// Create an empty snapshot.
    pub fn empty() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            discovered_calls: Vec::new(),
            fetched_ids: BTreeSet::new(),
        }
    }

    /// Whether discovery has produced any calls yet.
    pub fn has_discovered(&self) -> bool {
        !self.discovered_calls.is_empty()
    }

    /// Discovered calls, in discovery order.
    pub fn discovered_calls(&self) -> &[Call] {
        &self.discovered_calls
    }

    /// IDs whose transcripts have been fetched and persisted.
    pub fn fetched_ids(&self) -> &BTreeSet<String> {
        &self.fetched_ids
    }

    /// Replace the discovered call set; drops any fetched IDs that no longer
    /// correspond to a discovered call.
    pub fn set_discovered(&mut self, calls: Vec<Call>) {
        self.discovered_calls = calls;
        self.prune_strays();
        self.touch();
    }

    /// Record call IDs as fetched.
    pub fn record_fetched<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.fetched_ids.extend(ids);
        self.touch();
    }

    /// Discovered call IDs with no fetched transcript yet, in discovery order.
    pub fn missing_ids(&self) -> Vec<String> {
        self.discovered_calls
            .iter()
            .filter(|c| !self.fetched_ids.contains(&c.id))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Re-establish the subset invariant after deserialization or a
    /// discovery replacement.
    fn prune_strays(&mut self) {
        let discovered: BTreeSet<&str> =
            self.discovered_calls.iter().map(|c| c.id.as_str()).collect();
        let before = self.fetched_ids.len();
        self.fetched_ids.retain(|id| discovered.contains(id.as_str()));
        let dropped = before - self.fetched_ids.len();
        if dropped > 0 {
            warn!(dropped, "dropped fetched IDs not present in discovery");
        }
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Reads, writes, and clears the snapshot file for one run.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store over the given snapshot path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted snapshot, degrading to an empty one on any error.
    ///
    /// A missing file means a fresh run; a corrupt file is logged and
    /// treated the same way rather than failing the pipeline.
    pub fn load(&self) -> ProgressSnapshot {
        if !self.path.exists() {
            debug!("no snapshot found, starting fresh");
            return ProgressSnapshot::empty();
        }

        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read snapshot, starting fresh");
                return ProgressSnapshot::empty();
            }
        };

        match serde_json::from_str::<ProgressSnapshot>(&contents) {
            Ok(mut snapshot) => {
                if snapshot.schema_version != SCHEMA_VERSION {
                    warn!(
                        found = %snapshot.schema_version,
                        expected = SCHEMA_VERSION,
                        "snapshot schema version mismatch, starting fresh"
                    );
                    return ProgressSnapshot::empty();
                }
                snapshot.prune_strays();
                info!(
                    discovered = snapshot.discovered_calls.len(),
                    fetched = snapshot.fetched_ids.len(),
                    "loaded progress snapshot"
                );
                snapshot
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt snapshot, starting fresh");
                ProgressSnapshot::empty()
            }
        }
    }

    /// Persist the snapshot atomically (temp file + rename + fsync).
    pub fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| SnapshotError::SerializationError(e.to_string()))?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SnapshotError::IoError(e.to_string()))?;
                parent
            }
            _ => Path::new("."),
        };

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| SnapshotError::IoError(format!("failed to create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| SnapshotError::IoError(format!("failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| SnapshotError::IoError(format!("failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| SnapshotError::IoError(format!("failed to sync temp file: {e}")))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| SnapshotError::IoError(format!("failed to persist snapshot: {e}")))?;

        // Fsync the directory so the rename itself is durable.
        if let Ok(dir) = std::fs::File::open(parent) {
            let _ = dir.sync_all();
        }

        debug!(
            path = %self.path.display(),
            discovered = snapshot.discovered_calls.len(),
            fetched = snapshot.fetched_ids.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Delete the snapshot file after a fully successful run.
    pub fn clear(&self) {
        if self.path.exists() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => info!("removed snapshot after successful run"),
                Err(e) => warn!(error = %e, "failed to remove snapshot"),
            }
        }
    }
}
