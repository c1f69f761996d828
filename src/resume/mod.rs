//! Resume capability for interrupted download runs.
//!
//! Progress is checkpointed to a single JSON snapshot file in the output
//! directory. The snapshot records which calls have been discovered and
//! which call IDs already have transcripts on disk, so a re-run after a
//! crash or Ctrl+C fetches only what is missing.
//!
//! Single-writer assumption: nothing locks the snapshot file. Running two
//! pipelines against the same output directory concurrently is unsupported
//! and can corrupt the snapshot.

pub mod snapshot;

pub use snapshot::{ProgressSnapshot, SnapshotStore};

/// Errors related to snapshot persistence
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}
