//! Artifact writers.
//!
//! A completed run produces, under `<output_dir>/<year>/`:
//!
//! - `raw_json/` - per-call JSON artifacts plus a consolidated dump
//! - `transcripts/` - formatted text transcripts
//! - `by_date/<YYYY-MM-DD>/` - the same transcripts grouped by call date
//! - `by_participant/<name>/` - transcripts grouped per participant
//! - `calls_metadata.csv`, `participants.csv`, `participant_summary.csv`,
//!   `summary_statistics.csv` - tabular views

pub mod csv;
pub mod json;
pub mod path;
pub mod transcript;

pub use path::{safe_filename, OutputLayout};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
