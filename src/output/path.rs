//! Output directory layout and filename hygiene.
//!
//! All artifacts for a run live under `<output_dir>/<year>/`, where the year
//! comes from the start of the requested date range. Participant and call
//! titles flow into filenames, so everything passes through
//! [`safe_filename`] first.

use std::path::{Path, PathBuf};

use super::{OutputError, OutputResult};
use crate::Call;

/// Maximum filename length after sanitization.
const MAX_FILENAME_LEN: usize = 200;

/// Characters that are unsafe in filenames on at least one supported platform.
const UNSAFE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace unsafe filename characters with `_` and cap the length.
pub fn safe_filename(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect();
    if safe.len() > MAX_FILENAME_LEN {
        // Truncate on a char boundary.
        let mut cut = MAX_FILENAME_LEN;
        while !safe.is_char_boundary(cut) {
            cut -= 1;
        }
        safe.truncate(cut);
    }
    safe
}

/// Base filename (no extension) for a call's formatted transcript.
pub fn transcript_filename(call: &Call) -> String {
    safe_filename(&format!("transcript_{}_{}", call.id, call.date()))
}

/// Resolves artifact paths under the year-scoped output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Create a layout rooted at `<base_dir>/<year>`.
    pub fn new<P: AsRef<Path>>(base_dir: P, year: i32) -> Self {
        Self {
            root: base_dir.as_ref().join(year.to_string()),
        }
    }

    /// The year-scoped root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the fixed directory tree.
    pub fn ensure(&self) -> OutputResult<()> {
        for dir in [
            self.root.clone(),
            self.raw_json_dir(),
            self.transcripts_dir(),
            self.by_date_root(),
            self.by_participant_root(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                OutputError::IoError(format!("failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    /// Directory holding per-call raw JSON artifacts.
    pub fn raw_json_dir(&self) -> PathBuf {
        self.root.join("raw_json")
    }

    /// Directory holding formatted text transcripts.
    pub fn transcripts_dir(&self) -> PathBuf {
        self.root.join("transcripts")
    }

    /// Root of the per-date transcript tree.
    pub fn by_date_root(&self) -> PathBuf {
        self.root.join("by_date")
    }

    /// Per-date transcript directory for a `YYYY-MM-DD` date string.
    pub fn by_date_dir(&self, date: &str) -> PathBuf {
        self.by_date_root().join(safe_filename(date))
    }

    /// Root of the per-participant transcript tree.
    pub fn by_participant_root(&self) -> PathBuf {
        self.root.join("by_participant")
    }

    /// Per-participant transcript directory.
    pub fn by_participant_dir(&self, participant_name: &str) -> PathBuf {
        self.by_participant_root()
            .join(safe_filename(participant_name))
    }

    /// Raw JSON artifact path for one call.
    pub fn call_artifact_path(&self, call_id: &str) -> PathBuf {
        self.raw_json_dir()
            .join(safe_filename(&format!("call_{call_id}.json")))
    }

    /// Consolidated dump of all calls and transcripts.
    pub fn consolidated_path(&self) -> PathBuf {
        self.raw_json_dir().join("all_data.json")
    }

    /// Per-call metadata table.
    pub fn metadata_csv_path(&self) -> PathBuf {
        self.root.join("calls_metadata.csv")
    }

    /// Participant profiles table.
    pub fn participants_csv_path(&self) -> PathBuf {
        self.root.join("participants.csv")
    }

    /// Participant corpus statistics.
    pub fn participant_summary_csv_path(&self) -> PathBuf {
        self.root.join("participant_summary.csv")
    }

    /// Call corpus statistics.
    pub fn summary_statistics_csv_path(&self) -> PathBuf {
        self.root.join("summary_statistics.csv")
    }

    /// Progress snapshot location for resume.
    pub fn progress_path(&self) -> PathBuf {
        self.root.join("download_progress.json")
    }
}
