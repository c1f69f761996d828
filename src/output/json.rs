//! Raw JSON artifacts.
//!
//! Every call gets a `raw_json/call_<id>.json` artifact holding its metadata
//! and transcript together. Besides serving as the archival format, these
//! artifacts are what a resumed run reads back to merge previously fetched
//! transcripts without re-downloading them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use super::path::OutputLayout;
use super::{OutputError, OutputResult};
use crate::{Call, DateRange, Transcript};

/// On-disk shape of a per-call artifact.
#[derive(Debug, Serialize, Deserialize)]
struct CallArtifact {
    call_metadata: Call,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transcript: Option<Transcript>,
}

/// Write one call's artifact.
pub fn save_call_artifact(
    layout: &OutputLayout,
    call: &Call,
    transcript: Option<&Transcript>,
) -> OutputResult<()> {
    let artifact = CallArtifact {
        call_metadata: call.clone(),
        transcript: transcript.cloned(),
    };
    let json = serde_json::to_string_pretty(&artifact)
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    write_text(&layout.call_artifact_path(&call.id), &json)
}

/// Consolidated dump of everything the run produced.
#[derive(Debug, Serialize)]
struct ConsolidatedDump<'a> {
    calls: &'a [Call],
    transcripts: &'a HashMap<String, Transcript>,
    download_info: DownloadInfo,
}

#[derive(Debug, Serialize)]
struct DownloadInfo {
    date_range: String,
    downloaded_at: String,
    total_calls: usize,
    total_transcripts: usize,
}

/// Write the consolidated `all_data.json` dump.
pub fn save_consolidated(
    layout: &OutputLayout,
    range: &DateRange,
    calls: &[Call],
    transcripts: &HashMap<String, Transcript>,
) -> OutputResult<()> {
    let dump = ConsolidatedDump {
        calls,
        transcripts,
        download_info: DownloadInfo {
            date_range: range.to_string(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            total_calls: calls.len(),
            total_transcripts: transcripts.len(),
        },
    };
    let json = serde_json::to_string_pretty(&dump)
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    write_text(&layout.consolidated_path(), &json)
}

/// Load transcripts previously written for the given call IDs.
///
/// Missing or unreadable artifacts are logged and skipped; a resumed run
/// should fetch what it cannot recover rather than fail.
pub fn load_existing_transcripts<'a, I>(
    layout: &OutputLayout,
    call_ids: I,
) -> HashMap<String, Transcript>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut transcripts = HashMap::new();

    for call_id in call_ids {
        let path = layout.call_artifact_path(call_id);
        if !path.exists() {
            continue;
        }
        match read_artifact(&path) {
            Ok(Some(transcript)) => {
                transcripts.insert(call_id.clone(), transcript);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "could not load existing transcript");
            }
        }
    }

    debug!(
        loaded = transcripts.len(),
        "loaded previously fetched transcripts"
    );
    transcripts
}

fn read_artifact(path: &Path) -> OutputResult<Option<Transcript>> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| OutputError::IoError(e.to_string()))?;
    let artifact: CallArtifact = serde_json::from_str(&contents)
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    Ok(artifact.transcript)
}

fn write_text(path: &Path, contents: &str) -> OutputResult<()> {
    std::fs::write(path, contents)
        .map_err(|e| OutputError::IoError(format!("failed to write {}: {e}", path.display())))
}
