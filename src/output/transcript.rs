//! Formatted text transcripts and their on-disk organization.
//!
//! Each transcript is rendered once into a plain-text document with a
//! header block and `[MM:SS] speaker: text` lines, then written to the flat
//! `transcripts/` directory, the per-date tree, and the per-participant
//! tree.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

use super::path::{transcript_filename, OutputLayout};
use super::{OutputError, OutputResult};
use crate::{Call, Transcript};

const RULE_HEAVY: &str =
    "================================================================================";
const RULE_LIGHT: &str =
    "--------------------------------------------------------------------------------";

/// Render a transcript into a readable text document.
pub fn format_transcript(call: &Call, transcript: &Transcript) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(RULE_HEAVY.to_string());
    lines.push("CALL TRANSCRIPT".to_string());
    lines.push(RULE_HEAVY.to_string());
    lines.push(format!("Call ID: {}", call.id));
    lines.push(format!("Date: {}", call.date()));
    lines.push(format!("Time: {}", call.time()));
    lines.push(format!("Duration: {} minutes", call.duration_minutes()));
    lines.push(format!(
        "Title: {}",
        call.title.as_deref().unwrap_or("N/A")
    ));
    lines.push(format!(
        "Direction: {}",
        call.direction.as_deref().unwrap_or("N/A")
    ));

    let participants = call.participant_names();
    if !participants.is_empty() {
        lines.push(format!("Participants: {}", participants.join(", ")));
    }

    lines.push(RULE_LIGHT.to_string());
    lines.push(String::new());

    if transcript.entries.is_empty() {
        lines.push("No transcript available for this call.".to_string());
    } else {
        for entry in &transcript.entries {
            let speaker = entry.speaker_id.as_deref().unwrap_or("Unknown Speaker");
            for sentence in &entry.sentences {
                let timestamp = format_offset(sentence.start);
                match entry.topic.as_deref().filter(|t| !t.is_empty()) {
                    Some(topic) => {
                        lines.push(format!("{timestamp} {speaker} ({topic}): {}", sentence.text))
                    }
                    None => lines.push(format!("{timestamp} {speaker}: {}", sentence.text)),
                }
            }
        }
    }

    lines.push(String::new());
    lines.push(RULE_HEAVY.to_string());

    lines.join("\n")
}

/// Millisecond offset rendered as `[MM:SS]`.
fn format_offset(offset_ms: i64) -> String {
    let offset_ms = offset_ms.max(0);
    let minutes = offset_ms / 60_000;
    let seconds = (offset_ms % 60_000) / 1_000;
    format!("[{minutes:02}:{seconds:02}]")
}

/// Write a formatted transcript to `transcripts/` and the per-date tree.
pub fn save_formatted_transcript(
    layout: &OutputLayout,
    call: &Call,
    transcript: &Transcript,
) -> OutputResult<()> {
    let formatted = format_transcript(call, transcript);
    let filename = format!("{}.txt", transcript_filename(call));

    write_text(&layout.transcripts_dir().join(&filename), &formatted)?;

    let date_dir = layout.by_date_dir(&call.date());
    std::fs::create_dir_all(&date_dir)
        .map_err(|e| OutputError::IoError(format!("failed to create date directory: {e}")))?;
    write_text(&date_dir.join(&filename), &formatted)?;

    Ok(())
}

/// One participant's slice of the transcript corpus.
struct ParticipantCalls {
    name: String,
    email: String,
    context: String,
    calls: Vec<(String, String, String, String)>, // (call_id, date, filename, formatted)
}

/// Write per-participant transcript folders plus a summary file each.
///
/// Returns the number of participants organized.
pub fn organize_by_participant(
    layout: &OutputLayout,
    calls: &[Call],
    transcripts: &HashMap<String, Transcript>,
) -> OutputResult<usize> {
    let mut grouped: BTreeMap<String, ParticipantCalls> = BTreeMap::new();

    for call in calls {
        let Some(transcript) = transcripts.get(&call.id) else {
            continue;
        };
        let formatted = format_transcript(call, transcript);
        let filename = transcript_filename(call);

        for party in &call.parties {
            let entry = grouped
                .entry(party.profile_key())
                .or_insert_with(|| ParticipantCalls {
                    name: party.display_name().to_string(),
                    email: party.email_address.clone().unwrap_or_default(),
                    context: party.context.to_string(),
                    calls: Vec::new(),
                });
            entry.calls.push((
                call.id.clone(),
                call.date(),
                filename.clone(),
                formatted.clone(),
            ));
        }
    }

    for participant in grouped.values() {
        let dir = layout.by_participant_dir(&participant.name);
        std::fs::create_dir_all(&dir).map_err(|e| {
            OutputError::IoError(format!("failed to create participant directory: {e}"))
        })?;

        for (_, _, filename, formatted) in &participant.calls {
            write_text(&dir.join(format!("{filename}.txt")), formatted)?;
        }

        write_text(
            &dir.join("participant_summary.txt"),
            &participant_summary(participant),
        )?;
    }

    info!(
        participants = grouped.len(),
        "organized transcripts by participant"
    );
    Ok(grouped.len())
}

fn participant_summary(participant: &ParticipantCalls) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(RULE_HEAVY.to_string());
    lines.push("PARTICIPANT SUMMARY".to_string());
    lines.push(RULE_HEAVY.to_string());
    lines.push(format!("Name: {}", participant.name));
    lines.push(format!("Email: {}", participant.email));
    lines.push(format!("Context: {}", participant.context));
    lines.push(format!("Total Calls: {}", participant.calls.len()));
    lines.push(String::new());
    lines.push("Call History:".to_string());
    lines.push("----------------------------------------".to_string());
    for (call_id, date, _, _) in &participant.calls {
        lines.push(format!("  {date} - Call ID: {call_id}"));
    }
    lines.push(String::new());
    lines.push(RULE_HEAVY.to_string());
    lines.join("\n")
}

fn write_text(path: &Path, contents: &str) -> OutputResult<()> {
    std::fs::write(path, contents)
        .map_err(|e| OutputError::IoError(format!("failed to write {}: {e}", path.display())))
}
