//! CSV output writers for call metadata and participant profiles.

use csv::Writer;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult};
use crate::profile::ParticipantProfile;
use crate::{Call, PartyContext, Transcript};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Joined-list separator used in multi-value CSV cells.
const LIST_SEPARATOR: &str = "; ";

/// CSV row for one call.
#[derive(Debug, Serialize)]
struct MetadataRecord {
    call_id: String,
    date: String,
    time: String,
    duration_minutes: i64,
    title: String,
    direction: String,
    has_transcript: bool,
    transcript_sentences: usize,
    meeting_url: String,
    all_participants: String,
    internal_participants: String,
    external_participants: String,
    participant_count: usize,
    internal_count: usize,
    external_count: usize,
}

impl MetadataRecord {
    fn new(call: &Call, transcript: Option<&Transcript>) -> Self {
        let all = call.participant_names();
        let internal = call.participant_names_in(PartyContext::Internal);
        let external = call.participant_names_in(PartyContext::External);

        Self {
            call_id: call.id.clone(),
            date: call.date(),
            time: call.time(),
            duration_minutes: call.duration_minutes(),
            title: call.title.clone().unwrap_or_default(),
            direction: call.direction.clone().unwrap_or_default(),
            has_transcript: transcript.is_some(),
            transcript_sentences: transcript.map(Transcript::sentence_count).unwrap_or(0),
            meeting_url: call.meeting_url.clone().unwrap_or_default(),
            participant_count: all.len(),
            internal_count: internal.len(),
            external_count: external.len(),
            all_participants: all.join(LIST_SEPARATOR),
            internal_participants: internal.join(LIST_SEPARATOR),
            external_participants: external.join(LIST_SEPARATOR),
        }
    }
}

/// Streaming CSV writer for call metadata rows.
pub struct CsvMetadataWriter {
    writer: Writer<BufWriter<File>>,
    calls_written: u64,
}

impl CsvMetadataWriter {
    /// Create a writer; headers are emitted on the first row.
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "creating metadata CSV writer");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("failed to create directory: {e}")))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("failed to create file: {e}")))?;
        let writer = Writer::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        Ok(Self {
            writer,
            calls_written: 0,
        })
    }

    /// Append one call row.
    pub fn write_call(
        &mut self,
        call: &Call,
        transcript: Option<&Transcript>,
    ) -> OutputResult<()> {
        self.writer
            .serialize(MetadataRecord::new(call, transcript))
            .map_err(|e| OutputError::CsvError(format!("failed to write call row: {e}")))?;
        self.calls_written += 1;
        Ok(())
    }

    /// Rows written so far.
    pub fn calls_written(&self) -> u64 {
        self.calls_written
    }

    /// Flush and finalize the file.
    pub fn close(mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::CsvError(format!("failed to flush: {e}")))
    }
}

/// Write the full metadata table for a run.
pub fn write_metadata_csv(
    path: &Path,
    calls: &[Call],
    transcripts: &HashMap<String, Transcript>,
) -> OutputResult<u64> {
    let mut writer = CsvMetadataWriter::new(path)?;
    for call in calls {
        writer.write_call(call, transcripts.get(&call.id))?;
    }
    let written = writer.calls_written();
    writer.close()?;
    info!(rows = written, path = %path.display(), "wrote call metadata CSV");
    Ok(written)
}

/// CSV row for one participant profile.
#[derive(Debug, Serialize)]
struct ParticipantRecord {
    participant_key: String,
    name: String,
    email: String,
    context: PartyContext,
    role: String,
    company: String,
    title: String,
    speaker_id: String,
    total_calls: u64,
    total_duration_minutes: i64,
    average_duration_minutes: f64,
    host_count: u64,
    organizer_count: u64,
    first_seen: String,
    last_seen: String,
    call_ids: String,
    call_dates: String,
}

impl ParticipantRecord {
    fn new(key: &str, profile: &ParticipantProfile) -> Self {
        Self {
            participant_key: key.to_string(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            context: profile.context,
            role: profile.role.clone(),
            company: profile.company.clone(),
            title: profile.title.clone(),
            speaker_id: profile.speaker_id.clone(),
            total_calls: profile.total_calls,
            total_duration_minutes: profile.total_duration_minutes,
            average_duration_minutes: profile.average_duration_minutes(),
            host_count: profile.host_count,
            organizer_count: profile.organizer_count,
            first_seen: profile.first_seen.clone(),
            last_seen: profile.last_seen.clone(),
            call_ids: profile.call_ids.join(LIST_SEPARATOR),
            call_dates: profile.call_dates.join(LIST_SEPARATOR),
        }
    }
}

/// Write the participant profile table.
pub fn write_participants_csv(
    path: &Path,
    profiles: &BTreeMap<String, ParticipantProfile>,
) -> OutputResult<u64> {
    let mut writer = csv_writer(path)?;
    let mut written = 0u64;
    for (key, profile) in profiles {
        writer
            .serialize(ParticipantRecord::new(key, profile))
            .map_err(|e| OutputError::CsvError(format!("failed to write participant row: {e}")))?;
        written += 1;
    }
    writer
        .flush()
        .map_err(|e| OutputError::CsvError(format!("failed to flush: {e}")))?;
    info!(rows = written, path = %path.display(), "wrote participants CSV");
    Ok(written)
}

/// Corpus-level call statistics, written as a single CSV row.
#[derive(Debug, Serialize, PartialEq)]
pub struct SummaryStats {
    /// Calls discovered in the range
    pub total_calls: usize,
    /// Calls with a fetched transcript
    pub calls_with_transcripts: usize,
    /// Earliest call date observed
    pub date_range_start: String,
    /// Latest call date observed
    pub date_range_end: String,
    /// Sum of call durations in minutes
    pub total_duration_minutes: i64,
    /// Mean call duration in minutes
    pub average_duration_minutes: f64,
    /// Distinct internal participant names
    pub unique_internal_participants: usize,
    /// Distinct external participant names
    pub unique_external_participants: usize,
}

impl SummaryStats {
    /// Compute stats over the discovered calls and fetched transcripts.
    pub fn from_calls(calls: &[Call], transcripts: &HashMap<String, Transcript>) -> Self {
        let mut internal: BTreeSet<String> = BTreeSet::new();
        let mut external: BTreeSet<String> = BTreeSet::new();
        let mut dates: Vec<String> = Vec::new();
        let mut total_duration = 0i64;
        let mut with_transcripts = 0usize;

        for call in calls {
            total_duration += call.duration_minutes();
            if transcripts.contains_key(&call.id) {
                with_transcripts += 1;
            }
            dates.push(call.date());
            internal.extend(call.participant_names_in(PartyContext::Internal));
            external.extend(call.participant_names_in(PartyContext::External));
        }
        dates.sort();

        let average = if calls.is_empty() {
            0.0
        } else {
            total_duration as f64 / calls.len() as f64
        };

        Self {
            total_calls: calls.len(),
            calls_with_transcripts: with_transcripts,
            date_range_start: dates.first().cloned().unwrap_or_default(),
            date_range_end: dates.last().cloned().unwrap_or_default(),
            total_duration_minutes: total_duration,
            average_duration_minutes: average,
            unique_internal_participants: internal.len(),
            unique_external_participants: external.len(),
        }
    }
}

/// Corpus-level participant statistics, written as a single CSV row.
#[derive(Debug, Serialize, PartialEq)]
pub struct ParticipantSummaryStats {
    /// Distinct participants across all calls
    pub total_unique_participants: usize,
    /// Participants classified Internal
    pub internal_participants: usize,
    /// Participants classified External
    pub external_participants: usize,
    /// Participants with a known email
    pub participants_with_emails: usize,
    /// Participants with a known company
    pub participants_with_companies: usize,
    /// Name of the participant on the most calls
    pub most_active_participant: String,
    /// Largest per-participant total duration in minutes
    pub highest_total_duration_minutes: i64,
    /// Mean calls per participant
    pub average_calls_per_participant: f64,
}

impl ParticipantSummaryStats {
    /// Compute stats over the aggregated profiles.
    pub fn from_profiles(profiles: &BTreeMap<String, ParticipantProfile>) -> Self {
        let total = profiles.len();
        let internal = profiles
            .values()
            .filter(|p| p.context == PartyContext::Internal)
            .count();
        let external = profiles
            .values()
            .filter(|p| p.context == PartyContext::External)
            .count();
        let with_emails = profiles.values().filter(|p| !p.email.is_empty()).count();
        let with_companies = profiles.values().filter(|p| !p.company.is_empty()).count();
        let most_active = profiles
            .values()
            .max_by_key(|p| p.total_calls)
            .map(|p| p.display_name().to_string())
            .unwrap_or_default();
        let highest_duration = profiles
            .values()
            .map(|p| p.total_duration_minutes)
            .max()
            .unwrap_or(0);
        let total_call_appearances: u64 = profiles.values().map(|p| p.total_calls).sum();
        let average_calls = if total == 0 {
            0.0
        } else {
            total_call_appearances as f64 / total as f64
        };

        Self {
            total_unique_participants: total,
            internal_participants: internal,
            external_participants: external,
            participants_with_emails: with_emails,
            participants_with_companies: with_companies,
            most_active_participant: most_active,
            highest_total_duration_minutes: highest_duration,
            average_calls_per_participant: average_calls,
        }
    }
}

/// Write a single-row stats CSV.
pub fn write_single_row_csv<T: Serialize>(path: &Path, row: &T) -> OutputResult<()> {
    let mut writer = csv_writer(path)?;
    writer
        .serialize(row)
        .map_err(|e| OutputError::CsvError(format!("failed to write stats row: {e}")))?;
    writer
        .flush()
        .map_err(|e| OutputError::CsvError(format!("failed to flush: {e}")))?;
    Ok(())
}

fn csv_writer(path: &Path) -> OutputResult<Writer<BufWriter<File>>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| OutputError::IoError(format!("failed to create directory: {e}")))?;
    }
    let file = File::create(path)
        .map_err(|e| OutputError::IoError(format!("failed to create file: {e}")))?;
    Ok(Writer::from_writer(BufWriter::with_capacity(
        DEFAULT_BUFFER_SIZE,
        file,
    )))
}
