//! # callsync
//!
//! A library and CLI for bulk-downloading call recordings' metadata and
//! transcripts from a call-intelligence platform API.
//!
//! ## Features
//!
//! - **Paginated Discovery**: Cursor-based listing of all calls in a date range
//! - **Batch Transcript Fetch**: Transcripts fetched in batches of up to 100 call IDs
//! - **Resume Capability**: Durable progress snapshots so interrupted runs pick up
//!   where they left off instead of re-downloading
//! - **Rate Limiting**: Serialized, evenly-spaced API requests (default 2.5 calls/sec)
//! - **Bounded Retries**: Exponential backoff for transient failures, `Retry-After`
//!   support for rate-limit responses
//! - **Organized Output**: Raw JSON, formatted text transcripts, per-date and
//!   per-participant folders, and CSV metadata/profile tables
//!
//! ## Quick Start
//!
//! ```no_run
//! use callsync::client::http::HttpCallApi;
//! use callsync::config::ApiConfig;
//! use callsync::downloader::{DownloadExecutor, DownloadJob};
//! use callsync::DateRange;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApiConfig::new(
//!     "access-key",
//!     "access-key-secret",
//!     "https://api.example-calls.io",
//! )?;
//!
//! let range = DateRange::parse("2024-01-01", "2024-03-31")?;
//! let job = DownloadJob::new(range, "./transcripts".into());
//!
//! let api = Arc::new(HttpCallApi::new(&config)?);
//! let executor = DownloadExecutor::new(api);
//! let summary = executor.run(&job).await?;
//! println!("downloaded {} transcripts", summary.fetched_transcripts);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - API transport: rate-limited retrying HTTP executor, paginated
//!   call lister, batch transcript fetcher
//! - [`downloader`] - Run orchestration: resume-aware discovery → fetch → persist
//! - [`resume`] - Durable progress snapshots for crash recovery
//! - [`output`] - Artifact writers (raw JSON, text transcripts, CSV tables)
//! - [`profile`] - Participant profile aggregation
//! - [`cli`] - Command-line interface
//!
//! ## Concurrency model
//!
//! The pipeline runs on a single logical task. Requests are issued strictly in
//! program order; the only suspension points are the rate-limiter delay and
//! network I/O. Concurrent invocations against the same output directory are
//! unsupported (the progress snapshot has a single-writer assumption and no
//! inter-process locking).

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// API transport: HTTP client, pagination, batch fetching
pub mod client;

/// API credential and endpoint configuration
pub mod config;

/// Run orchestration with retry and rate limiting
pub mod downloader;

/// Observability metrics
pub mod metrics;

/// Artifact writers (JSON, text, CSV)
pub mod output;

/// Participant profile aggregation
pub mod profile;

/// Resume capability for interrupted runs
pub mod resume;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

// Re-export commonly used types
pub use client::CallApi;
pub use downloader::{DownloadExecutor, DownloadJob};

/// Milliseconds per minute, for duration conversion.
const MS_PER_MINUTE: i64 = 60_000;

/// Inclusive calendar date range used to bound discovery queries.
///
/// Upstream queries translate this to half-open `[start, end + 1 day)`
/// datetime bounds: the API treats `toDateTime` as exclusive, so the day
/// after the inclusive end date is sent to cover the full final day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range (inclusive).
    pub start: NaiveDate,
    /// Last day of the range (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, enforcing `start <= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!(
                "start date ({start}) must not be after end date ({end})"
            ));
        }
        if end.succ_opt().is_none() {
            return Err(format!("end date ({end}) is too far in the future"));
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .map_err(|e| format!("invalid start date {start:?}: {e}"))?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
            .map_err(|e| format!("invalid end date {end:?}: {e}"))?;
        Self::new(start, end)
    }

    /// Inclusive lower query bound: start date at `00:00:00Z`.
    pub fn from_datetime(&self) -> DateTime<Utc> {
        self.start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc()
    }

    /// Exclusive upper query bound: the day *after* the inclusive end date
    /// at `00:00:00Z`.
    pub fn to_datetime_exclusive(&self) -> DateTime<Utc> {
        // new() rejects ranges where end has no successor
        self.end
            .succ_opt()
            .expect("DateRange::new rejects NaiveDate::MAX")
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc()
    }

    /// Lower bound formatted for the wire (`2024-01-01T00:00:00Z`).
    pub fn from_datetime_str(&self) -> String {
        self.from_datetime()
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }

    /// Exclusive upper bound formatted for the wire (`2024-01-02T00:00:00Z`).
    pub fn to_datetime_str(&self) -> String {
        self.to_datetime_exclusive()
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Whether a participant belongs to the downloading organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PartyContext {
    /// Member of the downloading organization
    Internal,
    /// Outside party (customer, prospect, vendor)
    External,
    /// Context not reported by the API
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for PartyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PartyContext::Internal => "Internal",
            PartyContext::External => "External",
            PartyContext::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

/// One participant on a call.
///
/// Every identity field is optional upstream; [`Party::display_name`] picks
/// the best available label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    /// Participant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    /// Internal/External classification
    #[serde(default)]
    pub context: PartyContext,
    /// Role on the call (e.g. attendee)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Company affiliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Job title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Speaker ID linking this party to transcript entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
    /// Whether this party hosted the call
    #[serde(default)]
    pub is_host: bool,
    /// Whether this party organized the meeting
    #[serde(default)]
    pub is_organizer: bool,
}

impl Party {
    /// Best display label: name, then email, then "Unknown".
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.email_address.as_deref())
            .unwrap_or("Unknown")
    }

    /// Stable aggregation key: lowercased email, falling back to lowercased
    /// name, falling back to `"unknown"`.
    pub fn profile_key(&self) -> String {
        if let Some(email) = self
            .email_address
            .as_deref()
            .filter(|e| !e.trim().is_empty())
        {
            return email.trim().to_lowercase();
        }
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_lowercase();
        }
        "unknown".to_string()
    }
}

/// Call metadata as returned by the discovery endpoint.
///
/// Immutable once fetched; the authoritative copy is whatever discovery
/// returned. Unknown upstream fields are preserved in [`Call::extra`] so the
/// progress snapshot round-trips them unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Opaque call ID
    pub id: String,
    /// Call start timestamp; absent for a handful of degenerate records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    /// Call duration in milliseconds
    #[serde(default)]
    pub duration: i64,
    /// Call title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Call direction (Inbound/Outbound/Conference)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Meeting URL, if the call had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_url: Option<String>,
    /// Workspace the call belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    /// Participants; populated from the extensive discovery endpoint
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parties: Vec<Party>,
    /// Open-ended attribute bag for fields this tool does not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Call {
    /// Call date as `YYYY-MM-DD`, or `"unknown-date"` when unset.
    pub fn date(&self) -> String {
        match self.started {
            Some(dt) => dt.format("%Y-%m-%d").to_string(),
            None => "unknown-date".to_string(),
        }
    }

    /// Call time as `HH:MM` UTC, or `"unknown-time"` when unset.
    pub fn time(&self) -> String {
        match self.started {
            Some(dt) => dt.format("%H:%M").to_string(),
            None => "unknown-time".to_string(),
        }
    }

    /// Duration in whole minutes, floored.
    pub fn duration_minutes(&self) -> i64 {
        if self.duration > 0 {
            self.duration / MS_PER_MINUTE
        } else {
            0
        }
    }

    /// Display names of all participants.
    pub fn participant_names(&self) -> Vec<String> {
        self.parties
            .iter()
            .map(|p| p.display_name().to_string())
            .collect()
    }

    /// Display names of participants with the given context.
    pub fn participant_names_in(&self, context: PartyContext) -> Vec<String> {
        self.parties
            .iter()
            .filter(|p| p.context == context)
            .map(|p| p.display_name().to_string())
            .collect()
    }

    /// Validate structural integrity of a discovered call.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("call ID cannot be empty".to_string());
        }
        if self.duration < 0 {
            return Err(format!(
                "duration must be non-negative, got {}",
                self.duration
            ));
        }
        Ok(())
    }
}

/// One sentence within a transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Sentence {
    /// Offset from the start of the call, in milliseconds
    #[serde(default)]
    pub start: i64,
    /// Spoken text
    #[serde(default)]
    pub text: String,
}

/// A contiguous run of sentences from one speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    /// Speaker ID; joinable to [`Party::speaker_id`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
    /// Topic label assigned by the platform, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Sentences in speaking order
    #[serde(default)]
    pub sentences: Vec<Sentence>,
}

/// The heavy per-call payload: a full speaker-attributed transcript.
///
/// Fetched separately from [`Call`] because the discovery endpoint does not
/// include it. A call may have no transcript at all upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    /// ID of the call this transcript belongs to
    pub call_id: String,
    /// Speaker entries in chronological order
    #[serde(default, rename = "transcript")]
    pub entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Total number of sentences across all entries.
    pub fn sentence_count(&self) -> usize {
        self.entries.iter().map(|e| e.sentences.len()).sum()
    }
}
