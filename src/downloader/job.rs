//! Run specification and result types.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::DateRange;

/// How a run treats discovery state cached by an interrupted run.
///
/// Reusing cached discovery trades freshness for resumability: calls created
/// upstream after the original discovery will not appear until the snapshot
/// is cleared or `AlwaysRediscover` is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePolicy {
    /// Reuse cached discovery results when a snapshot has them
    #[default]
    ReuseCached,
    /// Re-run discovery even when a snapshot has cached results; fetched
    /// transcripts whose calls are rediscovered are still not re-fetched
    AlwaysRediscover,
}

impl FromStr for ResumePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reuse-cached" => Ok(ResumePolicy::ReuseCached),
            "always-rediscover" => Ok(ResumePolicy::AlwaysRediscover),
            _ => Err(format!(
                "invalid resume policy: {s}. Valid options: reuse-cached, always-rediscover"
            )),
        }
    }
}

/// Keyword filter applied to call titles before fetching.
///
/// `"identity and demo"` requires every keyword; `"empi,demo"` or
/// `"empi demo"` matches any keyword. Matching is case-insensitive
/// substring containment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleFilter {
    keywords: Vec<String>,
    require_all: bool,
}

impl TitleFilter {
    /// Parse a filter expression; returns `None` when it contains no
    /// keywords.
    pub fn parse(expression: &str) -> Option<Self> {
        let expression = expression.trim().to_lowercase();
        if expression.is_empty() {
            return None;
        }

        let (keywords, require_all): (Vec<String>, bool) = if expression.contains(" and ") {
            (
                expression
                    .split(" and ")
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect(),
                true,
            )
        } else {
            (
                expression
                    .replace(',', " ")
                    .split_whitespace()
                    .map(String::from)
                    .collect(),
                false,
            )
        };

        if keywords.is_empty() {
            return None;
        }
        Some(Self {
            keywords,
            require_all,
        })
    }

    /// Whether a call title passes the filter. Absent titles match nothing.
    pub fn matches(&self, title: Option<&str>) -> bool {
        let title = title.unwrap_or("").to_lowercase();
        if self.require_all {
            self.keywords.iter().all(|k| title.contains(k))
        } else {
            self.keywords.iter().any(|k| title.contains(k))
        }
    }
}

/// Specification for one download run.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Date range to discover calls in
    pub date_range: DateRange,
    /// Base output directory; artifacts land under `<output_dir>/<year>/`
    pub output_dir: PathBuf,
    /// Optional title filter applied after discovery
    pub title_filter: Option<TitleFilter>,
    /// How to treat cached discovery state
    pub resume_policy: ResumePolicy,
}

impl DownloadJob {
    /// Create a job with default policy and no filter.
    pub fn new(date_range: DateRange, output_dir: PathBuf) -> Self {
        Self {
            date_range,
            output_dir,
            title_filter: None,
            resume_policy: ResumePolicy::default(),
        }
    }

    /// Attach a title filter.
    pub fn with_title_filter(mut self, filter: Option<TitleFilter>) -> Self {
        self.title_filter = filter;
        self
    }

    /// Override the resume policy.
    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = policy;
        self
    }

    /// Year the output tree is rooted under (start of the range).
    pub fn year(&self) -> i32 {
        self.date_range.start.year()
    }

    /// Validate the job specification.
    pub fn validate(&self) -> Result<(), String> {
        if self.output_dir.as_os_str().is_empty() {
            return Err("output directory cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Phases of a download run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RunPhase {
    /// Not started
    #[default]
    Idle,
    /// Listing calls in the date range
    Discovering,
    /// Batch-fetching transcripts
    Fetching,
    /// Writing artifacts
    Persisting,
    /// Run completed; snapshot cleared
    Done,
    /// Run aborted; snapshot saved for resume
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::Discovering => "discovering",
            RunPhase::Fetching => "fetching",
            RunPhase::Persisting => "persisting",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Calls in scope after discovery and title filtering
    pub total_calls: usize,
    /// Transcripts available at the end of the run (new + reused)
    pub fetched_transcripts: usize,
    /// Transcripts fetched by this run
    pub newly_fetched: usize,
    /// Transcripts recovered from a previous run's artifacts
    pub reused_transcripts: usize,
    /// IDs whose transcript batches failed after retries; absent from the
    /// snapshot so a re-run retries exactly these
    pub failed_ids: BTreeSet<String>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Year-scoped directory the artifacts were written to
    pub output_dir: PathBuf,
}

impl RunSummary {
    /// Transcripts per in-scope call, in `[0, 1]`.
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.fetched_transcripts as f64 / self.total_calls as f64
    }
}
