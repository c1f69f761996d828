//! Run orchestration: resume-aware discovery → fetch → persist.
//!
//! # Overview
//!
//! A download run walks a fixed state machine:
//!
//! 1. **Discovering** - list every call in the date range (or reuse the
//!    cached discovery from an interrupted run, per [`job::ResumePolicy`])
//! 2. **Fetching** - batch-fetch transcripts for calls not yet fetched,
//!    checkpointing the progress snapshot after every batch
//! 3. **Persisting** - write raw JSON, formatted transcripts, per-date and
//!    per-participant trees, and CSV tables; then clear the snapshot
//!
//! Any failure or Ctrl+C saves the snapshot best-effort and surfaces the
//! error; re-invoking the pipeline resumes from the snapshot. There is no
//! automatic run-level retry.
//!
//! # Components
//!
//! - [`executor`] - The orchestrator ([`DownloadExecutor`])
//! - [`job`] - Run specification, title filter, summary types
//! - [`rate_limit`] - Request spacing
//! - [`progress`] - Progress reporting hooks
//! - [`config`] - Retry/backoff/batch constants

pub mod config;
pub mod executor;
pub mod job;
pub mod progress;
pub mod rate_limit;

pub use executor::DownloadExecutor;
pub use job::{DownloadJob, ResumePolicy, RunPhase, RunSummary, TitleFilter};
pub use rate_limit::RateLimiter;

use crate::client::ApiError;
use crate::output::OutputError;
use crate::resume::SnapshotError;

/// Download run errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// API transport error that exhausted its retries or was fatal
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Progress snapshot could not be written; resuming would be unsafe
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Artifact writing failed
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Invalid run specification
    #[error("validation error: {0}")]
    Validation(String),

    /// Operator requested shutdown; progress was saved
    #[error("run cancelled, progress saved for resume")]
    Cancelled,
}
