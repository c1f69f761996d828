//! Progress reporting hooks for long-running downloads.
//!
//! The executor emits progress events through a [`ProgressReporter`] so the
//! CLI can drive progress bars while library users get structured logs (or
//! nothing). Reporting is purely informational and never affects run
//! correctness.

use tracing::info;

use crate::client::pagination::DiscoveryProgress;

use super::job::RunPhase;

/// Receives progress events from a running [`super::DownloadExecutor`].
pub trait ProgressReporter: Send + Sync {
    /// The run entered a new phase.
    fn phase_changed(&self, _phase: RunPhase) {}

    /// A discovery page was retrieved.
    fn discovery_progress(&self, _progress: DiscoveryProgress) {}

    /// A transcript batch completed (successfully or not).
    fn fetch_progress(&self, _fetched: usize, _failed: usize, _total: usize) {}
}

/// Reporter that discards every event.
#[derive(Debug, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {}

/// Reporter that surfaces progress through `tracing`.
#[derive(Debug, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn phase_changed(&self, phase: RunPhase) {
        info!(%phase, "run phase changed");
    }

    fn discovery_progress(&self, progress: DiscoveryProgress) {
        match progress.total_hint {
            Some(total) => info!(
                fetched = progress.fetched,
                total,
                pages = progress.pages,
                "discovery progress"
            ),
            None => info!(
                fetched = progress.fetched,
                pages = progress.pages,
                "discovery progress"
            ),
        }
    }

    fn fetch_progress(&self, fetched: usize, failed: usize, total: usize) {
        let done = fetched + failed;
        let percent = percent_complete(done, total);
        info!(fetched, failed, total, percent, "transcript fetch progress");
    }
}

/// Completion percentage, clamped to `[0, 100]`.
pub fn percent_complete(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as u8
}
