//! The download orchestrator.
//!
//! Sequences discovery → resume-aware fetch → persist over a single API
//! transport, checkpointing the progress snapshot after every state-changing
//! step so a crash loses at most the most recent in-flight batch.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::client::batch::{BatchOutcome, TranscriptFetcher};
use crate::client::pagination::CallLister;
use crate::client::CallApi;
use crate::metrics;
use crate::output::csv::{
    write_metadata_csv, write_participants_csv, write_single_row_csv, ParticipantSummaryStats,
    SummaryStats,
};
use crate::output::json::{load_existing_transcripts, save_call_artifact, save_consolidated};
use crate::output::transcript::{organize_by_participant, save_formatted_transcript};
use crate::output::OutputLayout;
use crate::profile::build_participant_profiles;
use crate::resume::{ProgressSnapshot, SnapshotStore};
use crate::shutdown::{self, SharedShutdown};
use crate::{Call, Transcript};

use super::job::{DownloadJob, ResumePolicy, RunPhase, RunSummary};
use super::progress::{LogReporter, ProgressReporter};
use super::DownloadError;

/// Orchestrates one download run end to end.
///
/// The executor owns no snapshot state between runs; everything durable
/// lives in the snapshot file inside the job's output directory, so separate
/// invocations resume naturally.
pub struct DownloadExecutor {
    api: Arc<dyn CallApi>,
    shutdown: Option<SharedShutdown>,
    reporter: Arc<dyn ProgressReporter>,
}

impl DownloadExecutor {
    /// Create an executor over the given API transport.
    pub fn new(api: Arc<dyn CallApi>) -> Self {
        Self {
            api,
            shutdown: shutdown::get_global_shutdown(),
            reporter: Arc::new(LogReporter),
        }
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Override progress reporting (the default logs through `tracing`).
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Execute a download run.
    ///
    /// On failure or cancellation the progress snapshot is saved best-effort
    /// and the error propagates; re-invoking the run resumes from it.
    pub async fn run(&self, job: &DownloadJob) -> Result<RunSummary, DownloadError> {
        job.validate().map_err(DownloadError::Validation)?;

        let span = tracing::info_span!(
            "download_run",
            range = %job.date_range,
            year = job.year()
        );
        let _enter = span.enter();

        info!("starting download run");

        let layout = OutputLayout::new(&job.output_dir, job.year());
        layout.ensure()?;
        let store = SnapshotStore::new(layout.progress_path());
        let mut snapshot = store.load();

        let started = Instant::now();
        let result = self
            .run_phases(job, &layout, &store, &mut snapshot, started)
            .await;

        if let Err(e) = &result {
            self.set_phase(RunPhase::Failed);
            error!(error = %e, "run failed; saving progress snapshot for resume");
            if let Err(save_err) = store.save(&snapshot) {
                error!(error = %save_err, "best-effort snapshot save failed");
            }
        }

        result
    }

    async fn run_phases(
        &self,
        job: &DownloadJob,
        layout: &OutputLayout,
        store: &SnapshotStore,
        snapshot: &mut ProgressSnapshot,
        started: Instant,
    ) -> Result<RunSummary, DownloadError> {
        self.set_phase(RunPhase::Discovering);
        let calls = self.discover(job, store, snapshot).await?;

        let in_scope: Vec<Call> = match &job.title_filter {
            Some(filter) => {
                let kept: Vec<Call> = calls
                    .iter()
                    .filter(|c| filter.matches(c.title.as_deref()))
                    .cloned()
                    .collect();
                info!(
                    discovered = calls.len(),
                    kept = kept.len(),
                    "applied title filter"
                );
                kept
            }
            None => calls,
        };

        if in_scope.is_empty() {
            info!("no calls in scope; nothing to download");
            store.clear();
            self.set_phase(RunPhase::Done);
            return Ok(RunSummary {
                total_calls: 0,
                fetched_transcripts: 0,
                newly_fetched: 0,
                reused_transcripts: 0,
                failed_ids: BTreeSet::new(),
                elapsed: started.elapsed(),
                output_dir: layout.root().to_path_buf(),
            });
        }

        self.check_shutdown()?;

        self.set_phase(RunPhase::Fetching);
        let previously_fetched: BTreeSet<String> = snapshot.fetched_ids().clone();
        let missing: Vec<String> = in_scope
            .iter()
            .filter(|c| !previously_fetched.contains(&c.id))
            .map(|c| c.id.clone())
            .collect();

        let outcome = if missing.is_empty() {
            info!("all transcripts already fetched; reusing persisted artifacts");
            BatchOutcome::default()
        } else {
            info!(
                missing = missing.len(),
                already_fetched = in_scope.len() - missing.len(),
                "fetching transcripts"
            );
            self.fetch_missing(job, layout, store, snapshot, &in_scope, &missing)
                .await?
        };

        self.check_shutdown()?;

        self.set_phase(RunPhase::Persisting);
        let BatchOutcome {
            transcripts: mut all_transcripts,
            failed_ids,
        } = outcome;
        let newly_fetched = all_transcripts.len();
        metrics::record_transcripts_fetched(newly_fetched);

        // Merge transcripts persisted by earlier runs so the final result
        // set is deduplicated by call ID, not reset.
        let reuse_ids: Vec<String> = in_scope
            .iter()
            .filter(|c| previously_fetched.contains(&c.id))
            .map(|c| c.id.clone())
            .collect();
        let existing = load_existing_transcripts(layout, reuse_ids.iter());
        let reused_transcripts = existing.len();
        for (id, transcript) in existing {
            all_transcripts.entry(id).or_insert(transcript);
        }

        self.persist(job, layout, &in_scope, &all_transcripts)?;

        store.clear();
        self.set_phase(RunPhase::Done);

        let summary = RunSummary {
            total_calls: in_scope.len(),
            fetched_transcripts: all_transcripts.len(),
            newly_fetched,
            reused_transcripts,
            failed_ids,
            elapsed: started.elapsed(),
            output_dir: layout.root().to_path_buf(),
        };
        info!(
            total_calls = summary.total_calls,
            fetched = summary.fetched_transcripts,
            newly = summary.newly_fetched,
            reused = summary.reused_transcripts,
            failed = summary.failed_ids.len(),
            elapsed_secs = summary.elapsed.as_secs(),
            "download run complete"
        );
        Ok(summary)
    }

    /// Discovery with the resume short-circuit: a snapshot that already has
    /// discovered calls is reused verbatim under `ReuseCached`, even if the
    /// upstream range would return different results now.
    async fn discover(
        &self,
        job: &DownloadJob,
        store: &SnapshotStore,
        snapshot: &mut ProgressSnapshot,
    ) -> Result<Vec<Call>, DownloadError> {
        if snapshot.has_discovered() {
            match job.resume_policy {
                ResumePolicy::ReuseCached => {
                    info!(
                        calls = snapshot.discovered_calls().len(),
                        "reusing cached discovery from snapshot"
                    );
                    return Ok(snapshot.discovered_calls().to_vec());
                }
                ResumePolicy::AlwaysRediscover => {
                    info!("cached discovery present; re-running discovery per resume policy");
                }
            }
        }

        let lister = CallLister::new(self.api.as_ref());
        let reporter = &self.reporter;
        let calls = lister
            .list(&job.date_range, |progress| {
                reporter.discovery_progress(progress)
            })
            .await?;

        snapshot.set_discovered(calls.clone());
        store.save(snapshot)?;
        info!(calls = calls.len(), "discovery complete");
        Ok(calls)
    }

    /// Fetch missing transcripts, checkpointing after every batch.
    async fn fetch_missing(
        &self,
        job: &DownloadJob,
        layout: &OutputLayout,
        store: &SnapshotStore,
        snapshot: &mut ProgressSnapshot,
        calls: &[Call],
        missing: &[String],
    ) -> Result<BatchOutcome, DownloadError> {
        let by_id: HashMap<&str, &Call> = calls.iter().map(|c| (c.id.as_str(), c)).collect();
        let total = missing.len();
        let fetcher = TranscriptFetcher::new(self.api.as_ref());
        let shutdown = self.shutdown.clone();
        let reporter = &self.reporter;

        let outcome = fetcher
            .fetch_with(&job.date_range, missing, |progress: &BatchOutcome| {
                // Write this batch's artifacts before checkpointing: the
                // snapshot must never claim an ID whose artifact is not on
                // disk, or a resumed run would silently lose it.
                let mut newly: Vec<String> = Vec::new();
                for (id, transcript) in &progress.transcripts {
                    if snapshot.fetched_ids().contains(id) {
                        continue;
                    }
                    if let Some(call) = by_id.get(id.as_str()) {
                        save_call_artifact(layout, call, Some(transcript))?;
                    }
                    newly.push(id.clone());
                }
                snapshot.record_fetched(newly);
                store.save(snapshot)?;

                reporter.fetch_progress(
                    progress.transcripts.len(),
                    progress.failed_ids.len(),
                    total,
                );

                if shutdown.as_ref().is_some_and(|s| s.is_shutdown_requested()) {
                    info!("shutdown requested; stopping after current batch");
                    return Err(DownloadError::Cancelled);
                }
                Ok(())
            })
            .await?;

        Ok(outcome)
    }

    /// Write every artifact for the run.
    fn persist(
        &self,
        job: &DownloadJob,
        layout: &OutputLayout,
        calls: &[Call],
        transcripts: &HashMap<String, Transcript>,
    ) -> Result<(), DownloadError> {
        // Calls whose transcripts were fetched already have artifacts from
        // the per-batch checkpoint; fill in the rest (failed batches, or no
        // transcript upstream) so every call has a raw artifact.
        for call in calls {
            if !transcripts.contains_key(&call.id) {
                save_call_artifact(layout, call, None)?;
            }
        }

        for call in calls {
            if let Some(transcript) = transcripts.get(&call.id) {
                save_formatted_transcript(layout, call, transcript)?;
            }
        }

        let profiles = build_participant_profiles(calls);
        write_metadata_csv(&layout.metadata_csv_path(), calls, transcripts)?;
        write_participants_csv(&layout.participants_csv_path(), &profiles)?;
        write_single_row_csv(
            &layout.participant_summary_csv_path(),
            &ParticipantSummaryStats::from_profiles(&profiles),
        )?;
        write_single_row_csv(
            &layout.summary_statistics_csv_path(),
            &SummaryStats::from_calls(calls, transcripts),
        )?;
        organize_by_participant(layout, calls, transcripts)?;
        save_consolidated(layout, &job.date_range, calls, transcripts)?;

        Ok(())
    }

    fn set_phase(&self, phase: RunPhase) {
        self.reporter.phase_changed(phase);
    }

    fn check_shutdown(&self) -> Result<(), DownloadError> {
        if self
            .shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
        {
            info!("shutdown requested; aborting run");
            return Err(DownloadError::Cancelled);
        }
        Ok(())
    }
}
