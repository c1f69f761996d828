//! Batch transcript fetching.
//!
//! The transcript endpoint accepts at most
//! [`TRANSCRIPT_BATCH_SIZE`](crate::downloader::config::TRANSCRIPT_BATCH_SIZE)
//! call IDs per request, so the fetcher partitions the requested IDs into
//! fixed-size batches and issues one request per batch.
//!
//! Batch failures are tolerated, not fatal: a batch whose request fails even
//! after retries has its IDs recorded in [`BatchOutcome::failed_ids`] and the
//! loop moves on. This keeps "fetch failed" distinct from "no transcript
//! exists upstream": the latter is simply absent from both maps.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::downloader::config::TRANSCRIPT_BATCH_SIZE;
use crate::{DateRange, Transcript};

use super::CallApi;

/// Result of a batch fetch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Successfully fetched transcripts, keyed by call ID
    pub transcripts: HashMap<String, Transcript>,
    /// IDs whose batch request failed after all retries
    pub failed_ids: BTreeSet<String>,
}

impl BatchOutcome {
    /// Whether every batch request succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed_ids.is_empty()
    }
}

/// Fetches transcripts for arbitrarily many call IDs in fixed-size batches.
pub struct TranscriptFetcher<'a> {
    api: &'a dyn CallApi,
}

impl<'a> TranscriptFetcher<'a> {
    /// Create a fetcher over the given API transport.
    pub fn new(api: &'a dyn CallApi) -> Self {
        Self { api }
    }

    /// Fetch transcripts for `call_ids`, tolerating failed batches.
    ///
    /// Never fails: request errors land in [`BatchOutcome::failed_ids`].
    pub async fn fetch(&self, range: &DateRange, call_ids: &[String]) -> BatchOutcome {
        // after_batch cannot fail here, so neither can fetch_with.
        match self
            .fetch_with(range, call_ids, |_| Ok::<(), std::convert::Infallible>(()))
            .await
        {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Fetch transcripts, invoking `after_batch` with the cumulative outcome
    /// after each batch completes (successfully or not).
    ///
    /// The hook exists so the orchestrator can checkpoint progress between
    /// batches; a hook error aborts the remaining batches and is returned
    /// unchanged.
    pub async fn fetch_with<F, E>(
        &self,
        range: &DateRange,
        call_ids: &[String],
        mut after_batch: F,
    ) -> Result<BatchOutcome, E>
    where
        F: FnMut(&BatchOutcome) -> Result<(), E>,
    {
        let mut outcome = BatchOutcome::default();
        if call_ids.is_empty() {
            return Ok(outcome);
        }

        let batch_count = call_ids.len().div_ceil(TRANSCRIPT_BATCH_SIZE);
        debug!(
            ids = call_ids.len(),
            batches = batch_count,
            batch_size = TRANSCRIPT_BATCH_SIZE,
            "fetching transcripts"
        );

        for (index, batch) in call_ids.chunks(TRANSCRIPT_BATCH_SIZE).enumerate() {
            match self.api.fetch_transcript_batch(range, batch).await {
                Ok(transcripts) => {
                    debug!(
                        batch = index + 1,
                        batches = batch_count,
                        returned = transcripts.len(),
                        "transcript batch fetched"
                    );
                    for transcript in transcripts {
                        outcome
                            .transcripts
                            .insert(transcript.call_id.clone(), transcript);
                    }
                }
                Err(e) => {
                    // Skip this batch and keep going; the IDs stay unfetched
                    // so a later run can retry them.
                    warn!(
                        batch = index + 1,
                        batches = batch_count,
                        ids = batch.len(),
                        error = %e,
                        "transcript batch failed; continuing with next batch"
                    );
                    crate::metrics::record_batch_failure(batch.len());
                    outcome.failed_ids.extend(batch.iter().cloned());
                }
            }

            after_batch(&outcome)?;
        }

        Ok(outcome)
    }
}
