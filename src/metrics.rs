//! Observability metrics for the download pipeline.
//!
//! Collected through the `metrics` facade so the recorder is pluggable; the
//! CLI can install a Prometheus scrape endpoint with [`init_metrics`].
//! Recording is a no-op until a recorder is installed, so library users pay
//! nothing for it.

use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the Prometheus exporter and register metric descriptions.
///
/// Idempotent; only the first call binds the scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("metrics already initialized, skipping");
        return Ok(());
    }

    info!(%addr, "initializing metrics scrape endpoint");

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "api_requests_total",
        Unit::Count,
        "API requests issued, including retries"
    );
    describe_counter!(
        "api_retries_total",
        Unit::Count,
        "Retry attempts after transient failures"
    );
    describe_counter!(
        "api_rate_limited_total",
        Unit::Count,
        "429 responses received from the remote"
    );
    describe_counter!(
        "transcript_batches_failed_total",
        Unit::Count,
        "Transcript batches that failed after all retries"
    );
    describe_counter!(
        "transcript_batch_ids_failed_total",
        Unit::Count,
        "Call IDs left unfetched by failed batches"
    );
    describe_counter!(
        "transcripts_fetched_total",
        Unit::Count,
        "Transcripts fetched successfully"
    );

    Ok(())
}

/// Count an outgoing API request.
pub fn record_request(endpoint: &str) {
    counter!("api_requests_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Count a retry attempt.
pub fn record_retry(endpoint: &str) {
    counter!("api_retries_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Count a 429 response.
pub fn record_rate_limited(endpoint: &str) {
    counter!("api_rate_limited_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Count a failed transcript batch and the IDs it left unfetched.
pub fn record_batch_failure(ids_in_batch: usize) {
    counter!("transcript_batches_failed_total").increment(1);
    counter!("transcript_batch_ids_failed_total").increment(ids_in_batch as u64);
}

/// Count transcripts fetched by a run.
pub fn record_transcripts_fetched(count: usize) {
    counter!("transcripts_fetched_total").increment(count as u64);
}
