//! Minimal library usage: download one quarter of calls and transcripts.
//!
//! Credentials come from the environment:
//!
//! ```sh
//! export CALLSYNC_ACCESS_KEY=...
//! export CALLSYNC_ACCESS_KEY_SECRET=...
//! export CALLSYNC_BASE_URL=https://acme.api.example-calls.io
//! cargo run --example bulk_download
//! ```

use callsync::client::http::HttpCallApi;
use callsync::config::ApiConfig;
use callsync::downloader::{DownloadExecutor, DownloadJob};
use callsync::DateRange;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("callsync=info")
        .init();

    let config = ApiConfig::new(
        std::env::var("CALLSYNC_ACCESS_KEY")?,
        std::env::var("CALLSYNC_ACCESS_KEY_SECRET")?,
        std::env::var("CALLSYNC_BASE_URL")?,
    )?;

    let range = DateRange::parse("2024-01-01", "2024-03-31")?;
    let job = DownloadJob::new(range, "./transcripts".into());

    let api = Arc::new(HttpCallApi::new(&config)?);
    let summary = DownloadExecutor::new(api).run(&job).await?;

    println!(
        "downloaded {} of {} transcripts into {}",
        summary.fetched_transcripts,
        summary.total_calls,
        summary.output_dir.display()
    );
    if !summary.failed_ids.is_empty() {
        println!(
            "{} transcript fetches failed; re-run to retry them",
            summary.failed_ids.len()
        );
    }

    Ok(())
}
