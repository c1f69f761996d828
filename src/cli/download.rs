//! `download` and `test` command implementations.

use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::client::http::HttpCallApi;
use crate::client::pagination::DiscoveryProgress;
use crate::config::{ApiConfig, DEFAULT_RATE_LIMIT, DEFAULT_TIMEOUT_SECS};
use crate::downloader::progress::ProgressReporter;
use crate::downloader::{DownloadExecutor, DownloadJob, ResumePolicy, RunPhase, TitleFilter};
use crate::shutdown::SharedShutdown;
use crate::DateRange;

use super::CliError;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(
    name = "callsync",
    version,
    about = "Bulk download call metadata and transcripts from a call-intelligence platform"
)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download call metadata and transcripts for a date range
    Download(DownloadArgs),
    /// Test API connectivity and credentials
    Test(TestArgs),
}

/// API connection options shared by all commands.
#[derive(Debug, Clone, Args)]
pub struct ApiArgs {
    /// API access key
    #[arg(long, env = "CALLSYNC_ACCESS_KEY", hide_env_values = true)]
    pub access_key: String,

    /// API access key secret
    #[arg(long, env = "CALLSYNC_ACCESS_KEY_SECRET", hide_env_values = true)]
    pub access_key_secret: String,

    /// Base URL of the API (e.g. https://acme.api.example-calls.io)
    #[arg(long, env = "CALLSYNC_BASE_URL")]
    pub base_url: String,

    /// API calls per second
    #[arg(long, env = "CALLSYNC_RATE_LIMIT", default_value_t = DEFAULT_RATE_LIMIT)]
    pub rate_limit: f64,

    /// Per-request timeout in seconds
    #[arg(long, env = "CALLSYNC_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl ApiArgs {
    fn to_config(&self) -> Result<ApiConfig, CliError> {
        let config = ApiConfig::new(&self.access_key, &self.access_key_secret, &self.base_url)?
            .with_rate_limit(self.rate_limit)?
            .with_timeout(Duration::from_secs(self.timeout_secs));
        Ok(config)
    }
}

/// Arguments for the `download` command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// API connection options
    #[command(flatten)]
    pub api: ApiArgs,

    /// Start date (YYYY-MM-DD), inclusive
    #[arg(long, env = "CALLSYNC_START_DATE")]
    pub start_date: String,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long, env = "CALLSYNC_END_DATE")]
    pub end_date: String,

    /// Output directory; artifacts land under <output-dir>/<year>/
    #[arg(long, env = "CALLSYNC_OUTPUT_DIR", default_value = "./transcripts")]
    pub output_dir: PathBuf,

    /// Filter calls by title keywords. 'a and b' requires all keywords;
    /// 'a,b' or 'a b' matches any keyword.
    #[arg(long)]
    pub title_filter: Option<String>,

    /// How to treat cached discovery from an interrupted run. Use
    /// always-rediscover after changing the date range.
    #[arg(long, default_value = "reuse-cached")]
    pub resume: ResumePolicy,

    /// Validate configuration and connectivity without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Bind a Prometheus scrape endpoint (e.g. 127.0.0.1:9090)
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl DownloadArgs {
    /// Execute the download command.
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<(), CliError> {
        let config = self.api.to_config()?;
        let range = DateRange::parse(&self.start_date, &self.end_date)
            .map_err(CliError::InvalidArgument)?;
        let title_filter = match &self.title_filter {
            Some(expression) => {
                let filter = TitleFilter::parse(expression);
                if filter.is_none() {
                    warn!(%expression, "title filter has no keywords; ignoring");
                }
                filter
            }
            None => None,
        };

        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)
                .map_err(|e| CliError::InvalidArgument(format!("metrics endpoint: {e}")))?;
        }

        let api = Arc::new(HttpCallApi::new(&config)?);

        if self.dry_run {
            println!("Dry run: no files will be downloaded");
            println!("  Date range:       {range}");
            println!("  Output directory: {}", self.output_dir.display());
            let total = api.test_connection(&range).await?;
            println!("  API connection:   ok ({total} calls match the range)");
            return Ok(());
        }

        // Fail fast on bad credentials before a potentially hours-long run.
        api.test_connection(&range).await?;

        info!(%range, output_dir = %self.output_dir.display(), "starting download");

        let reporter = Arc::new(ConsoleReporter::new());
        let job = DownloadJob::new(range, self.output_dir.clone())
            .with_title_filter(title_filter)
            .with_resume_policy(self.resume);
        let executor = DownloadExecutor::new(api)
            .with_shutdown(shutdown)
            .with_reporter(reporter.clone());

        let summary = executor.run(&job).await?;
        reporter.finish();

        println!();
        println!("Download summary");
        println!("  Calls in scope:          {}", summary.total_calls);
        println!("  Transcripts available:   {}", summary.fetched_transcripts);
        println!("  Newly fetched:           {}", summary.newly_fetched);
        println!("  Reused from disk:        {}", summary.reused_transcripts);
        println!("  Success rate:            {:.1}%", summary.success_rate() * 100.0);
        println!("  Elapsed:                 {:?}", summary.elapsed);
        println!("  Output directory:        {}", summary.output_dir.display());
        if !summary.failed_ids.is_empty() {
            println!(
                "  FAILED transcript fetches: {} call IDs (re-run to retry them)",
                summary.failed_ids.len()
            );
        }

        Ok(())
    }
}

/// Arguments for the `test` command.
#[derive(Debug, Args)]
pub struct TestArgs {
    /// API connection options
    #[command(flatten)]
    pub api: ApiArgs,

    /// Start date (YYYY-MM-DD) for the probe query; defaults to 30 days ago
    #[arg(long)]
    pub start_date: Option<String>,

    /// End date (YYYY-MM-DD) for the probe query; defaults to today
    #[arg(long)]
    pub end_date: Option<String>,
}

impl TestArgs {
    /// Execute the test command.
    pub async fn execute(&self) -> Result<(), CliError> {
        let config = self.api.to_config()?;
        let range = self.probe_range()?;

        println!("Testing API connection...");
        println!("  Base URL:   {}", config.base_url);
        println!("  Date range: {range}");

        let api = HttpCallApi::new(&config)?;
        let total = api.test_connection(&range).await?;

        println!("Connection OK: {total} calls match the probe range");
        Ok(())
    }

    fn probe_range(&self) -> Result<DateRange, CliError> {
        let today = chrono::Utc::now().date_naive();
        let default_start = today - chrono::Days::new(30);

        let range = match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => DateRange::parse(start, end),
            (Some(start), None) => chrono::NaiveDate::parse_from_str(start, "%Y-%m-%d")
                .map_err(|e| format!("invalid start date {start:?}: {e}"))
                .and_then(|start| DateRange::new(start, today)),
            (None, Some(end)) => chrono::NaiveDate::parse_from_str(end, "%Y-%m-%d")
                .map_err(|e| format!("invalid end date {end:?}: {e}"))
                .and_then(|end| DateRange::new(end - chrono::Days::new(30), end)),
            (None, None) => DateRange::new(default_start, today),
        };
        range.map_err(CliError::InvalidArgument)
    }
}

/// Progress bars for interactive runs.
struct ConsoleReporter {
    multi: MultiProgress,
    discovery: ProgressBar,
    fetch: ProgressBar,
}

impl ConsoleReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template("{msg:<24} {bar:40.cyan/blue} {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());

        let discovery = multi.add(ProgressBar::no_length());
        discovery.set_style(style.clone());
        discovery.set_message("Discovering calls");

        let fetch = multi.add(ProgressBar::no_length());
        fetch.set_style(style);
        fetch.set_message("Fetching transcripts");

        Self {
            multi,
            discovery,
            fetch,
        }
    }

    fn finish(&self) {
        self.discovery.finish_and_clear();
        self.fetch.finish_and_clear();
        let _ = self.multi.clear();
    }
}

impl ProgressReporter for ConsoleReporter {
    fn phase_changed(&self, phase: RunPhase) {
        if phase == RunPhase::Fetching {
            self.discovery.finish();
        }
    }

    fn discovery_progress(&self, progress: DiscoveryProgress) {
        if let Some(total) = progress.total_hint {
            self.discovery.set_length(total);
        }
        self.discovery.set_position(progress.fetched as u64);
    }

    fn fetch_progress(&self, fetched: usize, failed: usize, total: usize) {
        self.fetch.set_length(total as u64);
        self.fetch.set_position((fetched + failed) as u64);
    }
}
