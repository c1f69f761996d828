//! CLI error types and conversions

use crate::client::ApiError;
use crate::config::ConfigError;
use crate::downloader::DownloadError;
use crate::output::OutputError;
use crate::resume::SnapshotError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// API transport error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Download run error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Snapshot error
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Output error
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
