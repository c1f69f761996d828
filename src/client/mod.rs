//! API transport layer: error taxonomy, the [`CallApi`] seam, pagination,
//! and batch transcript fetching.

use crate::{Call, DateRange, Transcript};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod batch;
pub mod http;
pub mod pagination;

/// API errors, split into transient (retried) and fatal (surfaced) classes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection-level failure (refused, reset, DNS)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Request exceeded the configured timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Remote kept rate-limiting us after all retries
    #[error("rate limited by remote after retries")]
    RateLimited,

    /// Non-2xx response that is not a rate-limit signal; retrying won't help
    #[error("API error {status}: {body}")]
    HttpError {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Response body could not be deserialized
    #[error("parse error: {0}")]
    ParseError(String),

    /// Structurally valid response that violates protocol expectations
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Whether this failure class is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::NetworkError(_) | ApiError::Timeout(_) | ApiError::RateLimited
        )
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Pagination info attached to a discovery response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Total matching records across all pages, as hinted by the server
    #[serde(default)]
    pub total_records: u64,
    /// Continuation cursor; absent or empty on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl PageInfo {
    /// The cursor to pass to the next request, if the server indicated more
    /// pages. Empty-string cursors count as absent.
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// One page of discovered calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CallsPage {
    /// Calls on this page, in server order
    pub calls: Vec<Call>,
    /// Pagination metadata
    #[serde(default)]
    pub records: PageInfo,
}

/// The seam between the pipeline and the network.
///
/// Production uses [`http::HttpCallApi`]; tests substitute scripted
/// implementations. Both operations are single requests; pagination and
/// batching loops live above this trait.
#[async_trait]
pub trait CallApi: Send + Sync {
    /// Fetch one page of calls in the date range, optionally continuing from
    /// a cursor returned by the previous page.
    async fn list_calls_page(
        &self,
        range: &DateRange,
        cursor: Option<&str>,
    ) -> ApiResult<CallsPage>;

    /// Fetch transcripts for up to [`crate::downloader::config::TRANSCRIPT_BATCH_SIZE`]
    /// call IDs in one request. Calls without a transcript upstream are
    /// simply absent from the result.
    async fn fetch_transcript_batch(
        &self,
        range: &DateRange,
        call_ids: &[String],
    ) -> ApiResult<Vec<Transcript>>;
}
