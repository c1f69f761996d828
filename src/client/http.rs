//! HTTP transport for the call-intelligence API.
//!
//! One retrying executor handles every request:
//! - Consults the shared [`RateLimiter`] before each attempt, including retries
//! - Retries transient failures (connection errors, timeouts, 429s) up to
//!   [`MAX_ATTEMPTS`] with exponential backoff
//! - Honors `Retry-After` on 429 responses before the backoff kicks in
//! - Fails immediately on any other non-2xx status: those indicate a
//!   programming or auth error that retrying cannot fix

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::downloader::config::{retry_backoff, MAX_ATTEMPTS, RETRY_AFTER_FALLBACK};
use crate::downloader::rate_limit::RateLimiter;
use crate::metrics;
use crate::{Call, CallApi, DateRange, Party, Transcript};

use super::{ApiError, ApiResult, CallsPage, PageInfo};

/// Discovery endpoint; returns call metadata including participants.
const CALLS_EXTENSIVE_ENDPOINT: &str = "/v2/calls/extensive";

/// Batch transcript endpoint.
const CALLS_TRANSCRIPT_ENDPOINT: &str = "/v2/calls/transcript";

/// HTTP implementation of [`CallApi`].
pub struct HttpCallApi {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
    access_key_secret: String,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpCallApi {
    /// Build a transport from the API config, with its own rate limiter.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit));
        Self::with_rate_limiter(config, rate_limiter)
    }

    /// Build a transport sharing an externally owned rate limiter.
    pub fn with_rate_limiter(
        config: &ApiConfig,
        rate_limiter: Arc<RateLimiter>,
    ) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            access_key: config.access_key.clone(),
            access_key_secret: config.access_key_secret.clone(),
            rate_limiter,
        })
    }

    /// Issue one discovery request and report the server's total-record hint.
    /// Used as a cheap credentials/connectivity check.
    pub async fn test_connection(&self, range: &DateRange) -> ApiResult<u64> {
        let page = self.list_calls_page(range, None).await?;
        Ok(page.records.total_records)
    }

    /// POST a JSON body with rate limiting and bounded retry.
    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            // Retries respect the spacing discipline too.
            self.rate_limiter.acquire().await;
            metrics::record_request(endpoint);

            let response = match self
                .client
                .post(&url)
                .basic_auth(&self.access_key, Some(&self.access_key_secret))
                .json(body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    let error = classify_send_error(e);
                    warn!(
                        endpoint,
                        attempt,
                        max_attempts = MAX_ATTEMPTS,
                        error = %error,
                        "request failed"
                    );
                    last_error = Some(error);
                    if attempt < MAX_ATTEMPTS {
                        let backoff = retry_backoff(attempt);
                        metrics::record_retry(endpoint);
                        debug!(backoff_ms = backoff.as_millis() as u64, "retrying");
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = parse_retry_after(response.headers()).unwrap_or(RETRY_AFTER_FALLBACK);
                warn!(
                    endpoint,
                    attempt,
                    wait_secs = wait.as_secs(),
                    "rate limited by remote"
                );
                metrics::record_rate_limited(endpoint);
                last_error = Some(ApiError::RateLimited);
                if attempt < MAX_ATTEMPTS {
                    // Honor the server-requested delay first, then treat the
                    // attempt like any other transient failure.
                    tokio::time::sleep(wait).await;
                    let backoff = retry_backoff(attempt);
                    metrics::record_retry(endpoint);
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                break;
            }

            if !status.is_success() {
                let body_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                return Err(ApiError::HttpError {
                    status: status.as_u16(),
                    body: body_text,
                });
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::ParseError(format!("failed to deserialize response: {e}")));
        }

        Err(last_error
            .unwrap_or_else(|| ApiError::NetworkError("all retry attempts exhausted".to_string())))
    }
}

#[async_trait::async_trait]
impl CallApi for HttpCallApi {
    async fn list_calls_page(
        &self,
        range: &DateRange,
        cursor: Option<&str>,
    ) -> ApiResult<CallsPage> {
        let mut body = serde_json::json!({
            "filter": {
                "fromDateTime": range.from_datetime_str(),
                "toDateTime": range.to_datetime_str(),
            },
            "contentSelector": {
                "exposedFields": {
                    "parties": true,
                }
            }
        });
        if let Some(cursor) = cursor {
            body["cursor"] = serde_json::Value::String(cursor.to_string());
        }

        let response: ExtensiveResponse = self.post_json(CALLS_EXTENSIVE_ENDPOINT, &body).await?;
        Ok(response.into_page())
    }

    async fn fetch_transcript_batch(
        &self,
        range: &DateRange,
        call_ids: &[String],
    ) -> ApiResult<Vec<Transcript>> {
        let body = serde_json::json!({
            "filter": {
                "fromDateTime": range.from_datetime_str(),
                "toDateTime": range.to_datetime_str(),
                "callIds": call_ids,
            }
        });

        let response: TranscriptResponse = self.post_json(CALLS_TRANSCRIPT_ENDPOINT, &body).await?;
        Ok(response.call_transcripts)
    }
}

/// Map a reqwest send error onto the transient taxonomy.
fn classify_send_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout(error.to_string())
    } else {
        ApiError::NetworkError(error.to_string())
    }
}

/// Parse a `Retry-After` header given in seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("Retry-After")?.to_str().ok()?;
    match value.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!(value, "unparseable Retry-After header");
            None
        }
    }
}

/// Envelope the extensive discovery endpoint wraps each call in: the call
/// fields proper live under `metaData`, siblings carry the exposed extras.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtensiveCallEnvelope {
    #[serde(default)]
    meta_data: Option<Call>,
    #[serde(default)]
    parties: Vec<Party>,
}

impl ExtensiveCallEnvelope {
    /// Flatten into a [`Call`]. Entries without `metaData` carry no usable
    /// identity and are dropped by the caller.
    fn into_call(self) -> Option<Call> {
        let mut call = self.meta_data?;
        call.parties = self.parties;
        Some(call)
    }
}

#[derive(Debug, Deserialize)]
struct ExtensiveResponse {
    #[serde(default)]
    calls: Vec<ExtensiveCallEnvelope>,
    #[serde(default)]
    records: PageInfo,
}

impl ExtensiveResponse {
    fn into_page(self) -> CallsPage {
        let mut calls = Vec::with_capacity(self.calls.len());
        for envelope in self.calls {
            match envelope.into_call() {
                Some(call) => calls.push(call),
                None => warn!("discovery entry without metaData; skipping"),
            }
        }
        CallsPage {
            calls,
            records: self.records,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptResponse {
    #[serde(default)]
    call_transcripts: Vec<Transcript>,
}
