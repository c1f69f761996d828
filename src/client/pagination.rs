//! Cursor-driven discovery of all calls in a date range.
//!
//! The server hands back a continuation cursor with each page; the lister
//! keeps requesting until the cursor is absent. Termination therefore
//! depends on the server, so a page-count ceiling guards against a server
//! that returns cursors forever.

use tracing::debug;

use crate::downloader::config::MAX_PAGES;
use crate::{Call, DateRange};

use super::{ApiError, ApiResult, CallApi};

/// Discovery progress, reported to the caller after each page.
///
/// Purely informational (progress bars, logs); not part of the discovery
/// correctness contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryProgress {
    /// Calls accumulated so far
    pub fetched: usize,
    /// Server's total-record hint, when it reported one
    pub total_hint: Option<u64>,
    /// Pages retrieved so far
    pub pages: usize,
}

/// Drives pagination over the discovery endpoint.
pub struct CallLister<'a> {
    api: &'a dyn CallApi,
}

impl<'a> CallLister<'a> {
    /// Create a lister over the given API transport.
    pub fn new(api: &'a dyn CallApi) -> Self {
        Self { api }
    }

    /// Accumulate every page of calls in the range, in server order.
    ///
    /// `observe` is invoked once per page with cumulative progress.
    pub async fn list<F>(&self, range: &DateRange, mut observe: F) -> ApiResult<Vec<Call>>
    where
        F: FnMut(DiscoveryProgress),
    {
        let mut all_calls = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if pages >= MAX_PAGES {
                return Err(ApiError::InvalidResponse(format!(
                    "discovery exceeded {MAX_PAGES} pages for range {range}; \
                     server may be returning cursors indefinitely"
                )));
            }

            let page = self.api.list_calls_page(range, cursor.as_deref()).await?;
            pages += 1;

            debug!(
                page = pages,
                page_calls = page.calls.len(),
                total_hint = page.records.total_records,
                "discovery page received"
            );

            all_calls.extend(page.calls);

            let total_hint = if page.records.total_records > 0 {
                Some(page.records.total_records)
            } else {
                None
            };
            observe(DiscoveryProgress {
                fetched: all_calls.len(),
                total_hint,
                pages,
            });

            match page.records.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        debug!(
            pages,
            total_calls = all_calls.len(),
            "discovery complete"
        );
        Ok(all_calls)
    }
}
