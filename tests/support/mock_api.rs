//! Scripted [`CallApi`] implementation for tests.

use async_trait::async_trait;
use callsync::client::{ApiError, ApiResult, CallApi, CallsPage, PageInfo};
use callsync::{Call, DateRange, Sentence, Transcript, TranscriptEntry};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Build a call with a deterministic start time and duration.
pub fn call(id: &str) -> Call {
    Call {
        id: id.to_string(),
        started: Some("2024-01-15T10:00:00Z".parse().unwrap()),
        duration: 600_000,
        title: Some(format!("Call {id}")),
        direction: Some("Outbound".to_string()),
        meeting_url: None,
        workspace_id: None,
        parties: Vec::new(),
        extra: serde_json::Map::new(),
    }
}

/// Build a minimal one-sentence transcript for a call.
pub fn transcript(id: &str) -> Transcript {
    Transcript {
        call_id: id.to_string(),
        entries: vec![TranscriptEntry {
            speaker_id: Some("spk-1".to_string()),
            topic: None,
            sentences: vec![Sentence {
                start: 1_000,
                text: format!("Transcript for {id}."),
            }],
        }],
    }
}

/// Build a discovery page.
pub fn page(calls: Vec<Call>, total: u64, cursor: Option<&str>) -> CallsPage {
    CallsPage {
        calls,
        records: PageInfo {
            total_records: total,
            cursor: cursor.map(String::from),
        },
    }
}

/// Scripted API: serves queued discovery pages and a transcript store,
/// recording every request for assertions.
#[derive(Default)]
pub struct MockCallApi {
    pages: Mutex<Vec<CallsPage>>,
    endless_cursor: bool,
    transcripts: Mutex<HashMap<String, Transcript>>,
    failing_batches: HashSet<usize>,
    list_requests: AtomicUsize,
    cursors_seen: Mutex<Vec<Option<String>>>,
    batch_requests: Mutex<Vec<Vec<String>>>,
}

impl MockCallApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue discovery pages, served front to back.
    pub fn with_pages(mut self, pages: Vec<CallsPage>) -> Self {
        self.pages = Mutex::new(pages);
        self
    }

    /// Serve a transcript for each of the given call IDs.
    pub fn with_transcripts_for<'a, I>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        {
            let mut store = self.transcripts.lock().unwrap();
            for id in ids {
                store.insert(id.to_string(), transcript(id));
            }
        }
        self
    }

    /// Fail the nth transcript batch request (1-indexed) permanently.
    pub fn with_failing_batch(mut self, n: usize) -> Self {
        self.failing_batches.insert(n);
        self
    }

    /// Always return a cursor, simulating a server that never terminates
    /// pagination.
    pub fn with_endless_cursor(mut self) -> Self {
        self.endless_cursor = true;
        self
    }

    pub fn list_request_count(&self) -> usize {
        self.list_requests.load(Ordering::SeqCst)
    }

    pub fn cursors_seen(&self) -> Vec<Option<String>> {
        self.cursors_seen.lock().unwrap().clone()
    }

    pub fn batch_requests(&self) -> Vec<Vec<String>> {
        self.batch_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallApi for MockCallApi {
    async fn list_calls_page(
        &self,
        _range: &DateRange,
        cursor: Option<&str>,
    ) -> ApiResult<CallsPage> {
        self.list_requests.fetch_add(1, Ordering::SeqCst);
        self.cursors_seen
            .lock()
            .unwrap()
            .push(cursor.map(String::from));

        if self.endless_cursor {
            return Ok(page(vec![call("looping")], 1, Some("again")));
        }

        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() {
            Ok(CallsPage::default())
        } else {
            Ok(pages.remove(0))
        }
    }

    async fn fetch_transcript_batch(
        &self,
        _range: &DateRange,
        call_ids: &[String],
    ) -> ApiResult<Vec<Transcript>> {
        let batch_number = {
            let mut log = self.batch_requests.lock().unwrap();
            log.push(call_ids.to_vec());
            log.len()
        };

        if self.failing_batches.contains(&batch_number) {
            return Err(ApiError::NetworkError("injected batch failure".to_string()));
        }

        let store = self.transcripts.lock().unwrap();
        Ok(call_ids
            .iter()
            .filter_map(|id| store.get(id).cloned())
            .collect())
    }
}
