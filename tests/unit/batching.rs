//! Unit tests for batch transcript fetching.

use callsync::client::batch::TranscriptFetcher;
use callsync::downloader::DownloadError;
use callsync::DateRange;
use std::collections::BTreeSet;

use crate::support::mock_api::MockCallApi;

fn range() -> DateRange {
    DateRange::parse("2024-01-01", "2024-03-31").unwrap()
}

fn ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("call-{i:04}")).collect()
}

#[tokio::test]
async fn test_batch_partitioning() {
    // ceil(len/100) requests, each at most 100 IDs, covering the input
    // exactly once in order.
    for (len, expected_batches) in [(0usize, 0usize), (1, 1), (100, 1), (101, 2), (250, 3)] {
        let call_ids = ids(len);
        let api = MockCallApi::new()
            .with_transcripts_for(call_ids.iter().map(String::as_str));

        let outcome = TranscriptFetcher::new(&api).fetch(&range(), &call_ids).await;

        let batches = api.batch_requests();
        assert_eq!(batches.len(), expected_batches, "len={len}");
        assert!(batches.iter().all(|b| b.len() <= 100), "len={len}");

        let requested: Vec<String> = batches.into_iter().flatten().collect();
        assert_eq!(requested, call_ids, "len={len}");

        assert_eq!(outcome.transcripts.len(), len);
        assert!(outcome.is_complete());
    }
}

#[tokio::test]
async fn test_partial_batch_failure_skips_and_continues() {
    // Batch 2 of 3 fails permanently: batches 1 and 3 land in the result,
    // batch 2's IDs land in failed_ids, and no error escapes fetch().
    let call_ids = ids(250);
    let api = MockCallApi::new()
        .with_transcripts_for(call_ids.iter().map(String::as_str))
        .with_failing_batch(2);

    let outcome = TranscriptFetcher::new(&api).fetch(&range(), &call_ids).await;

    assert_eq!(api.batch_requests().len(), 3);
    assert_eq!(outcome.transcripts.len(), 150);
    assert!(outcome.transcripts.contains_key("call-0000"));
    assert!(outcome.transcripts.contains_key("call-0249"));
    assert!(!outcome.transcripts.contains_key("call-0100"));

    let expected_failed: BTreeSet<String> = call_ids[100..200].iter().cloned().collect();
    assert_eq!(outcome.failed_ids, expected_failed);
    assert!(!outcome.is_complete());
}

#[tokio::test]
async fn test_absent_transcripts_are_not_failures() {
    // The server knows no transcript for half the IDs: they are missing
    // from the result map but are NOT failed - that distinction is the
    // point of the structured outcome.
    let call_ids = ids(10);
    let with_payloads: Vec<&str> = call_ids[..5].iter().map(String::as_str).collect();
    let api = MockCallApi::new().with_transcripts_for(with_payloads);

    let outcome = TranscriptFetcher::new(&api).fetch(&range(), &call_ids).await;

    assert_eq!(outcome.transcripts.len(), 5);
    assert!(outcome.failed_ids.is_empty());
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn test_after_batch_hook_runs_per_batch() {
    let call_ids = ids(250);
    let api = MockCallApi::new()
        .with_transcripts_for(call_ids.iter().map(String::as_str));

    let mut checkpoints: Vec<usize> = Vec::new();
    TranscriptFetcher::new(&api)
        .fetch_with(&range(), &call_ids, |outcome| {
            checkpoints.push(outcome.transcripts.len());
            Ok::<(), DownloadError>(())
        })
        .await
        .unwrap();

    // Cumulative counts after each of the three batches.
    assert_eq!(checkpoints, vec![100, 200, 250]);
}

#[tokio::test]
async fn test_after_batch_hook_error_aborts_remaining_batches() {
    let call_ids = ids(250);
    let api = MockCallApi::new()
        .with_transcripts_for(call_ids.iter().map(String::as_str));

    let result = TranscriptFetcher::new(&api)
        .fetch_with(&range(), &call_ids, |_| Err(DownloadError::Cancelled))
        .await;

    assert!(matches!(result, Err(DownloadError::Cancelled)));
    assert_eq!(api.batch_requests().len(), 1);
}
