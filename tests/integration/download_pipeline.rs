//! End-to-end pipeline tests over a scripted API.

use callsync::downloader::{DownloadError, DownloadExecutor, DownloadJob, ResumePolicy, TitleFilter};
use callsync::output::json::save_call_artifact;
use callsync::output::OutputLayout;
use callsync::resume::{ProgressSnapshot, SnapshotStore};
use callsync::shutdown::ShutdownCoordinator;
use callsync::{Call, DateRange};
use std::sync::Arc;
use tempfile::TempDir;

use crate::support::mock_api::{call, page, transcript, MockCallApi};

fn range() -> DateRange {
    DateRange::parse("2024-01-01", "2024-03-31").unwrap()
}

fn ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("call-{i:04}")).collect()
}

fn calls_for(ids: &[String]) -> Vec<Call> {
    ids.iter().map(|id| call(id)).collect()
}

/// 250 calls across three pages, transcripts for all of them.
fn scripted_api(all_ids: &[String]) -> MockCallApi {
    let calls = calls_for(all_ids);
    MockCallApi::new()
        .with_pages(vec![
            page(calls[..100].to_vec(), 250, Some("cursor-1")),
            page(calls[100..200].to_vec(), 250, Some("cursor-2")),
            page(calls[200..].to_vec(), 250, None),
        ])
        .with_transcripts_for(all_ids.iter().map(String::as_str))
}

#[tokio::test]
async fn test_full_pipeline_run() {
    let dir = TempDir::new().unwrap();
    let all_ids = ids(250);
    let api = Arc::new(scripted_api(&all_ids));

    let job = DownloadJob::new(range(), dir.path().to_path_buf());
    let summary = DownloadExecutor::new(api.clone()).run(&job).await.unwrap();

    assert_eq!(summary.total_calls, 250);
    assert_eq!(summary.fetched_transcripts, 250);
    assert_eq!(summary.newly_fetched, 250);
    assert_eq!(summary.reused_transcripts, 0);
    assert!(summary.failed_ids.is_empty());

    // Three discovery pages, three transcript batches of 100/100/50.
    assert_eq!(api.list_request_count(), 3);
    let batch_sizes: Vec<usize> = api.batch_requests().iter().map(Vec::len).collect();
    assert_eq!(batch_sizes, vec![100, 100, 50]);

    // Snapshot cleared after a successful run; artifacts present.
    let layout = OutputLayout::new(dir.path(), 2024);
    assert!(!layout.progress_path().exists());
    assert!(layout.call_artifact_path("call-0000").exists());
    assert!(layout.metadata_csv_path().exists());
    assert!(layout.participants_csv_path().exists());
    assert!(layout.consolidated_path().exists());
    assert!(layout
        .transcripts_dir()
        .join("transcript_call-0000_2024-01-15.txt")
        .exists());
}

#[tokio::test]
async fn test_resume_short_circuit_skips_discovery() {
    // A snapshot with discovered calls means discovery is never re-run,
    // even though the server would answer differently now.
    let dir = TempDir::new().unwrap();
    let all_ids = ids(250);

    let layout = OutputLayout::new(dir.path(), 2024);
    layout.ensure().unwrap();
    let store = SnapshotStore::new(layout.progress_path());
    let mut snapshot = ProgressSnapshot::empty();
    snapshot.set_discovered(calls_for(&all_ids));
    store.save(&snapshot).unwrap();

    // No discovery pages queued: a list request would come back empty and
    // fail the assertions below.
    let api = Arc::new(
        MockCallApi::new().with_transcripts_for(all_ids.iter().map(String::as_str)),
    );

    let job = DownloadJob::new(range(), dir.path().to_path_buf());
    let summary = DownloadExecutor::new(api.clone()).run(&job).await.unwrap();

    assert_eq!(api.list_request_count(), 0);
    assert_eq!(summary.total_calls, 250);
    assert_eq!(summary.newly_fetched, 250);
}

#[tokio::test]
async fn test_always_rediscover_reruns_discovery() {
    let dir = TempDir::new().unwrap();
    let all_ids = ids(10);

    let layout = OutputLayout::new(dir.path(), 2024);
    layout.ensure().unwrap();
    let store = SnapshotStore::new(layout.progress_path());
    let mut snapshot = ProgressSnapshot::empty();
    snapshot.set_discovered(calls_for(&ids(3)));
    store.save(&snapshot).unwrap();

    let api = Arc::new(
        MockCallApi::new()
            .with_pages(vec![page(calls_for(&all_ids), 10, None)])
            .with_transcripts_for(all_ids.iter().map(String::as_str)),
    );

    let job = DownloadJob::new(range(), dir.path().to_path_buf())
        .with_resume_policy(ResumePolicy::AlwaysRediscover);
    let summary = DownloadExecutor::new(api.clone()).run(&job).await.unwrap();

    assert_eq!(api.list_request_count(), 1);
    assert_eq!(summary.total_calls, 10);
}

#[tokio::test]
async fn test_crash_resume_fetches_only_missing_batches() {
    // Simulated crash after batch 1 of 3: snapshot has all 250 discovered
    // calls and the first 100 IDs fetched, with their artifacts on disk.
    let dir = TempDir::new().unwrap();
    let all_ids = ids(250);

    let layout = OutputLayout::new(dir.path(), 2024);
    layout.ensure().unwrap();
    for id in &all_ids[..100] {
        save_call_artifact(&layout, &call(id), Some(&transcript(id))).unwrap();
    }

    let store = SnapshotStore::new(layout.progress_path());
    let mut snapshot = ProgressSnapshot::empty();
    snapshot.set_discovered(calls_for(&all_ids));
    snapshot.record_fetched(all_ids[..100].iter().cloned());
    store.save(&snapshot).unwrap();

    let api = Arc::new(
        MockCallApi::new().with_transcripts_for(all_ids.iter().map(String::as_str)),
    );

    let job = DownloadJob::new(range(), dir.path().to_path_buf());
    let summary = DownloadExecutor::new(api.clone()).run(&job).await.unwrap();

    // Only the remaining 150 IDs are fetched, in two batches.
    assert_eq!(api.list_request_count(), 0);
    let batches = api.batch_requests();
    assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![100, 50]);
    let refetched: Vec<String> = batches.into_iter().flatten().collect();
    assert_eq!(refetched, all_ids[100..].to_vec());

    // Previously fetched transcripts are merged back from artifacts.
    assert_eq!(summary.total_calls, 250);
    assert_eq!(summary.newly_fetched, 150);
    assert_eq!(summary.reused_transcripts, 100);
    assert_eq!(summary.fetched_transcripts, 250);
}

#[tokio::test]
async fn test_failed_batch_is_reported_and_run_completes() {
    let dir = TempDir::new().unwrap();
    let all_ids = ids(250);
    let api = Arc::new(
        scripted_api(&all_ids).with_failing_batch(2), // transcript batch 2 of 3
    );

    let job = DownloadJob::new(range(), dir.path().to_path_buf());
    let summary = DownloadExecutor::new(api).run(&job).await.unwrap();

    assert_eq!(summary.total_calls, 250);
    assert_eq!(summary.fetched_transcripts, 150);
    assert_eq!(summary.failed_ids.len(), 100);
    assert!(summary.failed_ids.contains("call-0100"));
    assert!(summary.failed_ids.contains("call-0199"));

    // The run itself completed: snapshot cleared, metadata written for all
    // 250 calls including the failed ones.
    let layout = OutputLayout::new(dir.path(), 2024);
    assert!(!layout.progress_path().exists());
    let metadata = std::fs::read_to_string(layout.metadata_csv_path()).unwrap();
    assert_eq!(metadata.lines().count(), 251); // header + 250 rows
}

#[tokio::test]
async fn test_title_filter_limits_fetch_scope() {
    let dir = TempDir::new().unwrap();

    let mut demo_call = call("demo-1");
    demo_call.title = Some("Product demo".to_string());
    let mut sync_call = call("sync-1");
    sync_call.title = Some("Weekly sync".to_string());

    let api = Arc::new(
        MockCallApi::new()
            .with_pages(vec![page(vec![demo_call, sync_call], 2, None)])
            .with_transcripts_for(["demo-1", "sync-1"]),
    );

    let job = DownloadJob::new(range(), dir.path().to_path_buf())
        .with_title_filter(TitleFilter::parse("demo"));
    let summary = DownloadExecutor::new(api.clone()).run(&job).await.unwrap();

    assert_eq!(summary.total_calls, 1);
    let requested: Vec<String> = api.batch_requests().into_iter().flatten().collect();
    assert_eq!(requested, vec!["demo-1"]);
}

#[tokio::test]
async fn test_shutdown_saves_snapshot_and_cancels() {
    let dir = TempDir::new().unwrap();
    let all_ids = ids(250);
    let api = Arc::new(scripted_api(&all_ids));

    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let job = DownloadJob::new(range(), dir.path().to_path_buf());
    let result = DownloadExecutor::new(api)
        .with_shutdown(shutdown)
        .run(&job)
        .await;

    assert!(matches!(result, Err(DownloadError::Cancelled)));

    // Discovery completed before the shutdown check, so the snapshot holds
    // it for the next run.
    let layout = OutputLayout::new(dir.path(), 2024);
    let snapshot = SnapshotStore::new(layout.progress_path()).load();
    assert_eq!(snapshot.discovered_calls().len(), 250);
}

#[tokio::test]
async fn test_empty_range_completes_with_nothing() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(MockCallApi::new());

    let job = DownloadJob::new(range(), dir.path().to_path_buf());
    let summary = DownloadExecutor::new(api).run(&job).await.unwrap();

    assert_eq!(summary.total_calls, 0);
    assert_eq!(summary.fetched_transcripts, 0);
    assert_eq!(summary.success_rate(), 0.0);
}
