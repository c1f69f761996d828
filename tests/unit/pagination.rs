//! Unit tests for cursor-driven call discovery.

use callsync::client::pagination::{CallLister, DiscoveryProgress};
use callsync::DateRange;
use std::sync::Mutex;

use crate::support::mock_api::{call, page, MockCallApi};

fn range() -> DateRange {
    DateRange::parse("2024-01-01", "2024-03-31").unwrap()
}

fn ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i:03}")).collect()
}

#[tokio::test]
async fn test_single_page_discovery() {
    let api = MockCallApi::new().with_pages(vec![page(
        ids("c", 3).iter().map(|id| call(id)).collect(),
        3,
        None,
    )]);

    let calls = CallLister::new(&api).list(&range(), |_| {}).await.unwrap();

    assert_eq!(calls.len(), 3);
    assert_eq!(api.list_request_count(), 1);
    assert_eq!(api.cursors_seen(), vec![None]);
}

#[tokio::test]
async fn test_multi_page_discovery_concatenates_in_order() {
    // Three pages, cursors on all but the last.
    let api = MockCallApi::new().with_pages(vec![
        page(
            ids("a", 100).iter().map(|id| call(id)).collect(),
            250,
            Some("cursor-1"),
        ),
        page(
            ids("b", 100).iter().map(|id| call(id)).collect(),
            250,
            Some("cursor-2"),
        ),
        page(ids("c", 50).iter().map(|id| call(id)).collect(), 250, None),
    ]);

    let calls = CallLister::new(&api).list(&range(), |_| {}).await.unwrap();

    // Exactly N requests for N pages, cursors threaded through verbatim.
    assert_eq!(api.list_request_count(), 3);
    assert_eq!(
        api.cursors_seen(),
        vec![
            None,
            Some("cursor-1".to_string()),
            Some("cursor-2".to_string())
        ]
    );

    // All pages concatenated in server order.
    assert_eq!(calls.len(), 250);
    assert_eq!(calls[0].id, "a-000");
    assert_eq!(calls[99].id, "a-099");
    assert_eq!(calls[100].id, "b-000");
    assert_eq!(calls[249].id, "c-049");
}

#[tokio::test]
async fn test_empty_cursor_terminates_discovery() {
    let api = MockCallApi::new().with_pages(vec![page(
        vec![call("only")],
        1,
        Some(""), // blank cursor counts as absent
    )]);

    let calls = CallLister::new(&api).list(&range(), |_| {}).await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(api.list_request_count(), 1);
}

#[tokio::test]
async fn test_discovery_progress_observed_per_page() {
    let api = MockCallApi::new().with_pages(vec![
        page(vec![call("a")], 2, Some("cursor-1")),
        page(vec![call("b")], 2, None),
    ]);

    let observed: Mutex<Vec<DiscoveryProgress>> = Mutex::new(Vec::new());
    CallLister::new(&api)
        .list(&range(), |progress| {
            observed.lock().unwrap().push(progress);
        })
        .await
        .unwrap();

    let observed = observed.into_inner().unwrap();
    assert_eq!(observed.len(), 2);
    assert_eq!(observed[0].fetched, 1);
    assert_eq!(observed[0].pages, 1);
    assert_eq!(observed[0].total_hint, Some(2));
    assert_eq!(observed[1].fetched, 2);
    assert_eq!(observed[1].pages, 2);
}

#[tokio::test]
async fn test_endless_cursor_hits_page_ceiling() {
    let api = MockCallApi::new().with_endless_cursor();

    let result = CallLister::new(&api).list(&range(), |_| {}).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("pages"), "unexpected error: {err}");
    assert_eq!(api.list_request_count(), 1_000);
}
