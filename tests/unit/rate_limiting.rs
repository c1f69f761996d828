//! Unit tests for request spacing.

use callsync::downloader::RateLimiter;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_acquire_spacing_floor() {
    // For rate r, N acquisitions cannot complete faster than (N-1)/r.
    let limiter = RateLimiter::new(20.0);
    let start = Instant::now();
    for _ in 0..5 {
        limiter.acquire().await;
    }
    // (5-1)/20 = 200ms minimum.
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_only_first_acquire_is_free() {
    let limiter = RateLimiter::new(10.0);

    let start = Instant::now();
    limiter.acquire().await;
    let first = start.elapsed();
    limiter.acquire().await;
    let second = start.elapsed();

    assert!(first < Duration::from_millis(50));
    assert!(second >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_spacing_holds_across_tasks() {
    // Concurrent callers queue on the limiter; grants stay spaced even when
    // acquisitions come from different tasks.
    let limiter = Arc::new(RateLimiter::new(20.0));
    let start = Instant::now();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.acquire().await;
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_idle_time_counts_toward_spacing() {
    // Sleeping past the interval makes the next acquire immediate.
    let limiter = RateLimiter::new(10.0);
    limiter.acquire().await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    let start = Instant::now();
    limiter.acquire().await;
    assert!(start.elapsed() < Duration::from_millis(50));
}
