//! Tests for refresh deduplication across concurrent callers.

mod common;

use common::{Sequence, init_tracing, ms};
use freshcell::{CacheOptions, TtlCache};
use futures::future::join_all;
use tokio::time::advance;

fn spawn_gets(
    cache: &TtlCache<u64>,
    callers: usize,
) -> Vec<tokio::task::JoinHandle<freshcell::FreshcellResult<u64>>> {
    (0..callers)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get().await })
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_refresh() {
    init_tracing();
    let seq = Sequence::with_delay(ms(50));
    let cache = TtlCache::bound(ms(1_000), CacheOptions::default(), seq.clone());

    let results = join_all(spawn_gets(&cache, 16)).await;
    for result in results {
        assert_eq!(result.unwrap().unwrap(), 1);
    }

    assert_eq!(seq.calls(), 1);
    let stats = cache.stats();
    assert_eq!(*stats.sync_refreshes(), 1);
    assert_eq!(*stats.shared_outcomes(), 15);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_failure() {
    let seq = Sequence::with_delay(ms(50));
    seq.set_failing(true);
    let cache = TtlCache::bound(ms(1_000), CacheOptions::default(), seq.clone());

    let results = join_all(spawn_gets(&cache, 8)).await;
    for result in results {
        let err = result.unwrap().unwrap_err();
        assert!(err.to_string().contains("refresh 1 failed"));
    }
    assert_eq!(seq.calls(), 1);
    assert_eq!(*cache.stats().failures(), 1);

    // A caller arriving after the failed flight refreshes on its own.
    seq.set_failing(false);
    assert_eq!(cache.get().await.unwrap(), 2);
    assert_eq!(seq.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_expired_value_refreshed_once_for_many_callers() {
    let seq = Sequence::new();
    let cache = TtlCache::bound(ms(100), CacheOptions::default(), seq.clone());
    assert_eq!(cache.get().await.unwrap(), 1);

    seq.set_delay(ms(40));
    advance(ms(250)).await;

    let results = join_all(spawn_gets(&cache, 10)).await;
    for result in results {
        assert_eq!(result.unwrap().unwrap(), 2);
    }
    assert_eq!(seq.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_queued_callers_get_last_good_after_suppressed_failure() {
    let seq = Sequence::new();
    let cache = TtlCache::bound(
        ms(100),
        CacheOptions::default().with_return_last_good(true),
        seq.clone(),
    );
    assert_eq!(cache.get().await.unwrap(), 1);

    seq.set_failing(true);
    seq.set_delay(ms(50));
    advance(ms(150)).await;

    let results = join_all(spawn_gets(&cache, 4)).await;
    for result in results {
        assert_eq!(result.unwrap().unwrap(), 1);
    }

    assert_eq!(seq.calls(), 2);
    let stats = cache.stats();
    assert_eq!(*stats.suppressed_failures(), 1);
    assert_eq!(*stats.shared_outcomes(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_synchronous_caller_waits_on_background_refresh() {
    let seq = Sequence::new();
    let cache = TtlCache::bound(
        ms(100),
        CacheOptions::default().with_no_wait(true),
        seq.clone(),
    );
    assert_eq!(cache.get().await.unwrap(), 1);

    // Start a slow background refresh from the stale window.
    seq.set_delay(ms(300));
    advance(ms(150)).await;
    assert_eq!(cache.get().await.unwrap(), 1);
    tokio::task::yield_now().await;

    // Once the value is past twice the TTL, callers queue behind the
    // refresh already in flight instead of starting another.
    advance(ms(100)).await;
    assert_eq!(cache.get().await.unwrap(), 2);
    assert_eq!(seq.calls(), 2);
    assert_eq!(*cache.stats().background_refreshes(), 1);
    assert_eq!(*cache.stats().sync_refreshes(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_flight_across_threads() {
    let seq = Sequence::with_delay(ms(20));
    let cache = TtlCache::bound(ms(60_000), CacheOptions::default(), seq.clone());

    let results = join_all(spawn_gets(&cache, 32)).await;
    for result in results {
        assert_eq!(result.unwrap().unwrap(), 1);
    }
    assert_eq!(seq.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_background_timeout_not_shared_with_queued_caller() {
    let seq = Sequence::new();
    let cache = TtlCache::with_binding(
        freshcell::Binding::new(ms(100), CacheOptions::default().with_no_wait(true), seq.clone())
            .with_background_timeout(ms(80)),
    );
    assert_eq!(cache.get().await.unwrap(), 1);

    // t=150: stale, starts a background refresh that times out at t=230.
    seq.set_delay(ms(200));
    advance(ms(150)).await;
    assert_eq!(cache.get().await.unwrap(), 1);
    tokio::task::yield_now().await;
    assert_eq!(seq.calls(), 2);

    // t=210: expired, so this caller queues behind the background refresh.
    advance(ms(60)).await;
    seq.set_delay(ms(0));
    let queued = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get().await })
    };

    // The background timeout is not the caller's deadline; it refreshes itself.
    assert_eq!(queued.await.unwrap().unwrap(), 3);
    assert_eq!(seq.calls(), 3);
    let stats = cache.stats();
    assert_eq!(*stats.failures(), 1);
    assert_eq!(*stats.shared_outcomes(), 0);
    assert_eq!(*stats.sync_refreshes(), 2);
}
