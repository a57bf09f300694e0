//! Integration tests for the read-through cache
//!
//! Covers the connectivity decision table, bounded retry with stale
//! fallback, single-flight supersession and reconnect reconciliation.

mod support;

use std::sync::Arc;
use std::time::Duration;

use docket_core::{CacheError, CacheOptions, IntelligentCache, Store};
use docket_domain::CacheSource;
use support::{memory_store, network, set_online, ScriptedFetcher};

fn options(key: &str) -> CacheOptions {
    CacheOptions::new(key)
        .with_ttls(Duration::from_secs(300), Duration::from_secs(86_400))
        .with_retries(2, Duration::from_millis(100))
        .with_min_fetch_interval(Duration::ZERO)
}

/// Validates that nothing is fetched while offline.
///
/// Assertions:
/// - Confirms an empty offline cache yields `None` without fetching.
/// - Confirms a populated offline cache serves its value without fetching.
#[tokio::test(start_paused = true)]
async fn test_offline_never_fetches() {
    let store = memory_store();
    let fetcher = Arc::new(ScriptedFetcher::always("clients"));
    let (tx, rx) = network(false);
    let cache: IntelligentCache<String> =
        IntelligentCache::new(Arc::clone(&store), fetcher.clone(), rx, options("clients"));

    assert_eq!(cache.get().await.unwrap(), None);
    assert_eq!(fetcher.calls(), 0);

    set_online(&tx, true);
    assert_eq!(cache.get().await.unwrap(), Some("clients#1".to_string()));

    set_online(&tx, false);
    tokio::time::advance(Duration::from_secs(3_600)).await;
    assert_eq!(cache.refetch().await.unwrap(), Some("clients#1".to_string()));
    assert_eq!(cache.get().await.unwrap(), Some("clients#1".to_string()));
    assert_eq!(fetcher.calls(), 1);
}

/// Validates bounded retry followed by fallback to the cached value.
///
/// Assertions:
/// - Confirms exactly `max_retries + 1` attempts are made.
/// - Confirms the stale cached value is returned and counted.
#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_serves_stale() {
    let store = memory_store();
    let (_tx, rx) = network(true);
    let seed: IntelligentCache<String> = IntelligentCache::new(
        Arc::clone(&store),
        Arc::new(ScriptedFetcher::always("matters")),
        rx.clone(),
        options("matters"),
    );
    seed.get().await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::failing("503 Service Unavailable"));
    let cache: IntelligentCache<String> =
        IntelligentCache::new(store, fetcher.clone(), rx, options("matters"));

    let value = cache.refetch().await.unwrap();
    assert_eq!(value, Some("matters#1".to_string()));
    assert_eq!(fetcher.calls(), 3);

    let stats = cache.stats();
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.stale_fallbacks, 1);
    assert!(cache.snapshot().await.last_error.is_some());
}

/// Validates the failure surfaces when nothing is cached.
///
/// Assertions:
/// - Confirms `FetchFailed` reports the key and attempt count.
#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_without_cache_fails() {
    let (_tx, rx) = network(true);
    let fetcher = Arc::new(ScriptedFetcher::failing("connection reset"));
    let cache: IntelligentCache<String> =
        IntelligentCache::new(memory_store(), fetcher.clone(), rx, options("billing"));

    match cache.get().await {
        Err(CacheError::FetchFailed { key, attempts, message }) => {
            assert_eq!(key, "billing");
            assert_eq!(attempts, 3);
            assert!(message.contains("connection reset"));
        }
        other => panic!("expected FetchFailed, got {other:?}"),
    }
}

/// Validates a transient failure recovers within the retry budget.
///
/// Assertions:
/// - Confirms the second attempt's value is returned and persisted.
#[tokio::test(start_paused = true)]
async fn test_transient_failure_recovers() {
    let store = memory_store();
    let (_tx, rx) = network(true);
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Err("timeout"), Ok("academy")]));
    let cache: IntelligentCache<String> =
        IntelligentCache::new(Arc::clone(&store), fetcher.clone(), rx, options("academy"));

    assert_eq!(cache.get().await.unwrap(), Some("academy#2".to_string()));
    let entry = cache.cached().await.unwrap();
    assert_eq!(entry.source, CacheSource::Network);
    assert!(store.get("academy").await.unwrap().is_some());
}

/// Validates a newer fetch supersedes one in flight.
///
/// Assertions:
/// - Confirms the superseded call returns the previous cached value.
/// - Confirms the stored value comes from the newer fetch.
#[tokio::test(start_paused = true)]
async fn test_single_flight_supersedes() {
    let (_tx, rx) = network(true);
    let fetcher = Arc::new(ScriptedFetcher::always("proposals").with_delay(Duration::from_secs(2)));
    let cache: IntelligentCache<String> =
        IntelligentCache::new(memory_store(), fetcher.clone(), rx, options("proposals"));

    let slow = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get().await }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(cache.snapshot().await.is_loading);

    let fresh = cache.refetch().await.unwrap();
    let superseded = slow.await.unwrap().unwrap();

    assert_eq!(superseded, None);
    assert_eq!(fresh, Some("proposals#2".to_string()));
    assert_eq!(cache.cached().await.unwrap().data, "proposals#2");
}

/// Validates retries stop once connectivity drops mid-backoff.
///
/// Assertions:
/// - Confirms no fetch is issued after going offline.
/// - Confirms the failure reports only the attempt actually made.
#[tokio::test(start_paused = true)]
async fn test_offline_between_retries_stops_fetching() {
    let (tx, rx) = network(true);
    let fetcher = Arc::new(ScriptedFetcher::failing("gateway timeout"));
    let cache: IntelligentCache<String> = IntelligentCache::new(
        memory_store(),
        fetcher.clone(),
        rx,
        options("trust_ledger").with_retries(3, Duration::from_millis(100)),
    );

    let drop_link = async {
        while fetcher.calls() == 0 {
            tokio::task::yield_now().await;
        }
        set_online(&tx, false);
    };
    let (result, ()) = tokio::join!(cache.get(), drop_link);

    match result {
        Err(CacheError::FetchFailed { attempts, .. }) => assert_eq!(attempts, 1),
        other => panic!("expected FetchFailed, got {other:?}"),
    }
    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.stats().retries, 1);
}

/// Validates optimistic updates are reconciled after reconnecting.
///
/// Assertions:
/// - Confirms the optimistic value is served while offline.
/// - Confirms the watcher refetches once the network returns.
#[tokio::test(start_paused = true)]
async fn test_reconnect_reconciles_optimistic_update() {
    let (tx, rx) = network(false);
    let fetcher = Arc::new(ScriptedFetcher::always("calendar"));
    let cache: IntelligentCache<String> = IntelligentCache::new(
        memory_store(),
        fetcher.clone(),
        rx,
        options("calendar").with_sync_on_reconnect(true),
    );
    assert!(cache.spawn_reconnect_watcher());
    assert!(!cache.spawn_reconnect_watcher());

    cache.update_cache("local booking".to_string()).await.unwrap();
    assert_eq!(cache.get().await.unwrap(), Some("local booking".to_string()));

    set_online(&tx, true);
    for _ in 0..10 {
        let reconciled = cache.cached().await.is_some_and(|e| e.source == CacheSource::Network);
        if reconciled {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let entry = cache.cached().await.unwrap();
    assert_eq!(entry.source, CacheSource::Network);
    assert_eq!(entry.data, "calendar#1");
    assert_eq!(fetcher.calls(), 1);
    cache.stop().await;
}

/// Validates invalidation purges and refetches.
///
/// Assertions:
/// - Confirms a fresh entry is replaced by a new network read.
#[tokio::test(start_paused = true)]
async fn test_invalidate_refetches() {
    let (_tx, rx) = network(true);
    let fetcher = Arc::new(ScriptedFetcher::always("clients"));
    let cache: IntelligentCache<String> =
        IntelligentCache::new(memory_store(), fetcher.clone(), rx, options("clients"));

    cache.get().await.unwrap();
    assert_eq!(cache.invalidate().await.unwrap(), Some("clients#2".to_string()));
    assert_eq!(fetcher.calls(), 2);
}
