//! Integration Tests for the Cache Capability
//!
//! Drives both backends through the shared `Cache` trait.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tiered_cache::remote::FetchResult;
use tiered_cache::{
    AnyCache, Backend, BackingStore, Cache, CacheError, Codec, Config, LocalCache, MemoryStore,
    MessagePack, RemoteCache, Result, SharedStore, StoreError,
};
use tokio::sync::Notify;

// == Helper Functions ==

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    items: Vec<String>,
    total_cents: i64,
}

fn sample_order() -> Order {
    Order {
        id: 42,
        items: vec!["book".to_string(), "pen".to_string()],
        total_cents: 1999,
    }
}

/// Caller code written once against the capability.
async fn save_and_load<C: Cache>(cache: &C) -> Result<Order> {
    cache.set("order:42", &sample_order(), 60).await?;
    cache.get("order:42").await
}

async fn get_i32<C: Cache>(cache: &C, key: &str) -> Result<i32> {
    cache.get(key).await
}

// == Substitution ==

#[tokio::test]
async fn test_same_caller_works_with_both_backends() {
    let local = LocalCache::new(10, 300);
    let remote = RemoteCache::new(MemoryStore::new());

    assert_eq!(save_and_load(&local).await.unwrap(), sample_order());
    assert_eq!(save_and_load(&remote).await.unwrap(), sample_order());
}

#[tokio::test]
async fn test_both_backends_report_missing_keys_alike() {
    let local = LocalCache::new(10, 300);
    let remote = RemoteCache::new(MemoryStore::new());

    assert!(matches!(
        get_i32(&local, "nope").await,
        Err(CacheError::NotFound(_))
    ));
    assert!(matches!(
        get_i32(&remote, "nope").await,
        Err(CacheError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_both_backends_share_remove_contract() {
    async fn check<C: Cache>(cache: &C) {
        cache.set("a", &1, 60).await.unwrap();
        cache.set("b", &2, 60).await.unwrap();

        cache.remove(&["a"]).await.unwrap();
        let partial = cache.remove(&["b", "missing"]).await;
        assert!(matches!(
            partial,
            Err(CacheError::PartialNotFound {
                requested: 2,
                found: 1
            })
        ));
        assert!(get_i32(cache, "b").await.unwrap_err().is_miss());
    }

    check(&LocalCache::new(10, 300)).await;
    check(&RemoteCache::new(MemoryStore::new())).await;
}

#[tokio::test(start_paused = true)]
async fn test_far_future_ttl_accepted_by_both_backends() {
    async fn check<C: Cache>(cache: &C) {
        cache.set("forever", &7, i64::MAX).await.unwrap();
        tokio::time::advance(Duration::from_secs(50 * 365 * 24 * 60 * 60)).await;
        assert_eq!(get_i32(cache, "forever").await.unwrap(), 7);
    }

    check(&LocalCache::new(10, 300)).await;
    check(&RemoteCache::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn test_backend_chosen_at_runtime() {
    let store = Arc::new(MemoryStore::new());
    let caches: Vec<AnyCache> = [Backend::Local, Backend::Remote]
        .into_iter()
        .map(|backend| {
            let config = Config {
                backend,
                ..Config::default()
            };
            let store = Arc::clone(&store);
            AnyCache::from_config(&config, move || store as SharedStore)
        })
        .collect();

    for cache in &caches {
        assert_eq!(save_and_load(cache).await.unwrap(), sample_order());
        cache.remove(&["order:42"]).await.unwrap();
        assert!(matches!(
            get_i32(cache, "order:42").await,
            Err(CacheError::NotFound(_))
        ));
    }
    assert_eq!(store.read_count(), 2, "only the remote handle reaches the store");
}

// == Local Scenarios ==

#[tokio::test]
async fn test_scenario_a_overflow_evicts_oldest() {
    let cache = LocalCache::new(2, 300);
    Cache::set(&cache, "a", &1, 60).await.unwrap();
    Cache::set(&cache, "b", &2, 60).await.unwrap();
    Cache::set(&cache, "c", &3, 60).await.unwrap();

    assert_eq!(cache.len(), 2);
    assert!(matches!(
        get_i32(&cache, "a").await,
        Err(CacheError::NotFound(_))
    ));
    assert_eq!(get_i32(&cache, "b").await.unwrap(), 2);
    assert_eq!(get_i32(&cache, "c").await.unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_b_zero_ttl_is_expired() {
    let cache = LocalCache::new(10, 300);
    Cache::set(&cache, "x", &1, 0).await.unwrap();

    assert!(matches!(
        get_i32(&cache, "x").await,
        Err(CacheError::Expired(_))
    ));
    assert_eq!(cache.len(), 0);
}

#[tokio::test]
async fn test_scenario_c_read_protects_from_eviction() {
    let cache = LocalCache::new(2, 300);
    Cache::set(&cache, "k", &1, 60).await.unwrap();
    get_i32(&cache, "k").await.unwrap();
    Cache::set(&cache, "j", &2, 60).await.unwrap();
    Cache::set(&cache, "m", &3, 60).await.unwrap();

    assert!(matches!(
        get_i32(&cache, "j").await,
        Err(CacheError::NotFound(_))
    ));
    assert_eq!(get_i32(&cache, "k").await.unwrap(), 1);
    assert_eq!(get_i32(&cache, "m").await.unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_lazy_expiry_after_ttl() {
    let cache = LocalCache::new(10, 300);
    Cache::set(&cache, "session", "token", 30).await.unwrap();

    tokio::time::advance(Duration::from_secs(29)).await;
    let still_valid: String = Cache::get(&cache, "session").await.unwrap();
    assert_eq!(still_valid, "token");

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.len(), 1, "expiry is only detected on access");
    let expired: Result<String> = Cache::get(&cache, "session").await;
    assert!(matches!(expired, Err(CacheError::Expired(_))));
    assert_eq!(cache.len(), 0);
}

// == Remote Coalescing ==

/// Counts reads and holds them until released.
#[derive(Default)]
struct SlowStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    release: Notify,
}

#[async_trait]
impl BackingStore for SlowStore {
    async fn get(&self, key: &str) -> FetchResult {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: i64,
    ) -> std::result::Result<(), StoreError> {
        self.inner.set(key, value, ttl_secs).await
    }

    async fn delete(&self, keys: &[String]) -> std::result::Result<usize, StoreError> {
        self.inner.delete(keys).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_gets_one_fetch() {
    let store = Arc::new(SlowStore::default());
    let cache = Arc::new(RemoteCache::new(Arc::clone(&store)));
    store
        .inner
        .set("order:42", MessagePack.encode(&sample_order()).unwrap(), 60)
        .await
        .unwrap();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get::<Order>("order:42").await })
        })
        .collect();

    // One reader owns the fetch; the other 31 must be attached before release
    while store.reads.load(Ordering::SeqCst) == 0 || cache.waiting("order:42") < 31 {
        tokio::task::yield_now().await;
    }
    assert_eq!(cache.in_flight(), 1);
    store.release.notify_one();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), sample_order());
    }
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    assert_eq!(cache.in_flight(), 0);

    // A later read starts a fresh fetch
    store.release.notify_one();
    assert_eq!(cache.get::<Order>("order:42").await.unwrap(), sample_order());
    assert_eq!(store.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_writes_bypass_coalescing() {
    let store = Arc::new(SlowStore::default());
    let cache = RemoteCache::new(Arc::clone(&store));

    cache.set("k", &5, 60).await.unwrap();
    cache.remove(&["k"]).await.unwrap();

    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn test_independent_facades_do_not_share_in_flight_state() {
    let store = Arc::new(SlowStore::default());
    let first = Arc::new(RemoteCache::new(Arc::clone(&store)));
    let second = Arc::new(RemoteCache::new(Arc::clone(&store)));

    let a = {
        let first = Arc::clone(&first);
        tokio::spawn(async move { first.get::<i32>("k").await })
    };
    let b = {
        let second = Arc::clone(&second);
        tokio::spawn(async move { second.get::<i32>("k").await })
    };
    while store.reads.load(Ordering::SeqCst) < 2 {
        tokio::task::yield_now().await;
    }
    assert_eq!(first.in_flight(), 1);
    assert_eq!(second.in_flight(), 1);

    store.release.notify_one();
    store.release.notify_one();
    assert!(a.await.unwrap().unwrap_err().is_miss());
    assert!(b.await.unwrap().unwrap_err().is_miss());
}
