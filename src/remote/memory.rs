//! Memory Store Module
//!
//! An in-process [`BackingStore`], handy for tests, demos and single-node
//! deployments that still want the remote facade's behaviour.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::cache::ttl_duration;
use crate::error::StoreError;
use crate::remote::store::{BackingStore, FetchResult};

// == Memory Store ==
/// HashMap-backed store with per-key expiry and optional read latency.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
    read_latency: Option<Duration>,
    reads: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every read, simulating a slow network hop.
    pub fn with_read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (Vec<u8>, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored keys, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `get` calls served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn get(&self, key: &str) -> FetchResult {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.read_latency {
            tokio::time::sleep(latency).await;
        }

        let now = Instant::now();
        let mut entries = self.lock();
        if entries.get(key).is_some_and(|(_, expires_at)| now >= *expires_at) {
            entries.remove(key);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: i64) -> Result<(), StoreError> {
        let expires_at = Instant::now() + ttl_duration(ttl_secs);
        self.lock().insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut entries = self.lock();
        Ok(keys.iter().filter(|k| entries.remove(k.as_str()).is_some()).count())
    }
}
