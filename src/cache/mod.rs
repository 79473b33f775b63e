//! Cache Module
//!
//! The get/set/remove capability shared by every backend, plus the
//! in-process LRU/TTL engine that implements it locally.

mod entry;
mod local;
mod lru;


use std::collections::HashSet;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

// Re-export public types
pub use entry::{ttl_duration, CacheEntry, MAX_TTL_SECS};
pub use local::LocalCache;
pub use lru::RecencyList;

// == Cache Capability ==
/// Uniform get/set/remove contract implemented by every backend.
///
/// Callers program against this trait and pick the backend at construction
/// time; substitution is by generics (`fn f<C: Cache>(cache: &C)`). The two
/// backends differ only in latency and consistency characteristics.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetches and decodes the value stored under `key`.
    ///
    /// Fails with `NotFound` or `Expired` on a miss, `Serialization` if the
    /// stored bytes do not decode as `T`.
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<T>;

    /// Encodes `value` and stores it for `ttl_secs` seconds.
    ///
    /// A non-positive TTL stores an entry that is already expired.
    async fn set<T: Serialize + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: i64,
    ) -> Result<()>;

    /// Removes the given keys, reporting `PartialNotFound` if some were absent.
    async fn remove(&self, keys: &[&str]) -> Result<()>;
}

/// Drops repeated keys while keeping first-seen order.
pub(crate) fn dedup_keys<'a>(keys: &[&'a str]) -> Vec<&'a str> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter().copied().filter(|k| seen.insert(*k)).collect()
}
