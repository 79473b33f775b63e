//! Local Cache Module
//!
//! In-process cache engine combining a hash index with an arena-backed
//! recency list. Expiration is lazy: expired entries are only purged when a
//! read touches them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::{dedup_keys, Cache, CacheEntry, RecencyList};
use crate::codec::{Codec, MessagePack};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Inner State ==
/// Index and recency list, always mutated together under one lock.
#[derive(Debug)]
struct Inner {
    /// Key -> handle into `order`
    index: HashMap<String, usize>,
    /// Entries, most recently used first
    order: RecencyList<CacheEntry>,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl Inner {
    fn remove_key(&mut self, key: &str) -> Option<CacheEntry> {
        let idx = self.index.remove(key)?;
        self.order.remove(idx)
    }

    /// Evicts from the tail until the length bound holds again.
    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.order.len() > self.max_entries {
            let Some(entry) = self.order.pop_back() else {
                break;
            };
            self.index.remove(&entry.key);
            debug!(key = %entry.key, "Evicted least recently used entry");
            evicted += 1;
        }
        evicted
    }
}

// == Local Cache ==
/// Bounded in-process cache with LRU eviction and per-entry TTL.
///
/// Every operation takes a single exclusive lock for its whole duration, so
/// operations are fully serialized with respect to each other. Values are
/// stored as bytes produced by the configured [`Codec`].
#[derive(Debug)]
pub struct LocalCache<C: Codec = MessagePack> {
    inner: Mutex<Inner>,
    codec: C,
    /// TTL in seconds used by `set_default`
    default_ttl: i64,
}

impl LocalCache<MessagePack> {
    // == Constructor ==
    /// Creates a new cache using the MessagePack codec.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl` - TTL in seconds applied by `set_default`
    pub fn new(max_entries: usize, default_ttl: i64) -> Self {
        Self::with_codec(MessagePack, max_entries, default_ttl)
    }

    /// Creates a new cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_entries, config.default_ttl)
    }
}

impl<C: Codec> LocalCache<C> {
    /// Creates a new cache with a custom codec.
    pub fn with_codec(codec: C, max_entries: usize, default_ttl: i64) -> Self {
        info!(max_entries, default_ttl, "Local cache initialized");
        Self {
            inner: Mutex::new(Inner {
                index: HashMap::with_capacity(max_entries.min(4096)),
                order: RecencyList::with_capacity(max_entries.min(4096)),
                max_entries,
            }),
            codec,
            default_ttl,
        }
    }

    /// The mutex is never released with the index and list out of sync, so a
    /// poisoned lock still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Get ==
    /// Retrieves and decodes a value by key.
    ///
    /// Expired entries are removed and reported as `Expired`. A hit moves the
    /// entry to the head of the recency list; a decode failure leaves the
    /// recency order untouched.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let Some(&idx) = inner.index.get(key) else {
            return Err(CacheError::NotFound(key.to_string()));
        };

        let decoded = match inner.order.get(idx) {
            Some(entry) if entry.is_expired_at(Instant::now()) => None,
            Some(entry) => Some(self.codec.decode(&entry.value)?),
            None => {
                // Dangling index entry; drop it so the pair stays consistent.
                inner.index.remove(key);
                return Err(CacheError::NotFound(key.to_string()));
            }
        };

        match decoded {
            Some(value) => {
                inner.order.move_to_front(idx);
                Ok(value)
            }
            None => {
                inner.remove_key(key);
                debug!(key, "Purged expired entry on read");
                Err(CacheError::Expired(key.to_string()))
            }
        }
    }

    // == Set ==
    /// Encodes and stores a value that expires `ttl_secs` seconds from now.
    ///
    /// Overwriting replaces both bytes and expiry. Inserting a new key may
    /// evict least recently used entries. An encode failure leaves the cache
    /// exactly as it was.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_secs: i64) -> Result<()> {
        let bytes = self.codec.encode(value)?;

        let mut guard = self.lock();
        let inner = &mut *guard;

        if let Some(&idx) = inner.index.get(key) {
            if let Some(entry) = inner.order.get_mut(idx) {
                entry.refresh(bytes, ttl_secs);
                inner.order.move_to_front(idx);
                return Ok(());
            }
            inner.index.remove(key);
        }

        let idx = inner
            .order
            .push_front(CacheEntry::new(key.to_string(), bytes, ttl_secs));
        inner.index.insert(key.to_string(), idx);
        inner.evict_overflow();

        Ok(())
    }

    /// Stores a value using the configured default TTL.
    pub fn set_default<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, value, self.default_ttl)
    }

    // == Remove ==
    /// Removes every listed key that is present.
    ///
    /// Returns `PartialNotFound` if any requested key was missing; the keys
    /// that were present are removed regardless.
    pub fn remove(&self, keys: &[&str]) -> Result<()> {
        let keys = dedup_keys(keys);
        let mut inner = self.lock();

        let mut found = 0;
        for key in &keys {
            if inner.remove_key(key).is_some() {
                found += 1;
            } else {
                debug!(key = %key, "Remove requested for missing key");
            }
        }

        if found < keys.len() {
            return Err(CacheError::PartialNotFound {
                requested: keys.len(),
                found,
            });
        }
        Ok(())
    }

    // == Resize ==
    /// Changes the capacity, evicting immediately if the cache is now over it.
    ///
    /// Returns the number of evicted entries.
    pub fn resize(&self, max_entries: usize) -> usize {
        let mut inner = self.lock();
        inner.max_entries = max_entries;
        let evicted = inner.evict_overflow();
        info!(max_entries, evicted, "Local cache resized");
        evicted
    }

    // == Length ==
    /// Returns the current number of entries, expired-but-unread ones included.
    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().max_entries
    }

    pub fn default_ttl(&self) -> i64 {
        self.default_ttl
    }

    /// Checks for a key without touching recency or purging it if expired.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().index.contains_key(key)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lock().order.iter().map(|e| e.key.clone()).collect()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.index.clear();
        inner.order.clear();
    }
}

// == Capability Implementation ==
#[async_trait]
impl<C: Codec> Cache for LocalCache<C> {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<T> {
        LocalCache::get(self, key)
    }

    async fn set<T: Serialize + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: i64,
    ) -> Result<()> {
        LocalCache::set(self, key, value, ttl_secs)
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        LocalCache::remove(self, keys)
    }
}
