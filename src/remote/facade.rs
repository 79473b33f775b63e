//! Remote Cache Module
//!
//! Cache capability over a [`BackingStore`] with optional read coalescing.
//! Writes and deletes always go straight to the store; nothing is cached
//! locally here.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::cache::{dedup_keys, Cache};
use crate::codec::{Codec, MessagePack};
use crate::config::Config;
use crate::error::{CacheError, Result, StoreError};
use crate::remote::coalesce::Coalescer;
use crate::remote::store::{BackingStore, FetchResult};

// == Remote Cache ==
/// Facade that deduplicates concurrent reads of the same key.
///
/// With coalescing enabled, at most one `BackingStore::get` per key is in
/// flight at any instant for this instance; callers arriving meanwhile wait
/// for that fetch and receive the same result. Waiting has no timeout, so a
/// store call that never returns blocks every caller attached to it.
pub struct RemoteCache<S: BackingStore, C: Codec = MessagePack> {
    store: S,
    codec: C,
    coalescer: Coalescer,
    coalescing: bool,
}

impl<S: BackingStore> RemoteCache<S, MessagePack> {
    // == Constructor ==
    /// Creates a coalescing facade using the MessagePack codec.
    pub fn new(store: S) -> Self {
        Self::with_codec(store, MessagePack)
    }

    /// Creates a facade from configuration.
    pub fn from_config(store: S, config: &Config) -> Self {
        Self::new(store).coalescing(config.coalescing)
    }
}

impl<S: BackingStore, C: Codec> RemoteCache<S, C> {
    /// Creates a coalescing facade with a custom codec.
    pub fn with_codec(store: S, codec: C) -> Self {
        Self {
            store,
            codec,
            coalescer: Coalescer::new(),
            coalescing: true,
        }
    }

    /// Enables or disables read coalescing.
    ///
    /// Disable it when the store client already deduplicates, or to measure
    /// raw store latency.
    pub fn coalescing(mut self, enabled: bool) -> Self {
        info!(coalescing = enabled, "Remote cache coalescing configured");
        self.coalescing = enabled;
        self
    }

    pub fn is_coalescing(&self) -> bool {
        self.coalescing
    }

    /// Number of keys with a coalesced fetch outstanding.
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }

    /// Number of callers attached to the outstanding fetch for `key`.
    pub fn waiting(&self, key: &str) -> usize {
        self.coalescer.waiting(key)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn fetch(&self, key: &str) -> FetchResult {
        if self.coalescing {
            self.coalescer.run(key, || self.store.get(key)).await
        } else {
            self.store.get(key).await
        }
    }
}

fn store_failure(op: &'static str, key: &str, err: StoreError) -> CacheError {
    warn!(op, key, error = %err, "Backing store call failed");
    CacheError::BackingStore(err)
}

// == Capability Implementation ==
#[async_trait]
impl<S: BackingStore, C: Codec> Cache for RemoteCache<S, C> {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<T> {
        match self.fetch(key).await {
            Ok(Some(bytes)) => self.codec.decode(&bytes),
            Ok(None) => Err(CacheError::NotFound(key.to_string())),
            Err(err) => Err(store_failure("get", key, err)),
        }
    }

    async fn set<T: Serialize + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: i64,
    ) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        self.store
            .set(key, bytes, ttl_secs)
            .await
            .map_err(|err| store_failure("set", key, err))
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let keys: Vec<String> = dedup_keys(keys).into_iter().map(str::to_string).collect();
        if keys.is_empty() {
            return Ok(());
        }

        let found = self
            .store
            .delete(&keys)
            .await
            .map_err(|err| store_failure("delete", &keys.join(","), err))?;

        if found < keys.len() {
            return Err(CacheError::PartialNotFound {
                requested: keys.len(),
                found,
            });
        }
        Ok(())
    }
}
