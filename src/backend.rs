//! Backend Selection Module
//!
//! A single handle over either backend, chosen at runtime from [`Config`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::cache::{Cache, LocalCache};
use crate::config::{Backend, Config};
use crate::error::Result;
use crate::remote::{BackingStore, RemoteCache};

/// Store handle used when the backend is picked at runtime.
pub type SharedStore = Arc<dyn BackingStore>;

// == Any Cache ==
/// Either backend behind one concrete type.
///
/// `Cache` has generic methods and cannot be used as `dyn Cache`; this enum is
/// the runtime-selected alternative. Callers that know their backend at
/// compile time can keep using `LocalCache` or `RemoteCache` directly.
pub enum AnyCache {
    Local(LocalCache),
    Remote(RemoteCache<SharedStore>),
}

impl AnyCache {
    // == Constructor ==
    /// Builds the backend named by `config.backend`.
    ///
    /// # Arguments
    /// * `config` - Capacity, TTL, coalescing and backend settings
    /// * `connect` - Opens the backing store; only called for `Backend::Remote`
    pub fn from_config<F>(config: &Config, connect: F) -> Self
    where
        F: FnOnce() -> SharedStore,
    {
        info!(backend = ?config.backend, "Selecting cache backend");
        match config.backend {
            Backend::Local => Self::Local(LocalCache::from_config(config)),
            Backend::Remote => Self::Remote(RemoteCache::from_config(connect(), config)),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Local(_) => Backend::Local,
            Self::Remote(_) => Backend::Remote,
        }
    }
}

impl From<LocalCache> for AnyCache {
    fn from(cache: LocalCache) -> Self {
        Self::Local(cache)
    }
}

impl From<RemoteCache<SharedStore>> for AnyCache {
    fn from(cache: RemoteCache<SharedStore>) -> Self {
        Self::Remote(cache)
    }
}

#[async_trait]
impl Cache for AnyCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<T> {
        match self {
            Self::Local(cache) => Cache::get(cache, key).await,
            Self::Remote(cache) => cache.get(key).await,
        }
    }

    async fn set<T: Serialize + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: i64,
    ) -> Result<()> {
        match self {
            Self::Local(cache) => Cache::set(cache, key, value, ttl_secs).await,
            Self::Remote(cache) => cache.set(key, value, ttl_secs).await,
        }
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        match self {
            Self::Local(cache) => Cache::remove(cache, keys).await,
            Self::Remote(cache) => cache.remove(keys).await,
        }
    }
}
