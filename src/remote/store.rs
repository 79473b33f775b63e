//! Backing Store Module
//!
//! The byte-level key-value capability the remote facade sits on top of.

use async_trait::async_trait;

use crate::error::StoreError;

/// Result of a single backing-store read: `None` means the key is absent.
pub type FetchResult = std::result::Result<Option<Vec<u8>>, StoreError>;

// == Backing Store ==
/// Remote key-value store consumed by [`RemoteCache`](crate::remote::RemoteCache).
///
/// Connection handling and wire protocol belong to the implementor; the cache
/// only ever sees opaque bytes.
#[async_trait]
pub trait BackingStore: Send + Sync + 'static {
    /// Reads the bytes stored under `key`.
    async fn get(&self, key: &str) -> FetchResult;

    /// Writes `value` under `key` with a TTL in seconds.
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: i64) -> Result<(), StoreError>;

    /// Deletes the given keys and returns how many actually existed.
    async fn delete(&self, keys: &[String]) -> Result<usize, StoreError>;
}

#[async_trait]
impl<S: BackingStore + ?Sized> BackingStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> FetchResult {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: i64) -> Result<(), StoreError> {
        (**self).set(key, value, ttl_secs).await
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, StoreError> {
        (**self).delete(keys).await
    }
}
