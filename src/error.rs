//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache backend.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key was present but its TTL had elapsed
    #[error("Key expired: {0}")]
    Expired(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failure reported by the backing store
    #[error("Backing store error: {0}")]
    BackingStore(#[from] StoreError),

    /// Some keys of a batch remove were not present
    #[error("Removed {found} of {requested} keys")]
    PartialNotFound { requested: usize, found: usize },
}

impl CacheError {
    // == Is Miss ==
    /// Returns true when the error means "no usable value for this key".
    ///
    /// Callers normally treat `Expired` exactly like `NotFound`; the two are
    /// only kept apart for diagnostics.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }
}

// == Store Error ==
/// Opaque error raised by a [`BackingStore`](crate::remote::BackingStore).
///
/// Cloneable so a single failed fetch can be handed to every coalesced waiter.
#[derive(Clone)]
pub struct StoreError(Arc<anyhow::Error>);

impl StoreError {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(err.into()))
    }

    /// Builds an error from a plain message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self(Arc::new(anyhow::Error::msg(message)))
    }

    /// Returns true if both values share the same underlying failure.
    pub fn same_as(&self, other: &StoreError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl fmt::Debug for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreError({:?})", self.0)
    }
}

impl std::error::Error for StoreError {}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
