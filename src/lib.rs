//! Tiered Cache - A pluggable get/set/remove cache
//!
//! Provides one capability with two backends: a bounded in-process cache with
//! LRU eviction and lazy TTL expiration, and a facade over a remote key-value
//! store that coalesces concurrent reads of the same key.

pub mod backend;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod remote;

pub use backend::{AnyCache, SharedStore};
pub use cache::{Cache, LocalCache};
pub use codec::{Codec, Json, MessagePack};
pub use config::{Backend, Config};
pub use error::{CacheError, Result, StoreError};
pub use remote::{BackingStore, MemoryStore, RemoteCache};
