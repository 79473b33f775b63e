//! Remote Module
//!
//! Cache capability backed by an external key-value store, with request
//! coalescing in front of reads.

mod coalesce;
mod facade;
mod memory;
mod store;

pub use coalesce::Coalescer;
pub use facade::RemoteCache;
pub use memory::MemoryStore;
pub use store::{BackingStore, FetchResult};
