//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Which cache implementation `AnyCache::from_config` builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Bounded in-process LRU/TTL engine
    #[default]
    Local,
    /// Coalescing facade over a backing store
    Remote,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" | "memory" => Ok(Self::Local),
            "remote" | "store" => Ok(Self::Remote),
            other => Err(format!("unknown cache backend: {other}")),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the local cache can hold
    pub max_entries: usize,
    /// Default TTL in seconds used by `LocalCache::set_default`
    pub default_ttl: i64,
    /// Whether the remote facade coalesces concurrent reads of one key
    pub coalescing: bool,
    /// Backend selected at runtime
    pub backend: Backend,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_COALESCING` - `true`/`false`, `1`/`0` (default: true)
    /// - `CACHE_BACKEND` - `local` or `remote` (default: local)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_entries),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            coalescing: env::var("CACHE_COALESCING")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.coalescing),
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 300,
            coalescing: true,
            backend: Backend::Local,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
