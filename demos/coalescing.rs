//! Coalescing demo
//!
//! Fires a burst of concurrent reads for one key at a slow store, once with
//! coalescing and once without, and reports how many reads reached the store.
//!
//! Run with `RUST_LOG=tiered_cache=debug` to see joins and evictions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tiered_cache::{Cache, Config, LocalCache, MemoryStore, RemoteCache};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const READERS: usize = 64;

async fn burst(cache: Arc<RemoteCache<MemoryStore>>) -> anyhow::Result<Duration> {
    let started = Instant::now();
    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get::<String>("greeting").await })
        })
        .collect();

    for handle in handles {
        handle.await??;
    }
    Ok(started.elapsed())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info,coalescing=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, default_ttl={}s, coalescing={}",
        config.max_entries, config.default_ttl, config.coalescing
    );

    // Local engine
    let local = LocalCache::from_config(&config);
    local.set_default("greeting", "hello from memory")?;
    let greeting: String = Cache::get(&local, "greeting").await?;
    info!(%greeting, entries = local.len(), "Local cache read");

    // Remote facade over a store that takes 200ms per read
    for coalescing in [true, false] {
        let store = MemoryStore::new().with_read_latency(Duration::from_millis(200));
        let cache = Arc::new(RemoteCache::new(store).coalescing(coalescing));
        cache.set("greeting", "hello from the store", 60).await?;

        let elapsed = burst(Arc::clone(&cache)).await?;
        info!(
            coalescing,
            readers = READERS,
            store_reads = cache.store().read_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Read burst finished"
        );
    }

    Ok(())
}
