//! Request Coalescing Module
//!
//! Collapses concurrent reads of the same key into one backing-store fetch.
//!
//! The first caller for a key registers a broadcast channel and runs the
//! fetch; callers arriving while it is outstanding subscribe to that channel
//! instead of fetching. The registry entry is removed before the result is
//! broadcast, so any later caller starts a fresh fetch.
//!
//! There is no timeout: if a fetch never completes, every caller attached to
//! it waits forever. Wrap the backing store with its own deadline if that
//! matters.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use crate::remote::store::FetchResult;

/// A registered fetch: its broadcast channel plus a unique ticket.
#[derive(Debug)]
struct InFlight {
    ticket: u64,
    sender: broadcast::Sender<FetchResult>,
}

type InFlightMap = HashMap<String, InFlight>;

enum Role {
    /// No fetch outstanding; the caller must run it
    Leader {
        ticket: u64,
        sender: broadcast::Sender<FetchResult>,
    },
    /// Attached to an outstanding fetch
    Waiter(broadcast::Receiver<FetchResult>),
}

// == Coalescer ==
/// Per-instance registry of in-flight fetches keyed by cache key.
#[derive(Debug, Default)]
pub struct Coalescer {
    in_flight: Mutex<InFlightMap>,
    next_ticket: AtomicU64,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InFlightMap> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of keys with a fetch currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    /// Number of callers attached to the outstanding fetch for `key`, not
    /// counting the caller running it.
    pub fn waiting(&self, key: &str) -> usize {
        self.lock()
            .get(key)
            .map_or(0, |registered| registered.sender.receiver_count())
    }

    /// Attaches to the outstanding fetch for `key`, or registers a new one.
    fn join(&self, key: &str) -> Role {
        let mut in_flight = self.lock();
        if let Some(registered) = in_flight.get(key) {
            return Role::Waiter(registered.sender.subscribe());
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (sender, _) = broadcast::channel(1);
        in_flight.insert(
            key.to_string(),
            InFlight {
                ticket,
                sender: sender.clone(),
            },
        );
        Role::Leader { ticket, sender }
    }

    // == Run ==
    /// Runs `fetch` for `key` unless one is already running, in which case
    /// waits for and returns that fetch's result.
    ///
    /// Every caller attached to a fetch receives a clone of the same result,
    /// errors included. If the leading caller is dropped before its fetch
    /// finishes, attached callers retry and one of them takes over.
    pub async fn run<F, Fut>(&self, key: &str, fetch: F) -> FetchResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult>,
    {
        let (ticket, sender) = loop {
            let mut receiver = match self.join(key) {
                Role::Leader { ticket, sender } => break (ticket, sender),
                Role::Waiter(receiver) => receiver,
            };

            debug!(key, "Joined in-flight fetch");
            match receiver.recv().await {
                Ok(result) => return result,
                // Leader went away without publishing a result.
                Err(_) => debug!(key, "In-flight fetch abandoned, retrying"),
            }
        };

        let guard = LeaderGuard {
            coalescer: self,
            key,
            ticket,
            armed: true,
        };
        let started_at = Instant::now();
        let result = fetch().await;
        guard.finish();

        debug!(
            key,
            waiters = sender.receiver_count(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            success = result.is_ok(),
            "Completing coalesced fetch"
        );

        // Receivers may all have been dropped; nothing to deliver then.
        let _ = sender.send(result.clone());
        result
    }
}

// == Leader Guard ==
/// Deregisters the leader's channel, on completion or when its future is dropped.
struct LeaderGuard<'a> {
    coalescer: &'a Coalescer,
    key: &'a str,
    ticket: u64,
    armed: bool,
}

impl LeaderGuard<'_> {
    fn finish(mut self) {
        self.deregister();
    }

    fn deregister(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        let mut in_flight = self.coalescer.lock();
        let ours = in_flight
            .get(self.key)
            .is_some_and(|registered| registered.ticket == self.ticket);
        if ours {
            in_flight.remove(self.key);
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.deregister();
    }
}
