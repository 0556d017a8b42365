//! Expiring Key Cache - time-windowed set membership for deduplication
//!
//! One mutex-guarded map of key -> expiry instant. Expired entries are
//! treated as absent on access and physically removed by
//! [`ExpiringKeyCache::purge_expired`], which the relay runs on a periodic
//! sweep. A live key is never refreshed: its expiry is fixed at first insert.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct ExpiringKeyCache {
    entries: Mutex<HashMap<String, Instant>>,
}

impl ExpiringKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `key` has a live (unexpired) entry
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(expires_at) if *expires_at > now => true,
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        }
    }

    /// Insert `key` for `ttl`. Returns `false` without touching the existing
    /// expiry when the key is already live, so check-and-set is one call.
    pub fn insert(&self, key: impl Into<String>, ttl: Duration) -> bool {
        let now = Instant::now();
        let key = key.into();
        let mut entries = self.entries.lock();

        if let Some(expires_at) = entries.get(&key) {
            if *expires_at > now {
                return false;
            }
        }

        entries.insert(key, now + ttl);
        true
    }

    /// Remove `key`. Idempotent; returns whether a live entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        matches!(self.entries.lock().remove(key), Some(expires_at) if expires_at > now)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|expires_at| **expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodically purge expired keys from every cache until shutdown
pub fn spawn_cache_sweeper(
    caches: Vec<Arc<ExpiringKeyCache>>,
    interval: Duration,
    shutdown_tx: &broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed: usize = caches.iter().map(|c| c.purge_expired()).sum();
                    if removed > 0 {
                        debug!(removed = removed, "Purged expired dedup keys");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Dedup cache sweeper shutting down");
                    break;
                }
            }
        }
    })
}
