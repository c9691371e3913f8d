//! Per-identifier admission locks
//!
//! Process-wide registry serializing mutations of the same remote object.
//! Entries are created on first acquisition and kept for the process
//! lifetime; acquisitions are rare relative to process memory, so the
//! registry never shrinks. Distinct keys never contend with each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Registry of per-identifier mutexes.
///
/// Constructed explicitly and handed to each reconciler; there is no ambient
/// singleton. The table is only ever touched by acquire/release, never
/// inspected by other logic.
#[derive(Default)]
pub struct LockTable {
    entries: DashMap<String, Arc<Mutex<()>>>,
}

/// Held admission lock. Released exactly once, when dropped, which makes
/// release unconditional on every exit path including cancellation.
pub struct LockGuard {
    _guard: OwnedMutexGuard<()>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &str) -> Arc<Mutex<()>> {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Acquire the lock for `key`, waiting as long as the current holder
    /// takes. Blocks only the calling task.
    pub async fn acquire(&self, key: &str) -> LockGuard {
        // Clone the Arc out before awaiting so no map shard stays borrowed
        // across the suspension point.
        let entry = self.entry(key);
        trace!(key, "acquiring admission lock");
        let guard = entry.lock_owned().await;
        trace!(key, "admission lock acquired");
        LockGuard { _guard: guard }
    }

    /// Non-blocking acquisition attempt.
    pub fn try_acquire(&self, key: &str) -> Option<LockGuard> {
        let entry = self.entry(key);
        entry.try_lock_owned().ok().map(|guard| LockGuard { _guard: guard })
    }
}
