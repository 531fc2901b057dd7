//! Per-key population locks.
//!
//! A miss acquires the lock for its key before querying the source of truth;
//! concurrent misses for the same key wait and then re-check the cache. Lock
//! entries are dropped once nobody holds or awaits them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct SingleFlight {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until this caller is the only one populating `key`.
    pub async fn acquire(&self, key: &str) -> FlightGuard {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let (guard, waited) = match Arc::clone(&lock).try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => (lock.lock_owned().await, true),
        };
        FlightGuard {
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
            waited,
            _guard: guard,
        }
    }

    /// Keys with a live lock entry.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

pub struct FlightGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    waited: bool,
    _guard: OwnedMutexGuard<()>,
}

impl FlightGuard {
    /// True when another caller held the key first; the cache may now be warm.
    pub fn waited(&self) -> bool {
        self.waited
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // The table and this guard hold one reference each; anything above
        // that is a waiter that still needs the entry.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}
