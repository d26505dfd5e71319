//! Keyed processing locks
//!
//! Serializes work on one subject (an account, keyed by its URI) while
//! letting work on different subjects run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held while a subject is locked; dropping it unlocks.
pub type LockGuard = OwnedMutexGuard<()>;

/// Registry of per-key mutexes
///
/// Entries are created on first use and never removed, so the map is
/// bounded by the number of distinct keys ever locked.
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> LockGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.to_string()).or_default().clone()
        };

        lock.lock_owned().await
    }
}
