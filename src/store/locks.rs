//! Per-mailbox locks.
//!
//! One `RwLock` per mailbox hash. Mutations take it exclusively for the whole
//! load-mutate-persist sequence; reads take it shared so they never observe
//! an index and object set that disagree. Unrelated mailboxes never contend.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

/// Lock guarding one mailbox's on-disk state.
pub type MailboxLock = Arc<RwLock<()>>;

/// Hands out one shared lock per mailbox hash.
///
/// Entries are weak: a lock lives exactly as long as some mailbox handle
/// holds it, and dead entries are swept when new locks are created.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Weak<RwLock<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `hash`, shared with every live handle for the same mailbox.
    pub fn lock_for(&self, hash: &str) -> MailboxLock {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(hash).and_then(Weak::upgrade) {
            return lock;
        }

        locks.retain(|_, weak| weak.strong_count() > 0);
        let lock = Arc::new(RwLock::new(()));
        locks.insert(hash.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Number of mailboxes with a live lock.
    #[cfg(test)]
    pub(crate) fn live_count(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
