//! Profile persistence backends for LearnLoop.
//!
//! Both backends implement `learnloop_core::ProfileStore` and serialize
//! read-modify-write per student id inside one process. A deployment running
//! several processes against the same directory needs external locking.

pub mod file_store;
pub mod in_memory;

pub use file_store::FileProfileStore;
pub use in_memory::InMemoryProfileStore;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One async mutex per key, created on first use.
///
/// Entries nobody holds or waits on are pruned on the next lookup, so the
/// map stays proportional to the number of in-flight operations.
#[derive(Default)]
pub(crate) struct StudentLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl StudentLocks {
    pub(crate) fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map holds an idle entry
        map.retain(|k, lock| k == key || Arc::strong_count(lock) > 1);
        map.entry(key.to_string()).or_default().clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
