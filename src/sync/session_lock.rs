//! Serializes sync calls that share a provider session.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A registry of per-session async locks.
///
/// Two syncs for the same session key would otherwise race to write the same
/// cursor. Holding the session's lock for a whole sync pass makes the second
/// caller wait and then resume from the first caller's final cursor. Syncs for
/// different session keys do not block each other.
#[derive(Debug, Clone, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SessionLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `session_key`.
    ///
    /// The access lasts until the returned guard is dropped.
    pub async fn acquire(&self, session_key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            // Entries only referenced by the map have no holder or waiter.
            locks.retain(|key, lock| key == session_key || Arc::strong_count(lock) > 1);

            locks
                .entry(session_key.to_owned())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
