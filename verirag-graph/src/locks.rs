use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Per-thread mutual exclusion for checkpoint read-modify-write.
///
/// Entries exist only while a thread is held or awaited; the last guard to
/// release a thread removes its entry.
#[derive(Clone, Default)]
pub struct ThreadLocks {
    inner: Arc<LockMap>,
}

/// Held for the duration of one run on a thread.
pub struct ThreadLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    thread_id: String,
    locks: Arc<LockMap>,
}

impl Drop for ThreadLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone, so a count of one means only the map is left.
        self.locks
            .remove_if(&self.thread_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, thread_id: &str) -> ThreadLockGuard {
        let lock = self
            .inner
            .entry(thread_id.to_string())
            .or_default()
            .clone();
        ThreadLockGuard {
            guard: Some(lock.lock_owned().await),
            thread_id: thread_id.to_string(),
            locks: self.inner.clone(),
        }
    }

    pub fn is_locked(&self, thread_id: &str) -> bool {
        self.inner
            .get(thread_id)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Threads currently held or awaited.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
