//! Document lock table: per-document, FIFO-fair mutual exclusion.
//!
//! Each entry pairs a tokio `Mutex` (which grants the lock to waiters in the
//! order they queued) with a count of interested callers, holders and waiters
//! alike. The count is only changed under the map's shard lock, so an entry is
//! removed exactly when its last interested caller leaves and a late arrival
//! either sees the old entry or creates a fresh one.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

struct LockSlot {
    lock: Arc<Mutex<()>>,
    interested: usize,
}

type LockMap = DashMap<String, LockSlot>;

#[derive(Clone, Default)]
pub struct DocumentLockTable {
    locks: Arc<LockMap>,
}

impl DocumentLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `document_id`.
    ///
    /// An absent or empty id means no serialization was requested and yields
    /// a no-op handle immediately. If the returned future is dropped while
    /// waiting, the caller deregisters without ever holding the lock.
    pub async fn acquire(&self, document_id: Option<&str>) -> DocumentLockHandle {
        let Some(id) = document_id.filter(|id| !id.is_empty()) else {
            return DocumentLockHandle::noop();
        };

        let interest = self.register(id);
        let lock = Arc::clone(&interest.lock);
        let guard = lock.lock_owned().await;
        tracing::trace!(document = id, "document lock acquired");

        DocumentLockHandle {
            held: Some(HeldLock {
                _guard: guard,
                interest,
            }),
        }
    }

    /// Unlock and reclaim the entry if nobody else holds or awaits it.
    /// Dropping the handle has the same effect.
    pub fn release(&self, handle: DocumentLockHandle) {
        drop(handle);
    }

    /// Whether an entry exists for `document_id` (held or awaited).
    pub fn is_registered(&self, document_id: &str) -> bool {
        self.locks.contains_key(document_id)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn register(&self, id: &str) -> Interest {
        let mut slot = self.locks.entry(id.to_string()).or_insert_with(|| LockSlot {
            lock: Arc::new(Mutex::new(())),
            interested: 0,
        });
        slot.interested += 1;
        Interest {
            locks: Arc::clone(&self.locks),
            document_id: id.to_string(),
            lock: Arc::clone(&slot.lock),
        }
    }
}

/// Registration of one caller against one entry; deregisters on drop.
struct Interest {
    locks: Arc<LockMap>,
    document_id: String,
    lock: Arc<Mutex<()>>,
}

impl Drop for Interest {
    fn drop(&mut self) {
        if let Entry::Occupied(mut slot) = self.locks.entry(self.document_id.clone()) {
            let interested = &mut slot.get_mut().interested;
            *interested = interested.saturating_sub(1);
            if *interested == 0 {
                slot.remove();
                tracing::trace!(document = %self.document_id, "document lock reclaimed");
            }
        }
    }
}

// Field order is drop order: unlock first, then deregister.
struct HeldLock {
    _guard: OwnedMutexGuard<()>,
    interest: Interest,
}

/// Exclusive access to one document, or a no-op when none was requested.
/// Released on drop.
#[must_use = "the document lock is released as soon as the handle is dropped"]
pub struct DocumentLockHandle {
    held: Option<HeldLock>,
}

impl DocumentLockHandle {
    pub fn noop() -> Self {
        Self { held: None }
    }

    pub fn is_noop(&self) -> bool {
        self.held.is_none()
    }

    pub fn document_id(&self) -> Option<&str> {
        self.held
            .as_ref()
            .map(|h| h.interest.document_id.as_str())
    }
}
