//! Snapshot stores.
//!
//! A store holds one [`LedgerDocument`] per user and hands it out as a
//! versioned [`Snapshot`]. Writes are whole-document replacements guarded by
//! the version the writer read; a stale version is a
//! [`EngineError::Conflict`]. Every successful replace is published on the
//! store's [`ChangeFeed`].

use std::{
    collections::HashMap,
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::watch;

use crate::{EngineError, LedgerDocument, ResultEngine};

mod ledgers;
mod sqlite;

pub use sqlite::SqliteStore;

/// A document together with the version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub document: LedgerDocument,
    pub version: i64,
}

/// Persistent per-user document storage with change notification.
pub trait SnapshotStore: Send + Sync {
    /// Current snapshot, `None` when the user has no ledger yet.
    fn load(&self, user_id: &str) -> impl Future<Output = ResultEngine<Option<Snapshot>>> + Send;

    /// Store `document` if the ledger is still at `expected` (`None`: it must
    /// not exist yet). Returns the new version.
    fn replace(
        &self,
        user_id: &str,
        document: &LedgerDocument,
        expected: Option<i64>,
    ) -> impl Future<Output = ResultEngine<i64>> + Send;

    /// Receiver of every snapshot stored from now on.
    fn subscribe(&self, user_id: &str) -> watch::Receiver<Option<Snapshot>>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-user broadcast of stored snapshots.
#[derive(Debug, Default)]
pub struct ChangeFeed {
    senders: Mutex<HashMap<String, watch::Sender<Option<Snapshot>>>>,
}

impl ChangeFeed {
    pub fn subscribe(&self, user_id: &str) -> watch::Receiver<Option<Snapshot>> {
        lock(&self.senders)
            .entry(user_id.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    pub fn publish(&self, user_id: &str, snapshot: Snapshot) {
        if let Some(sender) = lock(&self.senders).get(user_id) {
            sender.send_replace(Some(snapshot));
        }
    }

    /// Drop the user's channel; open receivers see it close.
    pub fn close(&self, user_id: &str) {
        lock(&self.senders).remove(user_id);
    }
}

/// Process-local store, used for `database = "memory"` and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledgers: Mutex<HashMap<String, Snapshot>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }
}

impl SnapshotStore for MemoryStore {
    async fn load(&self, user_id: &str) -> ResultEngine<Option<Snapshot>> {
        Ok(lock(&self.ledgers).get(user_id).cloned())
    }

    async fn replace(
        &self,
        user_id: &str,
        document: &LedgerDocument,
        expected: Option<i64>,
    ) -> ResultEngine<i64> {
        let snapshot = {
            let mut ledgers = lock(&self.ledgers);
            let current = ledgers.get(user_id).map(|s| s.version);
            if current != expected {
                return Err(EngineError::Conflict(user_id.to_string()));
            }
            let snapshot = Snapshot {
                document: document.clone(),
                version: expected.unwrap_or(0) + 1,
            };
            ledgers.insert(user_id.to_string(), snapshot.clone());
            snapshot
        };
        let version = snapshot.version;
        self.feed.publish(user_id, snapshot);
        Ok(version)
    }

    fn subscribe(&self, user_id: &str) -> watch::Receiver<Option<Snapshot>> {
        self.feed.subscribe(user_id)
    }
}
