//! Engine orchestration over a [`SnapshotStore`].
//!
//! Every snapshot the store delivers goes through the same pipeline:
//! materialize due recurring items, apply the rollover if the month changed,
//! persist if either step changed the document, derive the metrics.
//! Reprocessing a snapshot that already went through the pipeline writes
//! nothing, which is what makes [`Engine::listen`] converge.

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::{
    EngineError, LedgerDocument, Metrics, ResultEngine, ResultRejection, SqliteStore,
    apply_rollover, derive_metrics, materialize_recurring,
    store::{Snapshot, SnapshotStore},
};

/// A processed ledger: the stored document, its version and its metrics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    pub document: LedgerDocument,
    pub version: i64,
    pub metrics: Metrics,
}

#[derive(Debug)]
pub struct Engine<S> {
    store: S,
}

impl Engine<SqliteStore> {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

impl<S: SnapshotStore> Engine<S> {
    /// Engine over any store, e.g. [`crate::MemoryStore`].
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the user's ledger and bring it up to date with `now`.
    ///
    /// A user without a ledger gets the default template.
    pub async fn sync(&self, user_id: &str, now: DateTime<Utc>) -> ResultEngine<Ledger> {
        let snapshot = self.store.load(user_id).await?;
        self.process(user_id, snapshot, now).await
    }

    /// Run the pipeline on a delivered snapshot.
    pub async fn process(
        &self,
        user_id: &str,
        snapshot: Option<Snapshot>,
        now: DateTime<Utc>,
    ) -> ResultEngine<Ledger> {
        let (document, expected) = match snapshot {
            Some(snapshot) => (snapshot.document, Some(snapshot.version)),
            None => {
                tracing::info!(user_id, "creating default ledger");
                (LedgerDocument::template(now), None)
            }
        };

        let materialized = materialize_recurring(&document, now);
        let rolled = apply_rollover(&materialized.document, now);
        let changed = expected.is_none() || materialized.changed || rolled.changed;
        let document = rolled.document;

        let version = match expected {
            Some(version) if !changed => version,
            _ => {
                let version = self.store.replace(user_id, &document, expected).await?;
                tracing::info!(user_id, version, "ledger brought up to date");
                version
            }
        };

        Ok(Ledger {
            metrics: derive_metrics(&document, now),
            document,
            version,
        })
    }

    /// Apply a validated mutation to the up-to-date ledger and persist it.
    ///
    /// `op` receives the current document and metrics and returns the next
    /// document or a rejection; the structural invariants are checked before
    /// anything is written.
    pub async fn mutate<F>(&self, user_id: &str, now: DateTime<Utc>, op: F) -> ResultEngine<Ledger>
    where
        F: FnOnce(&LedgerDocument, &Metrics) -> ResultRejection<LedgerDocument> + Send,
    {
        let current = self.sync(user_id, now).await?;
        let next = op(&current.document, &current.metrics)?;
        next.check_invariants()?;
        if next == current.document {
            return Ok(current);
        }

        let version = self
            .store
            .replace(user_id, &next, Some(current.version))
            .await
            .inspect_err(|err| {
                if matches!(err, EngineError::Conflict(_)) {
                    tracing::warn!(user_id, "ledger changed while mutating");
                }
            })?;
        tracing::info!(user_id, version, "ledger updated");

        Ok(Ledger {
            metrics: derive_metrics(&next, now),
            document: next,
            version,
        })
    }

    /// Process the latest published snapshot of `user_id`, then every later
    /// one, until the feed closes.
    ///
    /// A snapshot superseded while being processed is skipped: its successor
    /// is already on its way.
    pub async fn listen<C>(&self, user_id: &str, clock: C) -> ResultEngine<()>
    where
        C: Fn() -> DateTime<Utc> + Send,
    {
        let mut updates = self.store.subscribe(user_id);
        let mut pending = updates.borrow_and_update().clone();
        loop {
            if let Some(snapshot) = pending.take() {
                match self.process(user_id, Some(snapshot), clock()).await {
                    Ok(_) => {}
                    Err(EngineError::Conflict(_)) => {
                        tracing::warn!(user_id, "snapshot superseded, waiting for the next one");
                    }
                    Err(err) => return Err(err),
                }
            }
            if updates.changed().await.is_err() {
                break;
            }
            pending = updates.borrow_and_update().clone();
        }
        tracing::debug!(user_id, "change feed closed");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine<SqliteStore>> {
        Ok(Engine::new(SqliteStore::new(self.database)))
    }
}
