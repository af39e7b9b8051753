//! A SQLite backed implementation of the remote store gateways.
//!
//! All stores created from one [SQLiteDatabase] share a single connection and
//! a change counter. Every committed write bumps the counter, and each live
//! subscription re-runs its query when the counter changes.

mod category;
mod transaction;
mod user;

pub use category::SQLiteCategoryStore;
pub use transaction::SQLiteTransactionStore;
pub use user::SQLiteAuthProvider;

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::Connection;
use tokio::sync::{mpsc, watch};

use crate::{
    Error,
    db::initialize,
    gateway::{SUBSCRIPTION_BUFFER, SnapshotEvent, Subscription},
};

/// A shared SQLite connection plus the change notifications for live queries.
#[derive(Debug, Clone)]
pub struct SQLiteDatabase {
    connection: Arc<Mutex<Connection>>,
    changes: Arc<watch::Sender<u64>>,
}

impl SQLiteDatabase {
    /// Wrap `connection`, creating the application tables if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        initialize(&connection)?;

        let (changes, _) = watch::channel(0);

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            changes: Arc::new(changes),
        })
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::debug!("Opening database at {path:?}");

        Self::new(Connection::open(path)?)
    }

    /// Create a fresh database that lives only in memory.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::new(Connection::open_in_memory()?)
    }

    /// A category store backed by this database.
    pub fn category_store(&self) -> SQLiteCategoryStore {
        SQLiteCategoryStore::new(self.clone())
    }

    /// A transaction store backed by this database.
    pub fn transaction_store(&self) -> SQLiteTransactionStore {
        SQLiteTransactionStore::new(self.clone())
    }

    /// An authentication provider that keeps its users and session in this
    /// database, hashing passwords with bcrypt at `cost`.
    pub fn auth_provider(&self, cost: u32) -> SQLiteAuthProvider {
        SQLiteAuthProvider::new(self.clone(), cost)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }

    /// The number of live queries that are still running.
    #[cfg(test)]
    pub(crate) fn live_query_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Wake every live query so it reloads its snapshot.
    pub(crate) fn notify_changed(&self) {
        self.changes.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    /// Start a live query that runs `query` now and again after every change.
    ///
    /// The first failed query is sent as an error event and ends the subscription.
    pub(crate) fn live_query<T, F>(&self, query: F) -> Subscription<T>
    where
        T: Send + 'static,
        F: Fn(&Connection) -> Result<Vec<T>, Error> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut changes = self.changes.subscribe();
        let database = self.clone();

        let producer = tokio::spawn(async move {
            loop {
                let result = database.lock().and_then(|connection| query(&connection));

                match result {
                    Ok(items) => {
                        if sender.send(SnapshotEvent::Snapshot(items)).await.is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        tracing::error!("live query failed: {error}");
                        let _ = sender.send(SnapshotEvent::Error(error)).await;
                        return;
                    }
                }

                if changes.changed().await.is_err() {
                    return;
                }
            }
        });

        Subscription::new(receiver, producer)
    }
}
