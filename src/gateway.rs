//! Traits for the remote store that owns categories and transactions, and the
//! live subscription handle it hands out.
//!
//! The store is the source of truth. Callers keep non-owning copies of the
//! lists it pushes through a [Subscription] and send every change back
//! through the gateway traits.

use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    Error,
    category::{Category, CategoryId},
    transaction::{Transaction, TransactionId},
    user::UserId,
};

/// How many undelivered events a subscription buffers before the producer waits.
pub const SUBSCRIPTION_BUFFER: usize = 16;

/// An event delivered by a live subscription.
#[derive(Debug, PartialEq)]
pub enum SnapshotEvent<T> {
    /// The full, current list of matching entities. Replaces any earlier snapshot.
    Snapshot(Vec<T>),
    /// The subscription failed. No further events follow an error.
    Error(Error),
}

/// A live query that pushes [SnapshotEvent]s until it is dropped.
///
/// Dropping the subscription stops the task producing its events.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::Receiver<SnapshotEvent<T>>,
    producer: Option<JoinHandle<()>>,
}

impl<T> Subscription<T> {
    /// Create a subscription fed by the task `producer` through `receiver`.
    pub fn new(receiver: mpsc::Receiver<SnapshotEvent<T>>, producer: JoinHandle<()>) -> Self {
        Self {
            receiver,
            producer: Some(producer),
        }
    }

    /// Create a subscription from a bare channel, e.g. one fed by a test.
    pub fn from_receiver(receiver: mpsc::Receiver<SnapshotEvent<T>>) -> Self {
        Self {
            receiver,
            producer: None,
        }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<SnapshotEvent<T>> {
        self.receiver.recv().await
    }

    /// Wait for the first snapshot and end the subscription.
    ///
    /// # Errors
    ///
    /// Returns the error event if the stream failed, or
    /// [Error::SubscriptionClosed] if it ended without delivering anything.
    pub async fn first_snapshot(mut self) -> Result<Vec<T>, Error> {
        match self.next().await {
            Some(SnapshotEvent::Snapshot(items)) => Ok(items),
            Some(SnapshotEvent::Error(error)) => Err(error),
            None => Err(Error::SubscriptionClosed),
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

/// Selects the categories a subscription delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryFilter {
    /// The user that created the categories.
    pub owner_id: UserId,
}

impl CategoryFilter {
    /// All categories created by `owner_id`.
    pub fn owner(owner_id: UserId) -> Self {
        Self { owner_id }
    }
}

/// Selects the transactions a subscription delivers.
///
/// Transactions are always delivered in order of when they occurred, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionFilter {
    /// The user that recorded the transactions.
    pub owner_id: UserId,
    /// Only include transactions in this category.
    pub category_id: Option<CategoryId>,
}

impl TransactionFilter {
    /// All transactions recorded by `owner_id`.
    pub fn owner(owner_id: UserId) -> Self {
        Self {
            owner_id,
            category_id: None,
        }
    }

    /// Narrow the filter to transactions in `category_id`.
    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Persists, deletes and streams categories.
#[async_trait]
pub trait CategoryGateway: Send + Sync {
    /// Start a live query for the categories matching `filter`.
    fn subscribe(&self, filter: CategoryFilter) -> Subscription<Category>;

    /// Insert the category, or replace the stored category with the same ID.
    async fn put(&self, category: &Category) -> Result<(), Error>;

    /// Delete the category with `id`.
    async fn delete(&self, id: CategoryId) -> Result<(), Error>;
}

/// Persists, deletes and streams transactions.
///
/// The batch operations either apply to every listed transaction or to none.
#[async_trait]
pub trait TransactionGateway: Send + Sync {
    /// Start a live query for the transactions matching `filter`.
    fn subscribe(&self, filter: TransactionFilter) -> Subscription<Transaction>;

    /// Insert the transaction, or replace the stored transaction with the same ID.
    async fn put(&self, transaction: &Transaction) -> Result<(), Error>;

    /// Delete the transaction with `id`.
    async fn delete(&self, id: TransactionId) -> Result<(), Error>;

    /// Set the category of every transaction in `ids` to `category_id`.
    async fn batch_update_category(
        &self,
        ids: &[TransactionId],
        category_id: CategoryId,
    ) -> Result<(), Error>;

    /// Delete every transaction in `ids`.
    async fn batch_delete(&self, ids: &[TransactionId]) -> Result<(), Error>;
}
