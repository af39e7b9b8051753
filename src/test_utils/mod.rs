#![allow(missing_docs)]

//! Fixtures and gateway doubles shared by the unit tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime, macros::datetime};
use tokio::sync::{mpsc, watch};

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName, Color},
    gateway::{
        CategoryFilter, CategoryGateway, SnapshotEvent, Subscription, TransactionFilter,
        TransactionGateway,
    },
    stores::SQLiteDatabase,
    transaction::{Amount, Title, Transaction, TransactionId, TransactionKind},
    user::UserId,
};

/// The gateway calls that [FaultyGateway] can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Operation {
    Subscribe,
    Put,
    Delete,
    BatchUpdateCategory,
    BatchDelete,
}

/// The error returned by operations that [FaultyGateway] has been told to fail.
pub(crate) fn injected_error() -> Error {
    Error::SqlError("injected failure".to_owned())
}

/// Wraps a gateway, records every call and fails the chosen operations.
pub(crate) struct FaultyGateway<G> {
    inner: G,
    failing: Mutex<HashSet<Operation>>,
    calls: Mutex<Vec<Operation>>,
}

impl<G> FaultyGateway<G> {
    pub(crate) fn new(inner: G) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn fail(&self, operation: Operation) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// The operations called so far, in order.
    pub(crate) fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    fn call(&self, operation: Operation) -> Result<(), Error> {
        self.calls.lock().unwrap().push(operation);

        if self.failing.lock().unwrap().contains(&operation) {
            Err(injected_error())
        } else {
            Ok(())
        }
    }
}

fn failed_subscription<T>() -> Subscription<T> {
    let (sender, receiver) = mpsc::channel(1);
    sender
        .try_send(SnapshotEvent::Error(injected_error()))
        .expect("a new channel has capacity");

    Subscription::from_receiver(receiver)
}

#[async_trait]
impl<G: CategoryGateway> CategoryGateway for FaultyGateway<G> {
    fn subscribe(&self, filter: CategoryFilter) -> Subscription<Category> {
        match self.call(Operation::Subscribe) {
            Ok(()) => self.inner.subscribe(filter),
            Err(_) => failed_subscription(),
        }
    }

    async fn put(&self, category: &Category) -> Result<(), Error> {
        self.call(Operation::Put)?;
        self.inner.put(category).await
    }

    async fn delete(&self, id: CategoryId) -> Result<(), Error> {
        self.call(Operation::Delete)?;
        self.inner.delete(id).await
    }
}

#[async_trait]
impl<G: TransactionGateway> TransactionGateway for FaultyGateway<G> {
    fn subscribe(&self, filter: TransactionFilter) -> Subscription<Transaction> {
        match self.call(Operation::Subscribe) {
            Ok(()) => self.inner.subscribe(filter),
            Err(_) => failed_subscription(),
        }
    }

    async fn put(&self, transaction: &Transaction) -> Result<(), Error> {
        self.call(Operation::Put)?;
        self.inner.put(transaction).await
    }

    async fn delete(&self, id: TransactionId) -> Result<(), Error> {
        self.call(Operation::Delete)?;
        self.inner.delete(id).await
    }

    async fn batch_update_category(
        &self,
        ids: &[TransactionId],
        category_id: CategoryId,
    ) -> Result<(), Error> {
        self.call(Operation::BatchUpdateCategory)?;
        self.inner.batch_update_category(ids, category_id).await
    }

    async fn batch_delete(&self, ids: &[TransactionId]) -> Result<(), Error> {
        self.call(Operation::BatchDelete)?;
        self.inner.batch_delete(ids).await
    }
}

/// Both gateways over one fresh in-memory database, wrapped in [FaultyGateway].
pub(crate) fn faulty_gateways() -> (
    Arc<FaultyGateway<crate::stores::SQLiteCategoryStore>>,
    Arc<FaultyGateway<crate::stores::SQLiteTransactionStore>>,
) {
    let database = SQLiteDatabase::open_in_memory().expect("Could not open in-memory database");

    (
        Arc::new(FaultyGateway::new(database.category_store())),
        Arc::new(FaultyGateway::new(database.transaction_store())),
    )
}

pub(crate) fn category(name: &str, owner_id: UserId) -> Category {
    Category::new(CategoryName::new_unchecked(name), Color::DEFAULT, owner_id)
}

/// A transaction that happened `days` days after 1 March 2025.
pub(crate) fn transaction(
    kind: TransactionKind,
    amount: f64,
    days: i64,
    category_id: Option<CategoryId>,
    owner_id: UserId,
) -> Transaction {
    Transaction::build(
        Title::new_unchecked(&format!("{kind} of {amount}")),
        Amount::new(amount).expect("test amounts are positive"),
        kind,
    )
    .category_id(category_id)
    .occurred_at(base_time() + Duration::days(days))
    .finalise(owner_id)
}

pub(crate) fn base_time() -> OffsetDateTime {
    datetime!(2025-03-01 12:00 UTC)
}

/// Wait until the watched state matches `predicate` and return it.
pub(crate) async fn wait_for_state<S: Clone>(
    receiver: &mut watch::Receiver<S>,
    predicate: impl FnMut(&S) -> bool,
) -> S {
    tokio::time::timeout(std::time::Duration::from_secs(5), receiver.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed")
        .clone()
}
