//! Caches the signed in user's transactions and forwards changes to the store.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    Error,
    category::CategoryId,
    gateway::{TransactionFilter, TransactionGateway},
    holder::{CollectionState, LoadStatus, Listener, record_failure, wait_until_loaded},
    transaction::{Transaction, TransactionBuilder, TransactionId},
    user::UserId,
};

/// Keeps the latest snapshot of a user's transactions.
///
/// The store's subscription runs until the holder is dropped. Mutations go
/// straight to the store and the cache catches up with the next snapshot.
pub struct TransactionHolder {
    gateway: Arc<dyn TransactionGateway>,
    owner_id: UserId,
    state: Arc<watch::Sender<CollectionState<Transaction>>>,
    _listener: Listener,
}

impl TransactionHolder {
    /// Start following the transactions of `owner_id`.
    pub fn new(gateway: Arc<dyn TransactionGateway>, owner_id: UserId) -> Self {
        let (state, _) = watch::channel(CollectionState::default());
        let state = Arc::new(state);

        state.send_modify(|state| state.status = LoadStatus::Loading);
        let subscription = gateway.subscribe(TransactionFilter::owner(owner_id));
        let listener_state = state.clone();
        let listener = Listener::spawn(subscription, move |event| {
            listener_state.send_modify(|state| state.apply(event));
        });

        Self {
            gateway,
            owner_id,
            state,
            _listener: listener,
        }
    }

    /// A copy of the current state.
    pub fn state(&self) -> CollectionState<Transaction> {
        self.state.borrow().clone()
    }

    /// Watch for state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<CollectionState<Transaction>> {
        self.state.subscribe()
    }

    /// Wait for the first snapshot, or the failure that prevented it.
    ///
    /// # Errors
    ///
    /// Returns [Error::SubscriptionClosed] if the state stops being published.
    pub async fn loaded(&self) -> Result<CollectionState<Transaction>, Error> {
        wait_until_loaded(self.state.subscribe(), |state| state.status).await
    }

    /// The cached transactions in `category_id`, in the order they occurred.
    pub fn by_category(&self, category_id: CategoryId) -> Vec<Transaction> {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|transaction| transaction.is_in_category(category_id))
            .cloned()
            .collect()
    }

    /// Record a new transaction for the owner.
    ///
    /// # Errors
    ///
    /// Returns the store's error, which is also recorded in the state.
    pub async fn add(&self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        let transaction = builder.finalise(self.owner_id);
        let result = self.gateway.put(&transaction).await;

        self.record(result, "add transaction")?;
        tracing::info!("Added transaction {}", transaction.id);

        Ok(transaction)
    }

    /// Replace a cached transaction with `transaction`.
    ///
    /// The owner of the stored transaction is kept.
    ///
    /// # Errors
    ///
    /// Returns [Error::UpdateMissingTransaction] if no cached transaction has the same ID,
    /// or the store's error. Either error is recorded in the state.
    pub async fn update(&self, mut transaction: Transaction) -> Result<Transaction, Error> {
        let stored_owner = self
            .state
            .borrow()
            .items
            .iter()
            .find(|stored| stored.id == transaction.id)
            .map(|stored| stored.owner_id);

        let result = match stored_owner {
            Some(owner_id) => {
                transaction.owner_id = owner_id;
                self.gateway.put(&transaction).await
            }
            None => Err(Error::UpdateMissingTransaction),
        };

        self.record(result, "update transaction")?;
        tracing::info!("Updated transaction {}", transaction.id);

        Ok(transaction)
    }

    /// Delete the transaction with `id`.
    ///
    /// # Errors
    ///
    /// Returns the store's error, which is also recorded in the state.
    pub async fn delete(&self, id: TransactionId) -> Result<(), Error> {
        let result = self.gateway.delete(id).await;

        self.record(result, "delete transaction")?;
        tracing::info!("Deleted transaction {id}");

        Ok(())
    }

    /// Forget the last error.
    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    fn record(&self, result: Result<(), Error>, action: &str) -> Result<(), Error> {
        record_failure(result, action, |message| {
            self.state.send_modify(|state| state.error = Some(message));
        })
    }
}
