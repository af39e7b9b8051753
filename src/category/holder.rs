//! Caches the signed in user's categories and forwards changes to the store.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    Error,
    category::{
        CascadeAction, CascadePlan, CascadeResolver, Category, CategoryId, CategoryName, Color,
    },
    gateway::{CategoryFilter, CategoryGateway, TransactionGateway},
    holder::{CollectionState, LoadStatus, Listener, record_failure, wait_until_loaded},
    transaction::{Transaction, TransactionId},
    user::UserId,
};

/// Keeps the latest snapshot of a user's categories.
///
/// Deleting a category that still has transactions goes through
/// [CategoryHolder::cascade_delete].
pub struct CategoryHolder {
    gateway: Arc<dyn CategoryGateway>,
    resolver: CascadeResolver,
    owner_id: UserId,
    state: Arc<watch::Sender<CollectionState<Category>>>,
    _listener: Listener,
}

impl CategoryHolder {
    /// Start following the categories of `owner_id`.
    ///
    /// `transactions` is only used to delete or move the transactions of a deleted category.
    pub fn new(
        gateway: Arc<dyn CategoryGateway>,
        transactions: Arc<dyn TransactionGateway>,
        owner_id: UserId,
    ) -> Self {
        let (state, _) = watch::channel(CollectionState::default());
        let state = Arc::new(state);

        state.send_modify(|state| state.status = LoadStatus::Loading);
        let subscription = gateway.subscribe(CategoryFilter::owner(owner_id));
        let listener_state = state.clone();
        let listener = Listener::spawn(subscription, move |event| {
            listener_state.send_modify(|state| state.apply(event));
        });

        Self {
            resolver: CascadeResolver::new(gateway.clone(), transactions),
            gateway,
            owner_id,
            state,
            _listener: listener,
        }
    }

    /// A copy of the current state.
    pub fn state(&self) -> CollectionState<Category> {
        self.state.borrow().clone()
    }

    /// Watch for state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<CollectionState<Category>> {
        self.state.subscribe()
    }

    /// Wait for the first snapshot, or the failure that prevented it.
    ///
    /// # Errors
    ///
    /// Returns [Error::SubscriptionClosed] if the state stops being published.
    pub async fn loaded(&self) -> Result<CollectionState<Category>, Error> {
        wait_until_loaded(self.state.subscribe(), |state| state.status).await
    }

    /// Create a category for the owner.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyCategoryName] if `name` is blank, or the store's error.
    /// Either error is recorded in the state.
    pub async fn add(&self, name: &str, color: Color) -> Result<Category, Error> {
        let name = self.record(CategoryName::new(name), "add category")?;
        let category = Category::new(name, color, self.owner_id);

        self.record(self.gateway.put(&category).await, "add category")?;
        tracing::info!("Added category {}", category.id);

        Ok(category)
    }

    /// Replace a cached category with `category`, keeping the stored owner.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if no cached category has the same ID, or the
    /// store's error. Either error is recorded in the state.
    pub async fn update(&self, mut category: Category) -> Result<Category, Error> {
        let stored = self.record(self.cached(category.id), "update category")?;
        category.owner_id = stored.owner_id;

        self.record(self.gateway.put(&category).await, "update category")?;
        tracing::info!("Updated category {}", category.id);

        Ok(category)
    }

    /// Give the category with `id` a new name.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyCategoryName] if `name` is blank, [Error::NotFound]
    /// if the category is not cached, or the store's error. Every error is
    /// recorded in the state.
    pub async fn rename(&self, id: CategoryId, name: &str) -> Result<Category, Error> {
        let name = self.record(CategoryName::new(name), "rename category")?;
        let stored = self.record(self.cached(id), "rename category")?;

        self.update(Category { name, ..stored }).await
    }

    /// Delete the category with `id` without touching its transactions.
    ///
    /// # Errors
    ///
    /// Returns the store's error, which is also recorded in the state.
    pub async fn delete(&self, id: CategoryId) -> Result<(), Error> {
        self.record(self.gateway.delete(id).await, "delete category")?;
        tracing::info!("Deleted category {id}");

        Ok(())
    }

    /// Describe what deleting the category with `id` would touch, given the
    /// owner's `transactions`.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if the category is not cached.
    pub fn plan_delete(
        &self,
        id: CategoryId,
        transactions: &[Transaction],
    ) -> Result<CascadePlan, Error> {
        CascadePlan::for_category(id, &self.state.borrow().items, transactions)
    }

    /// Delete the category with `id` after applying `action` to `transaction_ids`.
    ///
    /// See [CascadeResolver::resolve] for the order of operations.
    ///
    /// # Errors
    ///
    /// Returns [Error::ReassignToSelf] or [Error::NoReassignTarget] without
    /// recording it and before any store call, or the resolver's store error,
    /// which is recorded in the state.
    pub async fn cascade_delete(
        &self,
        id: CategoryId,
        transaction_ids: &[TransactionId],
        action: CascadeAction,
    ) -> Result<(), Error> {
        self.check_reassign_target(id, &action)?;

        let result = self.resolver.resolve(id, transaction_ids, &action).await;

        match result {
            Err(error) if error.is_validation() => Err(error),
            result => self.record(result, "delete category"),
        }
    }

    /// Forget the last error.
    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    /// A reassignment must target another cached category of the owner.
    fn check_reassign_target(&self, id: CategoryId, action: &CascadeAction) -> Result<(), Error> {
        let CascadeAction::ReassignTransactions(target) = *action else {
            return Ok(());
        };

        if target == id {
            return Err(Error::ReassignToSelf);
        }

        let is_candidate = self
            .state
            .borrow()
            .items
            .iter()
            .any(|category| category.id == target && category.owner_id == self.owner_id);

        if is_candidate {
            Ok(())
        } else {
            tracing::warn!(
                "Refusing to move transactions of category {id} to unknown category {target}"
            );
            Err(Error::NoReassignTarget)
        }
    }

    fn cached(&self, id: CategoryId) -> Result<Category, Error> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|category| category.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn record<T>(&self, result: Result<T, Error>, action: &str) -> Result<T, Error> {
        record_failure(result, action, |message| {
            self.state.send_modify(|state| state.error = Some(message));
        })
    }
}
