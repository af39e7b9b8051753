//! Deleting a category together with the transactions that reference it.
//!
//! A category can only be deleted after its transactions have either been
//! deleted or moved to another category. [CascadePlan] describes what a
//! deletion would touch and [CascadeResolver] carries it out.

use std::sync::Arc;

use crate::{
    Error,
    category::{Category, CategoryId},
    gateway::{CategoryGateway, TransactionGateway},
    transaction::{Transaction, TransactionId},
};

/// What to do with the transactions of a category that is being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeAction {
    /// Delete the transactions along with the category.
    DeleteTransactions,
    /// Move the transactions to another category before deleting.
    ReassignTransactions(CategoryId),
}

/// Everything a category deletion would touch.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadePlan {
    /// The category being deleted.
    pub category: Category,
    /// The transactions that reference the category.
    pub transaction_ids: Vec<TransactionId>,
    /// The other categories of the same owner, in the order given.
    pub reassign_candidates: Vec<Category>,
}

impl CascadePlan {
    /// Plan the deletion of `category_id` from the owner's `categories` and `transactions`.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if `category_id` is not in `categories`.
    pub fn for_category(
        category_id: CategoryId,
        categories: &[Category],
        transactions: &[Transaction],
    ) -> Result<Self, Error> {
        let category = categories
            .iter()
            .find(|category| category.id == category_id)
            .cloned()
            .ok_or(Error::NotFound)?;

        let transaction_ids = transactions
            .iter()
            .filter(|transaction| transaction.is_in_category(category_id))
            .map(|transaction| transaction.id)
            .collect();

        let reassign_candidates = categories
            .iter()
            .filter(|candidate| candidate.id != category_id)
            .cloned()
            .collect();

        Ok(Self {
            category,
            transaction_ids,
            reassign_candidates,
        })
    }

    /// Whether any transactions would be affected.
    ///
    /// When this is `false` the category can be deleted with a simple confirmation.
    pub fn has_transactions(&self) -> bool {
        !self.transaction_ids.is_empty()
    }

    /// Whether there is another category to move the transactions to.
    pub fn can_reassign(&self) -> bool {
        !self.reassign_candidates.is_empty()
    }

    /// The category offered first for reassignment.
    pub fn default_reassign_target(&self) -> Option<CategoryId> {
        self.reassign_candidates.first().map(|candidate| candidate.id)
    }

    /// Check that `action` is allowed for this plan.
    ///
    /// # Errors
    ///
    /// Returns [Error::ReassignToSelf] if the target is the category being deleted,
    /// or [Error::NoReassignTarget] if the target is not one of the candidates.
    pub fn check(&self, action: &CascadeAction) -> Result<(), Error> {
        match action {
            CascadeAction::DeleteTransactions => Ok(()),
            CascadeAction::ReassignTransactions(target) if *target == self.category.id => {
                Err(Error::ReassignToSelf)
            }
            CascadeAction::ReassignTransactions(target) => {
                if self
                    .reassign_candidates
                    .iter()
                    .any(|candidate| candidate.id == *target)
                {
                    Ok(())
                } else {
                    Err(Error::NoReassignTarget)
                }
            }
        }
    }
}

/// Carries out category deletions against the store.
#[derive(Clone)]
pub struct CascadeResolver {
    categories: Arc<dyn CategoryGateway>,
    transactions: Arc<dyn TransactionGateway>,
}

impl CascadeResolver {
    /// Create a resolver that deletes through `categories` and `transactions`.
    pub fn new(
        categories: Arc<dyn CategoryGateway>,
        transactions: Arc<dyn TransactionGateway>,
    ) -> Self {
        Self {
            categories,
            transactions,
        }
    }

    /// Check `action` against `plan`, then carry it out.
    ///
    /// # Errors
    ///
    /// See [CascadePlan::check] and [CascadeResolver::resolve].
    pub async fn execute(&self, plan: &CascadePlan, action: &CascadeAction) -> Result<(), Error> {
        plan.check(action)?;

        self.resolve(plan.category.id, &plan.transaction_ids, action)
            .await
    }

    /// Delete `category_id` after deleting or reassigning `transaction_ids`.
    ///
    /// The transactions are changed in one batch before the category is
    /// deleted. The batch is skipped when there are no transactions. If the
    /// batch fails, the category is not deleted.
    ///
    /// # Errors
    ///
    /// Returns [Error::ReassignToSelf] before touching the store if the
    /// transactions would be moved to `category_id`, [Error::Cascade] if the
    /// batch fails, or the store's error if the category cannot be deleted.
    pub async fn resolve(
        &self,
        category_id: CategoryId,
        transaction_ids: &[TransactionId],
        action: &CascadeAction,
    ) -> Result<(), Error> {
        if *action == CascadeAction::ReassignTransactions(category_id) {
            return Err(Error::ReassignToSelf);
        }

        if transaction_ids.is_empty() {
            tracing::info!("Category {category_id} has no transactions, skipping cascade");
        } else {
            let result = match action {
                CascadeAction::DeleteTransactions => {
                    tracing::info!(
                        "Deleting {} transactions of category {category_id}",
                        transaction_ids.len()
                    );
                    self.transactions.batch_delete(transaction_ids).await
                }
                CascadeAction::ReassignTransactions(target) => {
                    tracing::info!(
                        "Moving {} transactions from category {category_id} to {target}",
                        transaction_ids.len()
                    );
                    self.transactions
                        .batch_update_category(transaction_ids, *target)
                        .await
                }
            };

            if let Err(error) = result {
                tracing::error!("Cascade for category {category_id} failed: {error}");
                return Err(Error::Cascade(Box::new(error)));
            }
        }

        self.categories.delete(category_id).await.inspect_err(|error| {
            tracing::error!("Could not delete category {category_id}: {error}");
        })?;
        tracing::info!("Deleted category {category_id}");

        Ok(())
    }
}


#[cfg(test)]
mod cascade_resolver_tests {
    use std::sync::Arc;

    use crate::{
        Error,
        category::{Category, CategoryId},
        gateway::{CategoryFilter, CategoryGateway, TransactionFilter, TransactionGateway},
        stores::{SQLiteCategoryStore, SQLiteTransactionStore},
        test_utils::{
            FaultyGateway, Operation, category, faulty_gateways, injected_error, transaction,
        },
        transaction::{Transaction, TransactionId, TransactionKind},
        user::UserId,
    };

    use super::{CascadeAction, CascadePlan, CascadeResolver};

    struct Fixture {
        owner: UserId,
        categories: Arc<FaultyGateway<SQLiteCategoryStore>>,
        transactions: Arc<FaultyGateway<SQLiteTransactionStore>>,
        resolver: CascadeResolver,
        food: Category,
        rent: Category,
        food_transactions: Vec<Transaction>,
    }

    async fn fixture() -> Fixture {
        let owner = UserId::generate();
        let (categories, transactions) = faulty_gateways();
        let food = category("Food", owner);
        let rent = category("Rent", owner);
        categories.put(&food).await.unwrap();
        categories.put(&rent).await.unwrap();
        let food_transactions = vec![
            transaction(TransactionKind::Expense, 12.0, 0, Some(food.id), owner),
            transaction(TransactionKind::Expense, 30.0, 1, Some(food.id), owner),
        ];
        for food_transaction in &food_transactions {
            transactions.put(food_transaction).await.unwrap();
        }

        Fixture {
            owner,
            resolver: CascadeResolver::new(categories.clone(), transactions.clone()),
            categories,
            transactions,
            food,
            rent,
            food_transactions,
        }
    }

    impl Fixture {
        fn food_ids(&self) -> Vec<TransactionId> {
            self.food_transactions.iter().map(|t| t.id).collect()
        }

        async fn stored_categories(&self) -> Vec<Category> {
            self.categories
                .subscribe(CategoryFilter::owner(self.owner))
                .first_snapshot()
                .await
                .unwrap()
        }

        async fn stored_transactions(&self) -> Vec<Transaction> {
            self.transactions
                .subscribe(TransactionFilter::owner(self.owner))
                .first_snapshot()
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn delete_action_removes_transactions_then_category() {
        let fixture = fixture().await;

        fixture
            .resolver
            .resolve(
                fixture.food.id,
                &fixture.food_ids(),
                &CascadeAction::DeleteTransactions,
            )
            .await
            .unwrap();

        assert_eq!(fixture.stored_categories().await, vec![fixture.rent.clone()]);
        assert!(fixture.stored_transactions().await.is_empty());
        assert_eq!(
            fixture.transactions.calls().last(),
            Some(&Operation::BatchDelete)
        );
        assert_eq!(fixture.categories.calls().last(), Some(&Operation::Delete));
    }

    #[tokio::test]
    async fn reassign_action_moves_transactions_then_deletes_category() {
        let fixture = fixture().await;

        fixture
            .resolver
            .resolve(
                fixture.food.id,
                &fixture.food_ids(),
                &CascadeAction::ReassignTransactions(fixture.rent.id),
            )
            .await
            .unwrap();

        assert_eq!(fixture.stored_categories().await, vec![fixture.rent.clone()]);
        let stored = fixture.stored_transactions().await;
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|t| t.category_id == Some(fixture.rent.id)));
    }

    #[tokio::test]
    async fn reassign_to_self_is_rejected_before_any_call() {
        let fixture = fixture().await;
        let calls_before = fixture.transactions.calls().len();

        let result = fixture
            .resolver
            .resolve(
                fixture.food.id,
                &fixture.food_ids(),
                &CascadeAction::ReassignTransactions(fixture.food.id),
            )
            .await;

        assert_eq!(result, Err(Error::ReassignToSelf));
        assert_eq!(fixture.transactions.calls().len(), calls_before);
        assert!(!fixture.categories.calls().contains(&Operation::Delete));
    }

    #[tokio::test]
    async fn empty_cascade_skips_batch() {
        let fixture = fixture().await;
        let empty = category("Empty", fixture.owner);
        fixture.categories.put(&empty).await.unwrap();

        fixture
            .resolver
            .resolve(empty.id, &[], &CascadeAction::DeleteTransactions)
            .await
            .unwrap();

        let calls = fixture.transactions.calls();
        assert!(!calls.contains(&Operation::BatchDelete));
        assert!(!calls.contains(&Operation::BatchUpdateCategory));
        assert_eq!(fixture.categories.calls().last(), Some(&Operation::Delete));
    }

    #[tokio::test]
    async fn failed_batch_leaves_category_in_place() {
        let fixture = fixture().await;
        fixture.transactions.fail(Operation::BatchDelete);

        let result = fixture
            .resolver
            .resolve(
                fixture.food.id,
                &fixture.food_ids(),
                &CascadeAction::DeleteTransactions,
            )
            .await;

        assert_eq!(result, Err(Error::Cascade(Box::new(injected_error()))));
        assert!(!fixture.categories.calls().contains(&Operation::Delete));
        assert_eq!(fixture.stored_categories().await.len(), 2);
        assert_eq!(fixture.stored_transactions().await.len(), 2);
    }

    #[tokio::test]
    async fn batch_with_stale_id_rolls_back_and_keeps_category() {
        let fixture = fixture().await;
        let mut ids = fixture.food_ids();
        ids.push(TransactionId::generate());

        let result = fixture
            .resolver
            .resolve(
                fixture.food.id,
                &ids,
                &CascadeAction::ReassignTransactions(fixture.rent.id),
            )
            .await;

        assert_eq!(
            result,
            Err(Error::Cascade(Box::new(Error::UpdateMissingTransaction)))
        );
        let stored = fixture.stored_transactions().await;
        assert!(stored.iter().all(|t| t.category_id == Some(fixture.food.id)));
        assert_eq!(fixture.stored_categories().await.len(), 2);
    }

    #[tokio::test]
    async fn execute_checks_plan_first() {
        let fixture = fixture().await;
        let plan = CascadePlan::for_category(
            fixture.food.id,
            &[fixture.food.clone()],
            &fixture.food_transactions,
        )
        .unwrap();

        let result = fixture
            .resolver
            .execute(&plan, &CascadeAction::ReassignTransactions(CategoryId::generate()))
            .await;

        assert_eq!(result, Err(Error::NoReassignTarget));
        assert_eq!(fixture.stored_categories().await.len(), 2);
    }
}
