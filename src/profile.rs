//! Actions on the signed in user's profile.

use crate::{
    Error,
    gateway::{CategoryFilter, CategoryGateway, TransactionFilter, TransactionGateway},
    user::UserId,
};

/// How much data [clear_all_user_data] removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearedData {
    /// The number of transactions deleted.
    pub transactions: usize,
    /// The number of categories deleted.
    pub categories: usize,
}

/// Delete every transaction of `owner_id`, then every category.
///
/// Transactions are removed in one batch so that a failure leaves them all in
/// place. Categories are removed one at a time after that.
///
/// # Errors
///
/// Returns the first error from the store. Categories deleted before the error stay deleted.
pub async fn clear_all_user_data(
    owner_id: UserId,
    categories: &dyn CategoryGateway,
    transactions: &dyn TransactionGateway,
) -> Result<ClearedData, Error> {
    let transaction_ids: Vec<_> = transactions
        .subscribe(TransactionFilter::owner(owner_id))
        .first_snapshot()
        .await?
        .into_iter()
        .map(|transaction| transaction.id)
        .collect();

    if !transaction_ids.is_empty() {
        transactions.batch_delete(&transaction_ids).await?;
    }
    tracing::info!(
        "Deleted {} transactions of user {owner_id}",
        transaction_ids.len()
    );

    let category_ids: Vec<_> = categories
        .subscribe(CategoryFilter::owner(owner_id))
        .first_snapshot()
        .await?
        .into_iter()
        .map(|category| category.id)
        .collect();

    for id in &category_ids {
        categories.delete(*id).await?;
    }
    tracing::info!("Deleted {} categories of user {owner_id}", category_ids.len());

    Ok(ClearedData {
        transactions: transaction_ids.len(),
        categories: category_ids.len(),
    })
}
