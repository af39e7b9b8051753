//! Implements a SQLite backed transaction store.

use async_trait::async_trait;
use rusqlite::{Connection, Row, types::Type};

use crate::{
    Error,
    category::CategoryId,
    db::{get_optional_uuid, get_timestamp, get_uuid, to_unix_millis},
    gateway::{Subscription, TransactionFilter, TransactionGateway},
    stores::sqlite::SQLiteDatabase,
    transaction::{Amount, Title, Transaction, TransactionId, TransactionKind},
    user::UserId,
};

/// Creates, updates, deletes and streams transactions in a SQLite database.
///
/// There is no foreign key from a transaction to its category, so
/// transactions may be reassigned before their old category is deleted.
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    database: SQLiteDatabase,
}

impl SQLiteTransactionStore {
    /// Create a new transaction store for `database`.
    pub fn new(database: SQLiteDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl TransactionGateway for SQLiteTransactionStore {
    fn subscribe(&self, filter: TransactionFilter) -> Subscription<Transaction> {
        self.database
            .live_query(move |connection| query_transactions(filter, connection))
    }

    /// Insert or replace a transaction. The owner of an existing transaction never changes.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    async fn put(&self, transaction: &Transaction) -> Result<(), Error> {
        {
            let connection = self.database.lock()?;
            connection.execute(
                "INSERT INTO \"transaction\"
                    (id, title, amount, kind, category_id, occurred_at, note, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    amount = excluded.amount,
                    kind = excluded.kind,
                    category_id = excluded.category_id,
                    occurred_at = excluded.occurred_at,
                    note = excluded.note",
                (
                    transaction.id.to_string(),
                    transaction.title.as_ref(),
                    transaction.amount.value(),
                    kind_to_sql(transaction.kind),
                    transaction.category_id.map(|id| id.to_string()),
                    to_unix_millis(transaction.occurred_at),
                    transaction.note.as_deref(),
                    transaction.owner_id.to_string(),
                ),
            )?;
        }

        self.database.notify_changed();
        Ok(())
    }

    /// Delete a transaction by ID.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingTransaction] if the transaction doesn't exist.
    async fn delete(&self, id: TransactionId) -> Result<(), Error> {
        let rows_affected = {
            let connection = self.database.lock()?;
            connection.execute(
                "DELETE FROM \"transaction\" WHERE id = ?1",
                [id.to_string()],
            )?
        };

        if rows_affected == 0 {
            return Err(Error::DeleteMissingTransaction);
        }

        self.database.notify_changed();
        Ok(())
    }

    /// Move every transaction in `ids` to `category_id` in a single SQL transaction.
    ///
    /// # Errors
    /// Returns [Error::UpdateMissingTransaction] and rolls back if any ID does not exist.
    async fn batch_update_category(
        &self,
        ids: &[TransactionId],
        category_id: CategoryId,
    ) -> Result<(), Error> {
        {
            let connection = self.database.lock()?;
            let tx = connection.unchecked_transaction()?;

            {
                let mut statement =
                    tx.prepare("UPDATE \"transaction\" SET category_id = ?1 WHERE id = ?2")?;

                for id in ids {
                    let rows_affected =
                        statement.execute((category_id.to_string(), id.to_string()))?;

                    if rows_affected == 0 {
                        tracing::warn!(
                            "Batch update aborted, transaction {id} is not in the database"
                        );
                        return Err(Error::UpdateMissingTransaction);
                    }
                }
            }

            tx.commit()?;
        }

        self.database.notify_changed();
        Ok(())
    }

    /// Delete every transaction in `ids` in a single SQL transaction.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingTransaction] and rolls back if any ID does not exist.
    async fn batch_delete(&self, ids: &[TransactionId]) -> Result<(), Error> {
        {
            let connection = self.database.lock()?;
            let tx = connection.unchecked_transaction()?;

            {
                let mut statement = tx.prepare("DELETE FROM \"transaction\" WHERE id = ?1")?;

                for id in ids {
                    if statement.execute([id.to_string()])? == 0 {
                        tracing::warn!(
                            "Batch delete aborted, transaction {id} is not in the database"
                        );
                        return Err(Error::DeleteMissingTransaction);
                    }
                }
            }

            tx.commit()?;
        }

        self.database.notify_changed();
        Ok(())
    }
}

/// Retrieve the transactions matching `filter`, oldest first.
///
/// Transactions that occurred at the same time are returned in insertion order.
pub fn query_transactions(
    filter: TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let owner_id = filter.owner_id.to_string();
    let category_id = filter.category_id.map(|id| id.to_string());

    connection
        .prepare(
            "SELECT id, title, amount, kind, category_id, occurred_at, note, owner_id
             FROM \"transaction\"
             WHERE owner_id = ?1 AND (?2 IS NULL OR category_id = ?2)
             ORDER BY occurred_at ASC, rowid ASC;",
        )?
        .query_map((owner_id, category_id), map_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

fn kind_to_sql(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Income => "income",
        TransactionKind::Expense => "expense",
    }
}

fn map_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_title: String = row.get(1)?;
    let raw_amount: f64 = row.get(2)?;
    let amount = Amount::new(raw_amount).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Real, error.into())
    })?;
    let raw_kind: String = row.get(3)?;
    let kind = match raw_kind.as_str() {
        "income" => TransactionKind::Income,
        "expense" => TransactionKind::Expense,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown transaction kind {other:?}").into(),
            ));
        }
    };

    Ok(Transaction {
        id: TransactionId::new(get_uuid(row, 0)?),
        title: Title::new_unchecked(&raw_title),
        amount,
        kind,
        category_id: get_optional_uuid(row, 4)?.map(CategoryId::new),
        occurred_at: get_timestamp(row, 5)?,
        note: row.get(6)?,
        owner_id: UserId::new(get_uuid(row, 7)?),
    })
}
