//! Implements a SQLite backed category store.

use async_trait::async_trait;
use rusqlite::{Connection, Row};

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName, Color},
    db::get_uuid,
    gateway::{CategoryFilter, CategoryGateway, Subscription},
    stores::sqlite::SQLiteDatabase,
    user::UserId,
};

/// Creates, updates, deletes and streams categories in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteCategoryStore {
    database: SQLiteDatabase,
}

impl SQLiteCategoryStore {
    /// Create a new category store for `database`.
    pub fn new(database: SQLiteDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl CategoryGateway for SQLiteCategoryStore {
    fn subscribe(&self, filter: CategoryFilter) -> Subscription<Category> {
        self.database
            .live_query(move |connection| get_categories_by_owner(filter.owner_id, connection))
    }

    /// Insert or replace a category. The owner of an existing category never changes.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    async fn put(&self, category: &Category) -> Result<(), Error> {
        {
            let connection = self.database.lock()?;
            connection.execute(
                "INSERT INTO category (id, name, color, owner_id) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, color = excluded.color",
                (
                    category.id.to_string(),
                    category.name.as_ref(),
                    i64::from(category.color.argb()),
                    category.owner_id.to_string(),
                ),
            )?;
        }

        self.database.notify_changed();
        Ok(())
    }

    /// Delete a category by ID.
    ///
    /// Transactions that reference the category are left untouched.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingCategory] if the category doesn't exist.
    async fn delete(&self, id: CategoryId) -> Result<(), Error> {
        let rows_affected = {
            let connection = self.database.lock()?;
            connection.execute("DELETE FROM category WHERE id = ?1", [id.to_string()])?
        };

        if rows_affected == 0 {
            return Err(Error::DeleteMissingCategory);
        }

        self.database.notify_changed();
        Ok(())
    }
}

/// Retrieve the categories of `owner_id` ordered alphabetically by name.
pub fn get_categories_by_owner(
    owner_id: UserId,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, color, owner_id FROM category
             WHERE owner_id = :owner_id ORDER BY name ASC;",
        )?
        .query_map(&[(":owner_id", &owner_id.to_string())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = CategoryId::new(get_uuid(row, 0)?);
    let raw_name: String = row.get(1)?;
    let raw_color: i64 = row.get(2)?;
    let owner_id = UserId::new(get_uuid(row, 3)?);

    Ok(Category {
        id,
        name: CategoryName::new_unchecked(&raw_name),
        color: Color::from_argb(raw_color as u32),
        owner_id,
    })
}

#[cfg(test)]
mod category_store_tests {
    use std::collections::HashSet;

    use crate::{
        Error,
        category::{Category, CategoryId, CategoryName, Color},
        gateway::{CategoryFilter, CategoryGateway, SnapshotEvent},
        stores::sqlite::SQLiteDatabase,
        user::UserId,
    };

    use super::{SQLiteCategoryStore, get_categories_by_owner};

    fn get_test_store() -> SQLiteCategoryStore {
        SQLiteDatabase::open_in_memory()
            .expect("Could not create in-memory SQLite database")
            .category_store()
    }

    fn stored_categories(store: &SQLiteCategoryStore, owner: UserId) -> Vec<Category> {
        let connection = store.database.lock().unwrap();
        get_categories_by_owner(owner, &connection).unwrap()
    }

    #[tokio::test]
    async fn put_inserts_category() {
        let store = get_test_store();
        let owner = UserId::generate();
        let category = Category::new(
            CategoryName::new_unchecked("Groceries"),
            Color::from_argb(0xFF4CAF50),
            owner,
        );

        store.put(&category).await.expect("Could not put category");

        assert_eq!(stored_categories(&store, owner), vec![category]);
    }

    #[tokio::test]
    async fn put_replaces_existing_category_but_keeps_owner() {
        let store = get_test_store();
        let owner = UserId::generate();
        let category = Category::new(CategoryName::new_unchecked("Food"), Color::DEFAULT, owner);
        store.put(&category).await.unwrap();

        let renamed = Category {
            name: CategoryName::new_unchecked("Eating Out"),
            owner_id: UserId::generate(),
            ..category.clone()
        };
        store.put(&renamed).await.unwrap();

        let got = stored_categories(&store, owner);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].name.as_ref(), "Eating Out");
        assert_eq!(got[0].owner_id, owner);
    }

    #[tokio::test]
    async fn categories_are_scoped_to_owner() {
        let store = get_test_store();
        let owner = UserId::generate();
        let someone_else = UserId::generate();
        let mine = HashSet::from([
            Category::new(CategoryName::new_unchecked("Foo"), Color::DEFAULT, owner),
            Category::new(CategoryName::new_unchecked("Bar"), Color::DEFAULT, owner),
        ]);
        for category in &mine {
            store.put(category).await.unwrap();
        }
        store
            .put(&Category::new(
                CategoryName::new_unchecked("Theirs"),
                Color::DEFAULT,
                someone_else,
            ))
            .await
            .unwrap();

        let got = HashSet::from_iter(stored_categories(&store, owner));

        assert_eq!(got, mine);
    }

    #[tokio::test]
    async fn delete_removes_category() {
        let store = get_test_store();
        let owner = UserId::generate();
        let category = Category::new(CategoryName::new_unchecked("Foo"), Color::DEFAULT, owner);
        store.put(&category).await.unwrap();

        store.delete(category.id).await.expect("Could not delete");

        assert!(stored_categories(&store, owner).is_empty());
    }

    #[tokio::test]
    async fn delete_with_invalid_id_returns_error() {
        let store = get_test_store();

        let result = store.delete(CategoryId::generate()).await;

        assert_eq!(result, Err(Error::DeleteMissingCategory));
    }

    #[tokio::test]
    async fn subscription_delivers_snapshot_after_each_write() {
        let store = get_test_store();
        let owner = UserId::generate();
        let mut subscription = store.subscribe(CategoryFilter::owner(owner));

        assert_eq!(subscription.next().await, Some(SnapshotEvent::Snapshot(vec![])));

        let category = Category::new(CategoryName::new_unchecked("Rent"), Color::DEFAULT, owner);
        store.put(&category).await.unwrap();

        assert_eq!(
            subscription.next().await,
            Some(SnapshotEvent::Snapshot(vec![category.clone()]))
        );

        store.delete(category.id).await.unwrap();

        assert_eq!(subscription.next().await, Some(SnapshotEvent::Snapshot(vec![])));
    }
}
