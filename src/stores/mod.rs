//! Contains implementations of the [gateways](crate::gateway) and the
//! [AuthProvider](crate::auth::AuthProvider).

pub mod sqlite;

pub use sqlite::{SQLiteAuthProvider, SQLiteCategoryStore, SQLiteDatabase, SQLiteTransactionStore};
