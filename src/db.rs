//! Creates the application's SQLite schema and converts between SQL values and domain types.

use rusqlite::{Connection, Row, types::Type};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::Error;

/// Create the tables for users, sessions, categories and transactions.
///
/// Safe to call on an existing database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS user (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS category (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            color INTEGER NOT NULL,
            owner_id TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_category_owner ON category(owner_id);

        CREATE TABLE IF NOT EXISTS \"transaction\" (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
            category_id TEXT,
            occurred_at INTEGER NOT NULL,
            note TEXT,
            owner_id TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_owner_date
            ON \"transaction\"(owner_id, occurred_at);
        CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category_id);",
    )?;

    Ok(())
}

/// Read a UUID stored as text in column `index`.
pub(crate) fn get_uuid(row: &Row, index: usize) -> Result<Uuid, rusqlite::Error> {
    let raw: String = row.get(index)?;

    Uuid::parse_str(&raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, error.into()))
}

/// Read an optional UUID stored as text in column `index`.
pub(crate) fn get_optional_uuid(row: &Row, index: usize) -> Result<Option<Uuid>, rusqlite::Error> {
    let raw: Option<String> = row.get(index)?;

    raw.map(|raw| {
        Uuid::parse_str(&raw).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(index, Type::Text, error.into())
        })
    })
    .transpose()
}

/// Convert a timestamp to Unix milliseconds for storage.
pub(crate) fn to_unix_millis(timestamp: OffsetDateTime) -> i64 {
    (timestamp.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Read a timestamp stored as Unix milliseconds in column `index`.
pub(crate) fn get_timestamp(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let millis: i64 = row.get(index)?;

    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, error.into())
        })
}
