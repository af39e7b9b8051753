//! Transactions: the income and expense records of a user.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - The `TransactionHolder` that caches a user's transactions and forwards edits to the store

mod domain;
mod holder;

pub use domain::{Amount, Title, Transaction, TransactionBuilder, TransactionId, TransactionKind};
pub use holder::TransactionHolder;

pub(crate) use domain::normalise_note;
