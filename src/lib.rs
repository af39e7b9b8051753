//! Fintrack is a personal finance tracker.
//!
//! Users sign in, record income and expense transactions, group them into
//! categories, and see their totals on a dashboard.
//!
//! This library provides:
//! - the [gateway] traits for the remote store that owns categories and
//!   transactions, and a SQLite implementation in [stores];
//! - holders that cache the latest snapshot from the store
//!   ([TransactionHolder], [CategoryHolder], [DashboardHolder], [AuthHolder]);
//! - the category deletion [cascade](category::CascadeResolver) and the
//!   dashboard [aggregation](dashboard::aggregate).

#![warn(missing_docs)]

pub mod auth;
pub mod category;
pub mod config;
pub mod dashboard;
pub mod gateway;
pub mod holder;
pub mod profile;
pub mod stores;
pub mod transaction;
pub mod user;

mod db;
mod error;
mod format;
mod logging;

#[cfg(test)]
mod test_utils;

pub use auth::{AuthHolder, AuthProvider, AuthState, Email, Session};
pub use category::{CascadeAction, CascadePlan, Category, CategoryHolder, CategoryId};
pub use config::Config;
pub use dashboard::{DashboardHolder, DashboardSummary, aggregate};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use format::format_currency;
pub use holder::{CollectionState, LoadStatus};
pub use logging::setup_logging;
pub use profile::clear_all_user_data;
pub use transaction::{Transaction, TransactionHolder, TransactionId, TransactionKind};
pub use user::UserId;
