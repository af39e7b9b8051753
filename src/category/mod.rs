//! Categories group a user's transactions.
//!
//! This module contains:
//! - The `Category` model and its validated fields
//! - The cascade that deletes a category along with, or after moving, its transactions
//! - The `CategoryHolder` that caches a user's categories and forwards edits to the store

mod cascade;
mod domain;
mod holder;

pub use cascade::{CascadeAction, CascadePlan, CascadeResolver};
pub use domain::{Category, CategoryId, CategoryName, Color};
pub use holder::CategoryHolder;
