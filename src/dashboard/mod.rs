//! Dashboard module
//!
//! Summarises a user's transactions into income, expense and balance totals
//! plus a short list of recent activity.

mod aggregation;
mod holder;

pub use aggregation::{DashboardSummary, RECENT_LIMIT, aggregate};
pub use holder::{DashboardHolder, DashboardState};
