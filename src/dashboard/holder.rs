//! Keeps the dashboard summary up to date with the user's transactions.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::{
    Error,
    dashboard::{DashboardSummary, aggregate},
    gateway::{SnapshotEvent, TransactionFilter, TransactionGateway},
    holder::{LoadStatus, Listener, status_after_failure, wait_until_loaded},
    user::UserId,
};

/// The dashboard summary plus loading and error information.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardState {
    /// Whether a summary has been computed yet.
    pub status: LoadStatus,
    /// Computed from the last transaction snapshot.
    pub summary: DashboardSummary,
    /// The last subscription failure, cleared by the next snapshot.
    pub error: Option<String>,
}

/// Recomputes the [DashboardSummary] for every transaction snapshot.
pub struct DashboardHolder {
    state: Arc<watch::Sender<DashboardState>>,
    _listener: Listener,
}

impl DashboardHolder {
    /// Start summarising the transactions of `owner_id`.
    pub fn new(gateway: Arc<dyn TransactionGateway>, owner_id: UserId) -> Self {
        let (state, _) = watch::channel(DashboardState {
            status: LoadStatus::Loading,
            ..Default::default()
        });
        let state = Arc::new(state);

        let listener_state = state.clone();
        let listener = Listener::spawn(
            gateway.subscribe(TransactionFilter::owner(owner_id)),
            move |event| {
                listener_state.send_modify(|state| match event {
                    SnapshotEvent::Snapshot(transactions) => {
                        state.summary = aggregate(&transactions);
                        state.status = LoadStatus::Ready;
                        state.error = None;
                    }
                    SnapshotEvent::Error(error) => {
                        tracing::error!("Dashboard subscription failed: {error}");
                        state.status = status_after_failure(state.status);
                        state.error = Some(error.to_string());
                    }
                });
            },
        );

        Self {
            state,
            _listener: listener,
        }
    }

    /// A copy of the current state.
    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Watch for state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// Wait for the first summary, or the failure that prevented it.
    ///
    /// # Errors
    ///
    /// Returns [Error::SubscriptionClosed] if the state stops being published.
    pub async fn loaded(&self) -> Result<DashboardState, Error> {
        wait_until_loaded(self.state.subscribe(), |state| state.status).await
    }
}

#[cfg(test)]
mod dashboard_holder_tests {
    use crate::{
        gateway::TransactionGateway,
        holder::LoadStatus,
        test_utils::{Operation, faulty_gateways, injected_error, transaction, wait_for_state},
        transaction::TransactionKind,
        user::UserId,
    };

    use super::DashboardHolder;

    #[tokio::test]
    async fn summary_follows_transactions() {
        let (_, transactions) = faulty_gateways();
        let owner = UserId::generate();
        let holder = DashboardHolder::new(transactions.clone(), owner);

        let state = holder.loaded().await.unwrap();
        assert_eq!(state.status, LoadStatus::Ready);
        assert_eq!(state.summary.total_balance, 0.0);

        transactions
            .put(&transaction(TransactionKind::Income, 100.0, 0, None, owner))
            .await
            .unwrap();
        transactions
            .put(&transaction(TransactionKind::Expense, 40.0, 1, None, owner))
            .await
            .unwrap();

        let mut receiver = holder.subscribe_state();
        let state = wait_for_state(&mut receiver, |state| state.summary.recent.len() == 2).await;
        assert_eq!(state.summary.total_income, 100.0);
        assert_eq!(state.summary.total_expense, 40.0);
        assert_eq!(state.summary.total_balance, 60.0);
    }

    #[tokio::test]
    async fn failed_subscription_is_reported() {
        let (_, transactions) = faulty_gateways();
        transactions.fail(Operation::Subscribe);
        let holder = DashboardHolder::new(transactions, UserId::generate());

        let state = holder.loaded().await.unwrap();

        assert_eq!(state.status, LoadStatus::Idle);
        assert_eq!(state.error, Some(injected_error().to_string()));
    }
}
