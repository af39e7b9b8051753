//! The cached state shared by the collection holders and the task that keeps
//! it in sync with a [Subscription].

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    Error,
    gateway::{SnapshotEvent, Subscription},
};

/// Whether a holder has received data from its subscription yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LoadStatus {
    /// No subscription is running, or it failed before delivering a snapshot.
    #[default]
    Idle,
    /// Waiting for the first snapshot.
    Loading,
    /// At least one snapshot has been received.
    Ready,
}

/// The latest list pushed by the store plus loading and error information.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionState<T> {
    /// Whether a snapshot has arrived yet.
    pub status: LoadStatus,
    /// The last snapshot. Kept when a later error arrives.
    pub items: Vec<T>,
    /// A message describing the last failure, if any.
    pub error: Option<String>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            status: LoadStatus::Idle,
            items: Vec::new(),
            error: None,
        }
    }
}

impl<T> CollectionState<T> {
    /// Update the state with an event from the subscription.
    ///
    /// A snapshot replaces the cached items and clears the error. An error is
    /// recorded and leaves the cached items in place.
    pub fn apply(&mut self, event: SnapshotEvent<T>) {
        match event {
            SnapshotEvent::Snapshot(items) => {
                self.items = items;
                self.status = LoadStatus::Ready;
                self.error = None;
            }
            SnapshotEvent::Error(error) => {
                self.status = status_after_failure(self.status);
                self.error = Some(error.to_string());
            }
        }
    }
}

/// The status to move to when a subscription fails while in `status`.
pub(crate) fn status_after_failure(status: LoadStatus) -> LoadStatus {
    match status {
        LoadStatus::Ready => LoadStatus::Ready,
        LoadStatus::Idle | LoadStatus::Loading => LoadStatus::Idle,
    }
}

/// Log a failed mutation and record it with `record`, then hand the result back.
pub(crate) fn record_failure<T>(
    result: Result<T, Error>,
    action: &str,
    record: impl FnOnce(String),
) -> Result<T, Error> {
    if let Err(error) = &result {
        tracing::error!("Could not {action}: {error}");
        record(error.to_string());
    }

    result
}

/// A task feeding subscription events to a holder. The task, and with it the
/// subscription, stops when this handle is dropped.
#[derive(Debug)]
pub(crate) struct Listener {
    task: JoinHandle<()>,
}

impl Listener {
    /// Call `on_event` for every event of `subscription` until it ends or fails.
    pub(crate) fn spawn<T, F>(mut subscription: Subscription<T>, mut on_event: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(SnapshotEvent<T>) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let failed = matches!(event, SnapshotEvent::Error(_));
                on_event(event);

                if failed {
                    break;
                }
            }
        });

        Self { task }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Wait until `receiver` holds a state that is not loading, and return it.
///
/// # Errors
///
/// Returns [Error::SubscriptionClosed] if the holder was dropped while waiting.
pub(crate) async fn wait_until_loaded<S, F>(
    mut receiver: watch::Receiver<S>,
    status: F,
) -> Result<S, Error>
where
    S: Clone,
    F: Fn(&S) -> LoadStatus,
{
    receiver
        .wait_for(|state| status(state) != LoadStatus::Loading)
        .await
        .map(|state| state.clone())
        .map_err(|_| Error::SubscriptionClosed)
}
