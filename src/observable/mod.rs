//! Observable handles over the record store and migration engine
//!
//! Each handle owns a `tokio::sync::watch` channel carrying a
//! `{data, loading, error}` state. Actions set `loading` and clear `error`
//! before awaiting, then publish the result or the error message. Callers
//! either [`subscribe`](Published::subscribe) for change notifications or
//! take a [`snapshot`](Published::snapshot).

use tokio::sync::watch;

pub mod conversations;
pub mod migration;

pub use conversations::{
    BulkOperationsHandle, ConversationHandle, ConversationsHandle, StatsHandle,
    StorageHealthHandle,
};
pub use migration::{MigrationState, StorageMigrationHandle};

/// Published state of a data handle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> QueryState<T> {
    /// State before any load has completed
    pub fn loading(data: T) -> Self {
        Self {
            data,
            loading: true,
            error: None,
        }
    }

    /// State of a handle that has not been asked to load yet
    pub fn idle(data: T) -> Self {
        Self {
            data,
            loading: false,
            error: None,
        }
    }
}

/// Message shown for a failed action, falling back when the error is blank
pub fn error_message(err: &anyhow::Error, fallback: &str) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// Watch channel wrapper shared by every handle
#[derive(Debug)]
pub struct Published<S> {
    tx: watch::Sender<S>,
}

impl<S: Clone> Published<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> S {
        self.tx.borrow().clone()
    }

    /// Mutate the state in place and notify subscribers
    pub fn update(&self, modify: impl FnOnce(&mut S)) {
        self.tx.send_modify(modify);
    }
}

impl<T: Clone> Published<QueryState<T>> {
    fn begin(&self) {
        self.update(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    fn succeed(&self, data: T) {
        self.update(|state| {
            state.data = data;
            state.loading = false;
        });
    }

    fn fail(&self, message: String) {
        self.update(|state| {
            state.error = Some(message);
            state.loading = false;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_uses_fallback_for_blank_errors() {
        let err = anyhow::anyhow!("  ");
        assert_eq!(error_message(&err, "Failed to load"), "Failed to load");

        let err = anyhow::anyhow!("disk full");
        assert_eq!(error_message(&err, "Failed to load"), "disk full");
    }

    #[test]
    fn test_published_transitions() {
        let published = Published::new(QueryState::idle(0u32));
        let mut rx = published.subscribe();

        published.begin();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().loading);

        published.succeed(7);
        let state = published.snapshot();
        assert_eq!(state.data, 7);
        assert!(!state.loading);
        assert!(state.error.is_none());

        published.begin();
        published.fail("boom".to_string());
        let state = published.snapshot();
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert_eq!(state.data, 7);
        assert!(!state.loading);
    }
}
