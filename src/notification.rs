//! Toast notifications for showing success and error messages to users.
//!
//! Producers push messages without knowing who displays them, consumers read
//! a snapshot of the queue. Every toast removes itself after a fixed delay.
//!
//! The queue has no maximum length. Toasts expire quickly so it stays short
//! in practice, but a burst of failures will show every one of them.

use std::{
    collections::VecDeque,
    fmt::Display,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::runtime::Handle;

use crate::config::DEFAULT_TOAST_DURATION;

/// The unique id of a toast.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToastId(String);

impl ToastId {
    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ToastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A short lived message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Identifies the toast for removal.
    pub id: ToastId,
    /// The text to display.
    pub message: String,
}

/// A FIFO queue of toasts that expire on their own.
///
/// Cloning the queue shares the same toasts.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    toasts: Arc<Mutex<VecDeque<Toast>>>,
    next_id: Arc<AtomicU64>,
    duration: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl NotificationQueue {
    /// Create a queue whose toasts live for `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            toasts: Arc::new(Mutex::new(VecDeque::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            duration,
        }
    }

    /// Append a toast and schedule its removal.
    ///
    /// Removal runs on the current tokio runtime. Outside a runtime the toast
    /// is kept until [NotificationQueue::dismiss] is called.
    pub fn push(&self, message: impl Into<String>) -> ToastId {
        let id = ToastId(format!(
            "toast-{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        ));
        let toast = Toast {
            id: id.clone(),
            message: message.into(),
        };
        tracing::debug!("showing toast {}: {}", toast.id, toast.message);

        match self.toasts.lock() {
            Ok(mut toasts) => toasts.push_back(toast),
            Err(error) => {
                tracing::error!("could not acquire the notification lock: {error}");
                return id;
            }
        }

        match Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                let expired = id.clone();
                handle.spawn(async move {
                    tokio::time::sleep(queue.duration).await;
                    queue.dismiss(&expired);
                });
            }
            Err(_) => tracing::warn!("no async runtime, toast {id} will not expire on its own"),
        }

        id
    }

    /// Remove the toast with `id`. Removing an expired toast does nothing.
    pub fn dismiss(&self, id: &ToastId) {
        match self.toasts.lock() {
            Ok(mut toasts) => toasts.retain(|toast| &toast.id != id),
            Err(error) => tracing::error!("could not acquire the notification lock: {error}"),
        }
    }

    /// The toasts currently shown, oldest first.
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|toasts| toasts.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The messages currently shown, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.toasts()
            .into_iter()
            .map(|toast| toast.message)
            .collect()
    }

    /// The number of toasts currently shown.
    pub fn len(&self) -> usize {
        self.toasts.lock().map(|toasts| toasts.len()).unwrap_or(0)
    }

    /// Whether no toasts are shown.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
