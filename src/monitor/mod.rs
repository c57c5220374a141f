//! Progress events: workers report completed steps, listeners (progress bar, log) observe them.

pub mod progress;

pub use progress::{LogListener, ProgressBarListener};

use std::sync::{Arc, PoisonError, RwLock};

/// Receiver of progress events.
pub trait Notifiable {
    /// One step completed. `detail` is a human-readable label (usually the document path).
    fn notify(&self, detail: Option<&str>);

    /// Expected total number of steps. A later hint supersedes an earlier one.
    fn hint_remaining(&self, total: usize);
}

/// A [`Notifiable`] that can be registered on a [`Monitorable`] and called from worker threads.
pub trait Listener: Notifiable + Send + Sync {}

impl<T: Notifiable + Send + Sync> Listener for T {}

/// Subject side: listener registration.
pub trait Monitorable {
    fn add_listener(&self, listener: Arc<dyn Listener>);

    /// Remove `listener` (by identity). Returns true if it was registered.
    fn delete_listener(&self, listener: &Arc<dyn Listener>) -> bool;

    fn delete_listeners(&self);

    fn count_listeners(&self) -> usize;
}

/// Lock-guarded subscriber list. Events are delivered to a snapshot taken under the read lock, so a
/// listener may (de)register listeners from inside `notify` without deadlocking.
#[derive(Default)]
pub struct ListenerBus {
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
}

impl ListenerBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Vec<Arc<dyn Listener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Deliver one step event to every registered listener.
    pub fn notify_listeners(&self, detail: Option<&str>) {
        for listener in self.snapshot() {
            listener.notify(detail);
        }
    }

    pub fn hint_listeners(&self, total: usize) {
        for listener in self.snapshot() {
            listener.hint_remaining(total);
        }
    }
}

impl Monitorable for ListenerBus {
    fn add_listener(&self, listener: Arc<dyn Listener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn delete_listener(&self, listener: &Arc<dyn Listener>) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    fn delete_listeners(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn count_listeners(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A bus is itself a listener, so buses can be chained (e.g. scanner hints forwarded to the consumer's bus).
impl Notifiable for ListenerBus {
    fn notify(&self, detail: Option<&str>) {
        self.notify_listeners(detail);
    }

    fn hint_remaining(&self, total: usize) {
        self.hint_listeners(total);
    }
}
