#![forbid(unsafe_code)]

//! Watch handles: observation with pause/resume/stop control.
//!
//! [`watch()`] subscribes a callback to any [`Watchable`] cell and returns a
//! [`WatchHandle`]. The handle mediates delivery: while paused, changes are
//! silently skipped (not queued); `stop()` revokes the subscription for
//! good. Dropping the handle stops it too, which is how view models dispose
//! of their watchers on unmount.

use std::cell::Cell;
use std::rc::Rc;

use crate::computed::Computed;
use crate::observable::{Observable, Subscription};

/// A cell whose value changes can be watched.
pub trait Watchable<T> {
    /// Register a boxed observer callback. Implementations deliver the fresh
    /// value after each effective change.
    fn watch_with(&self, callback: Box<dyn Fn(&T)>) -> Subscription;
}

impl<T: 'static> Watchable<T> for Observable<T> {
    fn watch_with(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        self.subscribe(move |v| callback(v))
    }
}

impl<T: Clone + 'static> Watchable<T> for Computed<T> {
    fn watch_with(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        self.subscribe(move |v| callback(v))
    }
}

/// Control handle for a registered watcher.
#[must_use = "dropping a WatchHandle stops the watcher"]
pub struct WatchHandle {
    subscription: Option<Subscription>,
    paused: Rc<Cell<bool>>,
}

impl WatchHandle {
    /// Skip deliveries until [`resume()`](WatchHandle::resume). Changes made
    /// while paused are not replayed.
    pub fn pause(&self) {
        self.paused.set(true);
    }

    /// Resume deliveries.
    pub fn resume(&self) {
        self.paused.set(false);
    }

    /// Whether deliveries are currently skipped.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    /// Whether the watcher is still subscribed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Permanently revoke the watcher. Idempotent.
    pub fn stop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            tracing::trace!(subscription_id = subscription.id(), "watcher stopped");
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.is_active())
            .field("paused", &self.is_paused())
            .finish()
    }
}

/// Watch a cell, delivering each effective change to `callback`.
pub fn watch<T, S>(source: &S, callback: impl Fn(&T) + 'static) -> WatchHandle
where
    S: Watchable<T> + ?Sized,
{
    let paused = Rc::new(Cell::new(false));
    let gate = Rc::clone(&paused);
    let subscription = source.watch_with(Box::new(move |value| {
        if !gate.get() {
            callback(value);
        }
    }));
    WatchHandle {
        subscription: Some(subscription),
        paused,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
