#![forbid(unsafe_code)]

//! Shared, version-tracked value cells with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value in shared, reference-counted storage.
//! Mutations bump a version counter and broadcast the new value to every
//! live subscriber, in registration order. Subscriber callbacks are stored
//! weakly: the strong half lives inside the [`Subscription`] guard returned
//! by [`subscribe()`](Observable::subscribe), so dropping the guard makes
//! the entry inert immediately; dead entries are pruned lazily on the next
//! broadcast.
//!
//! # Invariants
//!
//! 1. `version` increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. [`set()`](Observable::set) with a value equal to the current one is a
//!    no-op: no version bump, no notifications.
//! 4. Internal borrows are released before callbacks run, so a callback may
//!    read or mutate the observable it is subscribed to.
//!
//! # Failure Modes
//!
//! - **Callback panics**: the value and version are already committed; the
//!   remaining subscribers in this cycle are not notified.
//! - **Re-entrant mutation from a callback**: runs as a fresh, nested
//!   broadcast cycle. Unbounded mutual recursion between subscribers is the
//!   caller's responsibility.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// One registered subscriber. The callback is held weakly; the strong half
/// lives in the [`Subscription`] guard.
struct Subscriber<T> {
    id: u64,
    callback: Weak<dyn Fn(&T)>,
}

/// Shared interior for [`Observable<T>`].
struct ObservableInner<T> {
    value: T,
    /// Monotonically increasing, bumped once per effective change.
    version: u64,
    subscribers: Vec<Subscriber<T>>,
    next_id: u64,
}

/// A shared, observable value cell.
///
/// Cloning an `Observable` creates a new handle to the **same** inner state;
/// mutations through any handle are visible to all of them.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// RAII guard for a registered subscriber callback.
///
/// Dropping the guard releases the callback; the observable prunes the dead
/// entry on its next broadcast. Guards are type-erased so heterogeneous
/// subscriptions can be held in one collection.
#[must_use = "dropping a Subscription immediately deactivates its callback"]
pub struct Subscription {
    id: u64,
    /// Keeps the callback `Rc` alive; the observable only holds a `Weak`.
    _keep: Box<dyn Any>,
}

impl Subscription {
    /// Assemble a guard from an id and the strong callback handle. Used by
    /// every cell type in this crate that stores weak subscribers.
    pub(crate) fn from_parts(id: u64, keep: Box<dyn Any>) -> Self {
        Self { id, _keep: keep }
    }

    /// Identifier of this subscription within its cell, for diagnostics.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Explicitly revoke the subscription. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl<T> Observable<T> {
    /// Create a new cell holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Current version. Starts at 0 and increments once per effective change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of subscriber entries, including ones whose guard has been
    /// dropped but that have not been pruned yet.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl<T: 'static> Observable<T> {
    /// Register a callback invoked with the new value after each effective
    /// change. The callback stays registered for the lifetime of the
    /// returned [`Subscription`].
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<dyn Fn(&T)> = Rc::new(callback);
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            callback: Rc::downgrade(&callback),
        });
        tracing::trace!(subscription_id = id, "observable subscriber registered");
        Subscription::from_parts(id, Box::new(callback))
    }
}

impl<T: Clone> Observable<T> {
    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Replace the value unconditionally, returning the previous one.
    /// Always bumps the version and notifies subscribers.
    pub fn replace(&self, value: T) -> T {
        let (old, broadcast, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            let old = std::mem::replace(&mut inner.value, value);
            inner.version += 1;
            (old, inner.value.clone(), inner.collect_live())
        };
        for callback in subscribers {
            callback(&broadcast);
        }
        old
    }

    /// Mutate the value in place, then notify subscribers.
    /// Always bumps the version; use [`set()`](Observable::set) when
    /// equality suppression is wanted.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let (broadcast, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            f(&mut inner.value);
            inner.version += 1;
            (inner.value.clone(), inner.collect_live())
        };
        for callback in subscribers {
            callback(&broadcast);
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Set a new value. No-op when equal to the current value; otherwise
    /// bumps the version and notifies subscribers in registration order.
    pub fn set(&self, value: T) {
        let (broadcast, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
            (inner.value.clone(), inner.collect_live())
        };
        for callback in subscribers {
            callback(&broadcast);
        }
    }
}

impl<T> ObservableInner<T> {
    /// Snapshot the live callbacks in registration order, pruning entries
    /// whose guard has been dropped. Cleanup happens only here, as a side
    /// effect of broadcasting.
    fn collect_live(&mut self) -> Vec<Rc<dyn Fn(&T)>> {
        let mut live = Vec::with_capacity(self.subscribers.len());
        let before = self.subscribers.len();
        self.subscribers.retain(|s| match s.callback.upgrade() {
            Some(callback) => {
                live.push(callback);
                true
            }
            None => false,
        });
        let pruned = before - self.subscribers.len();
        if pruned > 0 {
            tracing::trace!(pruned, "pruned dead observable subscribers");
        }
        live
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
