#![forbid(unsafe_code)]

//! Multicast delegates: one invocation point, many fallible subscribers.
//!
//! A [`Delegate`] owns its subscriber list strongly; a handler lives until
//! its [`DelegateSubscription`] is dropped (or detached) or the delegate is
//! disposed. Two failure disciplines are supported:
//!
//! - [`DelegateMode::Sequential`]: subscribers run in registration order
//!   and the first error stops the run and is returned to the invoker.
//! - [`DelegateMode::Parallel`]: every subscriber runs; failures are logged
//!   and the invocation itself reports success.
//!
//! # Invariants
//!
//! 1. Invocation order is registration order.
//! 2. The subscriber list is snapshotted before any handler runs; handlers
//!    that subscribe or unsubscribe mid-invocation affect the next
//!    invocation only.
//! 3. Dropping a subscription removes exactly that handler.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// What a delegate subscriber reports back.
pub type DelegateResult = Result<(), Box<dyn std::error::Error>>;

/// Failure discipline for [`Delegate::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateMode {
    /// Stop at the first failing subscriber and surface its error.
    Sequential,
    /// Run every subscriber; log failures, report success.
    Parallel,
}

struct DelegateEntry<A> {
    id: u64,
    callback: Rc<dyn Fn(&A) -> DelegateResult>,
}

struct DelegateInner<A> {
    mode: DelegateMode,
    subscribers: Vec<DelegateEntry<A>>,
    next_id: u64,
}

/// A multicast invocation point for handlers of `A`.
pub struct Delegate<A> {
    inner: Rc<RefCell<DelegateInner<A>>>,
}

impl<A> Clone for Delegate<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> std::fmt::Debug for Delegate<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Delegate")
            .field("mode", &inner.mode)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Removes its handler from the owning delegate when dropped.
#[must_use = "dropping a DelegateSubscription immediately unsubscribes its handler"]
pub struct DelegateSubscription {
    id: u64,
    revoke: Option<Box<dyn FnOnce()>>,
}

impl DelegateSubscription {
    /// Identifier of the handler within its delegate.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Leave the handler subscribed for the delegate's remaining lifetime.
    pub fn detach(mut self) {
        self.revoke = None;
    }
}

impl Drop for DelegateSubscription {
    fn drop(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            revoke();
        }
    }
}

impl std::fmt::Debug for DelegateSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateSubscription")
            .field("id", &self.id)
            .finish()
    }
}

impl<A> Delegate<A> {
    /// A delegate with the given failure discipline.
    #[must_use]
    pub fn new(mode: DelegateMode) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DelegateInner {
                mode,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Shorthand for [`DelegateMode::Sequential`].
    #[must_use]
    pub fn sequential() -> Self {
        Self::new(DelegateMode::Sequential)
    }

    /// Shorthand for [`DelegateMode::Parallel`].
    #[must_use]
    pub fn parallel() -> Self {
        Self::new(DelegateMode::Parallel)
    }

    /// The delegate's failure discipline.
    #[must_use]
    pub fn mode(&self) -> DelegateMode {
        self.inner.borrow().mode
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Whether no handlers are subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().subscribers.is_empty()
    }

    /// Remove every subscriber at once.
    pub fn dispose(&self) {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            std::mem::take(&mut inner.subscribers).len()
        };
        if removed > 0 {
            tracing::debug!(removed, "delegate disposed");
        }
    }
}

impl<A: 'static> Delegate<A> {
    /// Register a handler. It stays subscribed until the returned guard is
    /// dropped, detached, or the delegate is disposed.
    pub fn subscribe(&self, callback: impl Fn(&A) -> DelegateResult + 'static) -> DelegateSubscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push(DelegateEntry {
                id,
                callback: Rc::new(callback),
            });
            id
        };
        let weak: Weak<RefCell<DelegateInner<A>>> = Rc::downgrade(&self.inner);
        DelegateSubscription {
            id,
            revoke: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().subscribers.retain(|entry| entry.id != id);
                }
            })),
        }
    }

    /// Invoke every subscriber with `args`, under the delegate's failure
    /// discipline. The list is snapshotted first, so handlers may freely
    /// mutate the delegate they are being called from.
    pub fn invoke(&self, args: &A) -> DelegateResult {
        let (mode, snapshot): (DelegateMode, Vec<(u64, Rc<dyn Fn(&A) -> DelegateResult>)>) = {
            let inner = self.inner.borrow();
            (
                inner.mode,
                inner
                    .subscribers
                    .iter()
                    .map(|entry| (entry.id, Rc::clone(&entry.callback)))
                    .collect(),
            )
        };

        match mode {
            DelegateMode::Sequential => {
                for (id, callback) in snapshot {
                    if let Err(error) = callback(args) {
                        tracing::debug!(subscriber_id = id, %error, "sequential delegate stopped");
                        return Err(error);
                    }
                }
                Ok(())
            }
            DelegateMode::Parallel => {
                for (id, callback) in snapshot {
                    if let Err(error) = callback(args) {
                        tracing::warn!(subscriber_id = id, %error, "parallel delegate subscriber failed");
                    }
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn record(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> impl Fn(&i32) -> DelegateResult + use<> {
        let log = Rc::clone(log);
        move |_| {
            log.borrow_mut().push(tag);
            Ok(())
        }
    }

    // ── Ordering ────────────────────────────────────────────────────────

    #[test]
    fn subscribers_run_in_registration_order() {
        let delegate = Delegate::sequential();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = delegate.subscribe(record(&log, "a"));
        let _b = delegate.subscribe(record(&log, "b"));
        let _c = delegate.subscribe(record(&log, "c"));
        delegate.invoke(&0).unwrap();
        assert_eq!(*log.borrow(), ["a", "b", "c"]);
    }

    // ── Sequential discipline ───────────────────────────────────────────

    #[test]
    fn sequential_stops_at_first_error() {
        let delegate = Delegate::sequential();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = delegate.subscribe(record(&log, "a"));
        let _b = delegate.subscribe(|_: &i32| Err("denied".into()));
        let _c = delegate.subscribe(record(&log, "c"));

        let err = delegate.invoke(&0).unwrap_err();
        assert_eq!(err.to_string(), "denied");
        assert_eq!(*log.borrow(), ["a"]);
    }

    // ── Parallel discipline ─────────────────────────────────────────────

    #[test]
    fn parallel_runs_everyone_and_reports_success() {
        let delegate = Delegate::parallel();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = delegate.subscribe(record(&log, "a"));
        let _b = delegate.subscribe(|_: &i32| Err("ignored".into()));
        let _c = delegate.subscribe(record(&log, "c"));

        delegate.invoke(&0).unwrap();
        assert_eq!(*log.borrow(), ["a", "c"]);
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    #[test]
    fn dropping_a_subscription_removes_its_handler() {
        let delegate = Delegate::sequential();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = delegate.subscribe(record(&log, "a"));
        let _b = delegate.subscribe(record(&log, "b"));
        assert_eq!(delegate.len(), 2);
        drop(a);
        assert_eq!(delegate.len(), 1);
        delegate.invoke(&0).unwrap();
        assert_eq!(*log.borrow(), ["b"]);
    }

    #[test]
    fn detached_subscriptions_outlive_their_guard() {
        let delegate = Delegate::sequential();
        let log = Rc::new(RefCell::new(Vec::new()));
        delegate.subscribe(record(&log, "a")).detach();
        assert_eq!(delegate.len(), 1);
        delegate.invoke(&0).unwrap();
        assert_eq!(*log.borrow(), ["a"]);
    }

    #[test]
    fn dispose_clears_all_subscribers() {
        let delegate = Delegate::sequential();
        let sub = delegate.subscribe(|_: &i32| Ok(()));
        delegate.dispose();
        assert!(delegate.is_empty());
        // Guard of an already-removed handler drops harmlessly.
        drop(sub);
        delegate.invoke(&0).unwrap();
    }

    #[test]
    fn mid_invocation_subscribes_take_effect_next_time() {
        let delegate: Delegate<i32> = Delegate::sequential();
        let log = Rc::new(RefCell::new(Vec::new()));
        let late: Rc<RefCell<Option<DelegateSubscription>>> = Rc::new(RefCell::new(None));

        let d = delegate.clone();
        let l = Rc::clone(&log);
        let slot = Rc::clone(&late);
        let _a = delegate.subscribe(move |_| {
            l.borrow_mut().push("a");
            if slot.borrow().is_none() {
                let l2 = Rc::clone(&l);
                *slot.borrow_mut() = Some(d.subscribe(move |_| {
                    l2.borrow_mut().push("late");
                    Ok(())
                }));
            }
            Ok(())
        });

        delegate.invoke(&0).unwrap();
        assert_eq!(*log.borrow(), ["a"]);
        delegate.invoke(&0).unwrap();
        assert_eq!(*log.borrow(), ["a", "a", "late"]);
    }

    #[test]
    fn subscription_guard_survives_delegate_drop() {
        let delegate = Delegate::sequential();
        let sub = delegate.subscribe(|_: &i32| Ok(()));
        drop(delegate);
        drop(sub);
    }
}
