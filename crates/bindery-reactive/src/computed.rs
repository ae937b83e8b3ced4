#![forbid(unsafe_code)]

//! Lazy computed values derived from explicit source cells.
//!
//! # Design
//!
//! [`Computed<T>`] wraps a compute function and its cached result in shared,
//! reference-counted storage. Sources are declared explicitly (see
//! [`SourceRef`]); when any of them changes, the cached value is invalidated.
//! The next [`get()`](Computed::get) recomputes and caches the result.
//!
//! A computed can itself be subscribed to. While it has subscribers, source
//! invalidation recomputes eagerly and broadcasts the fresh value, so
//! watchers and chained computeds are never left stale.
//!
//! # Invariants
//!
//! 1. `get()` always returns a value consistent with the current state of
//!    all sources (no stale reads after a source mutation completes).
//! 2. The compute function runs at most once per invalidation cycle
//!    (memoization).
//! 3. If no source has changed, `get()` returns the cached value in O(1).
//! 4. Version increments by exactly 1 per recomputation.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the cached value remains from the last
//!   successful computation; the dirty flag stays set so the next `get()`
//!   retries.
//! - **Source dropped**: the invalidation subscription becomes inert. The
//!   computed retains its last cached result and never goes dirty again from
//!   that source.
//! - **Self-referential compute function**: a compute function that reads
//!   its own `Computed` recurses; keeping compute functions acyclic is the
//!   caller's responsibility.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::observable::Subscription;
use crate::source::SourceRef;

/// One registered subscriber of a computed. Held weakly, like observable
/// subscribers; the strong half lives in the [`Subscription`] guard.
struct Subscriber<T> {
    id: u64,
    callback: Weak<dyn Fn(&T)>,
}

/// Shared interior for [`Computed<T>`].
struct ComputedInner<T> {
    /// The computation function. `Rc` so it can be invoked with the interior
    /// borrow released.
    compute: Rc<dyn Fn() -> T>,
    /// Cached result (None only before first computation).
    cached: Option<T>,
    /// Whether the cached value is stale.
    dirty: Cell<bool>,
    /// Monotonically increasing version, bumped on each recomputation.
    version: u64,
    subscribers: Vec<Subscriber<T>>,
    next_id: u64,
    /// Subscription guards keeping source invalidation callbacks alive.
    /// Never read after construction, but must be kept alive.
    _sources: Vec<Subscription>,
}

/// A lazily-evaluated, memoized value derived from explicit source cells.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
pub struct Computed<T> {
    inner: Rc<RefCell<ComputedInner<T>>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Computed")
            .field("cached", &inner.cached)
            .field("dirty", &inner.dirty.get())
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value wired to the given sources. Each source
    /// change marks the value dirty; while the computed has subscribers, it
    /// also recomputes eagerly and broadcasts.
    pub fn with_sources<I>(sources: I, compute: impl Fn() -> T + 'static) -> Self
    where
        I: IntoIterator<Item = SourceRef>,
    {
        let inner = Rc::new(RefCell::new(ComputedInner {
            compute: Rc::new(compute),
            cached: None,
            dirty: Cell::new(true), // dirty initially, computes on first get()
            version: 0,
            subscribers: Vec::new(),
            next_id: 0,
            _sources: Vec::new(),
        }));

        let mut guards = Vec::new();
        for source in sources {
            let weak = Rc::downgrade(&inner);
            guards.push(source.subscribe_invalidation(Box::new(move || {
                if let Some(strong) = weak.upgrade() {
                    Self::invalidated(&strong);
                }
            })));
        }
        inner.borrow_mut()._sources = guards;

        Self { inner }
    }

    /// Create a computed value with no sources. It computes once and stays
    /// cached until [`invalidate()`](Computed::invalidate) is called.
    pub fn from_fn(compute: impl Fn() -> T + 'static) -> Self {
        Self::with_sources(std::iter::empty::<SourceRef>(), compute)
    }

    /// Create a computed value derived from a single observable.
    pub fn from_observable<S: 'static>(
        source: &crate::Observable<S>,
        map: impl Fn(&S) -> T + 'static,
    ) -> Self {
        let src = source.clone();
        Self::with_sources([source.as_source()], move || src.with(|v| map(v)))
    }

    /// Create a computed value derived from two observables.
    pub fn from2<S1: 'static, S2: 'static>(
        s1: &crate::Observable<S1>,
        s2: &crate::Observable<S2>,
        map: impl Fn(&S1, &S2) -> T + 'static,
    ) -> Self {
        let c1 = s1.clone();
        let c2 = s2.clone();
        Self::with_sources([s1.as_source(), s2.as_source()], move || {
            c1.with(|v1| c2.with(|v2| map(v1, v2)))
        })
    }

    /// Get the current value, recomputing first if any source has changed.
    #[must_use]
    pub fn get(&self) -> T {
        self.refresh();
        self.inner
            .borrow()
            .cached
            .as_ref()
            .expect("cached is always Some after refresh")
            .clone()
    }

    /// Access the current value by reference without cloning. Forces
    /// recomputation if dirty.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.refresh();
        let inner = self.inner.borrow();
        f(inner
            .cached
            .as_ref()
            .expect("cached is always Some after refresh"))
    }

    /// Register a callback invoked with the fresh value after each
    /// recomputation triggered by source invalidation.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<dyn Fn(&T)> = Rc::new(callback);
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            callback: Rc::downgrade(&callback),
        });
        tracing::trace!(subscription_id = id, "computed subscriber registered");
        Subscription::from_parts(id, Box::new(callback))
    }

    /// Force invalidation. The next `get()` recomputes; if the computed has
    /// subscribers, recomputation and broadcast happen immediately.
    pub fn invalidate(&self) {
        Self::invalidated(&self.inner);
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().dirty.get()
    }

    /// Current version number. Increments by 1 per recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of subscriber entries, including not-yet-pruned dead ones.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Recompute and cache when dirty. Runs the compute function with the
    /// interior borrow released so it may read other cells freely.
    fn refresh(&self) {
        let compute = {
            let inner = self.inner.borrow();
            if !inner.dirty.get() && inner.cached.is_some() {
                return;
            }
            Rc::clone(&inner.compute)
        };
        let value = compute();
        let mut inner = self.inner.borrow_mut();
        inner.cached = Some(value);
        inner.dirty.set(false);
        inner.version += 1;
    }

    /// A source changed (or `invalidate` was called): mark dirty, and while
    /// observed, refresh eagerly and broadcast the fresh value.
    fn invalidated(inner: &Rc<RefCell<ComputedInner<T>>>) {
        let compute = {
            let guard = inner.borrow();
            guard.dirty.set(true);
            if guard.subscribers.is_empty() {
                return;
            }
            Rc::clone(&guard.compute)
        };
        let value = compute();
        let (broadcast, subscribers) = {
            let mut guard = inner.borrow_mut();
            guard.cached = Some(value);
            guard.dirty.set(false);
            guard.version += 1;
            let broadcast = guard
                .cached
                .as_ref()
                .expect("cached was just stored")
                .clone();
            (broadcast, guard.collect_live())
        };
        for callback in subscribers {
            callback(&broadcast);
        }
    }
}

impl<T> ComputedInner<T> {
    /// Snapshot live callbacks in registration order, pruning dead entries.
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
            tracing::trace!(pruned, "pruned dead computed subscribers");
        }
        live
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
