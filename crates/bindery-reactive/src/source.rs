#![forbid(unsafe_code)]

//! Type-erased dependency handles.
//!
//! A [`Computed`] needs to know when any of its inputs changed, without
//! caring what value type each input carries. [`Source`] is that seam:
//! anything that can deliver invalidation callbacks. [`SourceRef`] is the
//! owned, cloneable erased handle passed to
//! [`Computed::with_sources`](crate::Computed::with_sources) and stored in
//! declared field specs.

use std::rc::Rc;

use crate::computed::Computed;
use crate::observable::{Observable, Subscription};

/// A cell usable as a dependency of derived state.
pub trait Source {
    /// Register a callback fired whenever this cell's value may have
    /// changed. The payload is deliberately dropped; consumers re-read
    /// through their own typed handles.
    fn subscribe_invalidation(&self, callback: Box<dyn Fn()>) -> Subscription;

    /// Current version of the underlying cell, for diagnostics.
    fn source_version(&self) -> u64;
}

impl<T: 'static> Source for Observable<T> {
    fn subscribe_invalidation(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| callback())
    }

    fn source_version(&self) -> u64 {
        self.version()
    }
}

impl<T: Clone + 'static> Source for Computed<T> {
    fn subscribe_invalidation(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| callback())
    }

    fn source_version(&self) -> u64 {
        self.version()
    }
}

/// Owned, type-erased handle to a dependency cell.
///
/// Cloning the handle clones the underlying cell handle, not the cell.
#[derive(Clone)]
pub struct SourceRef {
    inner: Rc<dyn Source>,
}

impl SourceRef {
    /// Erase a concrete cell handle.
    #[must_use]
    pub fn new(source: impl Source + 'static) -> Self {
        Self {
            inner: Rc::new(source),
        }
    }

    /// See [`Source::subscribe_invalidation`].
    pub fn subscribe_invalidation(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.inner.subscribe_invalidation(callback)
    }

    /// See [`Source::source_version`].
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.source_version()
    }
}

impl std::fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRef")
            .field("version", &self.inner.source_version())
            .finish()
    }
}

impl<T: 'static> Observable<T> {
    /// Erased dependency handle to this cell.
    #[must_use]
    pub fn as_source(&self) -> SourceRef {
        SourceRef::new(self.clone())
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Erased dependency handle to this cell, enabling computed-of-computed
    /// chains.
    #[must_use]
    pub fn as_source(&self) -> SourceRef {
        SourceRef::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn observable_source_fires_on_change() {
        let cell = Observable::new(0);
        let fired = Rc::new(Cell::new(0u32));
        let f = Rc::clone(&fired);
        let source = cell.as_source();
        let _sub = source.subscribe_invalidation(Box::new(move || f.set(f.get() + 1)));

        cell.set(1);
        cell.set(1); // equal set suppressed upstream
        cell.set(2);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn source_version_tracks_cell_version() {
        let cell = Observable::new(0);
        let source = cell.as_source();
        assert_eq!(source.version(), 0);
        cell.set(9);
        assert_eq!(source.version(), 1);
    }
}
