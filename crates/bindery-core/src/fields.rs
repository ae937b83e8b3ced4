#![forbid(unsafe_code)]

//! Declared reactive fields with lazy, at-most-once materialization.
//!
//! # Design
//!
//! View models describe their reactive state as plain, non-live specs
//! ([`FieldSpec`]): a seed value, or a derivation over explicit sources. A
//! [`FieldStore`] maps field names to those specs and converts each one into
//! a live cell ([`Observable`] or [`Computed`]) the first time the field is
//! read or written. Declaration and materialization are deliberately two
//! phases: a view model can finish assembling itself (and hand out handles
//! to its own store) before any live state exists.
//!
//! # Invariants
//!
//! 1. Materialization happens at most once per (store, field name); after
//!    it, the same underlying cell serves every access for the store's
//!    lifetime.
//! 2. Once a field is live, further [`declare()`](FieldStore::declare) calls
//!    for that name have no effect.
//! 3. Before a field is live, re-declaring replaces the pending spec.
//! 4. A failed typed access (wrong `T`) leaves the field's state untouched.
//!
//! # Failure Modes
//!
//! - **Unknown name**: get/set of an undeclared field is an error; there is
//!   no underlying plain object to fall through to.
//! - **Assignment to a derived field without a setter**: an error naming the
//!   field; the cell keeps its derived value.
//! - **Self-referential derivation**: a derivation that reads its own field
//!   recurses; keeping derivations acyclic is the caller's responsibility.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bindery_reactive::{Computed, Observable, SourceRef, WatchHandle};

/// Errors from declared-field access.
#[derive(Debug, PartialEq, Eq)]
pub enum FieldError {
    /// The field name was never declared on this store.
    UnknownField { name: &'static str },
    /// The field was declared with a different value type.
    TypeMismatch {
        name: &'static str,
        expected: &'static str,
    },
    /// Assignment to a derived field that has no setter.
    ReadOnly { name: &'static str },
    /// A cell-handle accessor was used on the wrong field kind.
    KindMismatch {
        name: &'static str,
        requested: &'static str,
    },
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { name } => write!(
                f,
                "unknown reactive field '{name}'. (Hint: Declare the field before accessing it.)"
            ),
            Self::TypeMismatch { name, expected } => write!(
                f,
                "reactive field '{name}' does not hold a {expected}. \
                 (Hint: Access the field with the type it was declared with.)"
            ),
            Self::ReadOnly { name } => write!(
                f,
                "cannot assign to computed field '{name}': no setter was defined. \
                 (Hint: Declare the field with derived_writable to make it assignable.)"
            ),
            Self::KindMismatch { name, requested } => write!(
                f,
                "reactive field '{name}' is not a {requested} field. \
                 (Hint: Value fields expose Observable handles; derived fields expose Computed handles.)"
            ),
        }
    }
}

impl std::error::Error for FieldError {}

/// A declared reactive intent, not yet bound to a live cell.
pub enum FieldSpec<T> {
    /// A mutable value cell seeded with `initial`.
    Value { initial: T },
    /// A derived cell recomputed from `sources`, optionally writable.
    Derived {
        sources: Vec<SourceRef>,
        get: Box<dyn Fn() -> T>,
        set: Option<Box<dyn Fn(T)>>,
    },
}

/// Declare a mutable value field seeded with `initial`.
#[must_use]
pub fn value<T>(initial: T) -> FieldSpec<T> {
    FieldSpec::Value { initial }
}

/// Declare a derived field with no sources. It computes once and is
/// refreshed only by explicit invalidation of its cell handle.
#[must_use]
pub fn derived<T>(get: impl Fn() -> T + 'static) -> FieldSpec<T> {
    FieldSpec::Derived {
        sources: Vec::new(),
        get: Box::new(get),
        set: None,
    }
}

/// Declare a derived field recomputed whenever any of `sources` changes.
#[must_use]
pub fn derived_from<T>(
    sources: impl IntoIterator<Item = SourceRef>,
    get: impl Fn() -> T + 'static,
) -> FieldSpec<T> {
    FieldSpec::Derived {
        sources: sources.into_iter().collect(),
        get: Box::new(get),
        set: None,
    }
}

/// Declare a writable derived field: reads go through `get`, assignments
/// through `set` (which typically writes back into the sources).
#[must_use]
pub fn derived_writable<T>(
    sources: impl IntoIterator<Item = SourceRef>,
    get: impl Fn() -> T + 'static,
    set: impl Fn(T) + 'static,
) -> FieldSpec<T> {
    FieldSpec::Derived {
        sources: sources.into_iter().collect(),
        get: Box::new(get),
        set: Some(Box::new(set)),
    }
}

/// The live cell backing a materialized field.
enum LiveCell<T> {
    Value(Observable<T>),
    Derived {
        cell: Computed<T>,
        set: Option<Rc<dyn Fn(T)>>,
    },
}

impl<T> Clone for LiveCell<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(cell) => Self::Value(cell.clone()),
            Self::Derived { cell, set } => Self::Derived {
                cell: cell.clone(),
                set: set.clone(),
            },
        }
    }
}

/// One named field: still a pending spec, or already a live cell.
enum Slot {
    Declared(Box<dyn Any>),
    Live(Box<dyn Any>),
}

/// Name-keyed store of declared reactive fields.
///
/// Cloning a `FieldStore` creates a new handle to the **same** fields, which
/// is how derivation closures reach back into their own store.
#[derive(Clone)]
pub struct FieldStore {
    slots: Rc<RefCell<HashMap<&'static str, Slot>>>,
}

impl Default for FieldStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Declare a field. Ignored (with a trace diagnostic) once the field has
    /// been materialized; before that, a re-declaration replaces the spec.
    pub fn declare<T: 'static>(&self, name: &'static str, spec: FieldSpec<T>) {
        let mut slots = self.slots.borrow_mut();
        match slots.get(name) {
            Some(Slot::Live(_)) => {
                tracing::trace!(field = name, "declare ignored: field already materialized");
            }
            Some(Slot::Declared(_)) => {
                tracing::trace!(field = name, "field re-declared before materialization");
                slots.insert(name, Slot::Declared(Box::new(spec)));
            }
            None => {
                slots.insert(name, Slot::Declared(Box::new(spec)));
            }
        }
    }

    /// Current value of a field, materializing it on first access.
    pub fn get<T: Clone + 'static>(&self, name: &'static str) -> Result<T, FieldError> {
        match self.ensure_live::<T>(name)? {
            LiveCell::Value(cell) => Ok(cell.get()),
            LiveCell::Derived { cell, .. } => Ok(cell.get()),
        }
    }

    /// Write a field, materializing it on first access. Assignments to
    /// derived fields route through their setter when one was declared.
    pub fn set<T: Clone + PartialEq + 'static>(
        &self,
        name: &'static str,
        value: T,
    ) -> Result<(), FieldError> {
        match self.ensure_live::<T>(name)? {
            LiveCell::Value(cell) => {
                cell.set(value);
                Ok(())
            }
            LiveCell::Derived { set: Some(set), .. } => {
                set(value);
                Ok(())
            }
            LiveCell::Derived { set: None, .. } => Err(FieldError::ReadOnly { name }),
        }
    }

    /// Shared handle to a value field's cell, materializing on demand.
    pub fn observable<T: Clone + 'static>(
        &self,
        name: &'static str,
    ) -> Result<Observable<T>, FieldError> {
        match self.ensure_live::<T>(name)? {
            LiveCell::Value(cell) => Ok(cell),
            LiveCell::Derived { .. } => Err(FieldError::KindMismatch {
                name,
                requested: "value",
            }),
        }
    }

    /// Shared handle to a derived field's cell, materializing on demand.
    pub fn computed_cell<T: Clone + 'static>(
        &self,
        name: &'static str,
    ) -> Result<Computed<T>, FieldError> {
        match self.ensure_live::<T>(name)? {
            LiveCell::Derived { cell, .. } => Ok(cell),
            LiveCell::Value(_) => Err(FieldError::KindMismatch {
                name,
                requested: "derived",
            }),
        }
    }

    /// Watch a field for changes, materializing it on demand.
    pub fn watch<T: Clone + 'static>(
        &self,
        name: &'static str,
        callback: impl Fn(&T) + 'static,
    ) -> Result<WatchHandle, FieldError> {
        match self.ensure_live::<T>(name)? {
            LiveCell::Value(cell) => Ok(bindery_reactive::watch(&cell, callback)),
            LiveCell::Derived { cell, .. } => Ok(bindery_reactive::watch(&cell, callback)),
        }
    }

    /// Whether the field has been materialized.
    #[must_use]
    pub fn is_live(&self, name: &str) -> bool {
        matches!(self.slots.borrow().get(name), Some(Slot::Live(_)))
    }

    /// Whether the field is declared (live or not).
    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.slots.borrow().contains_key(name)
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Whether no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Look up the live cell for `name`, materializing the declared spec on
    /// first access. The interior borrow is released before returning, so
    /// cell reads (which may run user derivations that re-enter this store)
    /// happen unborrowed.
    fn ensure_live<T: Clone + 'static>(
        &self,
        name: &'static str,
    ) -> Result<LiveCell<T>, FieldError> {
        let mut slots = self.slots.borrow_mut();
        let slot = slots
            .remove(name)
            .ok_or(FieldError::UnknownField { name })?;
        match slot {
            Slot::Live(any) => match any.downcast::<LiveCell<T>>() {
                Ok(live) => {
                    let handle = (*live).clone();
                    slots.insert(name, Slot::Live(live));
                    Ok(handle)
                }
                Err(any) => {
                    slots.insert(name, Slot::Live(any));
                    Err(FieldError::TypeMismatch {
                        name,
                        expected: type_name::<T>(),
                    })
                }
            },
            Slot::Declared(any) => match any.downcast::<FieldSpec<T>>() {
                Ok(spec) => {
                    let live = materialize(*spec);
                    let handle = live.clone();
                    slots.insert(name, Slot::Live(Box::new(live)));
                    tracing::trace!(field = name, "reactive field materialized");
                    Ok(handle)
                }
                Err(any) => {
                    slots.insert(name, Slot::Declared(any));
                    Err(FieldError::TypeMismatch {
                        name,
                        expected: type_name::<T>(),
                    })
                }
            },
        }
    }
}

/// Build the live cell for a spec. Runs no user code: value cells seed
/// directly and derived cells stay lazy until first read.
fn materialize<T: Clone + 'static>(spec: FieldSpec<T>) -> LiveCell<T> {
    match spec {
        FieldSpec::Value { initial } => LiveCell::Value(Observable::new(initial)),
        FieldSpec::Derived { sources, get, set } => LiveCell::Derived {
            cell: Computed::with_sources(sources, get),
            set: set.map(Rc::from),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
