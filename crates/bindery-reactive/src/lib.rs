#![forbid(unsafe_code)]

//! Reactive cell primitives for Bindery.
//!
//! This crate provides the change-tracking state units the view-model layer
//! is built on:
//!
//! - [`Observable`]: a shared, version-tracked value cell with change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Computed`]: a lazily-evaluated, memoized value derived from explicit
//!   source cells.
//! - [`Source`] / [`SourceRef`]: type-erased dependency handles used to wire
//!   a `Computed` to the cells it derives from.
//! - [`Watchable`] / [`watch`] / [`WatchHandle`]: observation with
//!   pause/resume/stop control.
//!
//! # Architecture
//!
//! All cells use `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Subscribers are stored as `Weak` callbacks and cleaned up lazily during
//! notification; internal borrows are always released before user callbacks
//! run, so callbacks may freely read or mutate the cells they observe.
//!
//! # Invariants
//!
//! 1. An `Observable`'s version increments exactly once per mutation that
//!    changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. `Computed::get()` never returns a stale value.
//! 6. While a `Computed` has subscribers of its own, source invalidation
//!    recomputes it eagerly and notifies them with the fresh value.

pub mod computed;
pub mod observable;
pub mod source;
pub mod watch;

pub use computed::Computed;
pub use observable::{Observable, Subscription};
pub use source::{Source, SourceRef};
pub use watch::{WatchHandle, Watchable, watch};
