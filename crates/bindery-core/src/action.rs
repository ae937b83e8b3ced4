#![forbid(unsafe_code)]

//! One-shot action handshake between a caller and a handler.
//!
//! An [`Action`] implementor receives an [`ActionContext`] and must settle
//! it exactly once, with [`complete_action`](ActionContext::complete_action)
//! or [`fail_action`](ActionContext::fail_action). The caller holds the
//! matching [`PendingAction`] and collects the outcome whenever the handler
//! (or something the handler handed the context to) settles it.
//!
//! # Invariants
//!
//! 1. A context settles at most once. The first settlement wins outright;
//!    every later `complete_action` or `fail_action` on the same context is
//!    ignored and reported through a `warn` diagnostic.
//! 2. `fail_action(None)` carries the default message
//!    `"Action failed, but no error was provided"`.
//! 3. Cloned contexts share the slot: any clone may settle, and the
//!    once-only rule spans all of them.
//!
//! # Failure Modes
//!
//! - **Handler never settles**: the `PendingAction` simply never yields a
//!   result. Detecting abandonment is the caller's concern (see
//!   [`PendingAction::is_settled`]).
//! - **Settling after the caller dropped the `PendingAction`**: the result
//!   is stored and discarded with the slot; no error is raised.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

const UNSPECIFIED_FAILURE: &str = "Action failed, but no error was provided";

/// Error produced by a failed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    message: String,
}

impl ActionError {
    /// An error with an explicit message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error raised when a handler fails without giving a reason.
    #[must_use]
    pub(crate) fn unspecified() -> Self {
        Self {
            message: UNSPECIFIED_FAILURE.to_string(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActionError {}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Outcome of a settled action.
pub type ActionResult<T> = Result<T, ActionError>;

/// A component that can be driven through the one-shot handshake.
///
/// `on_action` is the synchronous entry point: it may settle the context
/// before returning, or stash the context (contexts are `Clone`) and settle
/// it later from an event handler. Returning `Err` reports a failure to
/// even start the action; it does **not** settle the context.
pub trait Action<T> {
    fn on_action(&self, ctx: ActionContext<T>) -> Result<(), ActionError>;
}

struct ActionSlot<T> {
    closed: Cell<bool>,
    result: RefCell<Option<ActionResult<T>>>,
}

/// Handler-side half of the handshake. Cheap to clone; all clones settle
/// the same underlying slot.
pub struct ActionContext<T> {
    slot: Rc<ActionSlot<T>>,
}

impl<T> Clone for ActionContext<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> std::fmt::Debug for ActionContext<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("closed", &self.slot.closed.get())
            .finish()
    }
}

impl<T> ActionContext<T> {
    /// A fresh context paired with the caller-side handle that will observe
    /// its settlement.
    #[must_use]
    pub fn channel() -> (Self, PendingAction<T>) {
        let slot = Rc::new(ActionSlot {
            closed: Cell::new(false),
            result: RefCell::new(None),
        });
        (
            Self {
                slot: Rc::clone(&slot),
            },
            PendingAction { slot },
        )
    }

    /// Settle the action successfully with `data`. Ignored if the context
    /// was already settled.
    pub fn complete_action(&self, data: T) {
        if self.slot.closed.get() {
            tracing::warn!("complete_action ignored: action context already settled");
            return;
        }
        self.slot.closed.set(true);
        *self.slot.result.borrow_mut() = Some(Ok(data));
    }

    /// Settle the action as failed. `None` substitutes the default
    /// unspecified-failure message. Ignored if the context was already
    /// settled.
    pub fn fail_action(&self, error: Option<ActionError>) {
        if self.slot.closed.get() {
            tracing::warn!("fail_action ignored: action context already settled");
            return;
        }
        self.slot.closed.set(true);
        *self.slot.result.borrow_mut() = Some(Err(error.unwrap_or_else(ActionError::unspecified)));
    }

    /// Whether the context has been settled.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slot.closed.get()
    }
}

/// Caller-side half of the handshake: observes the settlement of the
/// matching [`ActionContext`].
#[must_use = "dropping a PendingAction discards the action's eventual result"]
pub struct PendingAction<T> {
    slot: Rc<ActionSlot<T>>,
}

impl<T> std::fmt::Debug for PendingAction<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAction")
            .field("settled", &self.slot.closed.get())
            .finish()
    }
}

impl<T> PendingAction<T> {
    /// Whether the handler side has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.slot.closed.get()
    }

    /// Take the outcome if the action has settled. Returns `None` while
    /// unsettled, and on every call after the first successful take.
    pub fn try_take(&self) -> Option<ActionResult<T>> {
        self.slot.result.borrow_mut().take()
    }
}

/// Drive `action` through one handshake: build a channel, hand the handler
/// its context, and return the caller-side handle.
pub fn run_action<T, A: Action<T> + ?Sized>(action: &A) -> Result<PendingAction<T>, ActionError> {
    let (ctx, pending) = ActionContext::channel();
    action.on_action(ctx)?;
    Ok(pending)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
