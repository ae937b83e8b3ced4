#![forbid(unsafe_code)]

//! Bindery public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. It
//! re-exports common types from the member crates and offers a lightweight
//! prelude for day-to-day usage.

use std::fmt;

// --- Reactive re-exports ---------------------------------------------------

pub use bindery_reactive::{
    Computed, Observable, Source, SourceRef, Subscription, WatchHandle, Watchable, watch,
};

// --- Core re-exports -------------------------------------------------------

pub use bindery_core::action::{
    Action, ActionContext, ActionError, ActionResult, PendingAction, run_action,
};
pub use bindery_core::context::{
    AppContext, ContextError, ContextView, ProviderId, RenderProvider, ServiceId, ServiceKey,
};
pub use bindery_core::delegate::{Delegate, DelegateMode, DelegateResult, DelegateSubscription};
pub use bindery_core::fields::{
    FieldError, FieldSpec, FieldStore, derived, derived_from, derived_writable, value,
};
pub use bindery_core::shell::{AppShell, ShellPlugin};
pub use bindery_core::viewmodel::{
    HookResult, UserControlError, ViewModel, ViewModelCore, activate, deactivate, mount, unmount,
    update_cycle,
};

// --- Dialog re-exports -----------------------------------------------------

#[cfg(feature = "dialog")]
pub use bindery_dialog::{
    DialogControl, DialogCore, DialogPlugin, DialogRegistry, DialogService, DialogSlot,
    DialogState, DialogSurface,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for bindery apps.
#[derive(Debug)]
pub enum Error {
    /// Service registration or resolution failure.
    Context(ContextError),
    /// Reactive field access failure.
    Field(FieldError),
    /// Action handshake failure.
    Action(ActionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(err) => write!(f, "{err}"),
            Self::Field(err) => write!(f, "{err}"),
            Self::Action(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ContextError> for Error {
    fn from(err: ContextError) -> Self {
        Self::Context(err)
    }
}

impl From<FieldError> for Error {
    fn from(err: FieldError) -> Self {
        Self::Field(err)
    }
}

impl From<ActionError> for Error {
    fn from(err: ActionError) -> Self {
        Self::Action(err)
    }
}

/// Standard result type for bindery APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Action, ActionContext, AppContext, AppShell, Computed, ContextView, Delegate, Error,
        FieldStore, Observable, PendingAction, Result, ShellPlugin, ViewModel, ViewModelCore,
        derived, derived_from, derived_writable, mount, run_action, unmount, value, watch,
    };

    #[cfg(feature = "dialog")]
    pub use crate::{DialogControl, DialogCore, DialogService};

    pub use crate::{core, reactive};

    #[cfg(feature = "dialog")]
    pub use crate::dialog;
}

pub use bindery_core as core;
pub use bindery_reactive as reactive;

#[cfg(feature = "dialog")]
pub use bindery_dialog as dialog;

#[cfg(any(feature = "alert", feature = "router"))]
pub use bindery_extras as extras;
