#![forbid(unsafe_code)]

//! Core: reactive field store, view-model lifecycle, the one-shot action
//! protocol, multicast delegates, and the application context.

pub mod action;
pub mod context;
pub mod delegate;
pub mod fields;
pub mod shell;
pub mod viewmodel;

pub use action::{Action, ActionContext, ActionError, ActionResult, PendingAction, run_action};
pub use context::{
    AppContext, ContextError, ContextView, ProviderId, RenderProvider, ServiceId, ServiceKey,
};
pub use delegate::{Delegate, DelegateMode, DelegateResult, DelegateSubscription};
pub use fields::{FieldError, FieldSpec, FieldStore, derived, derived_from, derived_writable, value};
pub use shell::{AppShell, ShellPlugin};
pub use viewmodel::{
    HookResult, UserControlError, ViewModel, ViewModelCore, activate, deactivate, mount, unmount,
    update_cycle,
};
