#![forbid(unsafe_code)]

//! Dialog lifecycle: `Created → Opened ↔ Closed → Destroyed`.
//!
//! A dialog is a view model with an independent open/close/destroy
//! lifecycle, usually rendered as an overlay. Implementors embed a
//! [`DialogCore`] next to their state and get the lifecycle driving methods
//! ([`open_dialog`](DialogControl::open_dialog),
//! [`close_dialog`](DialogControl::close_dialog),
//! [`destroy`](DialogControl::destroy)) for free.
//!
//! # Invariants
//!
//! 1. `Destroyed` is terminal: once destroyed, open/close/destroy are
//!    ignored with a warn diagnostic, and `destroyed()` never reads false
//!    again.
//! 2. A state transition is recorded only after its hook succeeded; a
//!    failing `on_open`/`on_close` leaves the state unchanged and
//!    propagates.
//! 3. `destroy` never invokes `on_close`. A dialog that needs teardown on
//!    destruction should watch `destroyed()`.
//! 4. Destruction releases the registry slot (when attached) before
//!    returning, so registry enumeration never sees a destroyed dialog's
//!    slot as occupied.

use std::cell::{Cell, RefCell};

use bindery_core::context::ContextView;
use bindery_core::viewmodel::{HookResult, ViewModel, ViewModelCore};
use bindery_reactive::Observable;

use crate::registry::{DialogRegistry, DialogSlot};

/// Lifecycle phase of a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Created,
    Opened,
    Closed,
    Destroyed,
}

/// The embedded heart of every dialog: the view-model core plus the
/// dialog-specific lifecycle state.
pub struct DialogCore {
    vm: ViewModelCore,
    destroyed: Observable<bool>,
    state: Cell<DialogState>,
    attachment: RefCell<Option<(DialogRegistry, DialogSlot)>>,
}

impl std::fmt::Debug for DialogCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogCore")
            .field("state", &self.state.get())
            .field("attached", &self.attachment.borrow().is_some())
            .finish()
    }
}

impl DialogCore {
    /// A core bound to the given context view, in the `Created` state.
    #[must_use]
    pub fn new(ctx: ContextView) -> Self {
        Self {
            vm: ViewModelCore::new(ctx),
            destroyed: Observable::new(false),
            state: Cell::new(DialogState::Created),
            attachment: RefCell::new(None),
        }
    }

    /// The embedded view-model core.
    #[must_use]
    pub fn vm(&self) -> &ViewModelCore {
        &self.vm
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn state(&self) -> DialogState {
        self.state.get()
    }

    /// Whether the dialog has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// The destruction cell, for watching. Owned by the core: callers read
    /// and subscribe, only [`destroy`](Self::destroy) writes it.
    #[must_use]
    pub fn destroyed(&self) -> &Observable<bool> {
        &self.destroyed
    }

    /// Bind this dialog to the registry slot holding its weak reference, so
    /// destruction can release the slot.
    pub(crate) fn attach(&self, registry: DialogRegistry, slot: DialogSlot) {
        *self.attachment.borrow_mut() = Some((registry, slot));
    }

    pub(crate) fn record_state(&self, state: DialogState) {
        self.state.set(state);
    }

    /// Destroy the dialog: mark it destroyed, record the terminal state,
    /// and release the registry slot if attached. Idempotent; repeat calls
    /// warn and change nothing.
    pub fn destroy(&self) {
        if self.destroyed.get() {
            tracing::warn!("destroy ignored: dialog already destroyed");
            return;
        }
        self.record_state(DialogState::Destroyed);
        self.destroyed.set(true);
        if let Some((registry, slot)) = self.attachment.borrow_mut().take() {
            registry.release(slot);
        }
        tracing::debug!("dialog destroyed");
    }
}

/// A view model with a dialog lifecycle.
///
/// `on_open`/`on_close` are the implementor's hooks; the driving methods
/// are provided. A dialog that implements `Action<T>` usually stores the
/// received context and resolves it from a UI-triggered method; its
/// `on_close` should fail a still-open context so pending handles settle.
pub trait DialogControl: ViewModel {
    fn dialog_core(&self) -> &DialogCore;

    fn on_open(&self) -> HookResult {
        Ok(())
    }

    fn on_close(&self) -> HookResult {
        Ok(())
    }

    /// Open the dialog: run `on_open`, then record `Opened`. Ignored with
    /// a warn diagnostic once destroyed.
    fn open_dialog(&self) -> HookResult {
        let core = self.dialog_core();
        if core.is_destroyed() {
            tracing::warn!("open_dialog ignored: dialog already destroyed");
            return Ok(());
        }
        self.on_open()?;
        core.record_state(DialogState::Opened);
        Ok(())
    }

    /// Close the dialog: run `on_close`, then record `Closed`. Ignored
    /// with a warn diagnostic once destroyed. The dialog may be re-opened.
    fn close_dialog(&self) -> HookResult {
        let core = self.dialog_core();
        if core.is_destroyed() {
            tracing::warn!("close_dialog ignored: dialog already destroyed");
            return Ok(());
        }
        self.on_close()?;
        core.record_state(DialogState::Closed);
        Ok(())
    }

    /// Destroy the dialog. Never invokes `on_close`.
    fn destroy(&self) {
        self.dialog_core().destroy();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
