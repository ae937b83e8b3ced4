#![forbid(unsafe_code)]

//! View models: lifecycle-hooked state holders over a field store.
//!
//! A view model is any type that embeds a [`ViewModelCore`] and implements
//! the [`ViewModel`] trait. The core carries the pieces every view model
//! needs: a read-only context handle, the reactive [`FieldStore`], the
//! watcher list disposed on unmount, and the named user-control map. The
//! host drives lifecycle through the free functions ([`mount`],
//! [`update_cycle`], [`unmount`], [`activate`], [`deactivate`]), never by
//! calling hooks directly.
//!
//! # Invariants
//!
//! 1. Every consumer of a view model's reactive state goes through the one
//!    `FieldStore` owned by its core; there is no second path to the cells.
//! 2. `unmount` disposes the core's watchers between `before_unmount` and
//!    `unmounted`, exactly once per unmount.
//! 3. Drivers stop at the first hook error and propagate it; later hooks in
//!    the pair do not run.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bindery_reactive::WatchHandle;

use crate::action::{Action, ActionError, PendingAction};
use crate::context::ContextView;
use crate::fields::{FieldError, FieldStore};

/// What a lifecycle hook reports back.
pub type HookResult = Result<(), Box<dyn std::error::Error>>;

/// Errors from the named user-control map.
#[derive(Debug, PartialEq, Eq)]
pub enum UserControlError {
    Missing {
        name: String,
    },
    Mismatch {
        name: String,
        expected: &'static str,
    },
}

impl std::fmt::Display for UserControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { name } => write!(
                f,
                "user control '{name}' was not found. \
                 (Hint: Register the control under this name before querying it.)"
            ),
            Self::Mismatch { name, expected } => write!(
                f,
                "user control '{name}' is not a {expected}. \
                 (Hint: Query the control with the type it was registered as.)"
            ),
        }
    }
}

impl std::error::Error for UserControlError {}

/// The embedded heart of every view model.
pub struct ViewModelCore {
    ctx: ContextView,
    fields: FieldStore,
    watchers: RefCell<Vec<WatchHandle>>,
    user_controls: RefCell<HashMap<String, Rc<dyn Any>>>,
}

impl std::fmt::Debug for ViewModelCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModelCore")
            .field("fields", &self.fields.len())
            .field("watchers", &self.watchers.borrow().len())
            .field("user_controls", &self.user_controls.borrow().len())
            .finish()
    }
}

impl ViewModelCore {
    /// A core bound to the given context view.
    #[must_use]
    pub fn new(ctx: ContextView) -> Self {
        Self {
            ctx,
            fields: FieldStore::new(),
            watchers: RefCell::new(Vec::new()),
            user_controls: RefCell::new(HashMap::new()),
        }
    }

    /// The read-only application context.
    #[must_use]
    pub fn context(&self) -> &ContextView {
        &self.ctx
    }

    /// The reactive field store.
    #[must_use]
    pub fn fields(&self) -> &FieldStore {
        &self.fields
    }

    /// Watch a declared field and keep the handle until unmount.
    pub fn watch<T: Clone + 'static>(
        &self,
        name: &'static str,
        callback: impl Fn(&T) + 'static,
    ) -> Result<(), FieldError> {
        let handle = self.fields.watch(name, callback)?;
        self.hold_watcher(handle);
        Ok(())
    }

    /// Keep an externally created watch handle until unmount.
    pub fn hold_watcher(&self, handle: WatchHandle) {
        self.watchers.borrow_mut().push(handle);
    }

    /// Drop every held watcher. Called by [`unmount`]; safe to call again.
    pub fn dispose_watchers(&self) {
        let disposed = {
            let mut watchers = self.watchers.borrow_mut();
            std::mem::take(&mut *watchers).len()
        };
        if disposed > 0 {
            tracing::debug!(disposed, "view model watchers disposed");
        }
    }

    /// Number of currently held watchers.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.watchers.borrow().len()
    }

    /// Attach a named child control instance to this view model.
    pub fn register_user_control(&self, name: impl Into<String>, control: Rc<dyn Any>) {
        let name = name.into();
        tracing::trace!(control = %name, "user control registered");
        self.user_controls.borrow_mut().insert(name, control);
    }

    /// Look up a named child control by its registered type.
    pub fn user_control<C: 'static>(&self, name: &str) -> Result<Rc<C>, UserControlError> {
        let controls = self.user_controls.borrow();
        let control = controls.get(name).ok_or_else(|| UserControlError::Missing {
            name: name.to_string(),
        })?;
        Rc::clone(control)
            .downcast::<C>()
            .map_err(|_| UserControlError::Mismatch {
                name: name.to_string(),
                expected: type_name::<C>(),
            })
    }

    /// Drive a collaborator through one action handshake.
    pub fn run_action<T, A: Action<T> + ?Sized>(
        &self,
        action: &A,
    ) -> Result<PendingAction<T>, ActionError> {
        crate::action::run_action(action)
    }
}

/// A lifecycle-hooked state holder. Every hook defaults to a no-op `Ok`.
pub trait ViewModel {
    fn core(&self) -> &ViewModelCore;

    fn before_mount(&self) -> HookResult {
        Ok(())
    }
    fn mounted(&self) -> HookResult {
        Ok(())
    }
    fn before_update(&self) -> HookResult {
        Ok(())
    }
    fn updated(&self) -> HookResult {
        Ok(())
    }
    fn before_unmount(&self) -> HookResult {
        Ok(())
    }
    fn unmounted(&self) -> HookResult {
        Ok(())
    }
    fn activated(&self) -> HookResult {
        Ok(())
    }
    fn deactivated(&self) -> HookResult {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lifecycle drivers
// ---------------------------------------------------------------------------

/// Run the mount pair: `before_mount`, then `mounted`.
pub fn mount(vm: &dyn ViewModel) -> HookResult {
    vm.before_mount()?;
    vm.mounted()
}

/// Run the update pair: `before_update`, then `updated`.
pub fn update_cycle(vm: &dyn ViewModel) -> HookResult {
    vm.before_update()?;
    vm.updated()
}

/// Run the unmount pair, disposing the core's watchers in between.
pub fn unmount(vm: &dyn ViewModel) -> HookResult {
    vm.before_unmount()?;
    vm.core().dispose_watchers();
    vm.unmounted()
}

/// Run the keep-alive activation hook.
pub fn activate(vm: &dyn ViewModel) -> HookResult {
    vm.activated()
}

/// Run the keep-alive deactivation hook.
pub fn deactivate(vm: &dyn ViewModel) -> HookResult {
    vm.deactivated()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
