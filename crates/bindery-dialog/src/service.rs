#![forbid(unsafe_code)]

//! Dialog creation service and the render-side surface adapter.
//!
//! [`DialogService`] is the one place dialogs come into existence: it runs
//! the caller's constructor closure, registers the new dialog weakly,
//! attaches the slot to the dialog's core (so `destroy()` releases it), and
//! pokes every render provider. The caller keeps the only strong handle.
//!
//! [`DialogSurface`] sits on the host side: it is a
//! [`RenderProvider`] latching a dirty flag, and exposes the registry's
//! render filter as [`visible_dialogs`](DialogSurface::visible_dialogs).

use std::cell::Cell;
use std::rc::Rc;

use bindery_core::context::{AppContext, ContextError, ContextView, RenderProvider};
use bindery_core::shell::ShellPlugin;

use crate::control::DialogControl;
use crate::registry::DialogRegistry;

/// Creates dialogs and owns their registry.
pub struct DialogService {
    ctx: ContextView,
    registry: DialogRegistry,
}

impl std::fmt::Debug for DialogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogService")
            .field("registry", &self.registry)
            .finish()
    }
}

impl DialogService {
    /// A service bound to the given context view, with an empty registry.
    #[must_use]
    pub fn new(ctx: ContextView) -> Self {
        Self {
            ctx,
            registry: DialogRegistry::new(),
        }
    }

    /// The registry of live dialogs.
    #[must_use]
    pub fn registry(&self) -> &DialogRegistry {
        &self.registry
    }

    /// Create a dialog: run `build` with the context view, register the
    /// result weakly, attach the slot to its core, and notify every render
    /// provider. The returned `Rc` is the only strong handle.
    pub fn init_dialog<D: DialogControl + 'static>(
        &self,
        build: impl FnOnce(&ContextView) -> Rc<D>,
    ) -> Rc<D> {
        let dialog = build(&self.ctx);
        let erased: Rc<dyn DialogControl> = Rc::clone(&dialog) as Rc<dyn DialogControl>;
        let slot = self.registry.insert(Rc::downgrade(&erased));
        dialog.dialog_core().attach(self.registry.clone(), slot);
        tracing::debug!(slot = ?slot, "dialog initialized");
        self.ctx.notify_providers();
        dialog
    }
}

/// Host-side overlay adapter: a dirty flag the host polls, plus the list
/// of dialogs it should draw.
pub struct DialogSurface {
    registry: DialogRegistry,
    dirty: Cell<bool>,
}

impl std::fmt::Debug for DialogSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogSurface")
            .field("dirty", &self.dirty.get())
            .finish()
    }
}

impl RenderProvider for DialogSurface {
    fn request_render(&self) {
        self.dirty.set(true);
    }
}

impl DialogSurface {
    /// A surface over the given registry, initially clean.
    #[must_use]
    pub fn new(registry: DialogRegistry) -> Self {
        Self {
            registry,
            dirty: Cell::new(false),
        }
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    /// Live, not-destroyed dialogs, in slot order.
    #[must_use]
    pub fn visible_dialogs(&self) -> Vec<Rc<dyn DialogControl>> {
        self.registry.active()
    }
}

/// Registers the [`DialogService`] at bootstrap.
pub struct DialogPlugin;

impl ShellPlugin for DialogPlugin {
    fn name(&self) -> &'static str {
        "dialog"
    }

    fn install(&self, ctx: &AppContext) -> Result<(), ContextError> {
        ctx.register_service(|view| Rc::new(DialogService::new(view.clone())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{DialogCore, DialogState};
    use bindery_core::shell::AppShell;
    use bindery_core::viewmodel::{ViewModel, ViewModelCore};

    struct StubDialog {
        dialog: DialogCore,
    }

    impl ViewModel for StubDialog {
        fn core(&self) -> &ViewModelCore {
            self.dialog.vm()
        }
    }

    impl DialogControl for StubDialog {
        fn dialog_core(&self) -> &DialogCore {
            &self.dialog
        }
    }

    fn build_stub(ctx: &ContextView) -> Rc<StubDialog> {
        Rc::new(StubDialog {
            dialog: DialogCore::new(ctx.clone()),
        })
    }

    fn shell_with_dialogs() -> AppShell {
        let shell = AppShell::new();
        shell.install(&DialogPlugin).unwrap();
        shell
    }

    // ── init_dialog ─────────────────────────────────────────────────────

    #[test]
    fn init_dialog_registers_and_returns_the_only_strong_handle() {
        let shell = shell_with_dialogs();
        let service = shell.view().get_service::<DialogService>().unwrap();
        let dialog = service.init_dialog(build_stub);
        assert_eq!(service.registry().len(), 1);
        assert_eq!(Rc::strong_count(&dialog), 1);
    }

    #[test]
    fn init_dialog_marks_the_surface_dirty() {
        let shell = shell_with_dialogs();
        let service = shell.view().get_service::<DialogService>().unwrap();
        let surface = Rc::new(DialogSurface::new(service.registry().clone()));
        shell
            .context()
            .register_provider(Rc::clone(&surface) as Rc<dyn RenderProvider>);

        assert!(!surface.take_dirty());
        let _dialog = service.init_dialog(build_stub);
        assert!(surface.take_dirty());
        assert!(!surface.take_dirty());
    }

    // ── destroy releases the slot ───────────────────────────────────────

    #[test]
    fn destroy_removes_the_dialog_from_the_registry() {
        let shell = shell_with_dialogs();
        let service = shell.view().get_service::<DialogService>().unwrap();
        let dialog = service.init_dialog(build_stub);
        assert_eq!(service.registry().len(), 1);

        dialog.destroy();
        assert_eq!(service.registry().len(), 0);
        assert_eq!(dialog.dialog_core().state(), DialogState::Destroyed);
    }

    #[test]
    fn dropping_the_handle_empties_the_registry_without_destroy() {
        let shell = shell_with_dialogs();
        let service = shell.view().get_service::<DialogService>().unwrap();
        let dialog = service.init_dialog(build_stub);
        drop(dialog);
        assert!(service.registry().is_empty());
    }

    // ── Surface filter ──────────────────────────────────────────────────

    #[test]
    fn surface_hides_destroyed_dialogs() {
        let shell = shell_with_dialogs();
        let service = shell.view().get_service::<DialogService>().unwrap();
        let surface = DialogSurface::new(service.registry().clone());

        let keep = service.init_dialog(build_stub);
        let gone = service.init_dialog(build_stub);
        assert_eq!(surface.visible_dialogs().len(), 2);

        gone.destroy();
        assert_eq!(surface.visible_dialogs().len(), 1);
        drop(keep);
        assert!(surface.visible_dialogs().is_empty());
    }
}
