//! End-to-end dialog flow: create through the service, open, run the
//! action handshake, resolve from a UI-triggered method, tear down.

use std::cell::RefCell;
use std::rc::Rc;

use bindery_core::action::{Action, ActionContext, ActionError};
use bindery_core::context::ContextView;
use bindery_core::fields::value;
use bindery_core::run_action;
use bindery_core::shell::AppShell;
use bindery_core::viewmodel::{HookResult, ViewModel, ViewModelCore};
use bindery_dialog::{DialogControl, DialogCore, DialogPlugin, DialogService, DialogState};

/// A rename prompt: stores the handshake context in `on_action`, resolves
/// it from `submit`, and fails a still-open handshake when closed.
struct RenameDialog {
    dialog: DialogCore,
    pending: RefCell<Option<ActionContext<String>>>,
}

impl RenameDialog {
    fn build(ctx: &ContextView) -> Rc<Self> {
        let dialog = DialogCore::new(ctx.clone());
        dialog.vm().fields().declare("draft", value(String::new()));
        Rc::new(Self {
            dialog,
            pending: RefCell::new(None),
        })
    }

    /// The "confirm button": settle the handshake with the current draft.
    fn submit(&self) {
        let draft = self
            .dialog
            .vm()
            .fields()
            .get::<String>("draft")
            .unwrap_or_default();
        if let Some(ctx) = self.pending.borrow_mut().take() {
            ctx.complete_action(draft);
        }
    }
}

impl ViewModel for RenameDialog {
    fn core(&self) -> &ViewModelCore {
        self.dialog.vm()
    }
}

impl DialogControl for RenameDialog {
    fn dialog_core(&self) -> &DialogCore {
        &self.dialog
    }

    fn on_close(&self) -> HookResult {
        if let Some(ctx) = self.pending.borrow_mut().take() {
            ctx.fail_action(Some(ActionError::new("dialog was closed")));
        }
        Ok(())
    }
}

impl Action<String> for RenameDialog {
    fn on_action(&self, ctx: ActionContext<String>) -> Result<(), ActionError> {
        *self.pending.borrow_mut() = Some(ctx);
        Ok(())
    }
}

fn dialog_service() -> (AppShell, Rc<DialogService>) {
    let shell = AppShell::new();
    shell.install(&DialogPlugin).unwrap();
    let service = shell.view().get_service::<DialogService>().unwrap();
    (shell, service)
}

#[test]
fn submit_settles_the_handshake_with_the_draft() {
    let (_shell, service) = dialog_service();
    let dialog = service.init_dialog(RenameDialog::build);
    dialog.open_dialog().unwrap();

    let pending = run_action(&*dialog).unwrap();
    assert!(!pending.is_settled());

    dialog
        .dialog_core()
        .vm()
        .fields()
        .set("draft", String::from("notes.txt"))
        .unwrap();
    dialog.submit();

    assert_eq!(pending.try_take(), Some(Ok(String::from("notes.txt"))));
    dialog.destroy();
    assert!(service.registry().is_empty());
}

#[test]
fn closing_an_unresolved_dialog_fails_the_handshake() {
    let (_shell, service) = dialog_service();
    let dialog = service.init_dialog(RenameDialog::build);
    dialog.open_dialog().unwrap();
    let pending = run_action(&*dialog).unwrap();

    dialog.close_dialog().unwrap();
    let err = pending.try_take().unwrap().unwrap_err();
    assert_eq!(err.message(), "dialog was closed");
    assert_eq!(dialog.dialog_core().state(), DialogState::Closed);
}

#[test]
fn close_after_submit_does_not_disturb_the_result() {
    let (_shell, service) = dialog_service();
    let dialog = service.init_dialog(RenameDialog::build);
    dialog.open_dialog().unwrap();
    let pending = run_action(&*dialog).unwrap();

    dialog
        .dialog_core()
        .vm()
        .fields()
        .set("draft", String::from("kept"))
        .unwrap();
    dialog.submit();
    dialog.close_dialog().unwrap();

    assert_eq!(pending.try_take(), Some(Ok(String::from("kept"))));
}

#[test]
fn each_handshake_gets_a_fresh_context() {
    let (_shell, service) = dialog_service();
    let dialog = service.init_dialog(RenameDialog::build);
    dialog.open_dialog().unwrap();

    let first = run_action(&*dialog).unwrap();
    dialog
        .dialog_core()
        .vm()
        .fields()
        .set("draft", String::from("one"))
        .unwrap();
    dialog.submit();
    assert_eq!(first.try_take(), Some(Ok(String::from("one"))));

    let second = run_action(&*dialog).unwrap();
    dialog
        .dialog_core()
        .vm()
        .fields()
        .set("draft", String::from("two"))
        .unwrap();
    dialog.submit();
    assert_eq!(second.try_take(), Some(Ok(String::from("two"))));
}
