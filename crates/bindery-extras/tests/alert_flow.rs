//! End-to-end alert and confirm flows through a fully assembled shell.

use std::rc::Rc;

use bindery_core::context::RenderProvider;
use bindery_core::shell::AppShell;
use bindery_dialog::{DialogControl, DialogPlugin, DialogService, DialogSurface};
use bindery_extras::alert::{AlertOptions, AlertPlugin, AlertService};

fn assembled_shell() -> AppShell {
    let shell = AppShell::new();
    shell.install(&DialogPlugin).unwrap();
    shell.install(&AlertPlugin::with_default_controls()).unwrap();
    shell
}

#[test]
fn an_acknowledged_alert_settles_and_tears_down() {
    let shell = assembled_shell();
    let alerts = shell.view().get_service::<AlertService>().unwrap();
    let dialogs = shell.view().get_service::<DialogService>().unwrap();

    let mut ticket = alerts
        .show_alert(AlertOptions::new("Saved").with_description("All changes written."))
        .unwrap();
    assert_eq!(dialogs.registry().len(), 1);
    assert!(!ticket.is_settled());
    assert_eq!(ticket.control().options().title, "Saved");

    ticket.control().confirm();
    assert_eq!(ticket.try_settle(), Some(Ok(())));
    assert!(dialogs.registry().is_empty());
}

#[test]
fn a_confirm_answers_true_and_false() {
    let shell = assembled_shell();
    let alerts = shell.view().get_service::<AlertService>().unwrap();

    let mut accepted = alerts.show_confirm(AlertOptions::new("Delete?")).unwrap();
    accepted.control().confirm();
    assert_eq!(accepted.try_settle(), Some(true));

    let mut declined = alerts.show_confirm(AlertOptions::new("Delete?")).unwrap();
    declined.control().dismiss();
    assert_eq!(declined.try_settle(), Some(false));
}

#[test]
fn closing_an_unanswered_confirm_settles_false() {
    let shell = assembled_shell();
    let alerts = shell.view().get_service::<AlertService>().unwrap();

    let mut ticket = alerts.show_confirm(AlertOptions::new("Sure?")).unwrap();
    ticket.control().close_dialog().unwrap();
    assert_eq!(ticket.try_settle(), Some(false));
}

#[test]
fn dropping_an_unsettled_ticket_destroys_the_dialog() {
    let shell = assembled_shell();
    let alerts = shell.view().get_service::<AlertService>().unwrap();
    let dialogs = shell.view().get_service::<DialogService>().unwrap();

    let ticket = alerts.show_alert(AlertOptions::new("Hi")).unwrap();
    assert_eq!(dialogs.registry().len(), 1);
    drop(ticket);
    assert!(dialogs.registry().is_empty());
}

#[test]
fn showing_an_alert_marks_the_surface_dirty() {
    let shell = assembled_shell();
    let alerts = shell.view().get_service::<AlertService>().unwrap();
    let dialogs = shell.view().get_service::<DialogService>().unwrap();
    let surface = Rc::new(DialogSurface::new(dialogs.registry().clone()));
    shell
        .context()
        .register_provider(Rc::clone(&surface) as Rc<dyn RenderProvider>);

    let _ticket = alerts.show_alert(AlertOptions::new("Hi")).unwrap();
    assert!(surface.take_dirty());
    assert_eq!(surface.visible_dialogs().len(), 1);
}

#[test]
fn a_bare_plugin_reports_unconfigured_controls() {
    let shell = AppShell::new();
    shell.install(&DialogPlugin).unwrap();
    shell.install(&AlertPlugin::new()).unwrap();
    let alerts = shell.view().get_service::<AlertService>().unwrap();

    let err = alerts.show_alert(AlertOptions::new("Hi")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "No alert control is configured. (Hint: Did you forget to set it in your AppShell config?)"
    );
}
