#![forbid(unsafe_code)]

//! Alert and confirm dialogs built on the dialog subsystem's public
//! contract.
//!
//! [`AlertControl`] acknowledges a message (`Action<()>`);
//! [`ConfirmControl`] asks a yes/no question (`Action<bool>`). Both store
//! the handshake context in `on_action` and resolve it from UI-triggered
//! methods; closing an unresolved dialog fails the handshake with
//! "dialog was closed" so pending handles always settle.
//!
//! [`AlertService::show_alert`]/[`show_confirm`](AlertService::show_confirm)
//! run the whole flow (create, open, handshake) and hand back a ticket that
//! owns the dialog: settling the ticket, or dropping it unsettled, destroys
//! the dialog.

use std::cell::RefCell;
use std::rc::Rc;

use bindery_core::action::{Action, ActionContext, ActionError, PendingAction, run_action};
use bindery_core::context::{AppContext, ContextError, ContextView};
use bindery_core::fields::value;
use bindery_core::shell::ShellPlugin;
use bindery_core::viewmodel::{HookResult, ViewModel, ViewModelCore};
use bindery_dialog::{DialogControl, DialogCore, DialogService};

/// Errors from the alert service.
#[derive(Debug)]
pub enum AlertError {
    /// The requested control kind was not supplied at plugin time.
    ControlNotConfigured { kind: &'static str },
    /// Resolving the dialog service failed.
    Context(ContextError),
    /// Starting the handshake failed.
    Action(ActionError),
    /// The dialog's `on_open` hook failed.
    Hook(Box<dyn std::error::Error>),
}

impl std::fmt::Display for AlertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ControlNotConfigured { kind } => write!(
                f,
                "No {kind} control is configured. \
                 (Hint: Did you forget to set it in your AppShell config?)"
            ),
            Self::Context(err) => write!(f, "{err}"),
            Self::Action(err) => write!(f, "starting the handshake failed: {err}"),
            Self::Hook(err) => write!(f, "opening the dialog failed: {err}"),
        }
    }
}

impl std::error::Error for AlertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ControlNotConfigured { .. } => None,
            Self::Context(err) => Some(err),
            Self::Action(err) => Some(err),
            Self::Hook(err) => Some(err.as_ref()),
        }
    }
}

impl From<ContextError> for AlertError {
    fn from(err: ContextError) -> Self {
        Self::Context(err)
    }
}

impl From<ActionError> for AlertError {
    fn from(err: ActionError) -> Self {
        Self::Action(err)
    }
}

/// What an alert or confirm dialog displays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertOptions {
    pub title: String,
    pub description: String,
}

impl AlertOptions {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A message the user acknowledges.
#[derive(Debug)]
pub struct AlertControl {
    dialog: DialogCore,
    options: AlertOptions,
    pending: RefCell<Option<ActionContext<()>>>,
}

impl AlertControl {
    /// A control with its `title`/`description` exposed as reactive fields.
    #[must_use]
    pub fn new(ctx: ContextView, options: AlertOptions) -> Self {
        let dialog = DialogCore::new(ctx);
        dialog
            .vm()
            .fields()
            .declare("title", value(options.title.clone()));
        dialog
            .vm()
            .fields()
            .declare("description", value(options.description.clone()));
        Self {
            dialog,
            options,
            pending: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn options(&self) -> &AlertOptions {
        &self.options
    }

    /// The "OK button": acknowledge the alert.
    pub fn confirm(&self) {
        match self.pending.borrow_mut().take() {
            Some(ctx) => ctx.complete_action(()),
            None => tracing::warn!("confirm ignored: no pending alert handshake"),
        }
    }
}

impl ViewModel for AlertControl {
    fn core(&self) -> &ViewModelCore {
        self.dialog.vm()
    }
}

impl DialogControl for AlertControl {
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

impl Action<()> for AlertControl {
    fn on_action(&self, ctx: ActionContext<()>) -> Result<(), ActionError> {
        if let Some(old) = self.pending.borrow_mut().replace(ctx) {
            if !old.is_closed() {
                tracing::warn!("alert handshake restarted while a prior context was unresolved");
            }
        }
        Ok(())
    }
}

/// A yes/no question.
#[derive(Debug)]
pub struct ConfirmControl {
    dialog: DialogCore,
    options: AlertOptions,
    pending: RefCell<Option<ActionContext<bool>>>,
}

impl ConfirmControl {
    #[must_use]
    pub fn new(ctx: ContextView, options: AlertOptions) -> Self {
        let dialog = DialogCore::new(ctx);
        dialog
            .vm()
            .fields()
            .declare("title", value(options.title.clone()));
        dialog
            .vm()
            .fields()
            .declare("description", value(options.description.clone()));
        Self {
            dialog,
            options,
            pending: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn options(&self) -> &AlertOptions {
        &self.options
    }

    /// The "yes button".
    pub fn confirm(&self) {
        self.resolve(true);
    }

    /// The "no button".
    pub fn dismiss(&self) {
        self.resolve(false);
    }

    fn resolve(&self, accepted: bool) {
        match self.pending.borrow_mut().take() {
            Some(ctx) => ctx.complete_action(accepted),
            None => tracing::warn!(accepted, "resolve ignored: no pending confirm handshake"),
        }
    }
}

impl ViewModel for ConfirmControl {
    fn core(&self) -> &ViewModelCore {
        self.dialog.vm()
    }
}

impl DialogControl for ConfirmControl {
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

impl Action<bool> for ConfirmControl {
    fn on_action(&self, ctx: ActionContext<bool>) -> Result<(), ActionError> {
        if let Some(old) = self.pending.borrow_mut().replace(ctx) {
            if !old.is_closed() {
                tracing::warn!("confirm handshake restarted while a prior context was unresolved");
            }
        }
        Ok(())
    }
}

/// Builds the alert control a service will show.
pub type AlertBuilder = Rc<dyn Fn(&ContextView, AlertOptions) -> Rc<AlertControl>>;
/// Builds the confirm control a service will show.
pub type ConfirmBuilder = Rc<dyn Fn(&ContextView, AlertOptions) -> Rc<ConfirmControl>>;

/// Shows alerts and confirms through the dialog service.
pub struct AlertService {
    ctx: ContextView,
    alert: Option<AlertBuilder>,
    confirm: Option<ConfirmBuilder>,
}

impl AlertService {
    #[must_use]
    pub fn new(ctx: ContextView, alert: Option<AlertBuilder>, confirm: Option<ConfirmBuilder>) -> Self {
        Self { ctx, alert, confirm }
    }

    /// Create, open, and start the handshake of an alert dialog.
    pub fn show_alert(&self, options: AlertOptions) -> Result<AlertTicket, AlertError> {
        let build = Rc::clone(
            self.alert
                .as_ref()
                .ok_or(AlertError::ControlNotConfigured { kind: "alert" })?,
        );
        let dialogs = self.ctx.get_service::<DialogService>()?;
        let dialog = dialogs.init_dialog(move |view| build(view, options));
        dialog.open_dialog().map_err(AlertError::Hook)?;
        let pending = run_action(&*dialog)?;
        Ok(AlertTicket { dialog, pending })
    }

    /// Create, open, and start the handshake of a confirm dialog.
    pub fn show_confirm(&self, options: AlertOptions) -> Result<ConfirmTicket, AlertError> {
        let build = Rc::clone(
            self.confirm
                .as_ref()
                .ok_or(AlertError::ControlNotConfigured { kind: "confirm" })?,
        );
        let dialogs = self.ctx.get_service::<DialogService>()?;
        let dialog = dialogs.init_dialog(move |view| build(view, options));
        dialog.open_dialog().map_err(AlertError::Hook)?;
        let pending = run_action(&*dialog)?;
        Ok(ConfirmTicket { dialog, pending })
    }
}

/// Owns a shown alert until its acknowledgement. Settling or dropping the
/// ticket destroys the dialog.
#[must_use = "dropping an AlertTicket destroys the dialog unseen"]
#[derive(Debug)]
pub struct AlertTicket {
    dialog: Rc<AlertControl>,
    pending: PendingAction<()>,
}

impl AlertTicket {
    /// The control, for driving its UI-triggered methods.
    #[must_use]
    pub fn control(&self) -> &Rc<AlertControl> {
        &self.dialog
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.pending.is_settled()
    }

    /// Yield the outcome once settled, destroying the dialog.
    pub fn try_settle(&mut self) -> Option<Result<(), ActionError>> {
        let result = self.pending.try_take()?;
        self.dialog.destroy();
        Some(result)
    }
}

impl Drop for AlertTicket {
    fn drop(&mut self) {
        if !self.dialog.dialog_core().is_destroyed() {
            self.dialog.destroy();
        }
    }
}

/// Owns a shown confirm until its answer. A failed handshake (for example
/// the dialog was closed unanswered) settles as `false`.
#[must_use = "dropping a ConfirmTicket destroys the dialog unanswered"]
#[derive(Debug)]
pub struct ConfirmTicket {
    dialog: Rc<ConfirmControl>,
    pending: PendingAction<bool>,
}

impl ConfirmTicket {
    /// The control, for driving its UI-triggered methods.
    #[must_use]
    pub fn control(&self) -> &Rc<ConfirmControl> {
        &self.dialog
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.pending.is_settled()
    }

    /// Yield the answer once settled, destroying the dialog.
    pub fn try_settle(&mut self) -> Option<bool> {
        let result = self.pending.try_take()?;
        self.dialog.destroy();
        Some(result.unwrap_or(false))
    }
}

impl Drop for ConfirmTicket {
    fn drop(&mut self) {
        if !self.dialog.dialog_core().is_destroyed() {
            self.dialog.destroy();
        }
    }
}

/// Registers the [`AlertService`] at bootstrap, carrying the control
/// builders the application configured.
#[derive(Default)]
pub struct AlertPlugin {
    alert: Option<AlertBuilder>,
    confirm: Option<ConfirmBuilder>,
}

impl AlertPlugin {
    /// A plugin with no controls configured. Showing anything will fail
    /// until a builder is supplied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A plugin using the stock [`AlertControl`] and [`ConfirmControl`].
    #[must_use]
    pub fn with_default_controls() -> Self {
        Self::new()
            .with_alert_control(|view, options| Rc::new(AlertControl::new(view.clone(), options)))
            .with_confirm_control(|view, options| {
                Rc::new(ConfirmControl::new(view.clone(), options))
            })
    }

    /// Use a custom alert constructor.
    #[must_use]
    pub fn with_alert_control(
        mut self,
        build: impl Fn(&ContextView, AlertOptions) -> Rc<AlertControl> + 'static,
    ) -> Self {
        self.alert = Some(Rc::new(build));
        self
    }

    /// Use a custom confirm constructor.
    #[must_use]
    pub fn with_confirm_control(
        mut self,
        build: impl Fn(&ContextView, AlertOptions) -> Rc<ConfirmControl> + 'static,
    ) -> Self {
        self.confirm = Some(Rc::new(build));
        self
    }
}

impl ShellPlugin for AlertPlugin {
    fn name(&self) -> &'static str {
        "alert"
    }

    fn install(&self, ctx: &AppContext) -> Result<(), ContextError> {
        let alert = self.alert.clone();
        let confirm = self.confirm.clone();
        ctx.register_service(move |view| {
            Rc::new(AlertService::new(view.clone(), alert.clone(), confirm.clone()))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::context::AppContext;

    fn fresh_view() -> ContextView {
        AppContext::new().view()
    }

    // ── Options ─────────────────────────────────────────────────────────

    #[test]
    fn options_build_incrementally() {
        let options = AlertOptions::new("Delete file?").with_description("This cannot be undone.");
        assert_eq!(options.title, "Delete file?");
        assert_eq!(options.description, "This cannot be undone.");
    }

    #[test]
    fn controls_expose_their_options_as_reactive_fields() {
        let control = AlertControl::new(fresh_view(), AlertOptions::new("Hi"));
        let fields = control.dialog_core().vm().fields();
        assert_eq!(fields.get::<String>("title").unwrap(), "Hi");
        assert_eq!(fields.get::<String>("description").unwrap(), "");
    }

    // ── Handshake resolution ────────────────────────────────────────────

    #[test]
    fn alert_confirm_settles_the_handshake() {
        let control = AlertControl::new(fresh_view(), AlertOptions::new("Hi"));
        let pending = run_action(&control).unwrap();
        control.confirm();
        assert_eq!(pending.try_take(), Some(Ok(())));
    }

    #[test]
    fn confirm_control_answers_true_or_false() {
        let control = ConfirmControl::new(fresh_view(), AlertOptions::new("Sure?"));
        let pending = run_action(&control).unwrap();
        control.confirm();
        assert_eq!(pending.try_take(), Some(Ok(true)));

        let pending = run_action(&control).unwrap();
        control.dismiss();
        assert_eq!(pending.try_take(), Some(Ok(false)));
    }

    #[test]
    fn closing_fails_an_unresolved_handshake() {
        let control = ConfirmControl::new(fresh_view(), AlertOptions::new("Sure?"));
        let pending = run_action(&control).unwrap();
        control.close_dialog().unwrap();
        let err = pending.try_take().unwrap().unwrap_err();
        assert_eq!(err.message(), "dialog was closed");
    }

    #[test]
    fn resolving_without_a_handshake_changes_nothing() {
        let control = AlertControl::new(fresh_view(), AlertOptions::new("Hi"));
        // No handshake was started: a warn diagnostic, nothing else.
        control.confirm();
        let pending = run_action(&control).unwrap();
        assert!(!pending.is_settled());
    }

    // ── Service configuration ───────────────────────────────────────────

    #[test]
    fn unconfigured_controls_are_reported() {
        let service = AlertService::new(fresh_view(), None, None);
        let err = service.show_alert(AlertOptions::new("Hi")).unwrap_err();
        assert!(matches!(
            err,
            AlertError::ControlNotConfigured { kind: "alert" }
        ));
        assert!(err.to_string().contains("AppShell config"));

        let err = service.show_confirm(AlertOptions::new("Hi")).unwrap_err();
        assert!(matches!(
            err,
            AlertError::ControlNotConfigured { kind: "confirm" }
        ));
    }
}
