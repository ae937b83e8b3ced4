#![forbid(unsafe_code)]

//! Application bootstrap: an explicit shell instead of global state.
//!
//! An [`AppShell`] owns the one [`AppContext`] of the application. Feature
//! modules contribute their services and providers as [`ShellPlugin`]s,
//! installed in whatever order the application chooses. There is nothing to
//! tear down: dropping the shell drops the context and everything memoized
//! in it.

use crate::context::{AppContext, ContextError, ContextView};

/// A module that installs services or providers into the context.
pub trait ShellPlugin {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Register this plugin's services and providers.
    fn install(&self, ctx: &AppContext) -> Result<(), ContextError>;
}

/// Owner of the application context.
#[derive(Debug, Default)]
pub struct AppShell {
    ctx: AppContext,
}

impl AppShell {
    /// A shell with a fresh, empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ctx: AppContext::new(),
        }
    }

    /// Install a plugin. Registration errors (for example a duplicate
    /// install) propagate to the caller.
    pub fn install(&self, plugin: &dyn ShellPlugin) -> Result<(), ContextError> {
        tracing::debug!(plugin = plugin.name(), "installing shell plugin");
        plugin.install(&self.ctx)
    }

    /// The full, writable context.
    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// A read-only view for threading into constructors.
    #[must_use]
    pub fn view(&self) -> ContextView {
        self.ctx.view()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
