#![forbid(unsafe_code)]

//! In-memory routing with guarded, observable navigation.
//!
//! [`RouterService`] keeps a history stack whose top is the current path,
//! exposed as an `Observable<String>` so view models can watch it. Routes
//! are declared up front as [`RouteDef`]s; navigating to an undeclared path
//! is an error, and a route guard returning false denies the navigation.
//! Every successful navigation notifies the context's render providers.
//!
//! Going back pops the stack without re-running guards: the destination was
//! already admitted once.

use std::cell::RefCell;
use std::rc::Rc;

use bindery_core::context::{AppContext, ContextError, ContextView};
use bindery_core::shell::ShellPlugin;
use bindery_reactive::Observable;

/// The path every history starts at.
const ROOT_PATH: &str = "/";

/// Errors from navigation.
#[derive(Debug, PartialEq, Eq)]
pub enum RouterError {
    UnknownRoute { path: String },
    NavigationDenied { path: String },
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRoute { path } => write!(
                f,
                "no route matches path '{path}'. \
                 (Hint: Declare the route on the RouterPlugin before navigating to it.)"
            ),
            Self::NavigationDenied { path } => write!(
                f,
                "navigation to '{path}' was denied by a route guard. \
                 (Hint: Guards must return true to admit a navigation.)"
            ),
        }
    }
}

impl std::error::Error for RouterError {}

/// A declared route: a path plus an optional admission guard.
#[derive(Clone)]
pub struct RouteDef {
    path: String,
    guard: Option<Rc<dyn Fn(&ContextView) -> bool>>,
}

impl std::fmt::Debug for RouteDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDef")
            .field("path", &self.path)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

impl RouteDef {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            guard: None,
        }
    }

    /// Admit this route only when `guard` returns true. The guard receives
    /// the context view, so it can consult services.
    #[must_use]
    pub fn with_guard(mut self, guard: impl Fn(&ContextView) -> bool + 'static) -> Self {
        self.guard = Some(Rc::new(guard));
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Navigation over an in-memory history stack.
pub struct RouterService {
    ctx: ContextView,
    routes: Vec<RouteDef>,
    history: RefCell<Vec<String>>,
    current: Observable<String>,
}

impl std::fmt::Debug for RouterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterService")
            .field("routes", &self.routes.len())
            .field("depth", &self.history.borrow().len())
            .finish()
    }
}

impl RouterService {
    /// A router at `/` with the given routing table. The initial path does
    /// not need to be declared.
    #[must_use]
    pub fn new(ctx: ContextView, routes: Vec<RouteDef>) -> Self {
        Self {
            ctx,
            routes,
            history: RefCell::new(vec![ROOT_PATH.to_string()]),
            current: Observable::new(ROOT_PATH.to_string()),
        }
    }

    /// The current path.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.current.get()
    }

    /// The current-path cell, for watching. Only navigation writes it.
    #[must_use]
    pub fn current(&self) -> &Observable<String> {
        &self.current
    }

    /// Depth of the history stack, current entry included.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }

    /// Push a new entry and make `path` current.
    pub fn navigate_to(&self, path: &str) -> Result<(), RouterError> {
        self.admit(path)?;
        self.history.borrow_mut().push(path.to_string());
        self.arrive(path);
        Ok(())
    }

    /// Replace the current entry with `path`.
    pub fn replace_to(&self, path: &str) -> Result<(), RouterError> {
        self.admit(path)?;
        {
            let mut history = self.history.borrow_mut();
            history.pop();
            history.push(path.to_string());
        }
        self.arrive(path);
        Ok(())
    }

    /// Pop back to the previous entry. Returns whether a pop happened; at
    /// the bottom of the stack this is a no-op.
    pub fn navigate_back(&self) -> bool {
        let destination = {
            let mut history = self.history.borrow_mut();
            if history.len() <= 1 {
                return false;
            }
            history.pop();
            history.last().cloned()
        };
        match destination {
            Some(path) => {
                self.arrive(&path);
                true
            }
            None => false,
        }
    }

    fn admit(&self, path: &str) -> Result<(), RouterError> {
        let route = self
            .routes
            .iter()
            .find(|route| route.path == path)
            .ok_or_else(|| RouterError::UnknownRoute {
                path: path.to_string(),
            })?;
        if let Some(guard) = &route.guard {
            if !guard(&self.ctx) {
                return Err(RouterError::NavigationDenied {
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    }

    fn arrive(&self, path: &str) {
        self.current.set(path.to_string());
        tracing::debug!(path, "navigated");
        self.ctx.notify_providers();
    }
}

/// Registers the [`RouterService`] at bootstrap, carrying the application's
/// routing table.
#[derive(Debug, Default)]
pub struct RouterPlugin {
    routes: Vec<RouteDef>,
}

impl RouterPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a route.
    #[must_use]
    pub fn with_route(mut self, route: RouteDef) -> Self {
        self.routes.push(route);
        self
    }
}

impl ShellPlugin for RouterPlugin {
    fn name(&self) -> &'static str {
        "router"
    }

    fn install(&self, ctx: &AppContext) -> Result<(), ContextError> {
        let routes = self.routes.clone();
        ctx.register_service(move |view| Rc::new(RouterService::new(view.clone(), routes.clone())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
