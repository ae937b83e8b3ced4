#![forbid(unsafe_code)]

//! Application context: service container plus render-provider registry.
//!
//! The [`AppContext`] is created once at bootstrap (by the shell) and
//! threaded through constructors as a read-only [`ContextView`]. Services
//! are registered as factories and instantiated lazily, memoized, at most
//! once per key. There is no global state: everything hangs off the context
//! instance you were handed.
//!
//! # Invariants
//!
//! 1. One factory per key. A second registration for the same key fails;
//!    only [`mock_service`](AppContext::mock_service) may replace one.
//! 2. At-most-once instantiation: the first successful `get` memoizes the
//!    instance; every later `get` returns the same `Rc`.
//! 3. Mocking never clears an existing memo. Mock before first use.
//! 4. Factories run with the interior maps unborrowed, so a factory may
//!    resolve its own dependencies through the view it receives.
//!
//! # Failure Modes
//!
//! - **Unregistered key**: `get` fails; nothing is memoized.
//! - **Cyclic factories**: a factory that transitively resolves its own key
//!   fails with [`ContextError::CircularResolution`] instead of recursing
//!   forever.
//! - **Lying erased factory**: an erased factory returning the wrong type is
//!   caught at the typed `get` and reported as
//!   [`ContextError::InvalidServiceInstance`].

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Errors from service registration and resolution.
#[derive(Debug, PartialEq, Eq)]
pub enum ContextError {
    ServiceAlreadyRegistered { service: String },
    ServiceNotRegistered { service: String },
    InvalidServiceInstance { service: String },
    CircularResolution { service: String },
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceAlreadyRegistered { service } => write!(
                f,
                "service '{service}' is already registered. \
                 (Hint: Register each service exactly once; use mock_service to replace a factory in tests.)"
            ),
            Self::ServiceNotRegistered { service } => write!(
                f,
                "service '{service}' is not registered. \
                 (Hint: Register the service before requesting it.)"
            ),
            Self::InvalidServiceInstance { service } => write!(
                f,
                "factory for service '{service}' produced an instance of the wrong type. \
                 (Hint: Ensure the erased factory returns the type its key was declared with.)"
            ),
            Self::CircularResolution { service } => write!(
                f,
                "service '{service}' is already being resolved. \
                 (Hint: Break the dependency cycle between service factories.)"
            ),
        }
    }
}

impl std::error::Error for ContextError {}

/// How a service is keyed: by its concrete type, or by an opaque token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    Type(TypeId),
    Token(u64),
}

/// An opaque, identity-keyed handle for registering several services of the
/// same type. Two keys created for the same `T` are distinct.
pub struct ServiceKey<T> {
    id: u64,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ServiceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ServiceKey<T> {}

impl<T> std::fmt::Debug for ServiceKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceKey")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl<T> ServiceKey<T> {
    /// A fresh key. `name` labels the key in errors and logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        static NEXT_KEY: AtomicU64 = AtomicU64::new(0);
        Self {
            id: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            name,
            _marker: PhantomData,
        }
    }

    /// The key's label.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn service_id(&self) -> ServiceId {
        ServiceId::Token(self.id)
    }
}

/// Host-side hook poked whenever the framework wants a re-render.
pub trait RenderProvider {
    fn request_render(&self);
}

/// Handle for unregistering a render provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(u64);

type ServiceFactory = Rc<dyn Fn(&ContextView) -> Rc<dyn Any>>;

struct ServiceEntry {
    name: String,
    factory: ServiceFactory,
}

struct ContextInner {
    factories: HashMap<ServiceId, ServiceEntry>,
    instances: HashMap<ServiceId, Rc<dyn Any>>,
    resolving: HashSet<ServiceId>,
    providers: Vec<(u64, Rc<dyn RenderProvider>)>,
    next_provider_id: u64,
}

/// The full, writable application context. Owned by the shell; everything
/// else sees it as a [`ContextView`].
#[derive(Clone)]
pub struct AppContext {
    inner: Rc<RefCell<ContextInner>>,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("AppContext")
            .field("services", &inner.factories.len())
            .field("instances", &inner.instances.len())
            .field("providers", &inner.providers.len())
            .finish()
    }
}

impl AppContext {
    /// An empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ContextInner {
                factories: HashMap::new(),
                instances: HashMap::new(),
                resolving: HashSet::new(),
                providers: Vec::new(),
                next_provider_id: 0,
            })),
        }
    }

    /// A read-only view onto the same context.
    #[must_use]
    pub fn view(&self) -> ContextView {
        ContextView {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Register a type-keyed service factory.
    pub fn register_service<T: 'static>(
        &self,
        factory: impl Fn(&ContextView) -> Rc<T> + 'static,
    ) -> Result<(), ContextError> {
        let erased: ServiceFactory = Rc::new(move |view: &ContextView| {
            let instance: Rc<dyn Any> = factory(view);
            instance
        });
        self.register_erased(ServiceId::Type(TypeId::of::<T>()), type_name::<T>(), erased)
    }

    /// Register a token-keyed service factory.
    pub fn register_keyed<T: 'static>(
        &self,
        key: ServiceKey<T>,
        factory: impl Fn(&ContextView) -> Rc<T> + 'static,
    ) -> Result<(), ContextError> {
        let erased: ServiceFactory = Rc::new(move |view: &ContextView| {
            let instance: Rc<dyn Any> = factory(view);
            instance
        });
        self.register_erased(key.service_id(), key.name, erased)
    }

    /// Replace the factory of an already-registered type-keyed service.
    /// An existing memoized instance is kept, so mock before first use.
    pub fn mock_service<T: 'static>(
        &self,
        factory: impl Fn(&ContextView) -> Rc<T> + 'static,
    ) -> Result<(), ContextError> {
        let erased: ServiceFactory = Rc::new(move |view: &ContextView| {
            let instance: Rc<dyn Any> = factory(view);
            instance
        });
        self.mock_erased(ServiceId::Type(TypeId::of::<T>()), type_name::<T>(), erased)
    }

    /// Replace the factory of an already-registered token-keyed service.
    pub fn mock_keyed<T: 'static>(
        &self,
        key: ServiceKey<T>,
        factory: impl Fn(&ContextView) -> Rc<T> + 'static,
    ) -> Result<(), ContextError> {
        let erased: ServiceFactory = Rc::new(move |view: &ContextView| {
            let instance: Rc<dyn Any> = factory(view);
            instance
        });
        self.mock_erased(key.service_id(), key.name, erased)
    }

    /// Register a pre-erased factory under an explicit id. The typed `get`
    /// verifies what the factory actually produced.
    pub fn register_erased(
        &self,
        id: ServiceId,
        name: &str,
        factory: ServiceFactory,
    ) -> Result<(), ContextError> {
        let mut inner = self.inner.borrow_mut();
        if inner.factories.contains_key(&id) {
            return Err(ContextError::ServiceAlreadyRegistered {
                service: name.to_string(),
            });
        }
        inner.factories.insert(
            id,
            ServiceEntry {
                name: name.to_string(),
                factory,
            },
        );
        tracing::debug!(service = name, "service registered");
        Ok(())
    }

    /// Replace a pre-erased factory under an explicit id.
    pub fn mock_erased(
        &self,
        id: ServiceId,
        name: &str,
        factory: ServiceFactory,
    ) -> Result<(), ContextError> {
        let mut inner = self.inner.borrow_mut();
        match inner.factories.get_mut(&id) {
            Some(entry) => {
                entry.factory = factory;
                tracing::debug!(service = name, "service factory mocked");
                Ok(())
            }
            None => Err(ContextError::ServiceNotRegistered {
                service: name.to_string(),
            }),
        }
    }

    /// Resolve a type-keyed service.
    pub fn get_service<T: 'static>(&self) -> Result<Rc<T>, ContextError> {
        self.view().get_service::<T>()
    }

    /// Resolve a token-keyed service.
    pub fn get_keyed<T: 'static>(&self, key: ServiceKey<T>) -> Result<Rc<T>, ContextError> {
        self.view().get_keyed(key)
    }

    /// Register a render provider; returns the handle that removes it.
    pub fn register_provider(&self, provider: Rc<dyn RenderProvider>) -> ProviderId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_provider_id;
        inner.next_provider_id += 1;
        inner.providers.push((id, provider));
        tracing::debug!(provider_id = id, "render provider registered");
        ProviderId(id)
    }

    /// Remove a render provider. Returns whether it was present.
    pub fn unregister_provider(&self, id: ProviderId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.providers.len();
        inner.providers.retain(|(pid, _)| *pid != id.0);
        before != inner.providers.len()
    }

    /// Snapshot of the registered providers, in registration order.
    #[must_use]
    pub fn providers(&self) -> Vec<Rc<dyn RenderProvider>> {
        self.view().providers()
    }

    /// Ask every registered provider to re-render.
    pub fn notify_providers(&self) {
        self.view().notify_providers();
    }
}

/// Read-only handle to an [`AppContext`]: can resolve services and reach
/// providers, cannot register or mock.
#[derive(Clone)]
pub struct ContextView {
    inner: Rc<RefCell<ContextInner>>,
}

impl std::fmt::Debug for ContextView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ContextView")
            .field("services", &inner.factories.len())
            .finish()
    }
}

impl ContextView {
    /// Resolve a type-keyed service, instantiating and memoizing on first
    /// use.
    pub fn get_service<T: 'static>(&self) -> Result<Rc<T>, ContextError> {
        let any = resolve(&self.inner, ServiceId::Type(TypeId::of::<T>()), type_name::<T>())?;
        any.downcast::<T>()
            .map_err(|_| ContextError::InvalidServiceInstance {
                service: type_name::<T>().to_string(),
            })
    }

    /// Resolve a token-keyed service, instantiating and memoizing on first
    /// use.
    pub fn get_keyed<T: 'static>(&self, key: ServiceKey<T>) -> Result<Rc<T>, ContextError> {
        let any = resolve(&self.inner, key.service_id(), key.name)?;
        any.downcast::<T>()
            .map_err(|_| ContextError::InvalidServiceInstance {
                service: key.name.to_string(),
            })
    }

    /// Snapshot of the registered providers, in registration order.
    #[must_use]
    pub fn providers(&self) -> Vec<Rc<dyn RenderProvider>> {
        self.inner
            .borrow()
            .providers
            .iter()
            .map(|(_, provider)| Rc::clone(provider))
            .collect()
    }

    /// Ask every registered provider to re-render. The provider list is
    /// snapshotted first; providers run with the context unborrowed.
    pub fn notify_providers(&self) {
        let snapshot = self.providers();
        tracing::trace!(providers = snapshot.len(), "render requested");
        for provider in snapshot {
            provider.request_render();
        }
    }
}

/// Shared resolution path. The factory runs with `inner` unborrowed; the
/// `resolving` set turns factory cycles into errors instead of unbounded
/// recursion.
fn resolve(
    inner: &Rc<RefCell<ContextInner>>,
    id: ServiceId,
    requested: &str,
) -> Result<Rc<dyn Any>, ContextError> {
    let (name, factory) = {
        let mut guard = inner.borrow_mut();
        if let Some(instance) = guard.instances.get(&id) {
            return Ok(Rc::clone(instance));
        }
        let entry = guard
            .factories
            .get(&id)
            .ok_or_else(|| ContextError::ServiceNotRegistered {
                service: requested.to_string(),
            })?;
        let name = entry.name.clone();
        let factory = Rc::clone(&entry.factory);
        if !guard.resolving.insert(id) {
            return Err(ContextError::CircularResolution { service: name });
        }
        (name, factory)
    };

    let view = ContextView {
        inner: Rc::clone(inner),
    };
    let instance = factory(&view);

    let mut guard = inner.borrow_mut();
    guard.resolving.remove(&id);
    guard.instances.insert(id, Rc::clone(&instance));
    tracing::debug!(service = %name, "service instantiated");
    Ok(instance)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
