//! The composition driver.
//!
//! A [`Stack`] is an extensible request callable: a type-erased
//! `tower::Service` chain rooted at a [`Transport`], plus the shared
//! [`Capabilities`] bag every layer of the chain can see. Wrapping a stack
//! produces a new stack whose outermost layer is the new wrapper; the bag is
//! carried over by reference, never copied.
//!
//! Three wrapping paths exist:
//! - [`Stack::wrap`] with a typed [`Wrapper`] descriptor for the built-ins,
//! - [`Stack::wrap_named`] for builders registered in the process-wide
//!   [`crate::registry`],
//! - [`Stack::wrap_with`] for ad-hoc builder functions.
//!
//! [`Stack::from_config`] is the convenience path: it applies the built-in
//! wrappers named by a [`StackConfig`] in one fixed canonical layering.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tower::util::BoxCloneService;
use tower::{Layer, Service};
use tracing::debug;

use swaddle_core::{Error, Request, Response, Result, Transport};

use crate::capabilities::Capabilities;
use crate::config::StackConfig;
use crate::registry;
use crate::wrappers::{
    CacheConfig, CacheLayer, EventLayer, MetricsConfig, MetricsLayer, RetryConfig, RetryLayer,
};

/// Type-erased service used for wrapper composition.
pub type BoxedService = BoxCloneService<Request, Response, Error>;

/// Future type for the composed chain.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// Thread-safe wrapper for [`BoxedService`].
///
/// The mutex makes the service `Sync`; it is held only long enough to clone
/// the inner service, so concurrent invocations interleave freely.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: Request) -> ServiceFuture {
        // Lock, clone the service, and release the lock immediately
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.call(request).await })
    }

    fn into_service(self) -> BoxedService {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

// ============================================================================
// Transport adapter
// ============================================================================

/// Adapter exposing a [`Transport`] collaborator as a `tower::Service`.
#[derive(Debug)]
pub struct TransportService<T> {
    transport: Arc<T>,
}

impl<T> Clone for TransportService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> TransportService<T> {
    /// Wraps a transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }
}

impl<T: Transport> Service<Request> for TransportService<T> {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.transport.call(request)
    }
}

// ============================================================================
// Typed wrapper descriptors
// ============================================================================

/// A built-in wrapper and its configuration.
///
/// The typed descriptor replaces lookup by string name for the built-ins:
/// required configuration is present by construction, and what remains is
/// validated by [`Stack::wrap`] before any layer is built.
#[derive(Clone)]
pub enum Wrapper {
    /// Event notification tap ([`crate::wrappers::event`]).
    Event,
    /// Retry-on-failure ([`crate::wrappers::retry`]).
    Retry(RetryConfig),
    /// Response caching ([`crate::wrappers::cache`]).
    Cache(CacheConfig),
    /// Metrics export ([`crate::wrappers::metrics`]).
    Metrics(MetricsConfig),
}

impl std::fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event => write!(f, "Wrapper::Event"),
            Self::Retry(config) => f.debug_tuple("Wrapper::Retry").field(config).finish(),
            Self::Cache(_) => write!(f, "Wrapper::Cache"),
            Self::Metrics(_) => write!(f, "Wrapper::Metrics"),
        }
    }
}

impl Wrapper {
    const fn name(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Retry(_) => "retry",
            Self::Cache(_) => "cache",
            Self::Metrics(_) => "metrics",
        }
    }
}

// ============================================================================
// Stack
// ============================================================================

/// An extensible request callable.
///
/// Invoking the stack sends a request inward through every wrapper down to
/// the transport; the result flows back outward through the same wrappers in
/// reverse. Each wrap produces a new stack sharing the original
/// [`Capabilities`] bag.
///
/// # Example
///
/// ```ignore
/// use swaddle::{Stack, StackConfig, RetryConfig};
///
/// let stack = Stack::from_config(
///     transport,
///     StackConfig::new().event().retry(RetryConfig::new().attempts(2)),
/// )?;
/// let response = stack.execute(request).await?;
/// ```
#[derive(Clone)]
pub struct Stack {
    service: SyncService,
    capabilities: Capabilities,
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl Stack {
    /// Creates a stack over any compatible `tower::Service`.
    ///
    /// The extension bag starts empty.
    #[must_use]
    pub fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        S::Future: Send,
    {
        Self {
            service: SyncService::new(BoxCloneService::new(service)),
            capabilities: Capabilities::new(),
        }
    }

    /// Creates a stack over a [`Transport`] collaborator.
    #[must_use]
    pub fn from_transport<T: Transport>(transport: T) -> Self {
        Self::new(TransportService::new(transport))
    }

    /// Builds a stack from the convenience configuration.
    ///
    /// Present wrappers are applied in the fixed canonical layering
    /// event → retry → cache → metrics, outermost to innermost, regardless
    /// of the order the config setters were called: events observe
    /// everything, retries see cache hits and misses, and metrics time the
    /// transport itself. At most one instance of each built-in is created
    /// on this path; duplicate wrapper types require the manual
    /// [`Stack::wrap`] path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if any present wrapper config is
    /// invalid.
    pub fn from_config<T: Transport>(transport: T, config: StackConfig) -> Result<Self> {
        let (event, retry, cache, metrics) = config.into_parts();
        let mut stack = Self::from_transport(transport);

        // Innermost first: each wrap puts the new layer outside the rest.
        if let Some(config) = metrics {
            stack = stack.wrap(Wrapper::Metrics(config))?;
        }
        if let Some(config) = cache {
            stack = stack.wrap(Wrapper::Cache(config))?;
        }
        if let Some(config) = retry {
            stack = stack.wrap(Wrapper::Retry(config))?;
        }
        if event {
            stack = stack.wrap(Wrapper::Event)?;
        }
        Ok(stack)
    }

    /// Applies one built-in wrapper, producing a new outermost layer.
    ///
    /// The returned stack shares this stack's capability bag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the wrapper configuration is
    /// invalid; validation happens here, not at request time.
    pub fn wrap(self, wrapper: Wrapper) -> Result<Self> {
        debug!(wrapper = wrapper.name(), "applying wrapper");
        let capabilities = self.capabilities.clone();
        let inner = self.service.into_service();

        let service = match wrapper {
            Wrapper::Event => {
                BoxCloneService::new(EventLayer::new(capabilities.clone()).layer(inner))
            }
            Wrapper::Retry(config) => {
                config.validate()?;
                BoxCloneService::new(RetryLayer::new(capabilities.clone(), config).layer(inner))
            }
            Wrapper::Cache(config) => {
                BoxCloneService::new(CacheLayer::new(capabilities.clone(), config).layer(inner))
            }
            Wrapper::Metrics(config) => {
                BoxCloneService::new(MetricsLayer::new(config).layer(inner))
            }
        };

        Ok(Self {
            service: SyncService::new(service),
            capabilities,
        })
    }

    /// Applies a builder registered under `name` in the process-wide
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownWrapper`] if nothing is registered under
    /// `name`.
    pub fn wrap_named(self, name: &str) -> Result<Self> {
        let builder = registry::lookup(name).ok_or_else(|| Error::unknown_wrapper(name))?;
        debug!(wrapper = name, "applying registered wrapper");
        let capabilities = self.capabilities.clone();
        let service = builder(&capabilities, self.service.into_service());
        Ok(Self {
            service: SyncService::new(service),
            capabilities,
        })
    }

    /// Applies an ad-hoc builder function without registration.
    ///
    /// The builder receives the shared capability bag and the current
    /// callable, and returns the new outermost callable. Third-party
    /// behaviors read and extend the bag exactly like built-ins.
    #[must_use]
    pub fn wrap_with<F>(self, builder: F) -> Self
    where
        F: FnOnce(&Capabilities, BoxedService) -> BoxedService,
    {
        let capabilities = self.capabilities.clone();
        let service = builder(&capabilities, self.service.into_service());
        Self {
            service: SyncService::new(service),
            capabilities,
        }
    }

    /// Invokes the composed chain.
    ///
    /// # Errors
    ///
    /// Resolves to the innermost unrecovered error; no wrapper converts a
    /// failure into a degraded success.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.service.call(request).await
    }

    /// The capability bag shared by every layer of this stack.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

// A stack is itself a service, so it is re-wrappable: composition is
// associative and repeatable.
impl Service<Request> for Stack {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.service.call(request)
    }
}
