//! Response caching wrapper.
//!
//! Read-through caching over a pluggable [`CacheStore`] collaborator: a hit
//! returns the stored response and bypasses the delegate entirely; a miss
//! delegates and stores the successful result. Entry lifecycle (TTL,
//! eviction, collision handling) is owned by the store.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::{Layer, Service};
use tracing::debug;

use swaddle_core::{BoxFuture, Error, Request, Response, Result};

use crate::capabilities::Capabilities;
use crate::emitter::Event;

/// Options passed through opaquely to [`CacheStore::set`].
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Time-to-live for the entry, if the store honors one.
    pub ttl: Option<Duration>,
}

impl CacheOptions {
    /// Options with the given time-to-live.
    #[must_use]
    pub const fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }
}

/// The cache store collaborator.
///
/// A miss is `Ok(None)`, never an error. Store failures are surfaced as
/// [`Error::Cache`] and propagate to the caller unchanged; the wrapper never
/// converts them into a degraded success.
pub trait CacheStore: Send + Sync {
    /// Looks up a cached response by key.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Response>>>;

    /// Stores a response under `key`.
    fn set(
        &self,
        key: &str,
        response: Response,
        options: &CacheOptions,
    ) -> BoxFuture<'_, Result<()>>;
}

/// Cache key function: request descriptor in, key out.
pub type KeyFn = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// Default cache key for a request.
///
/// A plain GET with no headers and no body keys on the URL itself, keeping
/// keys readable for the common case. Anything else is fingerprinted: a
/// deterministic serialization of method, URL, headers sorted by name, and
/// body, hashed with BLAKE3 and hex-encoded. Collisions are the store's
/// concern.
#[must_use]
pub fn default_cache_key(request: &Request) -> String {
    if request.method() == swaddle_core::Method::Get
        && request.headers().is_empty()
        && request.body().is_none()
    {
        return request.url().to_string();
    }

    let mut hasher = blake3::Hasher::new();
    hasher.update(request.method().to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(request.url().as_str().as_bytes());
    hasher.update(b"\n");

    let mut headers: Vec<(&String, &String)> = request.headers().iter().collect();
    headers.sort();
    for (name, value) in headers {
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }

    if let Some(body) = request.body() {
        hasher.update(body);
    }

    hasher.finalize().to_hex().to_string()
}

/// Configuration for the cache wrapper.
///
/// The store is required by construction; there is no request-time check to
/// fail.
#[derive(Clone)]
pub struct CacheConfig {
    store: Arc<dyn CacheStore>,
    options: CacheOptions,
    key_fn: KeyFn,
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CacheConfig {
    /// Creates a configuration over the given store, with the default key
    /// function and no TTL.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            options: CacheOptions::default(),
            key_fn: Arc::new(default_cache_key),
        }
    }

    /// Sets the options passed through to [`CacheStore::set`].
    #[must_use]
    pub fn options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the cache key function.
    #[must_use]
    pub fn key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(f);
        self
    }
}

/// Layer that adds read-through response caching.
#[derive(Clone)]
pub struct CacheLayer {
    capabilities: Capabilities,
    config: CacheConfig,
}

impl CacheLayer {
    /// Creates a cache layer with the given configuration.
    #[must_use]
    pub fn new(capabilities: Capabilities, config: CacheConfig) -> Self {
        Self {
            capabilities,
            config,
        }
    }
}

impl<S> Layer<S> for CacheLayer {
    type Service = Cache<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Cache {
            inner,
            capabilities: self.capabilities.clone(),
            config: self.config.clone(),
        }
    }
}

/// Service that serves responses from the store when it can.
#[derive(Clone)]
pub struct Cache<S> {
    inner: S,
    capabilities: Capabilities,
    config: CacheConfig,
}

impl<S> Service<Request> for Cache<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Response>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let config = self.config.clone();
        let emitter = self.capabilities.emitter();

        Box::pin(async move {
            let key = (config.key_fn)(&request);

            if let Some(emitter) = &emitter {
                emitter.emit(&Event::CacheRequest { key: key.clone() });
            }

            if let Some(cached) = config.store.get(&key).await? {
                debug!(%key, "cache hit");
                return Ok(cached);
            }

            if let Some(emitter) = &emitter {
                emitter.emit(&Event::CacheMiss { key: key.clone() });
            }
            debug!(%key, "cache miss");

            let response = inner.call(request).await?;
            // Failures never reach this point, so nothing bad is cached.
            config
                .store
                .set(&key, response.clone(), &config.options)
                .await?;
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use bytes::Bytes;
    use tower::ServiceExt;

    use super::*;
    use swaddle_core::Method;

    /// In-memory store recording get/set traffic.
    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<String, Response>>,
        sets: AtomicU32,
        fail_gets: bool,
    }

    impl MemoryStore {
        fn failing() -> Self {
            Self {
                fail_gets: true,
                ..Self::default()
            }
        }
    }

    impl CacheStore for MemoryStore {
        fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Response>>> {
            let result = if self.fail_gets {
                Err(Error::cache("store unavailable"))
            } else {
                Ok(self.entries.lock().expect("lock").get(key).cloned())
            };
            Box::pin(async move { result })
        }

        fn set(
            &self,
            key: &str,
            response: Response,
            _options: &CacheOptions,
        ) -> BoxFuture<'_, Result<()>> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.entries
                .lock()
                .expect("lock")
                .insert(key.to_string(), response);
            Box::pin(async { Ok(()) })
        }
    }

    #[derive(Clone)]
    struct MockService {
        call_count: Arc<AtomicU32>,
        should_error: bool,
    }

    impl MockService {
        fn new() -> Self {
            Self {
                call_count: Arc::new(AtomicU32::new(0)),
                should_error: false,
            }
        }

        fn with_error() -> Self {
            Self {
                call_count: Arc::new(AtomicU32::new(0)),
                should_error: true,
            }
        }

        fn call_count(&self) -> u32 {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    impl Service<Request> for MockService {
        type Response = Response;
        type Error = Error;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _request: Request) -> Self::Future {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let should_error = self.should_error;

            Box::pin(async move {
                if should_error {
                    Err(Error::http(500, "mock failure"))
                } else {
                    Ok(Response::new(200, HashMap::new(), Bytes::from("fresh")))
                }
            })
        }
    }

    fn create_request() -> Request {
        let url = url::Url::parse("https://example.com/resource").expect("valid url");
        Request::builder(Method::Get, url).build()
    }

    fn recording(capabilities: &Capabilities) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        capabilities.attach_emitter().on(move |event| {
            if matches!(event, Event::CacheRequest { .. } | Event::CacheMiss { .. }) {
                sink.lock().expect("lock").push(event.name().to_string());
            }
        });
        seen
    }

    #[test]
    fn plain_get_keys_on_the_url() {
        let request = create_request();
        assert_eq!(default_cache_key(&request), "https://example.com/resource");
    }

    #[test]
    fn structured_requests_are_fingerprinted() {
        let url = url::Url::parse("https://example.com/resource").expect("valid url");
        let request = Request::builder(Method::Post, url.clone())
            .body("payload")
            .build();

        let key = default_cache_key(&request);
        assert_eq!(key.len(), 64);
        // Deterministic
        let again = Request::builder(Method::Post, url).body("payload").build();
        assert_eq!(default_cache_key(&again), key);
    }

    #[test]
    fn fingerprint_ignores_header_order() {
        let url = url::Url::parse("https://example.com/r").expect("valid url");
        let a = Request::builder(Method::Get, url.clone())
            .header("A", "1")
            .header("B", "2")
            .build();
        let b = Request::builder(Method::Get, url)
            .header("B", "2")
            .header("A", "1")
            .build();
        assert_eq!(default_cache_key(&a), default_cache_key(&b));
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let capabilities = Capabilities::new();
        let seen = recording(&capabilities);

        let store = Arc::new(MemoryStore::default());
        let mock = MockService::new();
        let layer = CacheLayer::new(capabilities, CacheConfig::new(Arc::clone(&store) as _));
        let mut service = layer.layer(mock.clone());

        // First request: miss, one delegate call, one store write
        let first = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await
            .expect("response");
        assert_eq!(first.body(), &Bytes::from("fresh"));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
        assert_eq!(
            *seen.lock().expect("lock"),
            vec!["cacheRequest", "cacheMiss"]
        );

        // Second identical request: hit, no delegate call, no write
        let second = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await
            .expect("response");
        assert_eq!(second.body(), &Bytes::from("fresh"));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
        assert_eq!(
            *seen.lock().expect("lock"),
            vec!["cacheRequest", "cacheMiss", "cacheRequest"]
        );
    }

    #[tokio::test]
    async fn delegate_failures_are_never_cached() {
        let store = Arc::new(MemoryStore::default());
        let mock = MockService::with_error();
        let layer = CacheLayer::new(
            Capabilities::new(),
            CacheConfig::new(Arc::clone(&store) as _),
        );
        let mut service = layer.layer(mock.clone());

        let err = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await
            .expect_err("propagated");

        assert_eq!(err.status(), Some(500));
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
        assert!(store.entries.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn store_errors_propagate_unchanged() {
        let store = Arc::new(MemoryStore::failing());
        let mock = MockService::new();
        let layer = CacheLayer::new(
            Capabilities::new(),
            CacheConfig::new(Arc::clone(&store) as _),
        );
        let mut service = layer.layer(mock.clone());

        let err = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await
            .expect_err("store failure");

        assert!(matches!(err, Error::Cache(_)));
        // The delegate was never consulted
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn custom_key_fn_is_used() {
        let store = Arc::new(MemoryStore::default());
        let mock = MockService::new();
        let config =
            CacheConfig::new(Arc::clone(&store) as _).key_fn(|_request| "fixed".to_string());
        let layer = CacheLayer::new(Capabilities::new(), config);
        let mut service = layer.layer(mock);

        let _ = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await
            .expect("response");

        assert!(store.entries.lock().expect("lock").contains_key("fixed"));
    }

    #[tokio::test]
    async fn ttl_options_reach_the_store() {
        struct TtlAssertingStore {
            seen_ttl: Mutex<Option<Duration>>,
        }

        impl CacheStore for TtlAssertingStore {
            fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<Response>>> {
                Box::pin(async { Ok(None) })
            }

            fn set(
                &self,
                _key: &str,
                _response: Response,
                options: &CacheOptions,
            ) -> BoxFuture<'_, Result<()>> {
                *self.seen_ttl.lock().expect("lock") = options.ttl;
                Box::pin(async { Ok(()) })
            }
        }

        let store = Arc::new(TtlAssertingStore {
            seen_ttl: Mutex::new(None),
        });
        let config = CacheConfig::new(Arc::clone(&store) as _)
            .options(CacheOptions::with_ttl(Duration::from_secs(60)));
        let layer = CacheLayer::new(Capabilities::new(), config);
        let mut service = layer.layer(MockService::new());

        let _ = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await
            .expect("response");

        assert_eq!(
            *store.seen_ttl.lock().expect("lock"),
            Some(Duration::from_secs(60))
        );
    }
}
