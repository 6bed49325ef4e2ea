//! Retry wrapper.
//!
//! Re-issues the request when the delegate fails with a retry-eligible
//! error, sleeping between attempts. The attempt counter lives in one
//! invocation's future, so concurrent invocations of the same stack never
//! share retry state, and the sleep suspends only the retrying invocation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::{Layer, Service};
use tracing::warn;

use swaddle_core::{Error, Request, Response, Result};

use crate::capabilities::Capabilities;
use crate::emitter::Event;

/// Default maximum tries.
const DEFAULT_ATTEMPTS: u32 = 3;
/// Default delay between tries.
const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

/// Delay between attempts: constant, or computed from the 1-based attempt
/// number that just failed (progressive backoff).
#[derive(Clone)]
pub enum RetryDelay {
    /// The same delay before every retry.
    Fixed(Duration),
    /// Delay computed per failed attempt.
    Backoff(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl RetryDelay {
    fn for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Backoff(f) => f(attempt),
        }
    }
}

impl std::fmt::Debug for RetryDelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Self::Backoff(_) => write!(f, "Backoff(..)"),
        }
    }
}

/// Configuration for the retry wrapper.
///
/// Defaults: 3 attempts, 1000 ms constant delay, and a filter that retries
/// timeouts and 500/502/503/504 responses.
#[derive(Clone)]
pub struct RetryConfig {
    attempts: u32,
    delay: RetryDelay,
    filter: Arc<dyn Fn(&Error) -> bool + Send + Sync>,
}

impl std::fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("attempts", &self.attempts)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: RetryDelay::Fixed(DEFAULT_DELAY),
            filter: Arc::new(default_filter),
        }
    }
}

impl RetryConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of tries (including the first).
    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets a constant delay between tries.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = RetryDelay::Fixed(delay);
        self
    }

    /// Sets a backoff function computing the delay from the 1-based attempt
    /// number that just failed.
    #[must_use]
    pub fn backoff<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        self.delay = RetryDelay::Backoff(Arc::new(f));
        self
    }

    /// Sets the predicate deciding whether an error is retry-eligible.
    #[must_use]
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(f);
        self
    }

    /// Validates the configuration; called at wrap time.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(Error::configuration("retry attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Default retry-eligibility: timeouts, and the transient 5xx statuses.
fn default_filter(error: &Error) -> bool {
    error.is_timeout() || matches!(error.status(), Some(500 | 502 | 503 | 504))
}

/// Layer that adds retry-on-failure.
#[derive(Debug, Clone)]
pub struct RetryLayer {
    capabilities: Capabilities,
    config: RetryConfig,
}

impl RetryLayer {
    /// Creates a retry layer with the given configuration.
    #[must_use]
    pub fn new(capabilities: Capabilities, config: RetryConfig) -> Self {
        Self {
            capabilities,
            config,
        }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Retry {
            inner,
            capabilities: self.capabilities.clone(),
            config: self.config.clone(),
        }
    }
}

/// Service that retries eligible failures with a delay.
#[derive(Debug, Clone)]
pub struct Retry<S> {
    inner: S,
    capabilities: Capabilities,
    config: RetryConfig,
}

impl<S> Service<Request> for Retry<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let config = self.config.clone();
        let emitter = self.capabilities.emitter();
        // At least one try even if the configuration slipped past validation.
        let max_attempts = config.attempts.max(1);

        Box::pin(async move {
            let mut attempt: u32 = 1;
            loop {
                match inner.call(request.clone()).await {
                    Ok(response) => {
                        if let Some(emitter) = &emitter {
                            emitter.emit(&Event::RetrySuccess { attempt });
                        }
                        return Ok(response);
                    }
                    Err(error) => {
                        if attempt >= max_attempts || !(config.filter)(&error) {
                            if let Some(emitter) = &emitter {
                                emitter.emit(&Event::RetryError { attempt });
                            }
                            return Err(error);
                        }

                        let delay = config.delay.for_attempt(attempt);
                        warn!(
                            attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %error,
                            "request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        if let Some(emitter) = &emitter {
                            emitter.emit(&Event::RetryRequest { attempt });
                        }
                    }
                }
            }
        })
    }
}
