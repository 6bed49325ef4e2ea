//! Transient pub/sub notifications tapped off the wrapper chain.
//!
//! The [`Emitter`] lives in the shared capability bag under
//! [`crate::capabilities::EMITTER`]. Wrappers emit [`Event`]s as control
//! flows through them; handlers observe but never influence the chain.
//! Events are not persisted.

use std::sync::{Arc, Mutex, PoisonError};

use swaddle_core::{Request, Response};

/// One observation from inside the wrapper chain.
///
/// For a single invocation, events arrive in composition order:
/// outermost wrapper first on the way in, innermost first on the way out.
#[derive(Debug, Clone)]
pub enum Event {
    /// A request is about to be delegated (event wrapper, inbound).
    Request {
        /// The request descriptor entering the chain.
        request: Request,
    },
    /// A delegate call succeeded (event wrapper, outbound).
    Response {
        /// The response leaving the chain.
        response: Response,
        /// The request that produced it.
        request: Request,
    },
    /// A delegate call failed (event wrapper, outbound).
    Error {
        /// Display form of the failure.
        message: String,
        /// The request that failed.
        request: Request,
    },
    /// The retry wrapper is about to re-issue a request.
    RetryRequest {
        /// 1-based attempt counter for the upcoming attempt.
        attempt: u32,
    },
    /// The retry wrapper saw the delegate succeed.
    RetrySuccess {
        /// Attempt on which the delegate succeeded.
        attempt: u32,
    },
    /// The retry wrapper gave up (retries exhausted or error not eligible).
    RetryError {
        /// Attempt on which the final failure surfaced.
        attempt: u32,
    },
    /// The cache wrapper is about to consult the store.
    CacheRequest {
        /// Cache key for the lookup.
        key: String,
    },
    /// The cache wrapper found no entry and will delegate.
    CacheMiss {
        /// Cache key that missed.
        key: String,
    },
}

impl Event {
    /// Wire-style event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Request { .. } => "request",
            Self::Response { .. } => "response",
            Self::Error { .. } => "error",
            Self::RetryRequest { .. } => "retryRequest",
            Self::RetrySuccess { .. } => "retrySuccess",
            Self::RetryError { .. } => "retryError",
            Self::CacheRequest { .. } => "cacheRequest",
            Self::CacheMiss { .. } => "cacheMiss",
        }
    }
}

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Synchronous fan-out event emitter.
///
/// Handlers run inline on the emitting task, in registration order. The
/// handler list is cloned out of the lock before dispatch, so a handler may
/// re-enter the emitter (register another handler, or emit); handlers
/// registered mid-dispatch only see subsequent events.
#[derive(Default)]
pub struct Emitter {
    handlers: Mutex<Vec<Handler>>,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("Emitter").field("handlers", &count).finish()
    }
}

impl Emitter {
    /// Creates an emitter with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler invoked for every emitted event.
    pub fn on<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Delivers an event to every registered handler.
    ///
    /// The lock is released before any handler runs.
    pub fn emit(&self, event: &Event) {
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in &handlers {
            handler(event);
        }
    }
}
