//! Event notification wrapper.
//!
//! Taps the chain with `request` / `response` / `error` events through the
//! shared [`Emitter`](crate::Emitter) capability. Purely observational: the delegate's
//! outcome passes through unchanged.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use swaddle_core::{Error, Request, Response, Result};

use crate::capabilities::Capabilities;
use crate::emitter::Event;

/// Layer that emits request/response/error events.
///
/// Construction attaches an [`Emitter`](crate::Emitter) to the shared
/// capability bag if none is present yet; reattaching is a no-op, so several event layers on one
/// stack share a single emitter.
#[derive(Debug, Clone)]
pub struct EventLayer {
    capabilities: Capabilities,
}

impl EventLayer {
    /// Creates the layer, attaching the emitter capability if absent.
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        let _ = capabilities.attach_emitter();
        Self { capabilities }
    }
}

impl<S> Layer<S> for EventLayer {
    type Service = EventWrap<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EventWrap {
            inner,
            capabilities: self.capabilities.clone(),
        }
    }
}

/// Service that emits request/response/error events around its delegate.
#[derive(Debug, Clone)]
pub struct EventWrap<S> {
    inner: S,
    capabilities: Capabilities,
}

impl<S> Service<Request> for EventWrap<S>
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
        // The emitter is attached at construction, but look it up at call
        // time: the bag is shared, so handlers registered through any layer
        // are visible here.
        let emitter = self.capabilities.attach_emitter();

        Box::pin(async move {
            emitter.emit(&Event::Request {
                request: request.clone(),
            });

            match inner.call(request.clone()).await {
                Ok(response) => {
                    emitter.emit(&Event::Response {
                        response: response.clone(),
                        request,
                    });
                    Ok(response)
                }
                Err(error) => {
                    emitter.emit(&Event::Error {
                        message: error.to_string(),
                        request,
                    });
                    Err(error)
                }
            }
        })
    }
}
