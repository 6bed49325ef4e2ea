//! The HTTP transport collaborator.
//!
//! swaddle never issues network calls itself. The innermost callable of a
//! composed chain is a [`Transport`]: anything that takes a [`Request`] and
//! resolves to a [`Response`] or an [`crate::Error`]. Production code plugs
//! in a real HTTP client; tests plug in closures or mock transports.

use std::future::Future;
use std::pin::Pin;

use crate::{Request, Response, Result};

/// A boxed, sendable future, used throughout the collaborator contracts.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The base "perform HTTP request" primitive.
///
/// Failures reject with an [`crate::Error`] exposing at minimum a message
/// and, for HTTP-level failures, a status code.
pub trait Transport: Send + Sync + 'static {
    /// Execute an HTTP request and return the response.
    fn call(&self, request: Request) -> BoxFuture<'static, Result<Response>>;
}

/// Blanket implementation so plain async closures work as transports.
impl<F, Fut> Transport for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, Result<Response>> {
        Box::pin(self(request))
    }
}
