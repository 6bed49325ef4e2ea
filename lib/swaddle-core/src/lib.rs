//! Core types and collaborator contracts for swaddle.
//!
//! This crate provides the foundational pieces shared by every wrapper:
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`] - HTTP response type
//! - [`Error`] and [`Result`] - Error handling
//! - [`Transport`] - The "perform the actual HTTP request" collaborator
//!
//! The transport is deliberately abstract: swaddle composes behavior
//! *around* a request function, it does not issue network calls itself.

mod error;
mod method;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use error::{Error, Result};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use transport::{BoxFuture, Transport};
