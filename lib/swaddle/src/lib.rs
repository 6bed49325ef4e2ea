//! Composable wrapper middleware for HTTP request functions.
//!
//! swaddle chains independently-authored wrappers (event notification,
//! retry-on-failure, response caching, metrics export) around a base
//! "perform HTTP request" primitive without modifying that primitive. The
//! transport, the cache store, and the metrics sink are pluggable
//! collaborators; swaddle owns only the composition model.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use swaddle::prelude::*;
//!
//! let stack = Stack::from_config(
//!     transport,
//!     StackConfig::new()
//!         .event()
//!         .retry(RetryConfig::new().attempts(2))
//!         .cache(CacheConfig::new(Arc::new(store))),
//! )?;
//!
//! // Any layer can observe the chain through the shared emitter
//! stack.capabilities().attach_emitter().on(|event| {
//!     println!("{}", event.name());
//! });
//!
//! let response = stack.execute(Request::get("https://example.com/users")?).await?;
//! ```
//!
//! Wrappers applied through [`Stack::from_config`] are layered in one fixed
//! canonical order - event outermost, then retry, then cache, then metrics -
//! so events observe everything, retries see cache hits and misses, and
//! metrics time the transport. The manual [`Stack::wrap`] /
//! [`Stack::wrap_with`] path allows arbitrary stacking, including duplicate
//! wrapper types at different layers.

pub mod capabilities;
mod config;
mod emitter;
pub mod prelude;
pub mod registry;
mod stack;
pub mod wrappers;

pub use capabilities::Capabilities;
pub use config::StackConfig;
pub use emitter::{Emitter, Event};
pub use registry::{WrapFn, register};
pub use stack::{BoxedService, ServiceFuture, Stack, TransportService, Wrapper};
pub use wrappers::{
    CacheConfig, CacheOptions, CacheStore, Counter, FacadeCounter, FacadeHistogram, Histogram,
    Labels, Metric, MetricsConfig, RetryConfig, RetryDelay,
};

// Re-export tower for raw layer composition
pub use tower;

// Re-export core types
pub use swaddle_core::{
    BoxFuture, Error, Method, Request, RequestBuilder, Response, Result, Transport,
};
