//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits
//! for easy glob importing:
//!
//! ```ignore
//! use swaddle::prelude::*;
//! ```

pub use crate::{
    CacheConfig, CacheOptions, CacheStore, Capabilities, Emitter, Error, Event, Method, Metric,
    MetricsConfig, Request, RequestBuilder, Response, Result, RetryConfig, Stack, StackConfig,
    Transport, Wrapper,
};
