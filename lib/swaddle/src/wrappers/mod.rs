//! Built-in wrappers.
//!
//! Each wrapper adds one cross-cutting behavior around the next-in-chain
//! callable while preserving the calling contract:
//!
//! - [`EventLayer`] - pub/sub notification of request/response/error
//! - [`RetryLayer`] - bounded retry with delay for eligible failures
//! - [`CacheLayer`] - read-through response caching over a pluggable store
//! - [`MetricsLayer`] - counter/latency export to a pluggable sink
//!
//! Event and metrics are purely observational taps and always re-raise the
//! exact failure they observed. Retry is the only wrapper permitted to
//! recover a failure, and it surfaces the final one unchanged. All four are
//! plain `tower::Layer`s underneath, so power users can compose them with
//! raw tower as well as through [`crate::Stack`].

pub mod cache;
pub mod event;
pub mod metrics;
pub mod retry;

pub use cache::{Cache, CacheConfig, CacheLayer, CacheOptions, CacheStore, KeyFn, default_cache_key};
pub use event::{EventLayer, EventWrap};
pub use metrics::{
    Counter, FacadeCounter, FacadeHistogram, Histogram, LabelSet, Labels, Metric, Metrics,
    MetricsConfig, MetricsLayer,
};
pub use retry::{Retry, RetryConfig, RetryDelay, RetryLayer};
