//! Convenience configuration for [`crate::Stack::from_config`].

use crate::wrappers::{CacheConfig, MetricsConfig, RetryConfig};

/// Which built-in wrappers to apply, and how.
///
/// The order the setters are called carries no meaning:
/// [`crate::Stack::from_config`] always layers the present wrappers in the
/// canonical order event → retry → cache → metrics (outermost to
/// innermost).
///
/// # Example
///
/// ```ignore
/// let config = StackConfig::new()
///     .cache(CacheConfig::new(store))
///     .event()
///     .retry(RetryConfig::new().attempts(2));
/// ```
#[derive(Clone, Default)]
pub struct StackConfig {
    event: bool,
    retry: Option<RetryConfig>,
    cache: Option<CacheConfig>,
    metrics: Option<MetricsConfig>,
}

impl std::fmt::Debug for StackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackConfig")
            .field("event", &self.event)
            .field("retry", &self.retry)
            .field("cache", &self.cache.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl StackConfig {
    /// Creates a configuration with no wrappers selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the event wrapper.
    #[must_use]
    pub fn event(mut self) -> Self {
        self.event = true;
        self
    }

    /// Enables the retry wrapper with the given configuration.
    #[must_use]
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Enables the cache wrapper with the given configuration.
    #[must_use]
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Enables the metrics wrapper with the given configuration.
    #[must_use]
    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.metrics = Some(config);
        self
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        bool,
        Option<RetryConfig>,
        Option<CacheConfig>,
        Option<MetricsConfig>,
    ) {
        (self.event, self.retry, self.cache, self.metrics)
    }
}
