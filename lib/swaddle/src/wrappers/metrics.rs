//! Metrics export wrapper.
//!
//! Drives one observation per invocation into a pluggable sink: a counter is
//! incremented, a latency observer receives the elapsed time. Labels are
//! static or computed per outcome. Like the event wrapper this is a pure
//! tap; the delegate's outcome passes through unchanged.
//!
//! [`FacadeCounter`] and [`FacadeHistogram`] adapt the sink contracts onto
//! the `metrics` crate facade, so any exporter backend registered with that
//! facade (Prometheus and friends) receives the observations.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tower::{Layer, Service};

use swaddle_core::{Error, Request, Response, Result};

/// Label set attached to one observation.
pub type LabelSet = Vec<(String, String)>;

/// Counting-only metrics sink.
pub trait Counter: Send + Sync {
    /// Records one occurrence.
    fn increment(&self, labels: &[(String, String)]);
}

/// Latency-measuring metrics sink.
pub trait Histogram: Send + Sync {
    /// Records an elapsed duration in seconds.
    fn observe(&self, seconds: f64, labels: &[(String, String)]);
}

/// The metric driven by the wrapper, classified by kind.
#[derive(Clone)]
pub enum Metric {
    /// Increment per invocation.
    Counter(Arc<dyn Counter>),
    /// Observe elapsed time per invocation.
    Latency(Arc<dyn Histogram>),
}

impl Metric {
    fn record(&self, elapsed: Duration, labels: &[(String, String)]) {
        match self {
            Self::Counter(counter) => counter.increment(labels),
            Self::Latency(histogram) => histogram.observe(elapsed.as_secs_f64(), labels),
        }
    }
}

/// Labels for each observation: a static set, or computed from the outcome
/// (`None` for success, `Some(error)` for failure).
#[derive(Clone)]
pub enum Labels {
    /// The same labels for every observation.
    Static(LabelSet),
    /// Labels computed per observation from the outcome.
    PerOutcome(Arc<dyn Fn(Option<&Error>) -> LabelSet + Send + Sync>),
}

impl Default for Labels {
    fn default() -> Self {
        Self::Static(Vec::new())
    }
}

impl Labels {
    fn compute(&self, error: Option<&Error>) -> LabelSet {
        match self {
            Self::Static(labels) => labels.clone(),
            Self::PerOutcome(f) => f(error),
        }
    }
}

/// Configuration for the metrics wrapper.
#[derive(Clone)]
pub struct MetricsConfig {
    metric: Metric,
    labels: Labels,
}

impl MetricsConfig {
    /// Creates a configuration driving the given metric, with no labels.
    #[must_use]
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            labels: Labels::default(),
        }
    }

    /// Sets static labels attached to every observation.
    #[must_use]
    pub fn static_labels(mut self, labels: LabelSet) -> Self {
        self.labels = Labels::Static(labels);
        self
    }

    /// Sets a label function computed per observation from the outcome.
    #[must_use]
    pub fn labels<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Error>) -> LabelSet + Send + Sync + 'static,
    {
        self.labels = Labels::PerOutcome(Arc::new(f));
        self
    }
}

/// Layer that records one metric observation per invocation.
#[derive(Clone)]
pub struct MetricsLayer {
    config: MetricsConfig,
}

impl MetricsLayer {
    /// Creates a metrics layer with the given configuration.
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = Metrics<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Metrics {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Service that times its delegate and drives the configured sink.
#[derive(Clone)]
pub struct Metrics<S> {
    inner: S,
    config: MetricsConfig,
}

impl<S> Service<Request> for Metrics<S>
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
        let start = Instant::now();

        Box::pin(async move {
            let result = inner.call(request).await;
            let elapsed = start.elapsed();

            let labels = match &result {
                Ok(_) => config.labels.compute(None),
                Err(error) => config.labels.compute(Some(error)),
            };
            config.metric.record(elapsed, &labels);

            result
        })
    }
}

// ============================================================================
// metrics-crate facade adapters
// ============================================================================

/// [`Counter`] backed by the `metrics` crate facade.
#[derive(Debug, Clone, Copy)]
pub struct FacadeCounter {
    name: &'static str,
}

impl FacadeCounter {
    /// Creates an adapter for the named counter.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Counter for FacadeCounter {
    fn increment(&self, labels: &[(String, String)]) {
        let labels: Vec<metrics::Label> = labels
            .iter()
            .map(|(name, value)| metrics::Label::new(name.clone(), value.clone()))
            .collect();
        metrics::counter!(self.name, labels).increment(1);
    }
}

/// [`Histogram`] backed by the `metrics` crate facade.
#[derive(Debug, Clone, Copy)]
pub struct FacadeHistogram {
    name: &'static str,
}

impl FacadeHistogram {
    /// Creates an adapter for the named histogram.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Histogram for FacadeHistogram {
    fn observe(&self, seconds: f64, labels: &[(String, String)]) {
        let labels: Vec<metrics::Label> = labels
            .iter()
            .map(|(name, value)| metrics::Label::new(name.clone(), value.clone()))
            .collect();
        metrics::histogram!(self.name, labels).record(seconds);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use bytes::Bytes;
    use tower::ServiceExt;

    use super::*;
    use swaddle_core::Method;

    #[derive(Default)]
    struct RecordingCounter {
        count: AtomicU32,
        last_labels: Mutex<LabelSet>,
    }

    impl Counter for RecordingCounter {
        fn increment(&self, labels: &[(String, String)]) {
            self.count.fetch_add(1, Ordering::SeqCst);
            *self.last_labels.lock().expect("lock") = labels.to_vec();
        }
    }

    #[derive(Default)]
    struct RecordingHistogram {
        observations: Mutex<Vec<f64>>,
    }

    impl Histogram for RecordingHistogram {
        fn observe(&self, seconds: f64, _labels: &[(String, String)]) {
            self.observations.lock().expect("lock").push(seconds);
        }
    }

    #[derive(Clone)]
    struct MockService {
        should_error: bool,
    }

    impl Service<Request> for MockService {
        type Response = Response;
        type Error = Error;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _request: Request) -> Self::Future {
            let should_error = self.should_error;
            Box::pin(async move {
                if should_error {
                    Err(Error::http(502, "mock failure"))
                } else {
                    Ok(Response::new(200, HashMap::new(), Bytes::new()))
                }
            })
        }
    }

    fn create_request() -> Request {
        let url = url::Url::parse("https://example.com/test").expect("valid url");
        Request::builder(Method::Get, url).build()
    }

    #[tokio::test]
    async fn counter_incremented_on_success() {
        let counter = Arc::new(RecordingCounter::default());
        let config = MetricsConfig::new(Metric::Counter(Arc::clone(&counter) as _))
            .static_labels(vec![("service".to_string(), "api".to_string())]);
        let mut service = MetricsLayer::new(config).layer(MockService {
            should_error: false,
        });

        let result = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await;

        assert!(result.is_ok());
        assert_eq!(counter.count.load(Ordering::SeqCst), 1);
        assert_eq!(
            *counter.last_labels.lock().expect("lock"),
            vec![("service".to_string(), "api".to_string())]
        );
    }

    #[tokio::test]
    async fn failure_observed_and_reraised() {
        let counter = Arc::new(RecordingCounter::default());
        let config =
            MetricsConfig::new(Metric::Counter(Arc::clone(&counter) as _)).labels(|error| {
                let outcome = match error {
                    Some(err) => err.status().map_or("error".to_string(), |s| s.to_string()),
                    None => "ok".to_string(),
                };
                vec![("outcome".to_string(), outcome)]
            });
        let mut service = MetricsLayer::new(config).layer(MockService { should_error: true });

        let err = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await
            .expect_err("failure passes through");

        assert_eq!(err.status(), Some(502));
        assert_eq!(counter.count.load(Ordering::SeqCst), 1);
        assert_eq!(
            *counter.last_labels.lock().expect("lock"),
            vec![("outcome".to_string(), "502".to_string())]
        );
    }

    #[tokio::test]
    async fn latency_metric_records_elapsed_seconds() {
        let histogram = Arc::new(RecordingHistogram::default());
        let config = MetricsConfig::new(Metric::Latency(Arc::clone(&histogram) as _));
        let mut service = MetricsLayer::new(config).layer(MockService {
            should_error: false,
        });

        let result = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await;

        assert!(result.is_ok());
        let observations = histogram.observations.lock().expect("lock");
        assert_eq!(observations.len(), 1);
        assert!(observations.first().is_some_and(|s| *s >= 0.0));
    }

    #[tokio::test]
    async fn per_outcome_labels_see_success_as_none() {
        let counter = Arc::new(RecordingCounter::default());
        let config =
            MetricsConfig::new(Metric::Counter(Arc::clone(&counter) as _)).labels(|error| {
                vec![(
                    "failed".to_string(),
                    error.is_some().to_string(),
                )]
            });
        let mut service = MetricsLayer::new(config).layer(MockService {
            should_error: false,
        });

        let _ = service
            .ready()
            .await
            .expect("ready")
            .call(create_request())
            .await;

        assert_eq!(
            *counter.last_labels.lock().expect("lock"),
            vec![("failed".to_string(), "false".to_string())]
        );
    }
}
