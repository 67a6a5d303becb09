use std::sync::Arc;

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

// ---------------------------------------------------------------------------
// Label types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: Outcome,
}

/// Result of one create-repository request.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Outcome {
    Created,
    ValidationError,
    DatabaseError,
    RepositoryInitError,
}

// ---------------------------------------------------------------------------
// Metrics struct
// ---------------------------------------------------------------------------

pub struct Metrics {
    pub repository_create_total: Family<OutcomeLabels, Counter>,
    pub repository_create_duration_seconds: Histogram,
}

impl Metrics {
    /// Create a new [`Metrics`] instance and register every metric with the
    /// supplied `registry`.
    pub fn new(registry: &mut Registry) -> Self {
        let repository_create_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "repoforge_repository_create",
            "Create-repository requests by outcome",
            repository_create_total.clone(),
        );

        let repository_create_duration_seconds =
            Histogram::new(exponential_buckets(0.005, 2.0, 14));
        registry.register(
            "repoforge_repository_create_duration_seconds",
            "Create-repository latency in seconds",
            repository_create_duration_seconds.clone(),
        );

        Self {
            repository_create_total,
            repository_create_duration_seconds,
        }
    }

    pub fn observe_create(&self, outcome: Outcome, elapsed_secs: f64) {
        self.repository_create_total
            .get_or_create(&OutcomeLabels { outcome })
            .inc();
        self.repository_create_duration_seconds.observe(elapsed_secs);
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Thread-safe wrapper for the metrics registry, used in [`crate::AppState`].
#[derive(Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub metrics: Arc<Metrics>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let metrics = Metrics::new(&mut registry);
        Self {
            registry: Arc::new(registry),
            metrics: Arc::new(metrics),
        }
    }

    /// Render the registry in OpenMetrics text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
