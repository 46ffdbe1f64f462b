//! Prometheus exposition of collector output.
//!
//! A [`MetricsRegistry`] owns a fresh Prometheus registry for one collection
//! cycle. Samples are registered lazily as one `GaugeVec` per
//! [`MetricName`], next to the exporter's own self-metrics
//! ([`ExporterMetrics`]). Building a new registry per scrape means gauges
//! from a previous cycle (e.g. an upgrade that has since been applied)
//! never leak into the next one.

use std::collections::HashMap;
use std::string::FromUtf8Error;
use std::time::Duration;

use prometheus::proto::MetricFamily;
use prometheus::{self, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::collectors::CollectorReport;
use crate::types::{MetricName, MetricSample, QueryRecord, bool_to_f64};

/// Prefix applied to every exposed metric.
pub const METRICS_PREFIX: &str = "cosmos_node_exporter";

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("exposition is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Metrics describing the exporter itself.
#[derive(Clone)]
pub struct ExporterMetrics {
    /// One series per external call attempted in the cycle: 1 if it
    /// succeeded, 0 otherwise.
    pub query_successful: GaugeVec,
    /// Whether each collector had the clients it needs.
    pub querier_enabled: GaugeVec,
    /// Wall-clock duration of the collection cycle.
    pub scrape_duration_seconds: Gauge,
}

impl ExporterMetrics {
    /// Registers exporter self-metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let query_successful = GaugeVec::new(
            Opts::new(
                "query_successful",
                "Was the query successful? (1 = yes, 0 = no)",
            ),
            &["action"],
        )?;
        registry.register(Box::new(query_successful.clone()))?;

        let querier_enabled = GaugeVec::new(
            Opts::new("querier_enabled", "Is the querier enabled?"),
            &["querier"],
        )?;
        registry.register(Box::new(querier_enabled.clone()))?;

        let scrape_duration_seconds = Gauge::with_opts(Opts::new(
            "scrape_duration_seconds",
            "Time spent collecting metrics for this scrape, in seconds",
        ))?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        Ok(Self {
            query_successful,
            querier_enabled,
            scrape_duration_seconds,
        })
    }
}

/// Per-cycle wrapper around a Prometheus registry.
pub struct MetricsRegistry {
    registry: Registry,
    pub exporter: ExporterMetrics,
    gauges: HashMap<MetricName, GaugeVec>,
}

impl MetricsRegistry {
    /// Creates a registry with the exporter prefix and registers the
    /// self-metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new_custom(Some(METRICS_PREFIX.to_string()), None)?;
        let exporter = ExporterMetrics::register(&registry)?;
        Ok(Self {
            registry,
            exporter,
            gauges: HashMap::new(),
        })
    }

    fn gauge_vec(&mut self, name: MetricName) -> Result<&GaugeVec, MetricsError> {
        if !self.gauges.contains_key(&name) {
            let vec = GaugeVec::new(Opts::new(name.as_str(), name.help()), name.label_names())?;
            self.registry.register(Box::new(vec.clone()))?;
            self.gauges.insert(name, vec);
        }
        // Inserted above if it was missing.
        Ok(&self.gauges[&name])
    }

    pub fn observe_sample(&mut self, sample: &MetricSample) -> Result<(), MetricsError> {
        let gauge = self
            .gauge_vec(sample.name())?
            .get_metric_with_label_values(&sample.label_values())?;
        gauge.set(sample.value());
        Ok(())
    }

    pub fn observe_query(&self, query: &QueryRecord) {
        self.exporter
            .query_successful
            .with_label_values(&[query.action.as_str()])
            .set(bool_to_f64(query.succeeded));
    }

    /// Records everything a collector produced in the cycle.
    pub fn observe_report(&mut self, report: &CollectorReport) -> Result<(), MetricsError> {
        self.exporter
            .querier_enabled
            .with_label_values(&[report.name])
            .set(bool_to_f64(report.enabled));

        for sample in &report.result.samples {
            self.observe_sample(sample)?;
        }
        for query in &report.result.queries {
            self.observe_query(query);
        }
        Ok(())
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> Result<String, MetricsError> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Renders one cycle's reports as Prometheus text exposition.
pub fn render(reports: &[CollectorReport], elapsed: Duration) -> Result<String, MetricsError> {
    let mut registry = MetricsRegistry::new()?;
    for report in reports {
        registry.observe_report(report)?;
    }
    registry
        .exporter
        .scrape_duration_seconds
        .set(elapsed.as_secs_f64());
    registry.gather_text()
}

/// Content type of [`render`]'s output.
pub fn content_type() -> &'static str {
    prometheus::TEXT_FORMAT
}
