//! Metrics exposition.
//!
//! Collectors return plain [`crate::types::MetricSample`] values; this
//! module turns one cycle's worth of them into Prometheus text format.
//!
//! Typical usage:
//!
//! ```ignore
//! use exporter::collectors::collect_all;
//! use exporter::metrics::render;
//!
//! let started = std::time::Instant::now();
//! let reports = collect_all(&collectors, &ctx);
//! let body = render(&reports, started.elapsed())?;
//! ```

pub mod prometheus;

pub use self::prometheus::{
    ExporterMetrics, METRICS_PREFIX, MetricsError, MetricsRegistry, content_type, render,
};
