//! Shared application state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use exporter::{CollectContext, Collector, MetricsError, collect_all, render};

/// State held by the HTTP handlers.
///
/// Wrapped in an [`Arc`] and passed to request handlers via Axum's `State`
/// extractor. Nothing in here changes between scrapes.
pub struct AppState {
    /// Collectors run on every scrape, in exposition order.
    pub collectors: Vec<Arc<dyn Collector>>,
    /// Deadline for one scrape.
    pub collect_timeout: Duration,
}

impl AppState {
    /// Runs one collection cycle and renders it.
    ///
    /// Blocks the calling thread for up to `collect_timeout` (plus the
    /// timeout of an in-flight request); async callers should go through
    /// `spawn_blocking`.
    pub fn scrape(&self) -> Result<String, MetricsError> {
        let started = Instant::now();
        let ctx = CollectContext::with_timeout(self.collect_timeout);
        let reports = collect_all(&self.collectors, &ctx);

        for report in &reports {
            let failed = report
                .result
                .queries
                .iter()
                .filter(|q| !q.succeeded)
                .count();
            tracing::debug!(
                collector = report.name,
                enabled = report.enabled,
                samples = report.result.samples.len(),
                queries = report.result.queries.len(),
                failed,
                "collector finished"
            );
        }

        render(&reports, started.elapsed())
    }
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use exporter::{NodeStatsCollector, UpgradeCollector};

    #[test]
    fn scrape_without_clients_reports_disabled_queriers() {
        let node_stats: Arc<dyn Collector> =
            Arc::new(NodeStatsCollector::new("node-stats-querier", None));
        let upgrades: Arc<dyn Collector> =
            Arc::new(UpgradeCollector::new("upgrades-querier", None, None));
        let state = AppState {
            collectors: vec![node_stats, upgrades],
            collect_timeout: Duration::from_secs(1),
        };

        let body = state.scrape().expect("scrape renders");
        assert!(body.contains("cosmos_node_exporter_querier_enabled{querier=\"node-stats-querier\"} 0"));
        assert!(body.contains("cosmos_node_exporter_querier_enabled{querier=\"upgrades-querier\"} 0"));
        assert!(!body.contains("cosmos_node_exporter_upgrade_coming"));
    }
}
