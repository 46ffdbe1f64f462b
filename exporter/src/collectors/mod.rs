//! Collectors turning client responses into metric samples.
//!
//! Each collector runs its stages to completion on the calling thread and
//! returns a [`CollectionResult`]: the samples it could build plus the
//! ledger of external calls it attempted. Collectors never fail as a whole;
//! a missing metric is explained by the ledger.
//!
//! - [`node_stats::NodeStatsCollector`]: sync status, node info, voting power.
//! - [`upgrades::UpgradeCollector`]: pending upgrade, its estimated time and
//!   whether its binary is installed.

use std::sync::Arc;
use std::thread;

use crate::clients::{ClientError, Cosmovisor, NodeRpc, TendermintRpc, UpgradeSource};
use crate::config::ExporterConfig;
use crate::context::CollectContext;
use crate::types::{MetricSample, QueryRecord};

pub mod ledger;
pub mod node_stats;
pub mod upgrades;

pub use ledger::QueryLedger;
pub use node_stats::NodeStatsCollector;
pub use upgrades::UpgradeCollector;

pub const NODE_STATS_COLLECTOR: &str = "node-stats-querier";
pub const UPGRADES_COLLECTOR: &str = "upgrades-querier";

/// Output of one collector for one cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionResult {
    pub samples: Vec<MetricSample>,
    pub queries: Vec<QueryRecord>,
}

impl CollectionResult {
    pub fn new(samples: Vec<MetricSample>, ledger: QueryLedger) -> Self {
        Self {
            samples,
            queries: ledger.into_records(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.queries.is_empty()
    }
}

/// A source of metric samples, run once per collection cycle.
pub trait Collector: Send + Sync {
    /// Stable name used in logs and in the `querier_enabled` metric.
    fn name(&self) -> &'static str;

    /// Whether the clients this collector needs are configured.
    fn enabled(&self) -> bool;

    fn collect(&self, ctx: &CollectContext) -> CollectionResult;
}

/// What one collector produced during a cycle.
#[derive(Clone, Debug)]
pub struct CollectorReport {
    pub name: &'static str,
    pub enabled: bool,
    pub result: CollectionResult,
}

/// Builds the clients described by `cfg` and wires them into the standard
/// collector set. Both collectors share one RPC client.
pub fn from_config(cfg: &ExporterConfig) -> Result<Vec<Arc<dyn Collector>>, ClientError> {
    let rpc: Option<Arc<dyn NodeRpc>> = match &cfg.tendermint {
        Some(tm) => Some(Arc::new(TendermintRpc::from_config(tm)?) as Arc<dyn NodeRpc>),
        None => None,
    };
    let source: Option<Arc<dyn UpgradeSource>> = cfg
        .cosmovisor
        .as_ref()
        .map(|cv| Arc::new(Cosmovisor::from_config(cv)) as Arc<dyn UpgradeSource>);

    let node_stats: Arc<dyn Collector> =
        Arc::new(NodeStatsCollector::new(NODE_STATS_COLLECTOR, rpc.clone()));
    let upgrades: Arc<dyn Collector> =
        Arc::new(UpgradeCollector::new(UPGRADES_COLLECTOR, source, rpc));

    Ok(vec![node_stats, upgrades])
}

/// Runs every enabled collector concurrently under `ctx` and returns their
/// reports in the order given.
pub fn collect_all(collectors: &[Arc<dyn Collector>], ctx: &CollectContext) -> Vec<CollectorReport> {
    thread::scope(|scope| {
        let handles: Vec<_> = collectors
            .iter()
            .map(|collector| {
                let handle = collector
                    .enabled()
                    .then(|| scope.spawn(move || collector.collect(ctx)));
                (collector, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(collector, handle)| {
                let result = match handle.map(|h| h.join()) {
                    Some(Ok(result)) => result,
                    Some(Err(_)) => {
                        tracing::error!(collector = collector.name(), "collector panicked");
                        CollectionResult::default()
                    }
                    None => CollectionResult::default(),
                };
                CollectorReport {
                    name: collector.name(),
                    enabled: collector.enabled(),
                    result,
                }
            })
            .collect()
    })
}
