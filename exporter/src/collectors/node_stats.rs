//! Node sync status, identity and voting power.

use std::sync::Arc;

use chrono::Utc;

use crate::clients::NodeRpc;
use crate::collectors::{CollectionResult, Collector, QueryLedger};
use crate::context::CollectContext;
use crate::types::{MetricName, MetricSample, bool_to_f64, string_to_f64};

pub const ACTION_GET_NODE_STATUS: &str = "tendermint_get_node_status";

/// Builds the node-stats metric set from one `/status` snapshot.
///
/// Either the whole snapshot is available or nothing is emitted; the only
/// optional sample is voting power, which is dropped if the RPC reports a
/// value that does not parse.
pub struct NodeStatsCollector {
    name: &'static str,
    rpc: Option<Arc<dyn NodeRpc>>,
}

impl NodeStatsCollector {
    pub fn new(name: &'static str, rpc: Option<Arc<dyn NodeRpc>>) -> Self {
        Self { name, rpc }
    }
}

impl Collector for NodeStatsCollector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn enabled(&self) -> bool {
        self.rpc.is_some()
    }

    fn collect(&self, ctx: &CollectContext) -> CollectionResult {
        let Some(rpc) = &self.rpc else {
            return CollectionResult::default();
        };

        let span = tracing::info_span!("collect", collector = self.name);
        let _guard = span.enter();

        let mut ledger = QueryLedger::new();
        let status = match ledger.record(
            ACTION_GET_NODE_STATUS,
            ctx.check().and_then(|()| rpc.status(ctx)),
        ) {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(collector = self.name, error = %e, "could not fetch node status");
                return CollectionResult::new(Vec::new(), ledger);
            }
        };

        let since_latest_block =
            (Utc::now() - status.latest_block_time).num_milliseconds() as f64 / 1000.0;

        let mut samples = vec![
            MetricSample::unlabeled(MetricName::CatchingUp, bool_to_f64(status.catching_up)),
            MetricSample::unlabeled(MetricName::TimeSinceLatestBlock, since_latest_block),
            MetricSample::new(
                MetricName::NodeInfo,
                [
                    ("moniker", status.moniker.as_str()),
                    ("chain", status.network_id.as_str()),
                ],
                1.0,
            ),
            MetricSample::new(
                MetricName::TendermintVersion,
                [("version", status.software_version.as_str())],
                1.0,
            ),
        ];

        match string_to_f64(&status.voting_power) {
            Ok(value) => samples.push(MetricSample::unlabeled(MetricName::VotingPower, value)),
            Err(e) => tracing::error!(
                collector = self.name,
                voting_power = %status.voting_power,
                error = %e,
                "could not convert voting power to a number"
            ),
        }

        CollectionResult::new(samples, ledger)
    }
}
