//! Core domain types used by the exporter.
//!
//! This module defines the values that flow between the clients, the
//! collectors and the exposition layer: node status snapshots, upgrade
//! plans, metric samples and query records. Collectors never hand out
//! Prometheus objects directly; they return these plain values and leave
//! registration to [`crate::metrics`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric names, label sets and the [`MetricSample`] value type.
pub mod metric;
/// Upgrade plans and the installed-binary registry.
pub mod upgrade;

pub use metric::{MetricName, MetricSample};
pub use upgrade::{UpgradeBinarySet, UpgradePlan, normalize_upgrade_name};

/// Snapshot of a node's `/status` as reported by the consensus RPC.
///
/// All node-stats metrics are derived from a single snapshot, so either the
/// whole struct is available or none of it is.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeStatus {
    /// Whether the node is still syncing towards the chain head.
    pub catching_up: bool,
    /// Height of the latest block the node knows about.
    pub latest_block_height: i64,
    /// Header time of the latest block.
    pub latest_block_time: DateTime<Utc>,
    pub moniker: String,
    /// Chain id, e.g. `cosmoshub-4`.
    pub network_id: String,
    /// Consensus engine version string.
    pub software_version: String,
    /// Voting power as reported by the RPC. Tendermint encodes it as a
    /// decimal string; it is kept verbatim and parsed by the collector.
    pub voting_power: String,
}

/// One external call attempted during a collection cycle.
///
/// Records are append-only within a cycle and are exposed as the
/// `query_successful` self-metric so operators can tell a failed query
/// apart from a feature that is simply absent.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub action: String,
    pub succeeded: bool,
}

impl QueryRecord {
    pub fn success(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            succeeded: true,
        }
    }

    pub fn failure(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            succeeded: false,
        }
    }
}

/// Maps a boolean onto the 0/1 gauge convention.
pub fn bool_to_f64(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

/// Parses a decimal string (as used by Tendermint for big integers) into
/// an `f64` suitable for a gauge value. Surrounding whitespace is rejected.
pub fn string_to_f64(value: &str) -> Result<f64, std::num::ParseFloatError> {
    value.parse::<f64>()
}
