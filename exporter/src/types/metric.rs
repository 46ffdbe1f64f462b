use std::collections::BTreeMap;
use std::fmt;

/// Stable identifiers for every metric the collectors can produce.
///
/// Each name has a fixed label set (see [`MetricName::label_names`]); a
/// sample for a given name always carries exactly those labels.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MetricName {
    CatchingUp,
    TimeSinceLatestBlock,
    NodeInfo,
    TendermintVersion,
    VotingPower,
    UpgradeComing,
    UpgradeInfo,
    UpgradeEstimatedTime,
    UpgradeBinaryPresent,
}

impl MetricName {
    pub const ALL: [MetricName; 9] = [
        MetricName::CatchingUp,
        MetricName::TimeSinceLatestBlock,
        MetricName::NodeInfo,
        MetricName::TendermintVersion,
        MetricName::VotingPower,
        MetricName::UpgradeComing,
        MetricName::UpgradeInfo,
        MetricName::UpgradeEstimatedTime,
        MetricName::UpgradeBinaryPresent,
    ];

    /// Exposed metric name, without the exporter prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::CatchingUp => "catching_up",
            MetricName::TimeSinceLatestBlock => "time_since_latest_block",
            MetricName::NodeInfo => "node_info",
            MetricName::TendermintVersion => "tendermint_version",
            MetricName::VotingPower => "voting_power",
            MetricName::UpgradeComing => "upgrade_coming",
            MetricName::UpgradeInfo => "upgrade_info",
            MetricName::UpgradeEstimatedTime => "upgrade_estimated_time",
            MetricName::UpgradeBinaryPresent => "upgrade_binary_present",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricName::CatchingUp => "Is node catching up?",
            MetricName::TimeSinceLatestBlock => "Time since latest block, in seconds",
            MetricName::NodeInfo => "Node info (moniker and chain id)",
            MetricName::TendermintVersion => "Tendermint/CometBFT version",
            MetricName::VotingPower => "Voting power of the node's validator",
            MetricName::UpgradeComing => "Is future upgrade planned?",
            MetricName::UpgradeInfo => "Future upgrade info",
            MetricName::UpgradeEstimatedTime => "Estimated upgrade time, as Unix timestamp",
            MetricName::UpgradeBinaryPresent => "Is upgrade binary present?",
        }
    }

    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            MetricName::CatchingUp
            | MetricName::TimeSinceLatestBlock
            | MetricName::VotingPower
            | MetricName::UpgradeComing => &[],
            MetricName::NodeInfo => &["moniker", "chain"],
            MetricName::TendermintVersion => &["version"],
            MetricName::UpgradeInfo
            | MetricName::UpgradeEstimatedTime
            | MetricName::UpgradeBinaryPresent => &["name", "info"],
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single gauge observation produced by a collector.
///
/// Samples are immutable once built. Labels are kept in a `BTreeMap` so the
/// exposition order is deterministic.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSample {
    name: MetricName,
    labels: BTreeMap<String, String>,
    value: f64,
}

impl MetricSample {
    /// Builds a sample for a metric without labels.
    pub fn unlabeled(name: MetricName, value: f64) -> Self {
        Self::new(name, [], value)
    }

    /// Builds a sample from `(label, value)` pairs.
    ///
    /// The label keys must match `name.label_names()`; this is checked in
    /// debug builds.
    pub fn new<const N: usize>(
        name: MetricName,
        labels: [(&str, &str); N],
        value: f64,
    ) -> Self {
        let labels: BTreeMap<String, String> = labels
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        debug_assert!(
            labels.len() == name.label_names().len()
                && name.label_names().iter().all(|l| labels.contains_key(*l)),
            "label set for {name} does not match {:?}",
            name.label_names()
        );

        Self {
            name,
            labels,
            value,
        }
    }

    pub fn name(&self) -> MetricName {
        self.name
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Returns the value of a single label, if present.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Label values ordered as in `name.label_names()`, ready for
    /// `GaugeVec::with_label_values`.
    pub fn label_values(&self) -> Vec<&str> {
        self.name
            .label_names()
            .iter()
            .map(|l| self.label(l).unwrap_or_default())
            .collect()
    }
}
