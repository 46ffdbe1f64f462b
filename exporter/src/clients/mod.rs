//! Clients for the systems the exporter observes.
//!
//! The collectors only see two traits:
//!
//! - [`NodeRpc`]: the node's consensus RPC (status and block-time
//!   estimation), implemented over HTTP by [`tendermint::TendermintRpc`];
//! - [`UpgradeSource`]: the upgrade manager's local state, implemented by
//!   [`cosmovisor::Cosmovisor`] on top of the node's home directories.
//!
//! Both are blocking. Higher layers run collectors on dedicated threads
//! (e.g. `tokio::task::spawn_blocking`) and may share one client between
//! several collectors.

use chrono::{DateTime, Utc};

use crate::context::CollectContext;
use crate::types::{NodeStatus, UpgradeBinarySet, UpgradePlan};

pub mod cosmovisor;
pub mod error;
pub mod tendermint;

pub use cosmovisor::Cosmovisor;
pub use error::ClientError;
pub use tendermint::TendermintRpc;

/// Consensus RPC of the observed node.
pub trait NodeRpc: Send + Sync {
    /// Fetches a status snapshot. Implementations should not outlive the
    /// deadline carried by `ctx`.
    fn status(&self, ctx: &CollectContext) -> Result<NodeStatus, ClientError>;

    /// Estimates the wall-clock time at which `height` will be produced,
    /// from the current head and the recent average block time. Every
    /// request made for the estimate is bounded by the deadline in `ctx`.
    fn estimate_time_at_height(
        &self,
        ctx: &CollectContext,
        height: i64,
    ) -> Result<DateTime<Utc>, ClientError>;
}

/// Upgrade manager state (scheduled plan and installed binaries).
pub trait UpgradeSource: Send + Sync {
    /// Currently scheduled upgrade. An empty name means none is scheduled.
    fn upgrade_plan(&self) -> Result<UpgradePlan, ClientError>;

    /// Upgrade binaries currently installed.
    fn upgrades(&self) -> Result<UpgradeBinarySet, ClientError>;
}
