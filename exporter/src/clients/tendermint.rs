//! HTTP client for the Tendermint / CometBFT JSON RPC.
//!
//! Only two endpoints are used:
//!
//! ```json
//! GET /status
//! {
//!   "result": {
//!     "node_info": { "moniker": "...", "network": "cosmoshub-4", "version": "0.37.2" },
//!     "sync_info": {
//!       "latest_block_height": "18400000",
//!       "latest_block_time": "2024-01-01T00:00:00.123456789Z",
//!       "catching_up": false
//!     },
//!     "validator_info": { "voting_power": "12345" }
//!   }
//! }
//!
//! GET /block?height=N
//! { "result": { "block": { "header": { "height": "N", "time": "..." } } } }
//! ```

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::clients::{ClientError, NodeRpc};
use crate::config::TendermintConfig;
use crate::context::CollectContext;
use crate::types::NodeStatus;

/// Blocking Tendermint RPC client.
///
/// Thread-safe and cheap to share behind an `Arc`; the underlying `reqwest`
/// client pools connections.
pub struct TendermintRpc {
    base_url: String,
    client: Client,
    // Per-request ceiling; a cycle deadline can only shorten it.
    timeout: Option<Duration>,
    block_window: i64,
}

impl TendermintRpc {
    /// Constructs a client pointing at `base_url`, e.g.
    /// `"http://127.0.0.1:26657"`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        block_window: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            timeout: Some(timeout),
            ..Self::with_client(base_url, client, block_window)
        })
    }

    /// Uses a preconfigured `reqwest` client (proxy, TLS, default timeout).
    pub fn with_client(base_url: impl Into<String>, client: Client, block_window: u64) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            timeout: None,
            block_window: i64::try_from(block_window.max(1)).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(cfg: &TendermintConfig) -> Result<Self, ClientError> {
        Self::new(cfg.address.clone(), cfg.timeout(), cfg.block_window)
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Option<Duration>,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path);

        let timeout = match (self.timeout, timeout) {
            (Some(ceiling), Some(left)) => Some(ceiling.min(left)),
            (ceiling, left) => ceiling.or(left),
        };

        let mut request = self.client.get(&url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let resp = request
            .send()
            .map_err(|e| ClientError::Transport(format!("HTTP GET {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }

        resp.json::<T>()
            .map_err(|e| ClientError::Protocol(format!("failed to parse JSON from {url}: {e}")))
    }

    fn fetch_status(&self, timeout: Option<Duration>) -> Result<StatusResult, ClientError> {
        let resp: RpcResponse<StatusResult> = self.get_json("/status", timeout)?;
        Ok(resp.result)
    }

    fn block_time(
        &self,
        height: i64,
        timeout: Option<Duration>,
    ) -> Result<DateTime<Utc>, ClientError> {
        let resp: RpcResponse<BlockResult> =
            self.get_json(&format!("/block?height={height}"), timeout)?;
        Ok(resp.result.block.header.time)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    node_info: NodeInfo,
    sync_info: SyncInfo,
    validator_info: ValidatorInfo,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    moniker: String,
    network: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    latest_block_height: String,
    latest_block_time: DateTime<Utc>,
    catching_up: bool,
}

#[derive(Debug, Deserialize)]
struct ValidatorInfo {
    voting_power: String,
}

#[derive(Debug, Deserialize)]
struct BlockResult {
    block: Block,
}

#[derive(Debug, Deserialize)]
struct Block {
    header: BlockHeader,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    time: DateTime<Utc>,
}

impl StatusResult {
    fn latest_height(&self) -> Result<i64, ClientError> {
        self.sync_info
            .latest_block_height
            .parse::<i64>()
            .map_err(|e| {
                ClientError::Protocol(format!(
                    "latest_block_height {:?} is not an integer: {e}",
                    self.sync_info.latest_block_height
                ))
            })
    }

    fn into_node_status(self) -> Result<NodeStatus, ClientError> {
        let latest_block_height = self.latest_height()?;
        Ok(NodeStatus {
            catching_up: self.sync_info.catching_up,
            latest_block_height,
            latest_block_time: self.sync_info.latest_block_time,
            moniker: self.node_info.moniker,
            network_id: self.node_info.network,
            software_version: self.node_info.version,
            voting_power: self.validator_info.voting_power,
        })
    }
}

/// Extrapolates the time of `target_height` from two observed blocks.
///
/// The average block time over `[earlier_height, latest_height]` is applied
/// to the remaining distance from the latest block.
pub fn estimate_block_time(
    latest_height: i64,
    latest_time: DateTime<Utc>,
    earlier_height: i64,
    earlier_time: DateTime<Utc>,
    target_height: i64,
) -> Result<DateTime<Utc>, ClientError> {
    if target_height <= latest_height {
        return Err(ClientError::Protocol(format!(
            "target height {target_height} is not above latest height {latest_height}"
        )));
    }

    let blocks = latest_height - earlier_height;
    if blocks <= 0 {
        return Err(ClientError::Protocol(format!(
            "cannot compute average block time over {blocks} blocks"
        )));
    }

    let elapsed_ms = (latest_time - earlier_time).num_milliseconds() as f64;
    let avg_block_ms = elapsed_ms / blocks as f64;
    let remaining_ms = avg_block_ms * (target_height - latest_height) as f64;

    TimeDelta::try_milliseconds(remaining_ms.round() as i64)
        .and_then(|delta| latest_time.checked_add_signed(delta))
        .ok_or_else(|| {
            ClientError::Protocol(format!(
                "estimated time for height {target_height} is out of range"
            ))
        })
}

impl NodeRpc for TendermintRpc {
    fn status(&self, ctx: &CollectContext) -> Result<NodeStatus, ClientError> {
        self.fetch_status(ctx.remaining())?.into_node_status()
    }

    fn estimate_time_at_height(
        &self,
        ctx: &CollectContext,
        height: i64,
    ) -> Result<DateTime<Utc>, ClientError> {
        ctx.check()?;
        let status = self.fetch_status(ctx.remaining())?;
        let latest_height = status.latest_height()?;
        let latest_time = status.sync_info.latest_block_time;

        let earlier_height = (latest_height - self.block_window).max(1);
        ctx.check()?;
        let earlier_time = self.block_time(earlier_height, ctx.remaining())?;

        estimate_block_time(
            latest_height,
            latest_time,
            earlier_height,
            earlier_time,
            height,
        )
    }
}
