//! Top-level configuration for the exporter.
//!
//! This module aggregates configuration for:
//!
//! - the Tendermint RPC client (`TendermintConfig`),
//! - the Cosmovisor state reader (`CosmovisorConfig`),
//! - logging (`LogConfig`),
//! - the HTTP listen address and per-scrape deadline.
//!
//! A missing `[tendermint]` or `[cosmovisor]` section disables the
//! collectors that depend on it. Everything else falls back to defaults,
//! so an empty file is a valid configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for the Tendermint RPC client.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TendermintConfig {
    /// Base URL of the RPC, e.g. `"http://127.0.0.1:26657"`.
    pub address: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
    /// Number of recent blocks used to compute the average block time.
    pub block_window: u64,
}

impl TendermintConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TendermintConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:26657".to_string(),
            timeout_secs: 5,
            block_window: 1000,
        }
    }
}

/// How to reach Cosmovisor: its binary for the scheduled plan, and its
/// directories for installed upgrades.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CosmovisorConfig {
    /// `cosmovisor` executable, resolved through `PATH` when relative.
    #[serde(default = "default_cosmovisor_path")]
    pub cosmovisor_path: PathBuf,
    /// Node home (`DAEMON_HOME`).
    pub chain_home: PathBuf,
    /// Cosmovisor root, holding `upgrades/`. Defaults to
    /// `<chain_home>/cosmovisor`.
    #[serde(default)]
    pub cosmovisor_home: Option<PathBuf>,
    /// Node binary name (`DAEMON_NAME`), e.g. `"gaiad"`.
    pub daemon_name: String,
}

fn default_cosmovisor_path() -> PathBuf {
    PathBuf::from("cosmovisor")
}

impl CosmovisorConfig {
    pub fn cosmovisor_home(&self) -> PathBuf {
        self.cosmovisor_home
            .clone()
            .unwrap_or_else(|| self.chain_home.join("cosmovisor"))
    }
}

/// Logging configuration. `RUST_LOG`, when set, takes precedence over
/// `level`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info,exporter=info,gateway=info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration for the exporter process.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExporterConfig {
    /// Address to bind the `/metrics` HTTP server to.
    pub listen_addr: SocketAddr,
    /// Deadline for a whole collection cycle, in seconds.
    pub collect_timeout_secs: u64,
    pub tendermint: Option<TendermintConfig>,
    pub cosmovisor: Option<CosmovisorConfig>,
    pub log: LogConfig,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9500)),
            collect_timeout_secs: 10,
            tendermint: None,
            cosmovisor: None,
            log: LogConfig::default(),
        }
    }
}

impl ExporterConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: ExporterConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_secs(self.collect_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "collect_timeout_secs must be positive".to_string(),
            ));
        }
        if let Some(tm) = &self.tendermint {
            if tm.address.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "tendermint.address must not be empty".to_string(),
                ));
            }
            if tm.block_window == 0 {
                return Err(ConfigError::Invalid(
                    "tendermint.block_window must be positive".to_string(),
                ));
            }
        }
        if let Some(cv) = &self.cosmovisor {
            if cv.daemon_name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "cosmovisor.daemon_name must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
