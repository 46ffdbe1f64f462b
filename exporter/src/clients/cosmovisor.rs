//! Cosmovisor as an upgrade source.
//!
//! The scheduled plan is what the chain itself reports, obtained through
//! the node binary wrapped by Cosmovisor:
//!
//! ```text
//! DAEMON_NAME=<daemon> DAEMON_HOME=<chain_home> \
//!     cosmovisor run query upgrade plan --output json
//! ```
//!
//! `data/upgrade-info.json` is not used: the node only writes it when it
//! halts at the upgrade height, and it keeps describing that upgrade after
//! it has been applied.
//!
//! Installed binaries are read from disk:
//!
//! ```text
//! <cosmovisor_home>/upgrades/<name>/bin/<daemon>
//! ```
//!
//! `<name>` is the lowercased, query-escaped plan name (see
//! [`crate::types::normalize_upgrade_name`]).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use crate::clients::{ClientError, UpgradeSource};
use crate::config::CosmovisorConfig;
use crate::types::{UpgradeBinarySet, UpgradePlan};

const DEFAULT_COSMOVISOR_BINARY: &str = "cosmovisor";
const NO_UPGRADE_SCHEDULED: &str = "no upgrade scheduled";

pub struct Cosmovisor {
    cosmovisor_path: PathBuf,
    chain_home: PathBuf,
    cosmovisor_home: PathBuf,
    daemon_name: String,
}

impl Cosmovisor {
    pub fn new(
        chain_home: impl Into<PathBuf>,
        cosmovisor_home: impl Into<PathBuf>,
        daemon_name: impl Into<String>,
    ) -> Self {
        Self {
            cosmovisor_path: PathBuf::from(DEFAULT_COSMOVISOR_BINARY),
            chain_home: chain_home.into(),
            cosmovisor_home: cosmovisor_home.into(),
            daemon_name: daemon_name.into(),
        }
    }

    /// Overrides the `cosmovisor` executable used to query the plan.
    pub fn with_binary(mut self, cosmovisor_path: impl Into<PathBuf>) -> Self {
        self.cosmovisor_path = cosmovisor_path.into();
        self
    }

    pub fn from_config(cfg: &CosmovisorConfig) -> Self {
        Self::new(
            cfg.chain_home.clone(),
            cfg.cosmovisor_home(),
            cfg.daemon_name.clone(),
        )
        .with_binary(cfg.cosmovisor_path.clone())
    }

    fn upgrades_dir(&self) -> PathBuf {
        self.cosmovisor_home.join("upgrades")
    }

    fn has_binary(&self, upgrade_dir: &Path) -> bool {
        upgrade_dir.join("bin").join(&self.daemon_name).is_file()
    }
}

/// Interprets the output of `query upgrade plan --output json`.
///
/// Older SDKs print the plan itself, newer ones wrap it as `{"plan": ...}`
/// (with `null` or `{}` when nothing is scheduled). Cosmovisor may print
/// log lines around the JSON document.
fn parse_plan_output(stdout: &str) -> Result<UpgradePlan, ClientError> {
    let (start, end) = match (stdout.find('{'), stdout.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(ClientError::Protocol(format!(
                "no JSON object in upgrade plan output: {:?}",
                stdout.trim()
            )));
        }
    };

    let malformed = |e: serde_json::Error| {
        ClientError::Protocol(format!("malformed upgrade plan output: {e}"))
    };

    let mut doc: Value = serde_json::from_str(&stdout[start..=end]).map_err(malformed)?;
    let plan = match doc.get_mut("plan").map(Value::take) {
        Some(plan) => plan,
        None => doc,
    };
    if plan.is_null() {
        return Ok(UpgradePlan::default());
    }
    serde_json::from_value(plan).map_err(malformed)
}

impl UpgradeSource for Cosmovisor {
    fn upgrade_plan(&self) -> Result<UpgradePlan, ClientError> {
        let output = Command::new(&self.cosmovisor_path)
            .args(["run", "query", "upgrade", "plan", "--output", "json"])
            .env("DAEMON_NAME", &self.daemon_name)
            .env("DAEMON_HOME", &self.chain_home)
            .output()
            .map_err(|e| ClientError::io(&self.cosmovisor_path, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Older SDKs report an empty schedule as a failing query.
        if stdout.contains(NO_UPGRADE_SCHEDULED) || stderr.contains(NO_UPGRADE_SCHEDULED) {
            return Ok(UpgradePlan::default());
        }

        if !output.status.success() {
            return Err(ClientError::Protocol(format!(
                "{} exited with {}: {}",
                self.cosmovisor_path.display(),
                output.status,
                stderr.trim()
            )));
        }

        parse_plan_output(&stdout)
    }

    fn upgrades(&self) -> Result<UpgradeBinarySet, ClientError> {
        let dir = self.upgrades_dir();
        let entries = fs::read_dir(&dir).map_err(|e| ClientError::io(&dir, e))?;

        let mut set = UpgradeBinarySet::new();
        for entry in entries {
            let entry = entry.map_err(|e| ClientError::io(&dir, e))?;
            let path = entry.path();
            if !path.is_dir() || !self.has_binary(&path) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                set.insert(name);
            }
        }

        Ok(set)
    }
}
