//! Command-line interface of the gateway.
//!
//! The CLI only locates the TOML config and allows a couple of overrides;
//! everything else lives in `exporter::ExporterConfig`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use exporter::{ConfigError, ExporterConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Prometheus exporter for Cosmos SDK nodes", long_about = None)]
pub struct Cli {
    #[arg(
        long,
        value_name = "path",
        env = "COSMOS_EXPORTER_CONFIG",
        help = "Path to the TOML config file (defaults are used when omitted)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "addr",
        env = "COSMOS_EXPORTER_LISTEN_ADDR",
        help = "Override the address to serve /metrics on"
    )]
    pub listen_addr: Option<SocketAddr>,

    #[arg(long, help = "Collect once, print the metrics and exit")]
    pub oneshot: bool,
}

impl Cli {
    /// Loads the config file (if any) and applies CLI overrides.
    pub fn load_config(&self) -> Result<ExporterConfig, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => ExporterConfig::load(path)?,
            None => ExporterConfig::default(),
        };
        if let Some(addr) = self.listen_addr {
            cfg.listen_addr = addr;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
