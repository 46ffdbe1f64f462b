//! Exporter library crate.
//!
//! This crate provides the building blocks of a Prometheus exporter for
//! Cosmos SDK nodes:
//!
//! - domain types shared by every layer (`types`),
//! - clients for the node RPC and Cosmovisor state (`clients`),
//! - collectors that turn client responses into metric samples
//!   (`collectors`),
//! - Prometheus text exposition (`metrics`),
//! - the per-cycle deadline (`context`),
//! - and the top-level exporter configuration (`config`).
//!
//! Binaries build collectors with [`collectors::from_config`], run them
//! once per scrape with [`collectors::collect_all`] and render the result
//! with [`metrics::render`].

pub mod clients;
pub mod collectors;
pub mod config;
pub mod context;
pub mod metrics;
pub mod types;

// Re-export top-level configuration types.
pub use config::{ConfigError, CosmovisorConfig, ExporterConfig, LogConfig, TendermintConfig};

// Re-export client interfaces and implementations.
pub use clients::{ClientError, Cosmovisor, NodeRpc, TendermintRpc, UpgradeSource};

// Re-export collectors and the cycle plumbing.
pub use collectors::{
    CollectionResult, Collector, CollectorReport, NodeStatsCollector, QueryLedger,
    UpgradeCollector, collect_all,
};
pub use context::CollectContext;

// Re-export exposition.
pub use metrics::{MetricsError, MetricsRegistry, render};

// Re-export domain types at the crate root for convenience.
pub use types::*;
