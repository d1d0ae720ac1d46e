//! Monitoring setup for Waypath.
//!
//! Installs the global tracing subscriber and describes the metrics the core
//! emits. Recording itself happens through the `tracing` and `metrics` macros
//! at the call sites; this crate only decides where the output goes.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

pub mod logging;
pub mod metrics;

/// Output format of the log layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Unrecognised log format name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log format '{0}', expected 'pretty' or 'json'")]
pub struct UnknownLogFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(UnknownLogFormat(other.to_string())),
        }
    }
}

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,waypath_core=debug"), used when RUST_LOG is unset
    pub log_filter: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Describe metrics and, with the `prometheus` feature, export them
    pub enable_metrics: bool,
    /// Scrape endpoint for the Prometheus exporter
    pub metrics_listen: Option<SocketAddr>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "waypath".to_string(),
            log_filter: "info".to_string(),
            log_format: LogFormat::Pretty,
            enable_metrics: true,
            metrics_listen: None,
        }
    }
}

static INITIALIZED: OnceCell<MonitoringConfig> = OnceCell::new();

/// Initialize monitoring system
///
/// Only the first call installs anything; later calls return `Ok` without
/// touching the global subscriber.
pub fn init(config: MonitoringConfig) -> anyhow::Result<()> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    logging::init_logging(&config)?;

    if config.enable_metrics {
        metrics::describe_metrics();
        if let Some(addr) = config.metrics_listen {
            metrics::install_exporter(addr)?;
        }
    }

    info!(
        service_name = %config.service_name,
        metrics = config.enable_metrics,
        "Monitoring initialized"
    );
    let _ = INITIALIZED.set(config);
    Ok(())
}

/// Whether [`init`] has completed
pub fn is_initialized() -> bool {
    INITIALIZED.get().is_some()
}

/// Shutdown the monitoring system
pub fn shutdown() {
    info!("Shutting down monitoring system");
}
