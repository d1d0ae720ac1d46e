//! Structured logging using tracing.
//!
//! Pretty output for development, JSON for log aggregation.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{LogFormat, MonitoringConfig};

/// Filter from RUST_LOG, falling back to the configured directive
pub fn env_filter(config: &MonitoringConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

/// Initialize structured logging
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    match config.log_format {
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);
            tracing::subscriber::set_global_default(registry.with(json_layer))
                .context("Failed to set global default subscriber")?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);
            tracing::subscriber::set_global_default(registry.with(fmt_layer))
                .context("Failed to set global default subscriber")?;
        }
    }

    info!(
        service_name = %config.service_name,
        log_format = ?config.log_format,
        "Logging initialized"
    );
    Ok(())
}
