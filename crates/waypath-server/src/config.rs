//! Configuration for the Waypath server
//!
//! Everything is read from environment variables by [`ServerConfig::load`].

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use tracing::{info, warn};
use waypath_core::{CoreConfig, ModerationConfig};
use waypath_monitoring::{LogFormat, MonitoringConfig};

use crate::error::{ServerError, ServerResult};

/// Principal created at startup with an initial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedAccount {
    /// Principal identifier
    pub principal: String,

    /// Tokens credited at startup
    pub balance: f64,
}

impl SeedAccount {
    fn new(principal: &str, balance: f64) -> Self {
        Self {
            principal: principal.to_string(),
            balance,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Moderation and pricing handed to the core
    #[serde(default)]
    pub core: CoreConfig,

    /// Accounts created at startup
    #[serde(default = "default_seed_accounts")]
    pub seed_accounts: Vec<SeedAccount>,

    /// Store the demo graphs at startup
    #[serde(default = "default_seed_demo_graphs")]
    pub seed_demo_graphs: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus scrape address
    #[serde(default)]
    pub metrics_listen: Option<SocketAddr>,

    /// Problems found while loading, logged by [`ServerConfig::log_warnings`]
    #[serde(skip)]
    pub warnings: Vec<String>,
}

fn default_seed_accounts() -> Vec<SeedAccount> {
    vec![
        SeedAccount::new("aldo", 200.0),
        SeedAccount::new("valeria", 200.0),
        SeedAccount::new("giacomo", 20.0),
    ]
}

fn default_seed_demo_graphs() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            seed_accounts: default_seed_accounts(),
            seed_demo_graphs: default_seed_demo_graphs(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_listen: None,
            warnings: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Invalid values fall back to their defaults and are recorded in
    /// `warnings`, since logging is usually not set up yet at this point.
    pub fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let alpha = lookup("WAYPATH_SMOOTHING_FACTOR").or_else(|| lookup("ALPHA"));
        if let Some(alpha) = alpha {
            match alpha.trim().parse::<f64>() {
                Ok(value) if value > 0.0 && value < 1.0 => {
                    config.core.moderation.smoothing_factor = value;
                }
                _ => config.warnings.push(format!(
                    "Invalid smoothing factor {}, using default {}",
                    alpha,
                    ModerationConfig::default().smoothing_factor
                )),
            }
        }

        if let Some(threshold) = lookup("WAYPATH_AUTO_APPLY_THRESHOLD") {
            match threshold.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value > 0.0 => {
                    config.core.moderation.auto_apply_threshold = value;
                }
                _ => config
                    .warnings
                    .push(format!("Invalid WAYPATH_AUTO_APPLY_THRESHOLD value: {}", threshold)),
            }
        }

        if let Some(rate) = lookup("WAYPATH_NODE_RATE") {
            match parse_rate(&rate) {
                Some(value) => config.core.pricing.node_rate = value,
                None => config
                    .warnings
                    .push(format!("Invalid WAYPATH_NODE_RATE value: {}", rate)),
            }
        }

        if let Some(rate) = lookup("WAYPATH_EDGE_RATE") {
            match parse_rate(&rate) {
                Some(value) => config.core.pricing.edge_rate = value,
                None => config
                    .warnings
                    .push(format!("Invalid WAYPATH_EDGE_RATE value: {}", rate)),
            }
        }

        if let Some(accounts) = lookup("WAYPATH_SEED_ACCOUNTS") {
            config.seed_accounts = parse_seed_accounts(&accounts, &mut config.warnings);
        }

        if let Some(enabled) = lookup("WAYPATH_SEED_DEMO_GRAPHS") {
            config.seed_demo_graphs = matches!(
                enabled.trim().to_lowercase().as_str(),
                "true" | "1" | "yes"
            );
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            match format.parse::<LogFormat>() {
                Ok(format) => config.log_format = format,
                Err(e) => config.warnings.push(e.to_string()),
            }
        }

        if let Some(addr) = lookup("WAYPATH_METRICS_ADDR") {
            match addr.trim().parse::<SocketAddr>() {
                Ok(addr) => config.metrics_listen = Some(addr),
                Err(_) => config
                    .warnings
                    .push(format!("Invalid WAYPATH_METRICS_ADDR value: {}", addr)),
            }
        }

        config
            .core
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        Ok(config)
    }

    /// Emit the loading warnings and a summary through the installed subscriber
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
        info!(
            warnings = self.warnings.len(),
            smoothing_factor = self.core.moderation.smoothing_factor,
            "Loaded server configuration"
        );
    }

    /// Monitoring settings derived from this configuration
    pub fn monitoring(&self) -> MonitoringConfig {
        MonitoringConfig {
            service_name: "waypath-server".to_string(),
            log_filter: self.log_level.clone(),
            log_format: self.log_format,
            enable_metrics: true,
            metrics_listen: self.metrics_listen,
        }
    }
}

fn parse_rate(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite() && *rate >= 0.0)
}

/// Parse `principal=balance,principal=balance`; malformed entries are skipped
fn parse_seed_accounts(value: &str, warnings: &mut Vec<String>) -> Vec<SeedAccount> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let parsed = entry.split_once('=').and_then(|(principal, balance)| {
                let principal = principal.trim();
                let balance = balance.trim().parse::<f64>().ok()?;
                (!principal.is_empty() && balance.is_finite() && balance >= 0.0)
                    .then(|| SeedAccount::new(principal, balance))
            });
            if parsed.is_none() {
                warnings.push(format!("Ignoring invalid WAYPATH_SEED_ACCOUNTS entry: {}", entry));
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ServerResult<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.core.moderation.smoothing_factor, 0.9);
        assert_eq!(config.seed_accounts.len(), 3);
        assert!(config.seed_demo_graphs);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("WAYPATH_SMOOTHING_FACTOR", "0.75"),
            ("WAYPATH_AUTO_APPLY_THRESHOLD", "0.2"),
            ("WAYPATH_NODE_RATE", "1"),
            ("WAYPATH_EDGE_RATE", "0"),
            ("WAYPATH_SEED_ACCOUNTS", "ops=10, dev=2.5"),
            ("WAYPATH_SEED_DEMO_GRAPHS", "false"),
            ("LOG_FORMAT", "json"),
            ("WAYPATH_METRICS_ADDR", "127.0.0.1:9000"),
        ])
        .unwrap();

        assert_eq!(config.core.moderation.smoothing_factor, 0.75);
        assert_eq!(config.core.moderation.auto_apply_threshold, 0.2);
        assert_eq!(config.core.pricing.node_rate, 1.0);
        assert_eq!(config.core.pricing.edge_rate, 0.0);
        assert_eq!(
            config.seed_accounts,
            vec![SeedAccount::new("ops", 10.0), SeedAccount::new("dev", 2.5)]
        );
        assert!(!config.seed_demo_graphs);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.metrics_listen, Some("127.0.0.1:9000".parse().unwrap()));
    }

    #[test]
    fn test_legacy_alpha_and_fallback() {
        let config = load(&[("ALPHA", "0.5")]).unwrap();
        assert_eq!(config.core.moderation.smoothing_factor, 0.5);

        // The explicit name wins over the legacy one
        let config = load(&[("ALPHA", "0.5"), ("WAYPATH_SMOOTHING_FACTOR", "0.6")]).unwrap();
        assert_eq!(config.core.moderation.smoothing_factor, 0.6);

        for bad in ["1", "0", "-0.2", "abc", "NaN"] {
            let config = load(&[("ALPHA", bad)]).unwrap();
            assert_eq!(config.core.moderation.smoothing_factor, 0.9, "ALPHA={bad}");
            assert_eq!(
                config.warnings,
                vec![format!("Invalid smoothing factor {bad}, using default 0.9")]
            );
        }
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let config = load(&[
            ("WAYPATH_AUTO_APPLY_THRESHOLD", "-1"),
            ("WAYPATH_NODE_RATE", "cheap"),
            ("WAYPATH_SEED_ACCOUNTS", "ok=1,broken,=3,neg=-2,nan=x"),
            ("LOG_FORMAT", "xml"),
        ])
        .unwrap();

        assert_eq!(config.core.moderation.auto_apply_threshold, 0.5);
        assert_eq!(config.core.pricing.node_rate, 0.10);
        assert_eq!(config.seed_accounts, vec![SeedAccount::new("ok", 1.0)]);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.warnings.len(), 7);
        assert!(config
            .warnings
            .contains(&"Ignoring invalid WAYPATH_SEED_ACCOUNTS entry: broken".to_string()));
    }

    #[test]
    fn test_empty_seed_accounts() {
        let config = load(&[("WAYPATH_SEED_ACCOUNTS", "")]).unwrap();
        assert!(config.seed_accounts.is_empty());
    }
}
