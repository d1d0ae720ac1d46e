//! Runtime configuration for the core services
//!
//! Configuration is constructed once by the process entry point and handed to
//! [`RuntimeInterface::create_with_repositories`](crate::RuntimeInterface::create_with_repositories).
//! Nothing in the core reads the environment on its own.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Weight moderation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// EMA smoothing factor applied to the existing weight, in (0, 1)
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f64,

    /// Largest relative deviation that is applied without review
    #[serde(default = "default_auto_apply_threshold")]
    pub auto_apply_threshold: f64,
}

fn default_smoothing_factor() -> f64 {
    0.9
}

fn default_auto_apply_threshold() -> f64 {
    0.5
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: default_smoothing_factor(),
            auto_apply_threshold: default_auto_apply_threshold(),
        }
    }
}

impl ModerationConfig {
    /// Create a validated moderation config
    pub fn new(smoothing_factor: f64, auto_apply_threshold: f64) -> Result<Self, CoreError> {
        let config = Self {
            smoothing_factor,
            auto_apply_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the smoothing factor lies in (0, 1) and the threshold is positive
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor < 1.0) {
            return Err(CoreError::ConfigurationError(format!(
                "smoothing factor must be in (0, 1), got {}",
                self.smoothing_factor
            )));
        }
        if !(self.auto_apply_threshold.is_finite() && self.auto_apply_threshold > 0.0) {
            return Err(CoreError::ConfigurationError(format!(
                "auto-apply threshold must be a positive number, got {}",
                self.auto_apply_threshold
            )));
        }
        Ok(())
    }
}

/// Token pricing rates used by the cost model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Tokens charged per source node
    #[serde(default = "default_node_rate")]
    pub node_rate: f64,

    /// Tokens charged per edge
    #[serde(default = "default_edge_rate")]
    pub edge_rate: f64,
}

fn default_node_rate() -> f64 {
    0.10
}

fn default_edge_rate() -> f64 {
    0.02
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            node_rate: default_node_rate(),
            edge_rate: default_edge_rate(),
        }
    }
}

impl PricingConfig {
    /// Rates must be finite and non-negative
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, rate) in [("node", self.node_rate), ("edge", self.edge_rate)] {
            if !(rate.is_finite() && rate >= 0.0) {
                return Err(CoreError::ConfigurationError(format!(
                    "{} rate must be a non-negative number, got {}",
                    name, rate
                )));
            }
        }
        Ok(())
    }
}

/// Complete core configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Weight moderation
    #[serde(default)]
    pub moderation: ModerationConfig,

    /// Cost model rates
    #[serde(default)]
    pub pricing: PricingConfig,
}

impl CoreConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), CoreError> {
        self.moderation.validate()?;
        self.pricing.validate()
    }
}
