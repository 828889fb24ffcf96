//! Configuration for the settlement engine

use serde::{Deserialize, Serialize};

/// Settlement engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Netting configuration
    pub netting: NettingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "settlement".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            netting: NettingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Netting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NettingConfig {
    /// Decimal places of the currency minor unit. Must match the scale the
    /// ledger quantizes amounts to (`ledger_core::MINOR_UNIT_SCALE`).
    pub minor_unit_scale: u32,

    /// Replay every computed payment list against the initial balances
    /// before returning it
    pub verify_postconditions: bool,
}

impl Default for NettingConfig {
    fn default() -> Self {
        Self {
            minor_unit_scale: ledger_core::MINOR_UNIT_SCALE,
            verify_postconditions: true,
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Record Prometheus metrics
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(name) = std::env::var("SETTLEMENT_SERVICE_NAME") {
            config.service_name = name;
        }

        if let Ok(scale) = std::env::var("SETTLEMENT_MINOR_UNIT_SCALE") {
            config.netting.minor_unit_scale = scale.parse().map_err(|e| {
                crate::Error::Config(format!("SETTLEMENT_MINOR_UNIT_SCALE: {}", e))
            })?;
        }

        if let Ok(verify) = std::env::var("SETTLEMENT_VERIFY_POSTCONDITIONS") {
            config.netting.verify_postconditions = parse_flag(&verify)?;
        }

        if let Ok(enabled) = std::env::var("SETTLEMENT_METRICS_ENABLED") {
            config.metrics.enabled = parse_flag(&enabled)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> crate::Result<()> {
        if self.netting.minor_unit_scale != ledger_core::MINOR_UNIT_SCALE {
            return Err(crate::Error::Config(format!(
                "minor_unit_scale {} differs from the ledger minor unit scale {}",
                self.netting.minor_unit_scale,
                ledger_core::MINOR_UNIT_SCALE
            )));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(crate::Error::Config(format!("invalid flag value: {}", other))),
    }
}
