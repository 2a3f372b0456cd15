//! Breaker configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CoreError;
use crate::types::BPS_DENOMINATOR;

/// Full configuration for a Sluice breaker deployment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BreakerConfig {
    /// Window, tick and cooldown settings.
    #[serde(default)]
    pub window: WindowConfig,

    /// Settlement strategy settings.
    #[serde(default)]
    pub settlement: SettlementConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Assets registered at startup.
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Length of the rolling withdrawal window, in seconds.
    #[serde(default = "default_period")]
    pub period_secs: u64,
    /// Bucket width used to coalesce deltas, in seconds.
    #[serde(default = "default_tick_length")]
    pub tick_length_secs: u64,
    /// Wait after a breach before anyone may clear the latch, in seconds.
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Minimum delay before a diverted outflow can be released, in seconds.
    #[serde(default = "default_delay")]
    pub delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Asset identifier.
    pub id: String,
    /// Minimum retained liquidity, in bps.
    pub min_retained_bps: u32,
    /// Settled liquidity required before the limit is enforced.
    #[serde(default)]
    pub begin_threshold: u64,
    /// Settlement strategy id ("delayed" or "reject").
    #[serde(default = "default_strategy")]
    pub settlement: String,
}

// Default value functions
fn default_period() -> u64 {
    4 * 60 * 60
}
fn default_tick_length() -> u64 {
    5 * 60
}
fn default_cooldown() -> u64 {
    3 * 24 * 60 * 60
}
fn default_delay() -> u64 {
    24 * 60 * 60
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_strategy() -> String {
    "delayed".into()
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period(),
            tick_length_secs: default_tick_length(),
            cooldown_secs: default_cooldown(),
        }
    }
}

impl WindowConfig {
    /// Reject window definitions the ledger cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.tick_length_secs == 0 {
            return Err(CoreError::InvalidConfig("tick_length_secs must be > 0".into()));
        }
        if self.period_secs < self.tick_length_secs {
            return Err(CoreError::InvalidConfig(format!(
                "period_secs ({}) must be at least tick_length_secs ({})",
                self.period_secs, self.tick_length_secs
            )));
        }
        Ok(())
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl BreakerConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: BreakerConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate the window and every asset entry.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.window.validate()?;
        for asset in &self.assets {
            if asset.min_retained_bps == 0 || asset.min_retained_bps > BPS_DENOMINATOR {
                return Err(CoreError::InvalidConfig(format!(
                    "asset {}: min_retained_bps {} out of range",
                    asset.id, asset.min_retained_bps
                )));
            }
            if self.assets.iter().filter(|a| a.id == asset.id).count() > 1 {
                return Err(CoreError::InvalidConfig(format!(
                    "asset {} listed more than once",
                    asset.id
                )));
            }
        }
        Ok(())
    }
}
