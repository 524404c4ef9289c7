//! Configuration - Type-safe, validated engine config
//!
//! Loads from `config.toml` at the project root. Every field has a default,
//! so an empty file yields the stock 99.7% / 0.3% split on 86400-second days.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::{Amount, Error, Result};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rent split between lister and platform
    #[serde(default)]
    pub fees: FeeConfig,

    /// Length of one rental day in clock seconds
    #[serde(default = "default_seconds_per_day")]
    pub seconds_per_day: u64,

    /// Ledger token decimals, used only to format amounts for humans
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,
}

/// Lister share of rent as `lister_share / denominator`; the platform keeps the rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_lister_share")]
    pub lister_share: u64,
    #[serde(default = "default_denominator")]
    pub denominator: u64,
}

impl FeeConfig {
    pub fn lister_share(&self) -> Amount {
        Amount::from(self.lister_share)
    }

    pub fn denominator(&self) -> Amount {
        Amount::from(self.denominator)
    }
}

fn default_seconds_per_day() -> u64 {
    86_400
}
fn default_token_decimals() -> u32 {
    18
}
fn default_lister_share() -> u64 {
    997
}
fn default_denominator() -> u64 {
    1000
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            lister_share: default_lister_share(),
            denominator: default_denominator(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fees: FeeConfig::default(),
            seconds_per_day: default_seconds_per_day(),
            token_decimals: default_token_decimals(),
        }
    }
}

impl EngineConfig {
    /// Load from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location (project root config.toml)
    pub fn load_default() -> Self {
        let candidates = [
            "config.toml",
            concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml"),
        ];

        for path in &candidates {
            match Self::load(Path::new(path)) {
                Ok(cfg) => {
                    tracing::info!("Loaded config from {}", path);
                    return cfg;
                }
                Err(e) => tracing::debug!("Skipping {}: {}", path, e),
            }
        }

        tracing::warn!("No config.toml found, using defaults");
        Self::default()
    }

    /// Reject configs that would break fee or term arithmetic
    pub fn validate(&self) -> Result<()> {
        if self.fees.denominator == 0 {
            return Err(Error::Config("fees.denominator must be positive".into()));
        }
        if self.fees.lister_share > self.fees.denominator {
            return Err(Error::Config(format!(
                "fees.lister_share {} exceeds denominator {}",
                self.fees.lister_share, self.fees.denominator
            )));
        }
        if self.seconds_per_day == 0 {
            return Err(Error::Config("seconds_per_day must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg = EngineConfig::from_toml("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.fees.lister_share, 997);
        assert_eq!(cfg.seconds_per_day, 86_400);
    }

    #[test]
    fn test_partial_override() {
        let toml = "seconds_per_day = 60\n[fees]\nlister_share = 990\n";
        let cfg = EngineConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.seconds_per_day, 60);
        assert_eq!(cfg.fees.lister_share, 990);
        assert_eq!(cfg.fees.denominator, 1000);
    }

    #[test]
    fn test_invalid_share_rejected() {
        let err = EngineConfig::from_toml("[fees]\nlister_share = 1001\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = EngineConfig::from_toml("seconds_per_day = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = EngineConfig::from_toml("fees = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
