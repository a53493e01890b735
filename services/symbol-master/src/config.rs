//! Symbol master configuration

use anyhow::{Context, Result, bail};
use common::Px;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default BFO master location
pub const DEFAULT_SOURCE_URL: &str = "https://api.shoonya.com/BFO_symbols.txt.zip";

/// Prefix for environment overrides, e.g. `SYMBOL_MASTER_SOURCE_URL`
pub const ENV_PREFIX: &str = "SYMBOL_MASTER";

/// Symbol master configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolMasterConfig {
    /// Master file location
    pub source_url: String,

    /// Directory for the persisted snapshot
    pub cache_dir: PathBuf,

    /// Fetch regardless of cached freshness
    pub hard_refresh: bool,

    /// HTTP timeout for the master download
    pub request_timeout_secs: u64,

    /// Strike step used when an option group has fewer than two strikes
    pub default_strike_step: f64,
}

impl Default for SymbolMasterConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            cache_dir: PathBuf::from("./data/symbol_master"),
            hard_refresh: false,
            request_timeout_secs: 30,
            default_strike_step: 1.0,
        }
    }
}

impl SymbolMasterConfig {
    /// Load configuration from an optional file plus `SYMBOL_MASTER_*`
    /// environment variables; anything unset keeps its default.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to build symbol master configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Invalid symbol master configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no store can work with
    pub fn validate(&self) -> Result<()> {
        if !self.default_strike_step.is_finite() || !self.strike_step_default().is_positive() {
            bail!(
                "default_strike_step must be a positive price, got {}",
                self.default_strike_step
            );
        }
        Ok(())
    }

    /// HTTP timeout as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Fallback strike step on the fixed-point scale
    #[must_use]
    pub fn strike_step_default(&self) -> Px {
        Px::new(self.default_strike_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SymbolMasterConfig::default();
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
        assert!(!config.hard_refresh);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.strike_step_default(), Px::from_units(1));
    }

    #[test]
    fn test_file_overrides_keep_other_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("symbol_master.toml");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "source_url = \"http://localhost:9/BFO.zip\"")?;
        writeln!(file, "hard_refresh = true")?;
        writeln!(file, "default_strike_step = 100.0")?;
        drop(file);

        let path_str = path.to_str().context("utf-8 path")?;
        let config = SymbolMasterConfig::load(Some(path_str))?;
        assert_eq!(config.source_url, "http://localhost:9/BFO.zip");
        assert!(config.hard_refresh);
        assert_eq!(config.strike_step_default(), Px::from_units(100));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.cache_dir, PathBuf::from("./data/symbol_master"));
        Ok(())
    }

    #[test]
    fn test_rejects_non_positive_strike_step() {
        for step in [0.0, -5.0, f64::NAN, f64::INFINITY, 0.00001] {
            let config = SymbolMasterConfig {
                default_strike_step: step,
                ..SymbolMasterConfig::default()
            };
            assert!(config.validate().is_err(), "accepted step {step}");
        }
        assert!(SymbolMasterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_rejects_zero_strike_step_in_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("symbol_master.toml");
        std::fs::write(&path, "default_strike_step = 0.0\n")?;

        let path_str = path.to_str().context("utf-8 path")?;
        let err = SymbolMasterConfig::load(Some(path_str)).unwrap_err();
        assert!(err.to_string().contains("default_strike_step"), "{err}");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(SymbolMasterConfig::load(Some("/definitely/not/here/symbol_master")).is_err());
    }
}
