//! Layered configuration: strategy/instrument parameters from YAML, the
//! refresh token from the environment. Mirrors the teacher's own
//! `BotConfig::load`/`validate` split between file-configured knobs and
//! environment-sourced secrets.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variable carrying the long-lived refresh credential.
pub const BKS_TOKEN_ENV: &str = "BKS_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentConfig {
    pub ticker: String,
    pub class_code: String,
    /// Depth requested on the order-book subscription.
    #[serde(default = "default_depth")]
    pub depth: u32,
}

fn default_depth() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Target quoted spread around the skewed center price.
    pub spread: f64,
    /// Base order size before inventory scaling.
    pub base_size: u64,
    /// Absolute inventory at which a side is fully suppressed.
    pub inventory_limit: i64,
    /// Skew coefficient applied to inventory when computing the center price.
    pub inventory_k: f64,
    /// Minimum price delta before an edit is issued instead of being
    /// suppressed by hysteresis.
    #[serde(default = "default_min_edit_delta")]
    pub min_edit_delta: f64,
    /// Tick size used to quantize prices before transmission.
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
}

fn default_min_edit_delta() -> f64 {
    0.10
}

fn default_tick_size() -> f64 {
    0.01
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Pacing floor between order-manager reconciliation passes, seconds.
    #[serde(default = "default_reconciliation_pacing_secs")]
    pub reconciliation_pacing_secs: u64,
    /// Forced per-order status refresh period, seconds.
    #[serde(default = "default_forced_refresh_secs")]
    pub forced_refresh_secs: u64,
    /// Inventory polling period, seconds.
    #[serde(default = "default_inventory_poll_secs")]
    pub inventory_poll_secs: u64,
    /// REST request timeout, seconds.
    #[serde(default = "default_rest_timeout_secs")]
    pub rest_timeout_secs: u64,
}

fn default_reconciliation_pacing_secs() -> u64 {
    5
}

fn default_forced_refresh_secs() -> u64 {
    10
}

fn default_inventory_poll_secs() -> u64 {
    5
}

fn default_rest_timeout_secs() -> u64 {
    10
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reconciliation_pacing_secs: default_reconciliation_pacing_secs(),
            forced_refresh_secs: default_forced_refresh_secs(),
            inventory_poll_secs: default_inventory_poll_secs(),
            rest_timeout_secs: default_rest_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub instrument: InstrumentConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Resolved at load time from `BKS_TOKEN`, never read from YAML.
    #[serde(skip)]
    pub refresh_token: String,
}

impl EngineConfig {
    /// Load strategy/instrument parameters from a YAML file and the
    /// refresh token from the environment, then validate the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileError {
            path: path.display().to_string(),
            source,
        })?;

        let mut config: EngineConfig = serde_yaml::from_str(&contents)?;
        config.refresh_token = std::env::var(BKS_TOKEN_ENV)
            .map_err(|_| ConfigError::EnvVarMissing(BKS_TOKEN_ENV.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.strategy.spread <= 0.0 {
            return Err(ConfigError::ValidationError(
                "strategy.spread must be positive".into(),
            ));
        }
        if self.strategy.base_size == 0 {
            return Err(ConfigError::ValidationError(
                "strategy.base_size must be at least 1".into(),
            ));
        }
        if self.strategy.inventory_limit <= 0 {
            return Err(ConfigError::ValidationError(
                "strategy.inventory_limit must be positive".into(),
            ));
        }
        if self.strategy.min_edit_delta < 0.0 {
            return Err(ConfigError::ValidationError(
                "strategy.min_edit_delta must be non-negative".into(),
            ));
        }
        if self.strategy.tick_size <= 0.0 {
            return Err(ConfigError::ValidationError(
                "strategy.tick_size must be positive".into(),
            ));
        }
        if self.instrument.depth == 0 {
            return Err(ConfigError::ValidationError(
                "instrument.depth must be at least 1".into(),
            ));
        }
        if self.refresh_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "refresh token must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
instrument:
  ticker: SBER
  class_code: TQBR
  depth: 10
strategy:
  spread: 0.30
  base_size: 1
  inventory_limit: 5
  inventory_k: 0.1
"#
    }

    #[test]
    fn load_applies_defaults_and_reads_token() {
        std::env::set_var(BKS_TOKEN_ENV, "test-refresh-token");
        let dir = std::env::temp_dir().join(format!("bks-mm-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, sample_yaml()).unwrap();

        let config = EngineConfig::load(&path).expect("config should load");
        assert_eq!(config.instrument.ticker, "SBER");
        assert_eq!(config.strategy.min_edit_delta, 0.10);
        assert_eq!(config.timing.forced_refresh_secs, 10);
        assert_eq!(config.refresh_token, "test-refresh-token");

        std::fs::remove_dir_all(&dir).ok();
        std::env::remove_var(BKS_TOKEN_ENV);
    }

    #[test]
    fn validate_rejects_non_positive_spread() {
        let mut config: EngineConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        config.refresh_token = "x".into();
        config.strategy.spread = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_refresh_token() {
        let mut config: EngineConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        config.refresh_token = "".into();
        assert!(config.validate().is_err());
    }
}
