use crate::domain::{Decimal, GridTable, PerLeg};
use crate::engine::{HedgeRatios, RebalancePolicy};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Process configuration from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub strategy_name: String,
    pub log_dir: PathBuf,
    pub strategy_config_path: PathBuf,
    pub order_timeout_ms: u64,
    pub order_poll_ms: u64,
    pub port: u16,
    pub quote_replay_path: Option<PathBuf>,
    pub paper_commission_per_lot: Decimal,
}

/// Per-strategy parameters, read from the JSON file at `STRATEGY_CONFIG_PATH`.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Contract traded on each leg.
    pub contracts: PerLeg<String>,
    #[serde(default)]
    pub hedge_ratios: HedgeRatios,
    /// Signed lots per leg for one layer multiple.
    pub unit: PerLeg<i64>,
    pub buckets: GridTable,
    #[serde(default)]
    pub policy: RebalancePolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let strategy_name = env_map
            .get("STRATEGY_NAME")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("STRATEGY_NAME".to_string()))?;
        if strategy_name.trim().is_empty() || strategy_name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue(
                "STRATEGY_NAME".to_string(),
                "must be a non-empty directory name".to_string(),
            ));
        }

        let log_dir = PathBuf::from(
            env_map
                .get("LOG_DIR")
                .map(|s| s.as_str())
                .unwrap_or("logs"),
        );

        let strategy_config_path = env_map
            .get("STRATEGY_CONFIG_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnv("STRATEGY_CONFIG_PATH".to_string()))?;

        let order_timeout_ms = parse_u64(&env_map, "ORDER_TIMEOUT_MS", "30000")?;
        let order_poll_ms = parse_u64(&env_map, "ORDER_POLL_MS", "200")?;
        if order_poll_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "ORDER_POLL_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let quote_replay_path = env_map.get("QUOTE_REPLAY_PATH").map(PathBuf::from);

        let paper_commission_per_lot = env_map
            .get("PAPER_COMMISSION_PER_LOT")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<Decimal>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "PAPER_COMMISSION_PER_LOT".to_string(),
                    "must be a decimal number".to_string(),
                )
            })?;

        Ok(Config {
            strategy_name,
            log_dir,
            strategy_config_path,
            order_timeout_ms,
            order_poll_ms,
            port,
            quote_replay_path,
            paper_commission_per_lot,
        })
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::from_millis(self.order_timeout_ms)
    }

    pub fn order_poll_interval(&self) -> Duration {
        Duration::from_millis(self.order_poll_ms)
    }

    pub fn load_strategy(&self) -> Result<StrategyConfig, ConfigError> {
        StrategyConfig::from_path(&self.strategy_config_path)
    }
}

impl StrategyConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| {
            ConfigError::InvalidValue(
                "STRATEGY_CONFIG_PATH".to_string(),
                format!("{} not found or unreadable", path.display()),
            )
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| {
            ConfigError::InvalidValue("STRATEGY_CONFIG_PATH".to_string(), e.to_string())
        })
    }
}

fn parse_u64(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<u64, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string()))
}
