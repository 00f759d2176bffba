//! # Configuration Management Module
//!
//! Beyonder reads a single TOML file (default `config.toml`). Every section has
//! defaults, so a missing section or key falls back instead of failing.
//!
//! ## Configuration Structure
//!
//! - [`AppConfig`] - general behaviour (confirmation prompts, default pathway)
//! - [`StorageConfig`] - where the sled database lives
//! - [`LoggingConfig`] - log level and optional log files
//! - [`DiceConfig`] - roll history size and percentile crit thresholds
//! - [`SecurityConfig`] - Argon2 cost parameters for account passwords
//!
//! ## Usage
//!
//! ```rust,no_run
//! use beyonder::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Database: {}", config.storage.database_path().display());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [app]
//! confirm_destructive = true
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "beyonder.log"
//!
//! [dice]
//! history_limit = 20
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::dice::{PercentileThresholds, DEFAULT_HISTORY_LIMIT};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ask before applying a vitals recompute or deleting records.
    /// `--yes` on the command line skips the prompt either way.
    #[serde(default = "default_true")]
    pub confirm_destructive: bool,
    /// Pathway given to newly created characters.
    #[serde(default = "default_pathway")]
    pub default_pathway: String,
}

fn default_true() -> bool {
    true
}

fn default_pathway() -> String {
    crate::sheet::DEFAULT_PATHWAY.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            confirm_destructive: true,
            default_pathway: default_pathway(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the sled database path; defaults to `<data_dir>/beyonder.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        match &self.db_path {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(&self.data_dir).join("beyonder.db"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    /// Separate file for `security` target records (logins, registrations).
    #[serde(default)]
    pub security_file: Option<String>,
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("beyonder.log".to_string()),
            security_file: Some("beyonder-security.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceConfig {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_crit_success")]
    pub percentile_crit_success: u32,
    #[serde(default = "default_crit_fail")]
    pub percentile_crit_fail: u32,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_crit_success() -> u32 {
    PercentileThresholds::default().success_at_or_below
}

fn default_crit_fail() -> u32 {
    PercentileThresholds::default().fail_at_or_above
}

impl DiceConfig {
    pub fn thresholds(&self) -> PercentileThresholds {
        PercentileThresholds {
            success_at_or_below: self.percentile_crit_success,
            fail_at_or_above: self.percentile_crit_fail,
        }
    }
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            percentile_crit_success: default_crit_success(),
            percentile_crit_fail: default_crit_fail(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub time_cost: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub argon2: Option<Argon2Config>,
}

impl SecurityConfig {
    /// Argon2 params with configured overrides, or `None` to use library defaults.
    pub fn argon2_params(&self) -> Result<Option<argon2::Params>> {
        let Some(cfg) = &self.argon2 else {
            return Ok(None);
        };
        let params = argon2::Params::new(
            cfg.memory_kib.unwrap_or(argon2::Params::DEFAULT_M_COST),
            cfg.time_cost.unwrap_or(argon2::Params::DEFAULT_T_COST),
            cfg.parallelism.unwrap_or(argon2::Params::DEFAULT_P_COST),
            None,
        )
        .map_err(|e| anyhow!("Invalid [security.argon2] settings: {}", e))?;
        Ok(Some(params))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dice: DiceConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject settings that would make the dice or storage unusable.
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        let d = &self.dice;
        if d.percentile_crit_success >= d.percentile_crit_fail {
            return Err(anyhow!(
                "dice.percentile_crit_success ({}) must be below dice.percentile_crit_fail ({})",
                d.percentile_crit_success,
                d.percentile_crit_fail
            ));
        }
        if d.percentile_crit_fail > 100 {
            return Err(anyhow!("dice.percentile_crit_fail must be at most 100"));
        }
        self.security.argon2_params()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dice.history_limit, 20);
        assert!(config.app.confirm_destructive);
        assert_eq!(
            config.storage.database_path(),
            PathBuf::from("./data").join("beyonder.db")
        );
    }

    #[test]
    fn test_missing_sections_fall_back() {
        let config: Config = toml::from_str("[storage]\ndata_dir = \"/tmp/x\"\n").unwrap();
        assert_eq!(config.storage.data_dir, "/tmp/x");
        assert_eq!(config.dice.percentile_crit_fail, 96);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_db_path_override() {
        let storage = StorageConfig {
            data_dir: "./data".into(),
            db_path: Some("/var/lib/beyonder".into()),
        };
        assert_eq!(storage.database_path(), PathBuf::from("/var/lib/beyonder"));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = Config::default();
        config.dice.percentile_crit_success = 97;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_toml_round_trip() {
        let serialized = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(serialized.contains("[storage]"));
        let back: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(back.storage.data_dir, "./data");
        assert_eq!(back.logging.security_file.as_deref(), Some("beyonder-security.log"));
    }

    #[test]
    fn test_level_filter_parsing() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.level_filter(), log::LevelFilter::Info);
        logging.level = "debug".into();
        assert_eq!(logging.level_filter(), log::LevelFilter::Debug);
        logging.level = "loud".into();
        assert_eq!(logging.level_filter(), log::LevelFilter::Info);
    }
}
