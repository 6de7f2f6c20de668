//! Application Configuration
//!
//! Layered with the `config` crate: built-in defaults, then the optional
//! `config/harvesthub.toml`, then `HARVESTHUB__SECTION__KEY` environment
//! variables, then the legacy `MOCK_GEMINI` / `GEMINI_API_KEY` variables.

use advisor::AdvisorConfig;
use classifier::{CropDefaults, MspTable, ThresholdConfig};
use config::{Config, ConfigError, Environment, File};
use fallback::FallbackConfig;
use request_validator::ValidationConfig;
use serde::{Deserialize, Serialize};

use crate::rate_limit::RateLimitConfig;

/// Default configuration file, without extension
pub const DEFAULT_CONFIG_FILE: &str = "config/harvesthub";

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
    /// Maximum log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Load the Warangal demo data at startup
    pub seed_demo: bool,
    /// Per-IP rate limit
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            cors_origins: Vec::new(),
            seed_demo: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite URL; the in-memory store is used when unset
    pub database_url: Option<String>,
    /// SQLite pool size; in-memory SQLite URLs always use one connection
    pub max_connections: u32,
    /// Mandi price history JSON file
    pub price_history_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            price_history_path: "fallback-data/mandi-prices.json".to_string(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub advisor: AdvisorConfig,
    pub storage: StorageConfig,
    pub thresholds: ThresholdConfig,
    pub msp: MspTable,
    pub crops: CropDefaults,
    pub fallback: FallbackConfig,
    pub validation: ValidationConfig,
}

impl AppConfig {
    /// Load from `DEFAULT_CONFIG_FILE` (if present) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a file (if present) and the process environment
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("HARVESTHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.apply_legacy_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `MOCK_GEMINI` (anything but `false` selects mock mode) and `GEMINI_API_KEY`
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mock) = lookup("MOCK_GEMINI") {
            self.advisor.mock = mock.trim() != "false";
        }
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.advisor.api_key = Some(key);
        }
    }
}
