//! Configuration management for the Tea Business Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with TEA_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Costing engine defaults
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// VAT rate applied when an organization has no stored settings, percent
    pub default_vat_percent: f64,

    /// Platform fee applied when an organization has no stored settings, percent
    pub default_platform_fee_percent: f64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = std::env::var("TEA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("engine.default_vat_percent", 20.0)?
            .set_default("engine.default_platform_fee_percent", 0.0)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (TEA_ prefix)
            .add_source(
                Environment::with_prefix("TEA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_vat_percent: 20.0,
            default_platform_fee_percent: 0.0,
        }
    }
}
