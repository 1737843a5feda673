//! Configuration management for the HAUS calculator service
//!
//! Supports loading configuration from:
//! - YAML files (config/default.yaml, config/{env}.yaml)
//! - Environment variables (HAUS__ prefix)
//!
//! # Market Configuration
//!
//! Jurisdiction-specific tables live in config/markets/{market}/market.yaml:
//! stamp-duty brackets, LMI tiers, input policy and currency display. Access
//! via [`MarketConfig`], which converts them into `haus-core` schedules.

pub mod constants;
pub mod market;
pub mod settings;

pub use market::{
    ConfigValidator, MarketConfig, ValidationFinding, ValidationResult, ValidationSeverity,
};
pub use settings::{
    environment_from_env, load_settings, load_settings_from, MarketSettings, ObservabilityConfig,
    RuntimeEnvironment, ServerConfig, Settings,
};

use haus_core::ScheduleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Invalid rate table: {0}")]
    Schedule(#[from] ScheduleError),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
