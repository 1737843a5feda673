//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{env, market, observability, paths, server};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Which market to serve and how strictly
    #[serde(default)]
    pub market: MarketSettings,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_observability()?;
        self.validate_market()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 This may block legitimate requests."
            );
        }

        Ok(())
    }

    fn validate_observability(&self) -> Result<(), ConfigError> {
        let level = self.observability.log_level.to_lowercase();
        if !observability::LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "observability.log_level".to_string(),
                message: format!(
                    "Unknown level '{}', expected one of {:?}",
                    self.observability.log_level,
                    observability::LOG_LEVELS
                ),
            });
        }
        Ok(())
    }

    fn validate_market(&self) -> Result<(), ConfigError> {
        if self.market.market_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "market.market_id".to_string(),
                message: "Market id cannot be empty".to_string(),
            });
        }

        if self.environment.is_strict() && !self.market.enforce_input_policy {
            tracing::warn!(
                environment = ?self.environment,
                "Input policy is advisory only; out-of-policy requests will be calculated"
            );
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    server::HOST.to_string()
}
fn default_port() -> u16 {
    server::PORT
}
fn default_timeout() -> u64 {
    server::TIMEOUT_SECONDS
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: default_true(),
            // Empty by default; list origins explicitly outside development
            cors_origins: Vec::new(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable the Prometheus endpoint
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    observability::LOG_LEVEL.to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Market selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSettings {
    /// Directory name under {config_dir}/markets/
    #[serde(default = "default_market_id")]
    pub market_id: String,

    /// Root of the market configuration tree
    #[serde(default = "default_market_config_dir")]
    pub config_dir: String,

    /// Reject out-of-policy input instead of reporting it
    #[serde(default)]
    pub enforce_input_policy: bool,
}

fn default_market_id() -> String {
    market::DEFAULT_MARKET_ID.to_string()
}
fn default_market_config_dir() -> String {
    paths::MARKET_CONFIG_DIR.to_string()
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            market_id: default_market_id(),
            config_dir: default_market_config_dir(),
            enforce_input_policy: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (HAUS__ prefix, e.g. HAUS__SERVER__PORT)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(paths::SETTINGS_DIR, env)
}

/// Same as [`load_settings`], reading files from `settings_dir`
pub fn load_settings_from(
    settings_dir: impl AsRef<Path>,
    env_name: Option<&str>,
) -> Result<Settings, ConfigError> {
    let settings_dir = settings_dir.as_ref();
    let mut builder = Config::builder();

    builder = builder.add_source(File::from(settings_dir.join("default")).required(false));

    if let Some(env_name) = env_name {
        builder = builder.add_source(File::from(settings_dir.join(env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(env::PREFIX)
            .separator(env::SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

/// Environment name from HAUS_ENV, if set and non-empty
///
/// The name selects a file under the settings directory, so anything other
/// than letters, digits, '-' and '_' is rejected.
pub fn environment_from_env() -> Result<Option<String>, ConfigError> {
    match std::env::var(env::ENVIRONMENT) {
        Ok(name) if name.trim().is_empty() => Ok(None),
        Ok(name) => check_environment_name(name.trim()).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::Environment(format!("{}: {}", env::ENVIRONMENT, e))),
    }
}

fn check_environment_name(name: &str) -> Result<String, ConfigError> {
    if name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(name.to_string())
    } else {
        Err(ConfigError::Environment(format!(
            "{} must be a plain name, got '{}'",
            env::ENVIRONMENT,
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.market.market_id, "nsw");
        assert!(!settings.market.enforce_input_policy);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();

        // Port cannot be 0
        settings.server.port = 0;
        assert!(settings.validate_server().is_err());
        settings.server.port = 8080;

        // timeout cannot be 0
        settings.server.timeout_seconds = 0;
        assert!(settings.validate_server().is_err());
        settings.server.timeout_seconds = 30;

        assert!(settings.validate_server().is_ok());
    }

    #[test]
    fn test_log_level_validation() {
        let mut settings = Settings::default();

        settings.observability.log_level = "verbose".to_string();
        assert!(settings.validate_observability().is_err());

        settings.observability.log_level = "DEBUG".to_string();
        assert!(settings.validate_observability().is_ok());
    }

    #[test]
    fn test_market_id_required() {
        let mut settings = Settings::default();
        settings.market.market_id = "  ".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "market.market_id"
        ));
    }

    #[test]
    fn test_environment_flags() {
        assert!(RuntimeEnvironment::Production.is_production());
        assert!(RuntimeEnvironment::Staging.is_strict());
        assert!(!RuntimeEnvironment::Development.is_strict());
    }

    #[test]
    fn test_environment_name_check() {
        assert_eq!(check_environment_name("staging").unwrap(), "staging");
        assert!(check_environment_name("../secrets").is_err());
        assert!(matches!(
            check_environment_name("prod/eu"),
            Err(ConfigError::Environment(_))
        ));
    }

    #[test]
    fn test_load_layers_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.yaml"),
            "server:\n  port: 9100\nmarket:\n  market_id: nsw\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.yaml"),
            "environment: staging\nserver:\n  timeout_seconds: 5\n",
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), Some("staging")).unwrap();
        assert_eq!(settings.environment, RuntimeEnvironment::Staging);
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.timeout_seconds, 5);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_missing_files_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(dir.path(), Some("production")).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.observability.log_level, "info");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.yaml"), "server:\n  port: 0\n").unwrap();
        assert!(load_settings_from(dir.path(), None).is_err());
    }
}
