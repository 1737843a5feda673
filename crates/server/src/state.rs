//! Application State
//!
//! Shared state across all handlers. Settings and the active market can both
//! be reloaded at runtime; handlers take a cheap `Arc` snapshot of the market
//! so a reload never changes the tables mid-request.

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

use haus_config::{
    constants::paths, load_settings_from, ConfigError, ConfigValidator, MarketConfig, MarketSettings, Settings,
    ValidationResult, ValidationSeverity,
};
use haus_core::{AffordabilityCalculator, CurrencyFormat, InputPolicy};

use crate::ServerError;

/// Everything derived from one loaded market file
pub struct MarketContext {
    pub config: MarketConfig,
    pub calculator: Arc<dyn AffordabilityCalculator>,
    pub policy: InputPolicy,
    pub currency: CurrencyFormat,
}

impl MarketContext {
    /// Validate a market and build its calculator
    ///
    /// Critical findings reject the market; everything else is logged.
    pub fn from_config(config: MarketConfig) -> Result<Self, ServerError> {
        let result = ConfigValidator::new().validate(&config);
        log_findings(&result);

        if !result.is_ok() {
            return Err(ServerError::Config(ConfigError::InvalidValue {
                field: format!("market '{}'", config.market_id),
                message: result.summary(),
            }));
        }

        let calculator = config.calculator()?;
        Ok(Self {
            policy: config.input_policy(),
            currency: config.currency_format(),
            calculator: Arc::new(calculator),
            config,
        })
    }

    /// Load and validate the market named in settings
    pub fn load(settings: &MarketSettings) -> Result<Self, ServerError> {
        let config = MarketConfig::load(&settings.market_id, &settings.config_dir)?;
        Self::from_config(config)
    }

    pub fn market_id(&self) -> &str {
        &self.config.market_id
    }
}

fn log_findings(result: &ValidationResult) {
    for finding in &result.findings {
        match finding.severity {
            ValidationSeverity::Warning => {
                tracing::warn!(
                    source = %finding.source,
                    field = ?finding.field,
                    "Market config warning: {}", finding.message
                );
            }
            ValidationSeverity::Error => {
                tracing::error!(
                    source = %finding.source,
                    field = ?finding.field,
                    "Market config error: {}", finding.message
                );
            }
            ValidationSeverity::Critical => {
                tracing::error!(
                    source = %finding.source,
                    field = ?finding.field,
                    "Critical market config error: {}", finding.message
                );
            }
        }
    }
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Settings, swapped on reload
    pub config: Arc<RwLock<Settings>>,
    /// Active market, swapped whole on reload
    pub market: Arc<RwLock<Arc<MarketContext>>>,
    metrics: Option<PrometheusHandle>,
    /// Environment name for config reload
    env: Option<String>,
    settings_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Settings, market: MarketContext) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            market: Arc::new(RwLock::new(Arc::new(market))),
            metrics: None,
            env: None,
            settings_dir: PathBuf::from(paths::SETTINGS_DIR),
        }
    }

    /// Environment name used when reloading settings
    pub fn with_env(mut self, env: Option<String>) -> Self {
        self.env = env;
        self
    }

    /// Directory settings are reloaded from
    pub fn with_settings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings_dir = dir.into();
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Reload configuration from files
    ///
    /// Settings only; the market is reloaded separately. CORS and timeout
    /// layers keep their startup values.
    pub fn reload_config(&self) -> Result<(), ServerError> {
        let new_config = load_settings_from(&self.settings_dir, self.env.as_deref())?;

        let mut config = self.config.write();
        *config = new_config;

        tracing::info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Reload the market named in the current settings
    ///
    /// The new market replaces the old one only if it loads and validates.
    pub fn reload_market(&self) -> Result<Arc<MarketContext>, ServerError> {
        let market_settings = self.config.read().market.clone();
        let market = Arc::new(MarketContext::load(&market_settings)?);

        *self.market.write() = Arc::clone(&market);

        tracing::info!(market = %market.market_id(), "Market reloaded successfully");
        Ok(market)
    }

    /// Get a read guard to the current configuration
    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }

    /// Snapshot of the active market
    pub fn market(&self) -> Arc<MarketContext> {
        self.market.read().clone()
    }

    pub fn metrics_handle(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}
