//! Centralized defaults for settings and market loading
//!
//! Serde defaults, the loaders and the validator all read from here so the
//! values cannot drift apart.

/// Server defaults
pub mod server {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8080;
    /// Request timeout (seconds)
    pub const TIMEOUT_SECONDS: u64 = 30;
}

/// Logging defaults
pub mod observability {
    pub const LOG_LEVEL: &str = "info";

    /// Levels accepted by `observability.log_level`
    pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
}

/// Where settings and markets are read from
pub mod paths {
    /// Settings directory, holding default.yaml and {env}.yaml
    pub const SETTINGS_DIR: &str = "config";

    /// Root of the market tree (markets/{id}/market.yaml, base/defaults.yaml)
    pub const MARKET_CONFIG_DIR: &str = "config";

    /// Optional defaults merged under every market file
    pub const BASE_DEFAULTS: &str = "base/defaults.yaml";

    /// Market file relative to the market tree root
    pub fn market_file(market_id: &str) -> String {
        format!("markets/{}/market.yaml", market_id)
    }
}

/// Environment variable names
pub mod env {
    /// Prefix for overrides, e.g. HAUS__SERVER__PORT=9000
    pub const PREFIX: &str = "HAUS";
    pub const SEPARATOR: &str = "__";

    /// Selects config/{env}.yaml
    pub const ENVIRONMENT: &str = "HAUS_ENV";
}

/// Market defaults
pub mod market {
    pub const DEFAULT_MARKET_ID: &str = "nsw";

    /// Largest relative jump between a bracket's base amount and the duty
    /// accrued at the previous bound before the validator warns
    pub const BASE_CONTINUITY_TOLERANCE: f64 = 0.001;
}
