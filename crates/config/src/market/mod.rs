//! Market (jurisdiction) configuration
//!
//! Layered like the settings:
//! 1. Base defaults (config/base/defaults.yaml, optional)
//! 2. Market file (config/markets/{market}/market.yaml)
//!
//! The merged document is typed as [`MarketConfig`], checked by
//! [`ConfigValidator`], then converted into core schedules.

mod master;
mod validator;

pub use master::{
    BracketEntry, CurrencyConfig, InputPolicyConfig, LmiConfig, LmiTierEntry, MarketConfig,
    RangeEntry, StampDutyConfig,
};
pub use validator::{
    ConfigValidator, ValidationCategory, ValidationFinding, ValidationResult, ValidationSeverity,
};
