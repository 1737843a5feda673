//! Market configuration file
//!
//! A market bundles everything jurisdiction-specific: stamp-duty brackets,
//! LMI tiers, the product's input policy and currency display. Rates in the
//! file are percentages; conversion to core types turns them into fractions.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use haus_core::{
    CurrencyFormat, DutyBracket, InputPolicy, LmiSchedule, LmiTier, LoanCalculator, PercentRange,
    StampDutySchedule, DEFAULT_COMPACT_THRESHOLD, DEFAULT_DEPOSIT_THRESHOLD_PERCENT,
};

use crate::constants::paths;
use crate::ConfigError;

/// Currency display settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_code")]
    pub code: String,
    #[serde(default = "default_compact_threshold")]
    pub compact_threshold: f64,
}

fn default_symbol() -> String {
    "$".to_string()
}
fn default_code() -> String {
    "AUD".to_string()
}
fn default_compact_threshold() -> f64 {
    DEFAULT_COMPACT_THRESHOLD
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            code: default_code(),
            compact_threshold: default_compact_threshold(),
        }
    }
}

/// One stamp-duty bracket as written in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketEntry {
    /// Inclusive upper bound; null for the final bracket
    #[serde(default)]
    pub upper_bound: Option<f64>,
    pub base_amount: f64,
    /// Percent (4.5 = 4.5%)
    pub marginal_rate: f64,
}

/// Stamp-duty section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StampDutyConfig {
    /// Label shown with results; defaults to the upper-cased market id
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub brackets: Vec<BracketEntry>,
}

/// One LMI tier as written in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmiTierEntry {
    pub lvr_above: f64,
    /// Percent of the loan amount
    pub rate: f64,
}

/// LMI section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmiConfig {
    #[serde(default = "default_deposit_threshold")]
    pub deposit_threshold_percent: f64,
    #[serde(default)]
    pub tiers: Vec<LmiTierEntry>,
}

fn default_deposit_threshold() -> f64 {
    DEFAULT_DEPOSIT_THRESHOLD_PERCENT
}

impl Default for LmiConfig {
    fn default() -> Self {
        Self {
            deposit_threshold_percent: default_deposit_threshold(),
            tiers: Vec::new(),
        }
    }
}

/// Inclusive range in the file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeEntry {
    pub min: f64,
    pub max: f64,
}

/// Input policy section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPolicyConfig {
    #[serde(default = "default_deposit_range")]
    pub deposit_percent: RangeEntry,
    #[serde(default = "default_rate_range")]
    pub interest_rate_percent: RangeEntry,
    #[serde(default = "default_terms")]
    pub loan_terms_years: Vec<u32>,
}

fn default_deposit_range() -> RangeEntry {
    let reference = InputPolicy::reference().deposit_percent;
    RangeEntry {
        min: reference.min,
        max: reference.max,
    }
}
fn default_rate_range() -> RangeEntry {
    let reference = InputPolicy::reference().interest_rate_percent;
    RangeEntry {
        min: reference.min,
        max: reference.max,
    }
}
fn default_terms() -> Vec<u32> {
    InputPolicy::reference().loan_terms_years
}

impl Default for InputPolicyConfig {
    fn default() -> Self {
        Self {
            deposit_percent: default_deposit_range(),
            interest_rate_percent: default_rate_range(),
            loan_terms_years: default_terms(),
        }
    }
}

/// A complete market file after merging over base defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Market identifier; filled from the directory name when omitted
    #[serde(default)]
    pub market_id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub currency: CurrencyConfig,

    #[serde(default)]
    pub stamp_duty: StampDutyConfig,

    #[serde(default)]
    pub lmi: LmiConfig,

    #[serde(default)]
    pub input_policy: InputPolicyConfig,
}

impl MarketConfig {
    /// Load a market from a directory structure
    ///
    /// Expects:
    /// - config_dir/base/defaults.yaml (optional)
    /// - config_dir/markets/{market_id}/market.yaml
    pub fn load(market_id: &str, config_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        if market_id.trim().is_empty() {
            return Err(ConfigError::MissingField("market_id".to_string()));
        }

        let base_path = config_dir.join(paths::BASE_DEFAULTS);
        let base_config = if base_path.exists() {
            Some(read_yaml(&base_path)?)
        } else {
            tracing::debug!("No base market defaults at {:?}", base_path);
            None
        };

        let market_path = config_dir.join(paths::market_file(market_id));
        if !market_path.exists() {
            return Err(ConfigError::FileNotFound(market_path.display().to_string()));
        }
        let market_config = read_yaml(&market_path)?;

        // Market overrides base
        let merged = match base_config {
            Some(base) => merge_json(base, market_config),
            None => market_config,
        };

        let mut config: MarketConfig = serde_json::from_value(merged).map_err(|e| {
            ConfigError::ParseError(format!("Failed to parse market '{}': {}", market_id, e))
        })?;

        if config.market_id.is_empty() {
            config.market_id = market_id.to_string();
        } else if config.market_id != market_id {
            tracing::warn!(
                requested = %market_id,
                declared = %config.market_id,
                "Market file declares a different id"
            );
        }

        tracing::info!(
            market = %config.market_id,
            brackets = config.stamp_duty.brackets.len(),
            lmi_tiers = config.lmi.tiers.len(),
            "Loaded market configuration"
        );

        Ok(config)
    }

    /// Parse a single market document without base defaults
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse market: {}", e)))
    }

    /// Jurisdiction label for the stamp-duty schedule
    pub fn jurisdiction(&self) -> String {
        self.stamp_duty
            .jurisdiction
            .clone()
            .unwrap_or_else(|| self.market_id.to_uppercase())
    }

    /// Stamp-duty schedule with rates converted to fractions
    pub fn stamp_duty_schedule(&self) -> Result<StampDutySchedule, ConfigError> {
        let brackets = self
            .stamp_duty
            .brackets
            .iter()
            .map(|entry| DutyBracket {
                upper_bound: entry.upper_bound,
                base_amount: entry.base_amount,
                marginal_rate: entry.marginal_rate / 100.0,
            })
            .collect();

        Ok(StampDutySchedule::new(self.jurisdiction(), brackets)?)
    }

    /// LMI schedule with rates converted to fractions
    pub fn lmi_schedule(&self) -> Result<LmiSchedule, ConfigError> {
        let tiers = self
            .lmi
            .tiers
            .iter()
            .map(|entry| LmiTier::new(entry.lvr_above, entry.rate / 100.0))
            .collect();

        Ok(LmiSchedule::new(self.lmi.deposit_threshold_percent, tiers)?)
    }

    /// Calculator over this market's tables
    pub fn calculator(&self) -> Result<LoanCalculator, ConfigError> {
        Ok(LoanCalculator::new(
            self.stamp_duty_schedule()?,
            self.lmi_schedule()?,
        ))
    }

    pub fn input_policy(&self) -> InputPolicy {
        let policy = &self.input_policy;
        InputPolicy {
            deposit_percent: PercentRange::new(policy.deposit_percent.min, policy.deposit_percent.max),
            interest_rate_percent: PercentRange::new(
                policy.interest_rate_percent.min,
                policy.interest_rate_percent.max,
            ),
            loan_terms_years: policy.loan_terms_years.clone(),
        }
    }

    pub fn currency_format(&self) -> CurrencyFormat {
        CurrencyFormat {
            symbol: self.currency.symbol.clone(),
            code: self.currency.code.clone(),
            compact_threshold: self.currency.compact_threshold,
        }
    }
}

fn read_yaml(path: &Path) -> Result<JsonValue, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_yaml::from_str(&content).map_err(|e| {
        ConfigError::ParseError(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Deep merge two JSON values (right overrides left)
pub(crate) fn merge_json(left: JsonValue, right: JsonValue) -> JsonValue {
    match (left, right) {
        (JsonValue::Object(mut left_map), JsonValue::Object(right_map)) => {
            for (key, right_val) in right_map {
                let merged_val = match left_map.remove(&key) {
                    Some(left_val) => merge_json(left_val, right_val),
                    None => right_val,
                };
                left_map.insert(key, merged_val);
            }
            JsonValue::Object(left_map)
        }
        // Arrays and scalars are replaced wholesale
        (_, right) => right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haus_core::ScheduleError;

    const MINIMAL: &str = r#"
market_id: testland
display_name: Testland
stamp_duty:
  brackets:
    - { upper_bound: 100000, base_amount: 0, marginal_rate: 2 }
    - { upper_bound: null, base_amount: 2000, marginal_rate: 3 }
lmi:
  tiers:
    - { lvr_above: 90, rate: 3 }
    - { lvr_above: 80, rate: 1 }
"#;

    #[test]
    fn test_parse_and_convert() {
        let config = MarketConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.jurisdiction(), "TESTLAND");
        assert_eq!(config.currency.code, "AUD");

        let duty = config.stamp_duty_schedule().unwrap();
        assert!((duty.compute(200_000.0) - 5_000.0).abs() < 1e-6);

        let lmi = config.lmi_schedule().unwrap();
        assert_eq!(lmi.deposit_threshold_percent(), 20.0);
        assert!((lmi.estimate(100_000.0, 5.0) - 3_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_policy_defaults_to_reference() {
        let config = MarketConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.input_policy(), InputPolicy::reference());
    }

    #[test]
    fn test_bad_table_is_schedule_error() {
        let yaml = r#"
stamp_duty:
  brackets:
    - { upper_bound: 50000, base_amount: 0, marginal_rate: 1 }
"#;
        let config = MarketConfig::from_yaml_str(yaml).unwrap();
        assert!(matches!(
            config.stamp_duty_schedule(),
            Err(ConfigError::Schedule(ScheduleError::MissingOpenBracket { .. }))
        ));
    }

    #[test]
    fn test_load_merges_base_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("base")).unwrap();
        std::fs::create_dir_all(dir.path().join("markets/testland")).unwrap();
        std::fs::write(
            dir.path().join("base/defaults.yaml"),
            "currency:\n  symbol: \"A$\"\n  code: AUD\ninput_policy:\n  loan_terms_years: [10, 20, 30]\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("markets/testland/market.yaml"),
            format!("{}\ncurrency:\n  symbol: \"T$\"\n", MINIMAL),
        )
        .unwrap();

        let config = MarketConfig::load("testland", dir.path()).unwrap();
        assert_eq!(config.currency.symbol, "T$");
        assert_eq!(config.currency.code, "AUD");
        assert_eq!(config.input_policy.loan_terms_years, vec![10, 20, 30]);
    }

    #[test]
    fn test_load_fills_missing_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("markets/vic")).unwrap();
        std::fs::write(
            dir.path().join("markets/vic/market.yaml"),
            "stamp_duty:\n  brackets:\n    - { upper_bound: null, base_amount: 0, marginal_rate: 5 }\n",
        )
        .unwrap();

        let config = MarketConfig::load("vic", dir.path()).unwrap();
        assert_eq!(config.market_id, "vic");
        assert_eq!(config.jurisdiction(), "VIC");
    }

    #[test]
    fn test_load_requires_market_id() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MarketConfig::load("", dir.path()),
            Err(ConfigError::MissingField(_))
        ));
    }

    #[test]
    fn test_load_missing_market() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MarketConfig::load("nowhere", dir.path()),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_merge_json() {
        let base = serde_json::json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "list": [1, 2, 3]
        });
        let overlay = serde_json::json!({
            "a": 10,
            "b": { "c": 20 },
            "e": 5,
            "list": [9]
        });
        let merged = merge_json(base, overlay);

        assert_eq!(merged["a"], 10);
        assert_eq!(merged["b"]["c"], 20);
        assert_eq!(merged["b"]["d"], 3);
        assert_eq!(merged["e"], 5);
        assert_eq!(merged["list"], serde_json::json!([9]));
    }
}
