//! Config Validator for market configuration
//!
//! Validates a market at startup and on reload so a bad table is caught
//! before it is swapped in. Performs:
//! - Required tables check
//! - Ordering checks on brackets and tiers
//! - Value range validation
//! - Bracket continuity (warning only)
//!
//! # Example
//!
//! ```ignore
//! use haus_config::market::{ConfigValidator, MarketConfig};
//!
//! let config = MarketConfig::load("nsw", "config")?;
//! let result = ConfigValidator::new().validate(&config);
//! assert!(result.is_ok());
//! ```

use super::MarketConfig;
use crate::constants::market::BASE_CONTINUITY_TOLERANCE;

const STAMP_DUTY: &str = "stamp_duty";
const LMI: &str = "lmi";
const INPUT_POLICY: &str = "input_policy";
const CURRENCY: &str = "currency";

/// One problem found in a market
#[derive(Debug, Clone)]
pub struct ValidationFinding {
    /// Category of finding
    pub category: ValidationCategory,
    /// Config section
    pub source: String,
    /// Specific entry or field
    pub field: Option<String>,
    pub message: String,
    pub severity: ValidationSeverity,
}

impl std::fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field_str = self.field.as_deref().unwrap_or("(root)");
        write!(
            f,
            "[{:?}] {}/{}: {}",
            self.severity, self.source, field_str, self.message
        )
    }
}

/// Category of finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCategory {
    /// Missing required table
    MissingRequired,
    /// Entries out of order
    Ordering,
    /// Value out of expected range
    ValueOutOfRange,
    /// Bracket base does not follow from the previous bracket
    Discontinuity,
}

/// Severity of finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    /// Informational warning
    Warning,
    /// Potential issue
    Error,
    /// Critical - the market cannot be used
    Critical,
}

/// Validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub findings: Vec<ValidationFinding>,
    /// Market being validated
    pub market: String,
}

impl ValidationResult {
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            findings: Vec::new(),
            market: market.into(),
        }
    }

    fn push(
        &mut self,
        severity: ValidationSeverity,
        category: ValidationCategory,
        source: &str,
        field: Option<String>,
        message: String,
    ) {
        self.findings.push(ValidationFinding {
            category,
            source: source.to_string(),
            field,
            message,
            severity,
        });
    }

    /// Check if validation passed (no critical findings)
    pub fn is_ok(&self) -> bool {
        !self
            .findings
            .iter()
            .any(|f| f.severity == ValidationSeverity::Critical)
    }

    pub fn critical(&self) -> Vec<&ValidationFinding> {
        self.at_least(ValidationSeverity::Critical)
    }

    pub fn warnings(&self) -> Vec<&ValidationFinding> {
        self.findings
            .iter()
            .filter(|f| f.severity == ValidationSeverity::Warning)
            .collect()
    }

    /// Findings at or above `severity`
    pub fn at_least(&self, severity: ValidationSeverity) -> Vec<&ValidationFinding> {
        self.findings
            .iter()
            .filter(|f| f.severity >= severity)
            .collect()
    }

    /// Summary string
    pub fn summary(&self) -> String {
        let count = |severity| {
            self.findings
                .iter()
                .filter(|f| f.severity == severity)
                .count()
        };

        if self.findings.is_empty() {
            format!("Market '{}': All validations passed", self.market)
        } else {
            format!(
                "Market '{}': {} critical, {} errors, {} warnings",
                self.market,
                count(ValidationSeverity::Critical),
                count(ValidationSeverity::Error),
                count(ValidationSeverity::Warning)
            )
        }
    }
}

/// Config validator
pub struct ConfigValidator {
    include_warnings: bool,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self {
            include_warnings: true,
        }
    }

    /// Set whether to include warnings
    pub fn with_warnings(mut self, include: bool) -> Self {
        self.include_warnings = include;
        self
    }

    /// Validate a market configuration
    pub fn validate(&self, config: &MarketConfig) -> ValidationResult {
        let mut result = ValidationResult::new(&config.market_id);

        self.validate_stamp_duty(config, &mut result);
        self.validate_lmi(config, &mut result);
        self.validate_input_policy(config, &mut result);
        self.validate_currency(config, &mut result);

        if !self.include_warnings {
            result
                .findings
                .retain(|f| f.severity > ValidationSeverity::Warning);
        }

        result
    }

    fn validate_stamp_duty(&self, config: &MarketConfig, result: &mut ValidationResult) {
        let brackets = &config.stamp_duty.brackets;

        if brackets.is_empty() {
            result.push(
                ValidationSeverity::Critical,
                ValidationCategory::MissingRequired,
                STAMP_DUTY,
                None,
                "No stamp-duty brackets defined".to_string(),
            );
            return;
        }

        let last = brackets.len() - 1;
        let mut previous_bound = 0.0;
        let mut open_brackets = 0;

        for (index, bracket) in brackets.iter().enumerate() {
            let field = Some(format!("brackets[{}]", index));

            if !bracket.base_amount.is_finite() || bracket.base_amount < 0.0 {
                result.push(
                    ValidationSeverity::Critical,
                    ValidationCategory::ValueOutOfRange,
                    STAMP_DUTY,
                    field.clone(),
                    format!("Base amount must be non-negative, got {}", bracket.base_amount),
                );
            }

            if !bracket.marginal_rate.is_finite() || !(0.0..=100.0).contains(&bracket.marginal_rate)
            {
                result.push(
                    ValidationSeverity::Critical,
                    ValidationCategory::ValueOutOfRange,
                    STAMP_DUTY,
                    field.clone(),
                    format!("Marginal rate must be 0-100%, got {}", bracket.marginal_rate),
                );
            }

            match bracket.upper_bound {
                Some(bound) => {
                    if !bound.is_finite() || bound <= previous_bound {
                        result.push(
                            ValidationSeverity::Critical,
                            ValidationCategory::Ordering,
                            STAMP_DUTY,
                            field.clone(),
                            format!(
                                "Upper bound {} must be above the previous bound {}",
                                bound, previous_bound
                            ),
                        );
                    } else {
                        previous_bound = bound;
                    }
                }
                None => {
                    open_brackets += 1;
                    if index != last {
                        result.push(
                            ValidationSeverity::Critical,
                            ValidationCategory::Ordering,
                            STAMP_DUTY,
                            field.clone(),
                            "Unbounded bracket must be last".to_string(),
                        );
                    }
                }
            }
        }

        if open_brackets == 0 {
            result.push(
                ValidationSeverity::Critical,
                ValidationCategory::MissingRequired,
                STAMP_DUTY,
                None,
                "Final bracket must have upper_bound: null".to_string(),
            );
        }

        self.check_continuity(config, result);
    }

    /// Warn when a bracket's base is not the duty accrued at the previous bound
    fn check_continuity(&self, config: &MarketConfig, result: &mut ValidationResult) {
        let brackets = &config.stamp_duty.brackets;
        let mut floor = 0.0;

        for (index, pair) in brackets.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let Some(previous_bound) = previous.upper_bound else {
                break;
            };

            let accrued =
                previous.base_amount + (previous_bound - floor) * previous.marginal_rate / 100.0;
            let jump = (current.base_amount - accrued).abs();

            if jump > accrued.abs().max(1.0) * BASE_CONTINUITY_TOLERANCE {
                result.push(
                    ValidationSeverity::Warning,
                    ValidationCategory::Discontinuity,
                    STAMP_DUTY,
                    Some(format!("brackets[{}]", index + 1)),
                    format!(
                        "Base amount {} differs from the {:.2} accrued at {}",
                        current.base_amount, accrued, previous_bound
                    ),
                );
            }

            floor = previous_bound;
        }
    }

    fn validate_lmi(&self, config: &MarketConfig, result: &mut ValidationResult) {
        let lmi = &config.lmi;
        let threshold = lmi.deposit_threshold_percent;

        if !threshold.is_finite() || !(threshold > 0.0 && threshold <= 100.0) {
            result.push(
                ValidationSeverity::Critical,
                ValidationCategory::ValueOutOfRange,
                LMI,
                Some("deposit_threshold_percent".to_string()),
                format!("Threshold must be in (0, 100], got {}", threshold),
            );
        }

        if lmi.tiers.is_empty() {
            result.push(
                ValidationSeverity::Critical,
                ValidationCategory::MissingRequired,
                LMI,
                None,
                "No LMI tiers defined".to_string(),
            );
            return;
        }

        let mut previous = f64::INFINITY;
        for (index, tier) in lmi.tiers.iter().enumerate() {
            let field = Some(format!("tiers[{}]", index));

            if !tier.lvr_above.is_finite() || !(0.0..=100.0).contains(&tier.lvr_above) {
                result.push(
                    ValidationSeverity::Critical,
                    ValidationCategory::ValueOutOfRange,
                    LMI,
                    field.clone(),
                    format!("LVR threshold must be 0-100, got {}", tier.lvr_above),
                );
            }

            if !tier.rate.is_finite() || !(0.0..=100.0).contains(&tier.rate) {
                result.push(
                    ValidationSeverity::Critical,
                    ValidationCategory::ValueOutOfRange,
                    LMI,
                    field.clone(),
                    format!("Rate must be 0-100%, got {}", tier.rate),
                );
            }

            if tier.lvr_above >= previous {
                result.push(
                    ValidationSeverity::Critical,
                    ValidationCategory::Ordering,
                    LMI,
                    field,
                    format!(
                        "LVR threshold {} must be below the previous {}",
                        tier.lvr_above, previous
                    ),
                );
            }
            previous = tier.lvr_above;
        }

        // Loans just over the threshold LVR must land in some tier
        let threshold_lvr = 100.0 - threshold;
        if previous > threshold_lvr {
            result.push(
                ValidationSeverity::Warning,
                ValidationCategory::ValueOutOfRange,
                LMI,
                Some(format!("tiers[{}]", lmi.tiers.len() - 1)),
                format!(
                    "Lowest tier starts at LVR {} but LMI applies above {}; those loans get a zero estimate",
                    previous, threshold_lvr
                ),
            );
        }
    }

    fn validate_input_policy(&self, config: &MarketConfig, result: &mut ValidationResult) {
        let policy = &config.input_policy;

        let deposit = policy.deposit_percent;
        if !(deposit.min <= deposit.max) || deposit.min <= 0.0 || deposit.max >= 100.0 {
            result.push(
                ValidationSeverity::Error,
                ValidationCategory::ValueOutOfRange,
                INPUT_POLICY,
                Some("deposit_percent".to_string()),
                format!(
                    "Range {}-{} must be ordered and inside (0, 100)",
                    deposit.min, deposit.max
                ),
            );
        }

        let rate = policy.interest_rate_percent;
        if !(rate.min <= rate.max) || rate.min <= 0.0 || !rate.max.is_finite() {
            result.push(
                ValidationSeverity::Error,
                ValidationCategory::ValueOutOfRange,
                INPUT_POLICY,
                Some("interest_rate_percent".to_string()),
                format!(
                    "Range {}-{} must be ordered and above 0",
                    rate.min, rate.max
                ),
            );
        }

        if policy.loan_terms_years.is_empty() {
            result.push(
                ValidationSeverity::Warning,
                ValidationCategory::MissingRequired,
                INPUT_POLICY,
                Some("loan_terms_years".to_string()),
                "No terms listed; every term will be accepted".to_string(),
            );
        } else if policy.loan_terms_years.contains(&0) {
            result.push(
                ValidationSeverity::Error,
                ValidationCategory::ValueOutOfRange,
                INPUT_POLICY,
                Some("loan_terms_years".to_string()),
                "Terms must be at least one year".to_string(),
            );
        }
    }

    fn validate_currency(&self, config: &MarketConfig, result: &mut ValidationResult) {
        let currency = &config.currency;

        if currency.symbol.is_empty() {
            result.push(
                ValidationSeverity::Warning,
                ValidationCategory::MissingRequired,
                CURRENCY,
                Some("symbol".to_string()),
                "Empty currency symbol".to_string(),
            );
        }

        if !currency.compact_threshold.is_finite() || currency.compact_threshold <= 0.0 {
            result.push(
                ValidationSeverity::Error,
                ValidationCategory::ValueOutOfRange,
                CURRENCY,
                Some("compact_threshold".to_string()),
                format!("Must be positive, got {}", currency.compact_threshold),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NSW: &str = r#"
market_id: nsw
display_name: New South Wales
stamp_duty:
  brackets:
    - { upper_bound: 16000, base_amount: 0, marginal_rate: 1.25 }
    - { upper_bound: 35000, base_amount: 200, marginal_rate: 1.5 }
    - { upper_bound: 93000, base_amount: 485, marginal_rate: 1.75 }
    - { upper_bound: 351000, base_amount: 1500, marginal_rate: 3.5 }
    - { upper_bound: 1168000, base_amount: 10530, marginal_rate: 4.5 }
    - { upper_bound: 3505000, base_amount: 47295, marginal_rate: 5.5 }
    - { upper_bound: null, base_amount: 175832, marginal_rate: 7.0 }
lmi:
  deposit_threshold_percent: 20
  tiers:
    - { lvr_above: 95, rate: 4 }
    - { lvr_above: 90, rate: 3 }
    - { lvr_above: 85, rate: 2 }
    - { lvr_above: 80, rate: 1 }
"#;

    fn nsw() -> MarketConfig {
        MarketConfig::from_yaml_str(NSW).unwrap()
    }

    #[test]
    fn test_nsw_passes_cleanly() {
        let result = ConfigValidator::new().validate(&nsw());
        assert!(result.is_ok());
        assert!(result.findings.is_empty(), "{:?}", result.findings);
    }

    #[test]
    fn test_missing_tables_are_critical() {
        let config = MarketConfig::from_yaml_str("market_id: empty\n").unwrap();
        let result = ConfigValidator::new().validate(&config);
        assert!(!result.is_ok());
        assert_eq!(result.critical().len(), 2);
    }

    #[test]
    fn test_unordered_brackets() {
        let mut config = nsw();
        config.stamp_duty.brackets.swap(1, 2);
        let result = ConfigValidator::new().validate(&config);
        assert!(!result.is_ok());
        assert!(result
            .critical()
            .iter()
            .any(|f| f.category == ValidationCategory::Ordering));
    }

    #[test]
    fn test_open_bracket_must_be_last() {
        let mut config = nsw();
        config.stamp_duty.brackets.rotate_right(1);
        assert!(!ConfigValidator::new().validate(&config).is_ok());

        let mut closed = nsw();
        closed.stamp_duty.brackets.pop();
        assert!(!ConfigValidator::new().validate(&closed).is_ok());
    }

    #[test]
    fn test_discontinuity_is_warning() {
        let mut config = nsw();
        // The quoted-but-wrong base from the previous bracket
        config.stamp_duty.brackets[4].base_amount = 1_500.0;
        let result = ConfigValidator::new().validate(&config);
        assert!(result.is_ok());
        let warnings = result.warnings();
        assert!(warnings
            .iter()
            .any(|f| f.category == ValidationCategory::Discontinuity
                && f.field.as_deref() == Some("brackets[4]")));
    }

    #[test]
    fn test_lmi_tiers_must_descend() {
        let mut config = nsw();
        config.lmi.tiers.reverse();
        let result = ConfigValidator::new().validate(&config);
        assert!(!result.is_ok());
    }

    #[test]
    fn test_lmi_rate_range() {
        let mut config = nsw();
        config.lmi.tiers[0].rate = 140.0;
        assert!(!ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn test_policy_problems_are_errors() {
        let mut config = nsw();
        config.input_policy.deposit_percent.min = 60.0;
        config.input_policy.loan_terms_years.clear();
        let result = ConfigValidator::new().validate(&config);
        assert!(result.is_ok());
        assert_eq!(result.at_least(ValidationSeverity::Error).len(), 1);
        assert_eq!(result.warnings().len(), 1);
    }

    #[test]
    fn test_without_warnings() {
        let mut config = nsw();
        config.input_policy.loan_terms_years.clear();
        let result = ConfigValidator::new().with_warnings(false).validate(&config);
        assert!(result.findings.is_empty());
        assert!(result.summary().contains("All validations passed"));
    }
}
