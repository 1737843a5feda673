//! Lenders Mortgage Insurance estimate
//!
//! LMI is charged once when the deposit is below the lender's threshold
//! (20% by default, i.e. LVR above 80%). The premium is a flat rate on the
//! loan amount picked from tiers ordered by descending LVR.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::brackets::{first_matching, Bracket};
use crate::error::ScheduleError;
use crate::financial::finite_or_zero;

const TABLE: &str = "lmi";

/// Deposit percentage at or above which no LMI is charged
pub const DEFAULT_DEPOSIT_THRESHOLD_PERCENT: f64 = 20.0;

static DEFAULT_SCHEDULE: Lazy<LmiSchedule> = Lazy::new(LmiSchedule::standard);

/// One LMI premium tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LmiTier {
    /// Tier applies when LVR is strictly above this percentage
    pub lvr_above: f64,
    /// Premium as a fraction of the loan amount (0.02 = 2%)
    pub rate: f64,
}

impl LmiTier {
    pub fn new(lvr_above: f64, rate: f64) -> Self {
        Self { lvr_above, rate }
    }
}

impl Bracket for LmiTier {
    fn contains(&self, lvr: f64) -> bool {
        lvr > self.lvr_above
    }
}

/// Outcome of an LMI check
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LmiAssessment {
    pub required: bool,
    /// Loan-to-value ratio implied by the deposit
    pub lvr_percent: f64,
    /// Premium rate applied (0 when not required or no tier matched)
    pub rate: f64,
    pub estimate: f64,
}

/// LMI tiers plus the deposit threshold that triggers them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LmiSchedule {
    deposit_threshold_percent: f64,
    tiers: Vec<LmiTier>,
}

impl LmiSchedule {
    /// Build a schedule, rejecting tiers that are not strictly descending
    pub fn new(deposit_threshold_percent: f64, tiers: Vec<LmiTier>) -> Result<Self, ScheduleError> {
        if !deposit_threshold_percent.is_finite()
            || !(deposit_threshold_percent > 0.0 && deposit_threshold_percent <= 100.0)
        {
            return Err(ScheduleError::OutOfRange {
                table: TABLE,
                index: 0,
                field: "deposit_threshold_percent",
                value: deposit_threshold_percent,
            });
        }
        validate_tiers(&tiers)?;
        Ok(Self {
            deposit_threshold_percent,
            tiers,
        })
    }

    /// Indicative premiums by LVR band
    pub fn standard() -> Self {
        Self {
            deposit_threshold_percent: DEFAULT_DEPOSIT_THRESHOLD_PERCENT,
            tiers: vec![
                LmiTier::new(95.0, 0.04),
                LmiTier::new(90.0, 0.03),
                LmiTier::new(85.0, 0.02),
                LmiTier::new(80.0, 0.01),
            ],
        }
    }

    pub fn deposit_threshold_percent(&self) -> f64 {
        self.deposit_threshold_percent
    }

    pub fn tiers(&self) -> &[LmiTier] {
        &self.tiers
    }

    /// Whether a deposit of `deposit_percent` attracts LMI
    pub fn is_required(&self, deposit_percent: f64) -> bool {
        deposit_percent < self.deposit_threshold_percent
    }

    /// Premium rate for a loan-to-value ratio, 0 when no tier matches
    pub fn rate_for_lvr(&self, lvr_percent: f64) -> f64 {
        first_matching(&self.tiers, lvr_percent)
            .map(|(_, tier)| tier.rate)
            .unwrap_or(0.0)
    }

    /// Full assessment for a loan
    pub fn assess(&self, loan_amount: f64, deposit_percent: f64) -> LmiAssessment {
        let lvr_percent = lvr_from_deposit(deposit_percent);

        if !self.is_required(deposit_percent) || !(loan_amount > 0.0) {
            return LmiAssessment {
                required: self.is_required(deposit_percent),
                lvr_percent,
                rate: 0.0,
                estimate: 0.0,
            };
        }

        let rate = self.rate_for_lvr(lvr_percent);
        LmiAssessment {
            required: true,
            lvr_percent,
            rate,
            estimate: finite_or_zero(loan_amount * rate),
        }
    }

    /// Estimated premium; 0 when the deposit meets the threshold
    pub fn estimate(&self, loan_amount: f64, deposit_percent: f64) -> f64 {
        self.assess(loan_amount, deposit_percent).estimate
    }
}

impl Default for LmiSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

/// Loan-to-value ratio implied by a deposit percentage
pub fn lvr_from_deposit(deposit_percent: f64) -> f64 {
    100.0 - deposit_percent
}

/// Estimated LMI under the standard tiers
pub fn compute_lmi(loan_amount: f64, deposit_percent: f64) -> f64 {
    DEFAULT_SCHEDULE.estimate(loan_amount, deposit_percent)
}

fn validate_tiers(tiers: &[LmiTier]) -> Result<(), ScheduleError> {
    if tiers.is_empty() {
        return Err(ScheduleError::Empty { table: TABLE });
    }

    let mut previous = f64::INFINITY;
    for (index, tier) in tiers.iter().enumerate() {
        if !tier.lvr_above.is_finite() || !(0.0..=100.0).contains(&tier.lvr_above) {
            return Err(ScheduleError::OutOfRange {
                table: TABLE,
                index,
                field: "lvr_above",
                value: tier.lvr_above,
            });
        }
        if !tier.rate.is_finite() || !(0.0..=1.0).contains(&tier.rate) {
            return Err(ScheduleError::OutOfRange {
                table: TABLE,
                index,
                field: "rate",
                value: tier.rate,
            });
        }
        if tier.lvr_above >= previous {
            return Err(ScheduleError::NotDescending {
                table: TABLE,
                index,
                threshold: tier.lvr_above,
                previous,
            });
        }
        previous = tier.lvr_above;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_selection() {
        let lmi = LmiSchedule::standard();
        assert_eq!(lmi.rate_for_lvr(96.0), 0.04);
        assert_eq!(lmi.rate_for_lvr(95.0), 0.03);
        assert_eq!(lmi.rate_for_lvr(90.0), 0.02);
        assert_eq!(lmi.rate_for_lvr(85.5), 0.02);
        assert_eq!(lmi.rate_for_lvr(81.0), 0.01);
        assert_eq!(lmi.rate_for_lvr(80.0), 0.0);
        assert_eq!(lmi.rate_for_lvr(50.0), 0.0);
    }

    #[test]
    fn test_ten_percent_deposit() {
        // LVR 90 sits in the "> 85" tier
        assert_eq!(compute_lmi(450_000.0, 10.0), 9_000.0);
    }

    #[test]
    fn test_five_percent_deposit() {
        assert_eq!(compute_lmi(475_000.0, 5.0), 14_250.0);
    }

    #[test]
    fn test_threshold_deposit_not_required() {
        let lmi = LmiSchedule::standard();
        assert!(!lmi.is_required(20.0));
        assert!(lmi.is_required(19.99));
        assert_eq!(compute_lmi(800_000.0, 20.0), 0.0);
        assert_eq!(compute_lmi(10_000_000.0, 50.0), 0.0);
    }

    #[test]
    fn test_just_below_threshold_uses_lowest_tier() {
        let assessment = LmiSchedule::standard().assess(100_000.0, 19.5);
        assert!(assessment.required);
        assert_eq!(assessment.rate, 0.01);
        assert!((assessment.estimate - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_assess_reports_lvr() {
        let assessment = LmiSchedule::standard().assess(450_000.0, 10.0);
        assert_eq!(assessment.lvr_percent, 90.0);
        assert_eq!(assessment.rate, 0.02);
    }

    #[test]
    fn test_rejects_ascending_tiers() {
        let result = LmiSchedule::new(20.0, vec![LmiTier::new(80.0, 0.01), LmiTier::new(90.0, 0.03)]);
        assert!(matches!(result, Err(ScheduleError::NotDescending { index: 1, .. })));
    }

    #[test]
    fn test_rejects_bad_threshold_and_rates() {
        assert!(LmiSchedule::new(0.0, vec![LmiTier::new(80.0, 0.01)]).is_err());
        assert!(LmiSchedule::new(20.0, vec![LmiTier::new(80.0, 1.5)]).is_err());
        assert!(LmiSchedule::new(20.0, vec![LmiTier::new(120.0, 0.01)]).is_err());
        assert!(LmiSchedule::new(20.0, vec![]).is_err());
    }

    #[test]
    fn test_standard_is_valid() {
        let standard = LmiSchedule::standard();
        assert!(LmiSchedule::new(20.0, standard.tiers().to_vec()).is_ok());
    }
}
