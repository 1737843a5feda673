//! Caller-side input policy
//!
//! The calculator accepts any mathematically valid input. Which deposits,
//! rates and terms a product actually offers is a business decision made by
//! the caller; this module holds that decision as data.

use serde::Serialize;

use crate::calculator::CalculatorInput;
use crate::error::PolicyViolation;

/// Inclusive percentage range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentRange {
    pub min: f64,
    pub max: f64,
}

impl PercentRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ranges and terms a product offers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputPolicy {
    pub deposit_percent: PercentRange,
    pub interest_rate_percent: PercentRange,
    /// Offered loan terms; empty accepts any term
    pub loan_terms_years: Vec<u32>,
}

impl InputPolicy {
    /// The calculator's published affordances: 5-50% deposit, 4-10% rate,
    /// 25 or 30 year terms
    pub fn reference() -> Self {
        Self {
            deposit_percent: PercentRange::new(5.0, 50.0),
            interest_rate_percent: PercentRange::new(4.0, 10.0),
            loan_terms_years: vec![25, 30],
        }
    }

    /// Every violation in `input`, in field order
    pub fn violations(&self, input: &CalculatorInput) -> Vec<PolicyViolation> {
        let mut found = Vec::new();

        if !self.deposit_percent.contains(input.deposit_percent) {
            found.push(PolicyViolation::DepositOutOfRange {
                value: input.deposit_percent,
                min: self.deposit_percent.min,
                max: self.deposit_percent.max,
            });
        }

        if !self
            .interest_rate_percent
            .contains(input.annual_interest_rate_percent)
        {
            found.push(PolicyViolation::InterestRateOutOfRange {
                value: input.annual_interest_rate_percent,
                min: self.interest_rate_percent.min,
                max: self.interest_rate_percent.max,
            });
        }

        if !self.offers_term(input.loan_term_years) {
            found.push(PolicyViolation::TermNotOffered {
                value: input.loan_term_years,
                allowed: self.loan_terms_years.clone(),
            });
        }

        found
    }

    /// First violation in `input`, if any
    pub fn check(&self, input: &CalculatorInput) -> Result<(), PolicyViolation> {
        match self.violations(input).into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }

    fn offers_term(&self, years: f64) -> bool {
        self.loan_terms_years.is_empty()
            || self
                .loan_terms_years
                .iter()
                .any(|&offered| f64::from(offered) == years)
    }
}

impl Default for InputPolicy {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(deposit: f64, rate: f64, term: u32) -> CalculatorInput {
        CalculatorInput::new(750_000.0, deposit, rate, term)
    }

    #[test]
    fn test_reference_accepts_offered_values() {
        let policy = InputPolicy::reference();
        assert!(policy.check(&input(5.0, 4.0, 25)).is_ok());
        assert!(policy.check(&input(50.0, 10.0, 30)).is_ok());
        assert!(policy.check(&input(20.0, 6.14, 30)).is_ok());
    }

    #[test]
    fn test_deposit_out_of_range() {
        let policy = InputPolicy::reference();
        assert!(matches!(
            policy.check(&input(4.0, 6.0, 30)),
            Err(PolicyViolation::DepositOutOfRange { .. })
        ));
    }

    #[test]
    fn test_term_not_offered() {
        let policy = InputPolicy::reference();
        let err = policy.check(&input(20.0, 6.0, 15)).unwrap_err();
        assert_eq!(err.code(), "term_not_offered");
    }

    #[test]
    fn test_collects_every_violation() {
        let policy = InputPolicy::reference();
        let found = policy.violations(&input(60.0, 12.0, 40));
        assert_eq!(found.len(), 3);
        assert!(matches!(found[1], PolicyViolation::InterestRateOutOfRange { .. }));
    }

    #[test]
    fn test_empty_terms_accept_any() {
        let policy = InputPolicy {
            loan_terms_years: Vec::new(),
            ..InputPolicy::reference()
        };
        assert!(policy.check(&input(20.0, 6.0, 17)).is_ok());
    }
}
