//! Error types for the calculation core
//!
//! Every failure here is a caller-correctable input problem. Nothing in the
//! core panics on bad input and nothing is retried.

use thiserror::Error;

/// Input validation failure for a loan calculation
///
/// Each variant carries the offending value so callers can echo it back.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid property price: {0} (must be a finite amount greater than zero)")]
    InvalidPropertyPrice(f64),

    #[error("Invalid deposit percent: {0} (must be finite and strictly between 0 and 100)")]
    InvalidDepositPercent(f64),

    #[error("Invalid interest rate: {0}% (must be a finite rate greater than zero)")]
    InvalidInterestRate(f64),

    #[error("Invalid loan term: {0} years (must be a positive whole number of years)")]
    InvalidLoanTerm(f64),

    #[error("Invalid loan amount: {0} (must be finite and not negative)")]
    InvalidLoanAmount(f64),
}

impl ValidationError {
    /// Stable machine-readable code, used in API responses and metric labels
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPropertyPrice(_) => "invalid_property_price",
            Self::InvalidDepositPercent(_) => "invalid_deposit_percent",
            Self::InvalidInterestRate(_) => "invalid_interest_rate",
            Self::InvalidLoanTerm(_) => "invalid_loan_term",
            Self::InvalidLoanAmount(_) => "invalid_loan_amount",
        }
    }

    /// Name of the input field that failed
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidPropertyPrice(_) => "property_price",
            Self::InvalidDepositPercent(_) => "deposit_percent",
            Self::InvalidInterestRate(_) => "annual_interest_rate_percent",
            Self::InvalidLoanTerm(_) => "loan_term_years",
            Self::InvalidLoanAmount(_) => "loan_amount",
        }
    }
}

/// A stamp-duty or LMI table that cannot be evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("{table} has no entries")]
    Empty { table: &'static str },

    #[error("{table} entry {index}: bound {bound} is not above the previous bound {previous}")]
    NotAscending {
        table: &'static str,
        index: usize,
        bound: f64,
        previous: f64,
    },

    #[error("{table} entry {index}: threshold {threshold} is not below the previous threshold {previous}")]
    NotDescending {
        table: &'static str,
        index: usize,
        threshold: f64,
        previous: f64,
    },

    #[error("{table} must end with exactly one unbounded entry")]
    MissingOpenBracket { table: &'static str },

    #[error("{table} entry {index}: unbounded entry must be last")]
    OpenBracketNotLast { table: &'static str, index: usize },

    #[error("{table} entry {index}: {field} = {value} is out of range")]
    OutOfRange {
        table: &'static str,
        index: usize,
        field: &'static str,
        value: f64,
    },
}

/// Caller-side input policy violation (see [`crate::policy::InputPolicy`])
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyViolation {
    #[error("Deposit {value}% is outside the offered range {min}%-{max}%")]
    DepositOutOfRange { value: f64, min: f64, max: f64 },

    #[error("Interest rate {value}% is outside the offered range {min}%-{max}%")]
    InterestRateOutOfRange { value: f64, min: f64, max: f64 },

    #[error("Loan term of {value} years is not offered (available: {allowed:?})")]
    TermNotOffered { value: f64, allowed: Vec<u32> },
}

impl PolicyViolation {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::DepositOutOfRange { .. } => "deposit_out_of_range",
            Self::InterestRateOutOfRange { .. } => "interest_rate_out_of_range",
            Self::TermNotOffered { .. } => "term_not_offered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_codes() {
        assert_eq!(
            ValidationError::InvalidPropertyPrice(0.0).code(),
            "invalid_property_price"
        );
        assert_eq!(ValidationError::InvalidLoanTerm(2.5).field(), "loan_term_years");
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InvalidDepositPercent(120.0);
        let display = err.to_string();
        assert!(display.contains("120"));
        assert!(display.contains("deposit"));
    }

    #[test]
    fn test_schedule_error_display() {
        let err = ScheduleError::NotAscending {
            table: "stamp_duty",
            index: 2,
            bound: 10.0,
            previous: 20.0,
        };
        assert!(err.to_string().contains("entry 2"));
    }
}
