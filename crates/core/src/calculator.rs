//! Loan affordability calculator
//!
//! Turns a property price and three adjustable parameters into the full set
//! of figures a buyer needs: deposit, loan, repayments, stamp duty and LMI.
//! The stamp-duty and LMI tables are injected, so the same calculator serves
//! any market.
//!
//! # Example
//!
//! ```
//! use haus_core::{calculate_loan, CalculatorInput};
//!
//! let input = CalculatorInput::new(1_000_000.0, 20.0, 6.14, 30);
//! let result = calculate_loan(&input).unwrap();
//!
//! assert_eq!(result.loan_amount, 800_000.0);
//! assert!(!result.lmi_required);
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::financial::{
    amortization_schedule, compute_amortization, finite_or_zero, ScheduleYear, MONTHS_PER_YEAR,
};
use crate::lmi::{LmiAssessment, LmiSchedule};
use crate::stamp_duty::StampDutySchedule;

/// Longest term whose month count still fits the repayment exponent
pub const MAX_LOAN_TERM_YEARS: u32 = (i32::MAX as u32) / MONTHS_PER_YEAR;

/// Longest term a yearly schedule is produced for
///
/// The schedule is one row per year, so its size grows with the term while
/// the closed-form figures do not.
pub const MAX_SCHEDULE_YEARS: u32 = 100;

static DEFAULT_CALCULATOR: Lazy<LoanCalculator> = Lazy::new(LoanCalculator::default);

/// Raw calculator input as supplied by a caller
///
/// The term is carried as a float so that fractional or non-finite terms can
/// be rejected with a proper error instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalculatorInput {
    pub property_price: f64,
    pub deposit_percent: f64,
    pub annual_interest_rate_percent: f64,
    pub loan_term_years: f64,
}

impl CalculatorInput {
    pub fn new(
        property_price: f64,
        deposit_percent: f64,
        annual_interest_rate_percent: f64,
        loan_term_years: u32,
    ) -> Self {
        Self {
            property_price,
            deposit_percent,
            annual_interest_rate_percent,
            loan_term_years: f64::from(loan_term_years),
        }
    }

    /// Check every field, in declaration order, and return the first failure
    pub fn validate(&self) -> Result<ValidatedInput, ValidationError> {
        if !self.property_price.is_finite() || self.property_price <= 0.0 {
            return Err(ValidationError::InvalidPropertyPrice(self.property_price));
        }

        if !self.deposit_percent.is_finite()
            || self.deposit_percent <= 0.0
            || self.deposit_percent >= 100.0
        {
            return Err(ValidationError::InvalidDepositPercent(self.deposit_percent));
        }

        if !self.annual_interest_rate_percent.is_finite() || self.annual_interest_rate_percent <= 0.0
        {
            return Err(ValidationError::InvalidInterestRate(
                self.annual_interest_rate_percent,
            ));
        }

        let term = self.loan_term_years;
        if !term.is_finite()
            || term <= 0.0
            || term.fract() != 0.0
            || term > f64::from(MAX_LOAN_TERM_YEARS)
        {
            return Err(ValidationError::InvalidLoanTerm(term));
        }

        Ok(ValidatedInput {
            property_price: self.property_price,
            deposit_percent: self.deposit_percent,
            annual_interest_rate_percent: self.annual_interest_rate_percent,
            // Whole and within u32 range, checked above
            loan_term_years: term as u32,
        })
    }
}

/// Input that has passed [`CalculatorInput::validate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedInput {
    property_price: f64,
    deposit_percent: f64,
    annual_interest_rate_percent: f64,
    loan_term_years: u32,
}

impl ValidatedInput {
    pub fn property_price(&self) -> f64 {
        self.property_price
    }

    pub fn deposit_percent(&self) -> f64 {
        self.deposit_percent
    }

    pub fn annual_interest_rate_percent(&self) -> f64 {
        self.annual_interest_rate_percent
    }

    pub fn loan_term_years(&self) -> u32 {
        self.loan_term_years
    }

    pub fn deposit_amount(&self) -> f64 {
        self.property_price * (self.deposit_percent / 100.0)
    }

    pub fn loan_amount(&self) -> f64 {
        self.property_price - self.deposit_amount()
    }
}

/// Everything derived from one [`CalculatorInput`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalculatorResult {
    pub deposit_amount: f64,
    pub loan_amount: f64,
    pub monthly_repayment: f64,
    pub total_repayment: f64,
    pub total_interest: f64,
    pub stamp_duty: f64,
    pub lmi_required: bool,
    pub lmi_estimate: f64,
    /// Loan-to-value ratio, percent
    pub lvr_percent: f64,
    pub number_of_payments: u32,
    /// Cash needed at settlement: deposit, stamp duty and LMI
    pub upfront_costs: f64,
}

impl CalculatorResult {
    /// Replace any non-finite figure with 0
    fn sanitized(mut self) -> Self {
        for value in [
            &mut self.deposit_amount,
            &mut self.loan_amount,
            &mut self.monthly_repayment,
            &mut self.total_repayment,
            &mut self.total_interest,
            &mut self.stamp_duty,
            &mut self.lmi_estimate,
            &mut self.lvr_percent,
            &mut self.upfront_costs,
        ] {
            *value = finite_or_zero(*value);
        }
        self
    }
}

/// Market-agnostic affordability interface
///
/// Implementations own their stamp-duty and LMI tables. Every method
/// validates its input and never panics.
pub trait AffordabilityCalculator: Send + Sync {
    /// Full affordability result for one input
    fn calculate(&self, input: &CalculatorInput) -> Result<CalculatorResult, ValidationError>;

    /// Year-by-year repayment schedule for one input
    fn schedule(&self, input: &CalculatorInput) -> Result<Vec<ScheduleYear>, ValidationError>;

    /// Stamp duty on a purchase price
    fn stamp_duty(&self, property_price: f64) -> Result<f64, ValidationError>;

    /// LMI assessment for a loan and the deposit behind it
    fn lmi(&self, loan_amount: f64, deposit_percent: f64)
        -> Result<LmiAssessment, ValidationError>;

    /// Short jurisdiction label (e.g. "NSW")
    fn jurisdiction(&self) -> &str;
}

/// Table-driven calculator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanCalculator {
    stamp_duty: StampDutySchedule,
    lmi: LmiSchedule,
}

impl LoanCalculator {
    pub fn new(stamp_duty: StampDutySchedule, lmi: LmiSchedule) -> Self {
        Self { stamp_duty, lmi }
    }

    pub fn stamp_duty_schedule(&self) -> &StampDutySchedule {
        &self.stamp_duty
    }

    pub fn lmi_schedule(&self) -> &LmiSchedule {
        &self.lmi
    }

    /// Compute a result from input that is already validated
    pub fn calculate_validated(&self, input: &ValidatedInput) -> CalculatorResult {
        let property_price = input.property_price();
        let deposit_amount = input.deposit_amount();
        let loan_amount = input.loan_amount();

        let amortization = compute_amortization(
            loan_amount,
            input.annual_interest_rate_percent(),
            input.loan_term_years(),
        );
        let stamp_duty = self.stamp_duty.compute(property_price);
        let lmi = self.lmi.assess(loan_amount, input.deposit_percent());

        let result = CalculatorResult {
            deposit_amount,
            loan_amount,
            monthly_repayment: amortization.monthly_repayment,
            total_repayment: amortization.total_repayment,
            total_interest: amortization.total_interest,
            stamp_duty,
            lmi_required: lmi.required,
            lmi_estimate: lmi.estimate,
            lvr_percent: loan_amount / property_price * 100.0,
            number_of_payments: input.loan_term_years().saturating_mul(MONTHS_PER_YEAR),
            upfront_costs: deposit_amount + stamp_duty + lmi.estimate,
        }
        .sanitized();

        tracing::debug!(
            jurisdiction = %self.stamp_duty.jurisdiction(),
            property_price,
            deposit_percent = input.deposit_percent(),
            rate = input.annual_interest_rate_percent(),
            term_years = input.loan_term_years(),
            monthly_repayment = result.monthly_repayment,
            lmi_required = result.lmi_required,
            "Calculated loan affordability"
        );

        result
    }
}

impl AffordabilityCalculator for LoanCalculator {
    fn calculate(&self, input: &CalculatorInput) -> Result<CalculatorResult, ValidationError> {
        let validated = input.validate().map_err(|e| {
            tracing::debug!(code = e.code(), error = %e, "Rejected calculator input");
            e
        })?;
        Ok(self.calculate_validated(&validated))
    }

    fn schedule(&self, input: &CalculatorInput) -> Result<Vec<ScheduleYear>, ValidationError> {
        let validated = input.validate()?;
        if validated.loan_term_years() > MAX_SCHEDULE_YEARS {
            return Err(ValidationError::InvalidLoanTerm(input.loan_term_years));
        }
        Ok(amortization_schedule(
            validated.loan_amount(),
            validated.annual_interest_rate_percent(),
            validated.loan_term_years(),
        ))
    }

    fn stamp_duty(&self, property_price: f64) -> Result<f64, ValidationError> {
        if !property_price.is_finite() || property_price <= 0.0 {
            return Err(ValidationError::InvalidPropertyPrice(property_price));
        }
        Ok(finite_or_zero(self.stamp_duty.compute(property_price)))
    }

    fn lmi(
        &self,
        loan_amount: f64,
        deposit_percent: f64,
    ) -> Result<LmiAssessment, ValidationError> {
        if !loan_amount.is_finite() || loan_amount < 0.0 {
            return Err(ValidationError::InvalidLoanAmount(loan_amount));
        }
        if !deposit_percent.is_finite() || deposit_percent <= 0.0 || deposit_percent >= 100.0 {
            return Err(ValidationError::InvalidDepositPercent(deposit_percent));
        }
        Ok(self.lmi.assess(loan_amount, deposit_percent))
    }

    fn jurisdiction(&self) -> &str {
        self.stamp_duty.jurisdiction()
    }
}

/// Calculate with the default NSW stamp duty and standard LMI tiers
pub fn calculate_loan(input: &CalculatorInput) -> Result<CalculatorResult, ValidationError> {
    DEFAULT_CALCULATOR.calculate(input)
}
