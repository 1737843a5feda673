//! Loan affordability calculation core
//!
//! This crate holds the pure calculations behind the HAUS calculator:
//! - Amortized repayments and yearly schedules
//! - Progressive stamp duty over a swappable bracket table
//! - Tiered LMI estimates
//! - Input validation, caller-side input policy and currency formatting
//!
//! Nothing here performs I/O or holds mutable state, so every function is
//! safe to call from any thread.

pub mod brackets;
pub mod calculator;
pub mod error;
pub mod financial;
pub mod format;
pub mod lmi;
pub mod policy;
pub mod stamp_duty;

pub use brackets::{first_matching, Bracket};
pub use calculator::{
    calculate_loan, AffordabilityCalculator, CalculatorInput, CalculatorResult, LoanCalculator,
    ValidatedInput, MAX_LOAN_TERM_YEARS, MAX_SCHEDULE_YEARS,
};
pub use error::{PolicyViolation, ScheduleError, ValidationError};
pub use financial::{
    amortization_schedule, calculate_repayment, compute_amortization, Amortization, ScheduleYear,
    MONTHS_PER_YEAR,
};
pub use format::{CurrencyFormat, DEFAULT_COMPACT_THRESHOLD};
pub use lmi::{
    compute_lmi, lvr_from_deposit, LmiAssessment, LmiSchedule, LmiTier,
    DEFAULT_DEPOSIT_THRESHOLD_PERCENT,
};
pub use policy::{InputPolicy, PercentRange};
pub use stamp_duty::{compute_stamp_duty, DutyBracket, StampDutySchedule};
