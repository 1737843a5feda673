//! Amortization engine
//!
//! Fixed-rate, fixed-term, principal-and-interest loan maths. This is the
//! single source of truth for repayment figures; nothing else in the
//! workspace re-derives them.
//!
//! All values are `f64` and nothing is rounded here. Rounding happens only
//! when figures are formatted for display (see [`crate::format`]).

use serde::Serialize;

/// Number of repayments per year
pub const MONTHS_PER_YEAR: u32 = 12;

/// Upper bound on the rows reserved up front for a schedule
const MAX_SCHEDULE_CAPACITY: u32 = 1_200;

/// Repayment figures for one loan
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Amortization {
    /// Fixed monthly repayment
    pub monthly_repayment: f64,
    /// Monthly repayment times the number of repayments
    pub total_repayment: f64,
    /// Total repayment less the principal
    pub total_interest: f64,
}

/// One year of an amortization schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduleYear {
    /// 1-based year number
    pub year: u32,
    /// Balance owing at the start of the year
    pub opening_balance: f64,
    /// Principal repaid during the year
    pub principal_paid: f64,
    /// Interest charged during the year
    pub interest_paid: f64,
    /// Balance owing at the end of the year
    pub closing_balance: f64,
}

/// Convert an annual percentage rate to a monthly fraction
///
/// `6.0` (percent per year) becomes `0.005` per month.
pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / MONTHS_PER_YEAR as f64
}

/// Calculate the fixed monthly repayment.
///
/// Repayment = P × r × (1 + r)^n / [(1 + r)^n - 1]
///
/// Where:
/// - P = principal
/// - r = monthly rate (annual_rate_percent / 100 / 12)
/// - n = number of monthly repayments
///
/// Returns 0.0 for a non-positive principal or zero repayments. A zero rate
/// repays the principal in equal instalments. Non-finite results are
/// clamped to 0.0.
pub fn calculate_repayment(principal: f64, annual_rate_percent: f64, tenure_months: u32) -> f64 {
    if tenure_months == 0 || !(principal > 0.0) {
        return 0.0;
    }

    let payments = tenure_months as f64;
    let rate = monthly_rate(annual_rate_percent);

    if rate == 0.0 {
        return finite_or_zero(principal / payments);
    }

    // powi keeps full precision for integer month counts
    let n = i32::try_from(tenure_months).unwrap_or(i32::MAX);
    let factor = (1.0 + rate).powi(n);
    let growth = factor - 1.0;

    // Rates too small to move (1 + r) behave like a zero rate
    if growth == 0.0 {
        return finite_or_zero(principal / payments);
    }

    // Very long terms overflow the factor; the repayment tends to interest-only
    if factor.is_infinite() {
        return finite_or_zero(principal * rate);
    }

    finite_or_zero(principal * rate * factor / growth)
}

/// Compute repayment, total repayment and total interest for a loan.
///
/// A non-positive loan amount or zero term yields all zeros.
pub fn compute_amortization(
    loan_amount: f64,
    annual_rate_percent: f64,
    loan_term_years: u32,
) -> Amortization {
    if !(loan_amount > 0.0) || loan_term_years == 0 {
        return Amortization::default();
    }

    let payments = loan_term_years.saturating_mul(MONTHS_PER_YEAR);
    let monthly_repayment = calculate_repayment(loan_amount, annual_rate_percent, payments);
    let total_repayment = finite_or_zero(monthly_repayment * payments as f64);
    let total_interest = finite_or_zero(total_repayment - loan_amount);

    tracing::trace!(
        loan_amount,
        annual_rate_percent,
        payments,
        monthly_repayment,
        "Computed amortization"
    );

    Amortization {
        monthly_repayment,
        total_repayment,
        total_interest,
    }
}

/// Build a year-by-year schedule of balances, principal and interest.
///
/// Interest accrues monthly on the outstanding balance. The last repayment
/// clears whatever residual floating-point balance remains so the schedule
/// always closes at zero.
pub fn amortization_schedule(
    loan_amount: f64,
    annual_rate_percent: f64,
    loan_term_years: u32,
) -> Vec<ScheduleYear> {
    if !(loan_amount > 0.0) || loan_term_years == 0 || !loan_amount.is_finite() {
        return Vec::new();
    }

    let payments = loan_term_years.saturating_mul(MONTHS_PER_YEAR);
    let rate = monthly_rate(annual_rate_percent);
    let repayment = calculate_repayment(loan_amount, annual_rate_percent, payments);

    let mut years = Vec::with_capacity(loan_term_years.min(MAX_SCHEDULE_CAPACITY) as usize);
    let mut balance = loan_amount;

    for year in 1..=loan_term_years {
        let opening_balance = balance;
        let mut principal_paid = 0.0;
        let mut interest_paid = 0.0;

        for month in 0..MONTHS_PER_YEAR {
            let interest = finite_or_zero(balance * rate);
            let is_last = year == loan_term_years && month == MONTHS_PER_YEAR - 1;
            let principal = if is_last {
                balance
            } else {
                (repayment - interest).clamp(0.0, balance)
            };

            interest_paid += interest;
            principal_paid += principal;
            balance -= principal;
        }

        years.push(ScheduleYear {
            year,
            opening_balance,
            principal_paid,
            interest_paid,
            closing_balance: balance.max(0.0),
        });
    }

    years
}

/// Replace NaN and infinities with 0.0
pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_repayment() {
        // 100k at 12% over one year
        let emi = calculate_repayment(100_000.0, 12.0, 12);
        assert!((emi - 8884.88).abs() < 0.01, "got {}", emi);
    }

    #[test]
    fn test_repayment_zero_principal() {
        assert_eq!(calculate_repayment(0.0, 6.0, 360), 0.0);
        assert_eq!(calculate_repayment(-10.0, 6.0, 360), 0.0);
        assert_eq!(calculate_repayment(f64::NAN, 6.0, 360), 0.0);
    }

    #[test]
    fn test_repayment_zero_tenure() {
        assert_eq!(calculate_repayment(100_000.0, 6.0, 0), 0.0);
    }

    #[test]
    fn test_repayment_zero_rate_is_exact_division() {
        let repayment = calculate_repayment(450_000.0, 0.0, 360);
        assert_eq!(repayment, 450_000.0 / 360.0);
    }

    #[test]
    fn test_repayment_tiny_rate_does_not_divide_by_zero() {
        let repayment = calculate_repayment(360_000.0, 1e-15, 360);
        assert!(repayment.is_finite());
        assert!((repayment - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_repayment_overflowing_factor_tends_to_interest_only() {
        let repayment = calculate_repayment(100_000.0, 1200.0, 1_000_000);
        // 100% per month, interest-only
        assert_eq!(repayment, 100_000.0);
    }

    #[test]
    fn test_compute_amortization_reference_loan() {
        let a = compute_amortization(800_000.0, 6.14, 30);
        assert!((a.monthly_repayment - 4868.65).abs() < 0.01, "got {}", a.monthly_repayment);
        assert_eq!(a.total_repayment, a.monthly_repayment * 360.0);
        assert_eq!(a.total_interest, a.total_repayment - 800_000.0);
    }

    #[test]
    fn test_compute_amortization_zero_rate() {
        let a = compute_amortization(450_000.0, 0.0, 30);
        assert_eq!(a.monthly_repayment, 450_000.0 / 360.0);
        assert!(a.total_interest.abs() < 1e-6);
    }

    #[test]
    fn test_compute_amortization_non_positive_loan() {
        assert_eq!(compute_amortization(0.0, 6.0, 30), Amortization::default());
        assert_eq!(compute_amortization(-5.0, 6.0, 30), Amortization::default());
    }

    #[test]
    fn test_compute_amortization_never_returns_non_finite() {
        let a = compute_amortization(f64::MAX, 6.0, 30);
        assert!(a.monthly_repayment.is_finite());
        assert!(a.total_repayment.is_finite());
        assert!(a.total_interest.is_finite());
    }

    #[test]
    fn test_schedule_closes_at_zero() {
        let schedule = amortization_schedule(500_000.0, 6.0, 25);
        assert_eq!(schedule.len(), 25);
        assert_eq!(schedule[0].opening_balance, 500_000.0);
        assert_eq!(schedule.last().map(|y| y.closing_balance), Some(0.0));

        let principal: f64 = schedule.iter().map(|y| y.principal_paid).sum();
        assert!((principal - 500_000.0).abs() < 1e-4);
    }

    #[test]
    fn test_schedule_interest_matches_totals() {
        let totals = compute_amortization(300_000.0, 5.5, 30);
        let schedule = amortization_schedule(300_000.0, 5.5, 30);
        let interest: f64 = schedule.iter().map(|y| y.interest_paid).sum();
        assert!((interest - totals.total_interest).abs() < 1.0);
    }

    #[test]
    fn test_schedule_balances_chain() {
        let schedule = amortization_schedule(200_000.0, 7.0, 10);
        for pair in schedule.windows(2) {
            assert_eq!(pair[0].closing_balance, pair[1].opening_balance);
            assert!(pair[1].closing_balance < pair[0].closing_balance);
        }
    }

    #[test]
    fn test_schedule_zero_rate_is_linear() {
        let schedule = amortization_schedule(120_000.0, 0.0, 10);
        for year in &schedule {
            assert_eq!(year.interest_paid, 0.0);
            assert!((year.principal_paid - 12_000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_schedule_empty_for_invalid_loan() {
        assert!(amortization_schedule(0.0, 6.0, 30).is_empty());
        assert!(amortization_schedule(100.0, 6.0, 0).is_empty());
    }
}
