//! Progressive stamp-duty schedule
//!
//! Transfer duty is charged on a marginal-rate schedule: each bracket has a
//! fixed base amount plus a rate applied to the part of the price above the
//! previous bracket's upper bound. Brackets are plain data so a jurisdiction
//! can be swapped in without touching [`StampDutySchedule::compute`].

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::brackets::{first_matching, Bracket};
use crate::error::ScheduleError;

const TABLE: &str = "stamp_duty";

static DEFAULT_SCHEDULE: Lazy<StampDutySchedule> = Lazy::new(StampDutySchedule::nsw);

/// One stamp-duty bracket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DutyBracket {
    /// Inclusive upper bound of the bracket (None = unbounded)
    pub upper_bound: Option<f64>,
    /// Duty payable at the previous bracket's upper bound
    pub base_amount: f64,
    /// Rate on the excess over the previous bound, as a fraction (0.045 = 4.5%)
    pub marginal_rate: f64,
}

impl DutyBracket {
    /// Bracket ending at `upper_bound`
    pub fn new(upper_bound: f64, base_amount: f64, marginal_rate: f64) -> Self {
        Self {
            upper_bound: Some(upper_bound),
            base_amount,
            marginal_rate,
        }
    }

    /// Final, unbounded bracket
    pub fn open(base_amount: f64, marginal_rate: f64) -> Self {
        Self {
            upper_bound: None,
            base_amount,
            marginal_rate,
        }
    }
}

impl Bracket for DutyBracket {
    fn contains(&self, value: f64) -> bool {
        self.upper_bound.map_or(true, |upper| value <= upper)
    }
}

/// Ordered stamp-duty brackets for one jurisdiction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StampDutySchedule {
    jurisdiction: String,
    brackets: Vec<DutyBracket>,
}

impl StampDutySchedule {
    /// Build a schedule, rejecting tables that cannot be evaluated
    pub fn new(
        jurisdiction: impl Into<String>,
        brackets: Vec<DutyBracket>,
    ) -> Result<Self, ScheduleError> {
        validate_brackets(&brackets)?;
        Ok(Self {
            jurisdiction: jurisdiction.into(),
            brackets,
        })
    }

    /// NSW general transfer duty rates
    pub fn nsw() -> Self {
        Self {
            jurisdiction: "NSW".to_string(),
            brackets: vec![
                DutyBracket::new(16_000.0, 0.0, 0.0125),
                DutyBracket::new(35_000.0, 200.0, 0.015),
                DutyBracket::new(93_000.0, 485.0, 0.0175),
                DutyBracket::new(351_000.0, 1_500.0, 0.035),
                DutyBracket::new(1_168_000.0, 10_530.0, 0.045),
                DutyBracket::new(3_505_000.0, 47_295.0, 0.055),
                DutyBracket::open(175_832.0, 0.07),
            ],
        }
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    pub fn brackets(&self) -> &[DutyBracket] {
        &self.brackets
    }

    /// Duty payable on a purchase at `property_price`.
    ///
    /// Non-positive or non-finite prices owe nothing.
    pub fn compute(&self, property_price: f64) -> f64 {
        if !(property_price > 0.0) || !property_price.is_finite() {
            return 0.0;
        }

        let Some((index, bracket)) = first_matching(&self.brackets, property_price) else {
            return 0.0;
        };

        let floor = index
            .checked_sub(1)
            .and_then(|prev| self.brackets.get(prev))
            .and_then(|prev| prev.upper_bound)
            .unwrap_or(0.0);

        bracket.base_amount + (property_price - floor) * bracket.marginal_rate
    }
}

impl Default for StampDutySchedule {
    fn default() -> Self {
        Self::nsw()
    }
}

/// Stamp duty on `property_price` under the default (NSW) schedule
pub fn compute_stamp_duty(property_price: f64) -> f64 {
    DEFAULT_SCHEDULE.compute(property_price)
}

fn validate_brackets(brackets: &[DutyBracket]) -> Result<(), ScheduleError> {
    if brackets.is_empty() {
        return Err(ScheduleError::Empty { table: TABLE });
    }

    let mut previous = 0.0;
    let last = brackets.len() - 1;

    for (index, bracket) in brackets.iter().enumerate() {
        if !bracket.base_amount.is_finite() || bracket.base_amount < 0.0 {
            return Err(ScheduleError::OutOfRange {
                table: TABLE,
                index,
                field: "base_amount",
                value: bracket.base_amount,
            });
        }

        if !bracket.marginal_rate.is_finite() || !(0.0..=1.0).contains(&bracket.marginal_rate) {
            return Err(ScheduleError::OutOfRange {
                table: TABLE,
                index,
                field: "marginal_rate",
                value: bracket.marginal_rate,
            });
        }

        match bracket.upper_bound {
            Some(bound) => {
                if !bound.is_finite() || bound <= previous {
                    return Err(ScheduleError::NotAscending {
                        table: TABLE,
                        index,
                        bound,
                        previous,
                    });
                }
                previous = bound;
            }
            None if index != last => {
                return Err(ScheduleError::OpenBracketNotLast { table: TABLE, index });
            }
            None => {}
        }
    }

    if brackets[last].upper_bound.is_some() {
        return Err(ScheduleError::MissingOpenBracket { table: TABLE });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_first_bracket() {
        assert_close(compute_stamp_duty(10_000.0), 125.0);
    }

    #[test]
    fn test_middle_bracket() {
        // 10,530 + (1,000,000 - 351,000) * 4.5%
        assert_close(compute_stamp_duty(1_000_000.0), 39_735.0);
        // 10,530 + (500,000 - 351,000) * 4.5%
        assert_close(compute_stamp_duty(500_000.0), 17_235.0);
    }

    #[test]
    fn test_top_bracket() {
        assert_close(compute_stamp_duty(5_000_000.0), 280_482.0);
    }

    #[test]
    fn test_upper_bound_is_inclusive() {
        // Exactly on a bound uses the lower bracket's formula
        assert_close(compute_stamp_duty(16_000.0), 200.0);
        assert_close(compute_stamp_duty(351_000.0), 10_530.0);
    }

    #[test]
    fn test_non_positive_price_owes_nothing() {
        assert_eq!(compute_stamp_duty(0.0), 0.0);
        assert_eq!(compute_stamp_duty(-100.0), 0.0);
        assert_eq!(compute_stamp_duty(f64::NAN), 0.0);
        assert_eq!(compute_stamp_duty(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_nsw_schedule_is_valid() {
        let nsw = StampDutySchedule::nsw();
        assert!(StampDutySchedule::new("NSW", nsw.brackets().to_vec()).is_ok());
        assert_eq!(nsw.jurisdiction(), "NSW");
    }

    #[test]
    fn test_swapped_schedule() {
        // Flat 2% up to 100k, then 5k + 3% above
        let schedule = StampDutySchedule::new(
            "Testland",
            vec![
                DutyBracket::new(100_000.0, 0.0, 0.02),
                DutyBracket::open(2_000.0, 0.03),
            ],
        )
        .unwrap();
        assert_close(schedule.compute(50_000.0), 1_000.0);
        assert_close(schedule.compute(200_000.0), 5_000.0);
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(
            StampDutySchedule::new("X", vec![]),
            Err(ScheduleError::Empty { table: TABLE })
        );
    }

    #[test]
    fn test_rejects_unordered_bounds() {
        let result = StampDutySchedule::new(
            "X",
            vec![
                DutyBracket::new(50_000.0, 0.0, 0.01),
                DutyBracket::new(20_000.0, 500.0, 0.02),
                DutyBracket::open(1_000.0, 0.03),
            ],
        );
        assert!(matches!(result, Err(ScheduleError::NotAscending { index: 1, .. })));
    }

    #[test]
    fn test_rejects_missing_or_misplaced_open_bracket() {
        let closed = StampDutySchedule::new("X", vec![DutyBracket::new(50_000.0, 0.0, 0.01)]);
        assert!(matches!(closed, Err(ScheduleError::MissingOpenBracket { .. })));

        let misplaced = StampDutySchedule::new(
            "X",
            vec![DutyBracket::open(0.0, 0.01), DutyBracket::new(50_000.0, 0.0, 0.01)],
        );
        assert!(matches!(misplaced, Err(ScheduleError::OpenBracketNotLast { index: 0, .. })));
    }

    #[test]
    fn test_rejects_bad_rates() {
        let negative = StampDutySchedule::new("X", vec![DutyBracket::open(0.0, -0.01)]);
        assert!(matches!(
            negative,
            Err(ScheduleError::OutOfRange { field: "marginal_rate", .. })
        ));

        let nan_base = StampDutySchedule::new("X", vec![DutyBracket::open(f64::NAN, 0.01)]);
        assert!(matches!(
            nan_base,
            Err(ScheduleError::OutOfRange { field: "base_amount", .. })
        ));
    }
}
