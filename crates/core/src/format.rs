//! Currency display formatting
//!
//! Presentation only. Nothing here feeds back into a calculation.

use serde::Serialize;

/// Amount at which [`CurrencyFormat::format_compact`] switches to millions
pub const DEFAULT_COMPACT_THRESHOLD: f64 = 1_000_000.0;

/// How amounts are rendered for a market
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyFormat {
    /// Prefix symbol (e.g. "$")
    pub symbol: String,
    /// ISO 4217 code (e.g. "AUD")
    pub code: String,
    /// Amounts at or above this are shown as millions
    pub compact_threshold: f64,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "$".to_string(),
            code: "AUD".to_string(),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }
}

impl CurrencyFormat {
    /// Whole units with thousands separators: `$1,234,567`
    pub fn format(&self, amount: f64) -> String {
        if !amount.is_finite() {
            return format!("{}0", self.symbol);
        }

        let rounded = amount.round();
        let sign = if rounded < 0.0 { "-" } else { "" };
        let digits = format!("{:.0}", rounded.abs());

        format!("{}{}{}", sign, self.symbol, group_thousands(&digits))
    }

    /// Millions as `$1.25M`, smaller amounts as [`format`](Self::format)
    pub fn format_compact(&self, amount: f64) -> String {
        if amount.is_finite() && amount.abs() >= self.compact_threshold {
            let sign = if amount < 0.0 { "-" } else { "" };
            format!("{}{}{:.2}M", sign, self.symbol, amount.abs() / 1_000_000.0)
        } else {
            self.format(amount)
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
