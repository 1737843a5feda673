//! First-matching-bracket lookup
//!
//! Stamp duty, LMI premiums and rate tiers are all ordered tables where the
//! first entry that accepts a value decides the outcome. The tables are data;
//! this module is the only place that walks them.

/// An entry in an ordered lookup table
pub trait Bracket {
    /// Whether `value` falls in this entry
    fn contains(&self, value: f64) -> bool;
}

/// Find the first entry that contains `value`, with its index
pub fn first_matching<B: Bracket>(table: &[B], value: f64) -> Option<(usize, &B)> {
    table
        .iter()
        .enumerate()
        .find(|(_, bracket)| bracket.contains(value))
}
