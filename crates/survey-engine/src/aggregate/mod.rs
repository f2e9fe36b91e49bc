//! Frequency tabulation of one column and cross tabulation of two.

mod cross;
mod simple;

pub use cross::crosstab;
pub use simple::tabulate;

use survey_model::{Column, Expr};

use crate::query::GroupKey;

/// `count * 100 / total` rounded to one decimal, ties to even.
///
/// Computed on integers so ties are exact. A zero total yields 0.0.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let scaled = count as u128 * 1_000;
    let total = total as u128;
    let mut tenths = scaled / total;
    let twice_remainder = (scaled % total) * 2;
    if twice_remainder > total || (twice_remainder == total && tenths % 2 == 1) {
        tenths += 1;
    }
    tenths as f64 / 10.0
}

/// One tabulation axis: the column, and whether fan-out was requested.
#[derive(Debug, Clone, Copy)]
pub struct Axis<'a> {
    pub column: &'a Column,
    pub split: bool,
}

impl<'a> Axis<'a> {
    pub fn new(column: &'a Column, split: bool) -> Self {
        Self { column, split }
    }

    /// Whether fan-out actually happens. Single-valued derived columns never split.
    pub fn splits(&self) -> bool {
        self.column.fan_out(self.split).is_some()
    }

    pub fn key(&self) -> GroupKey {
        GroupKey::fanned_out(
            self.column.expression.clone(),
            self.column.fan_out(self.split),
        )
    }

    /// Base columns drop nulls. Derived columns keep them, since they spell
    /// out missing data as labels.
    pub fn null_guard(&self) -> Expr {
        if self.column.is_derived {
            Expr::always()
        } else {
            self.column.expression.clone().is_not_null()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(3, 3), 100.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn ties_go_to_even() {
        // 1/16 = 6.25%, 3/16 = 18.75%
        assert_eq!(percentage(1, 16), 6.2);
        assert_eq!(percentage(3, 16), 18.8);
        // 1/80 = 1.25%
        assert_eq!(percentage(1, 80), 1.2);
        // 3/80 = 3.75%
        assert_eq!(percentage(3, 80), 3.8);
    }
}
