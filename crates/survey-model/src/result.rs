//! Result objects handed to rendering layers.
//!
//! All of them are created fresh per call and owned by the caller.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleTabRow {
    pub value: String,
    pub count: usize,
    pub percentage: f64,
}

/// Frequency table for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleTabResult {
    pub column: String,
    pub rows: Vec<SimpleTabRow>,
    /// Sum of row counts after filtering and null exclusion.
    pub total: usize,
}

impl SimpleTabResult {
    pub fn row(&self, value: &str) -> Option<&SimpleTabRow> {
        self.rows.iter().find(|row| row.value == value)
    }

    pub fn values(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.value.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossTabRow {
    pub x_value: String,
    pub y_value: String,
    pub count: usize,
    /// Share of `count` within its x-value partition.
    pub percentage: f64,
}

/// Joint frequency table for two columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossTabResult {
    pub x_column: String,
    pub y_column: String,
    pub rows: Vec<CrossTabRow>,
    pub total: usize,
}

impl CrossTabResult {
    pub fn row(&self, x: &str, y: &str) -> Option<&CrossTabRow> {
        self.rows
            .iter()
            .find(|row| row.x_value == x && row.y_value == y)
    }
}

/// One cell of a [`CrossTabPivot`].
///
/// `exists == false` means the pair never co-occurred in the data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PivotCell {
    pub count: usize,
    pub percentage: f64,
    pub exists: bool,
}

/// Dense matrix view of a cross tabulation. `matrix[x][y]` follows the
/// order of `x_values` and `y_values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossTabPivot {
    pub x_column: String,
    pub y_column: String,
    pub x_values: Vec<String>,
    pub y_values: Vec<String>,
    pub matrix: Vec<Vec<PivotCell>>,
    pub total: usize,
}

impl CrossTabPivot {
    pub fn cell(&self, x: &str, y: &str) -> Option<&PivotCell> {
        let xi = self.x_values.iter().position(|v| v == x)?;
        let yi = self.y_values.iter().position(|v| v == y)?;
        self.matrix.get(xi)?.get(yi)
    }

    /// Sum of counts in the row for `x`.
    pub fn row_total(&self, x: &str) -> Option<usize> {
        let xi = self.x_values.iter().position(|v| v == x)?;
        Some(self.matrix.get(xi)?.iter().map(|cell| cell.count).sum())
    }
}

/// How many rows a filter keeps and drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterImpact {
    pub filter: String,
    pub total: usize,
    pub matched: usize,
    pub excluded: usize,
}

impl FilterImpact {
    pub fn new(filter: impl Into<String>, total: usize, matched: usize) -> Self {
        Self {
            filter: filter.into(),
            total,
            matched,
            excluded: total.saturating_sub(matched),
        }
    }
}
