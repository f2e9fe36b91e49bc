//! Resolved column metadata.

use serde::{Deserialize, Serialize};

use crate::definition::CalculationType;
use crate::expr::Expr;

/// Name and storage type of a base dataset column, as reported by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A column as presented to analysts: base columns first, derived after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// 1-based position in the resolved column list.
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    /// Holds several answers per record joined by `split_separator`.
    pub is_multi: bool,
    pub is_derived: bool,
    /// Calculation behind a derived column; `None` for base columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<CalculationType>,
    /// Expression producing the column's value for one row.
    pub expression: Expr,
    /// Separator used when the column is fanned out. `None` means the column
    /// can never be split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_separator: Option<String>,
}

impl Column {
    pub fn base(
        index: usize,
        schema: ColumnSchema,
        is_multi: bool,
        separator: impl Into<String>,
    ) -> Self {
        let expression = Expr::col(schema.name.as_str());
        Self {
            index,
            name: schema.name,
            data_type: schema.data_type,
            is_multi,
            is_derived: false,
            calculation: None,
            expression,
            split_separator: Some(separator.into()),
        }
    }

    /// Whether a split request is honoured for this column.
    ///
    /// Derived columns only split when they are multi-valued by construction.
    pub fn can_split(&self) -> bool {
        self.split_separator.is_some() && (!self.is_derived || self.is_multi)
    }

    /// The separator to fan out on, if `requested` and allowed.
    pub fn fan_out(&self, requested: bool) -> Option<&str> {
        if requested && self.can_split() {
            self.split_separator.as_deref()
        } else {
            None
        }
    }

    /// Short marker for listings.
    pub fn marker(&self) -> Option<&'static str> {
        if self.is_derived {
            Some("derived")
        } else if self.is_multi {
            Some("multi")
        } else {
            None
        }
    }
}
