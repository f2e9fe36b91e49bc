//! [`QueryExecutor`] over an in-memory polars [`DataFrame`].

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use polars::prelude::{Column, DataFrame};
use survey_common::any_to_value;
use survey_model::{ColumnSchema, Expr, Value};
use tracing::debug;

use crate::error::QueryError;
use crate::eval::{RowSource, evaluate, passes};
use crate::query::{AggregateQuery, GroupKey, GroupRow, QueryExecutor, sort_rows};

/// Embedded executor evaluating queries row by row against a `DataFrame`.
#[derive(Debug, Clone)]
pub struct FrameExecutor {
    df: DataFrame,
}

impl FrameExecutor {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Looks up every column the expressions reference. Names the frame
    /// lacks are left out and read as null.
    fn resolve<'a>(&'a self, exprs: impl IntoIterator<Item = &'a Expr>) -> FrameColumns<'a> {
        let names: BTreeSet<&str> = exprs
            .into_iter()
            .flat_map(Expr::referenced_columns)
            .collect();
        let columns = names
            .into_iter()
            .filter_map(|name| self.df.column(name).ok().map(|column| (name, column)))
            .collect();
        FrameColumns { columns }
    }
}

struct FrameColumns<'a> {
    columns: HashMap<&'a str, &'a Column>,
}

impl FrameColumns<'_> {
    fn row(&self, idx: usize) -> FrameRow<'_> {
        FrameRow {
            columns: &self.columns,
            idx,
        }
    }
}

struct FrameRow<'a> {
    columns: &'a HashMap<&'a str, &'a Column>,
    idx: usize,
}

impl RowSource for FrameRow<'_> {
    fn value(&self, column: &str) -> Value {
        self.columns
            .get(column)
            .and_then(|c| c.get(self.idx).ok())
            .map_or(Value::Null, any_to_value)
    }
}

/// Expands one evaluated key into its group elements.
///
/// Without a separator the key is a single element. With one, the text is
/// split and trimmed, empty pieces are dropped, and an all-empty value still
/// yields one empty element so the record is counted.
pub fn fan_out_key(value: Value, separator: Option<&str>) -> Vec<Option<String>> {
    let Some(text) = value.into_text() else {
        return vec![None];
    };
    let Some(separator) = separator.filter(|s| !s.is_empty()) else {
        return vec![Some(text)];
    };
    let elements: Vec<Option<String>> = text
        .split(separator)
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .map(|element| Some(element.to_string()))
        .collect();
    if elements.is_empty() {
        vec![Some(String::new())]
    } else {
        elements
    }
}

/// Cartesian product of the per-key element lists.
fn combinations(per_key: Vec<Vec<Option<String>>>) -> Vec<Vec<Option<String>>> {
    per_key.into_iter().fold(vec![Vec::new()], |acc, elements| {
        acc.iter()
            .flat_map(|prefix| {
                elements.iter().map(move |element| {
                    let mut combined = prefix.clone();
                    combined.push(element.clone());
                    combined
                })
            })
            .collect()
    })
}

impl QueryExecutor for FrameExecutor {
    fn describe(&self) -> Result<Vec<ColumnSchema>, QueryError> {
        Ok(self
            .df
            .get_columns()
            .iter()
            .map(|column| ColumnSchema::new(column.name().as_str(), column.dtype().to_string()))
            .collect())
    }

    fn count(&self, predicate: Option<&Expr>) -> Result<usize, QueryError> {
        let Some(predicate) = predicate else {
            return Ok(self.df.height());
        };
        let columns = self.resolve([predicate]);
        Ok((0..self.df.height())
            .filter(|&idx| passes(predicate, &columns.row(idx)))
            .count())
    }

    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<GroupRow>, QueryError> {
        let start = Instant::now();
        let columns = self.resolve(
            query
                .keys
                .iter()
                .map(|key| &key.expr)
                .chain(query.predicate.as_ref()),
        );

        let mut counts: HashMap<Vec<Option<String>>, usize> = HashMap::new();
        let mut matched_rows = 0usize;
        for idx in 0..self.df.height() {
            let row = columns.row(idx);
            if let Some(predicate) = &query.predicate
                && !passes(predicate, &row)
            {
                continue;
            }
            matched_rows += 1;
            let per_key = query
                .keys
                .iter()
                .map(|GroupKey { expr, fan_out }| {
                    fan_out_key(evaluate(expr, &row), fan_out.as_deref())
                })
                .collect();
            for keys in combinations(per_key) {
                *counts.entry(keys).or_default() += 1;
            }
        }

        let mut rows: Vec<GroupRow> = counts
            .into_iter()
            .map(|(keys, count)| GroupRow { keys, count })
            .collect();
        sort_rows(&mut rows, &query.order_by);

        debug!(
            rows = self.df.height(),
            matched_rows,
            groups = rows.len(),
            duration_ms = start.elapsed().as_millis(),
            "aggregate query"
        );
        Ok(rows)
    }
}
