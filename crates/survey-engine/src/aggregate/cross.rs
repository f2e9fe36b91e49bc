use std::collections::HashMap;
use std::time::Instant;

use survey_model::{CrossTabResult, CrossTabRow, Expr};
use tracing::{debug, info_span};

use super::{Axis, percentage};
use crate::error::QueryError;
use crate::query::{AggregateQuery, OrderBy, QueryExecutor};

/// Joint counts of `x` and `y` among the rows passing `predicate`.
///
/// Rows are ordered by x value, then count descending. Each row's
/// percentage is its share of the rows with the same x value.
pub fn crosstab(
    executor: &dyn QueryExecutor,
    x: Axis<'_>,
    y: Axis<'_>,
    predicate: &Expr,
) -> Result<CrossTabResult, QueryError> {
    let span = info_span!(
        "crosstab",
        x_column = %x.column.name,
        y_column = %y.column.name,
        split_x = x.splits(),
        split_y = y.splits()
    );
    span.in_scope(|| -> Result<CrossTabResult, QueryError> {
        let start = Instant::now();
        let query = AggregateQuery::new(vec![x.key(), y.key()])
            .with_predicate(Expr::all([
                predicate.clone(),
                x.null_guard(),
                y.null_guard(),
            ]))
            .order_by(OrderBy::KeyAsc(0))
            .order_by(OrderBy::CountDesc);
        let groups = executor.aggregate(&query)?;

        let mut x_totals: HashMap<&str, usize> = HashMap::new();
        for group in &groups {
            *x_totals.entry(group.key(0)).or_default() += group.count;
        }
        let rows: Vec<CrossTabRow> = groups
            .iter()
            .map(|group| {
                let x_total = x_totals.get(group.key(0)).copied().unwrap_or_default();
                CrossTabRow {
                    x_value: group.key(0).to_string(),
                    y_value: group.key(1).to_string(),
                    count: group.count,
                    percentage: percentage(group.count, x_total),
                }
            })
            .collect();
        let total: usize = rows.iter().map(|row| row.count).sum();

        debug!(
            x_column = %x.column.name,
            y_column = %y.column.name,
            x_values = x_totals.len(),
            cells = rows.len(),
            total,
            duration_ms = start.elapsed().as_millis(),
            "cross tabulation complete"
        );
        Ok(CrossTabResult {
            x_column: x.column.name.clone(),
            y_column: y.column.name.clone(),
            rows,
            total,
        })
    })
}
