use std::time::Instant;

use survey_model::{Expr, SimpleTabResult, SimpleTabRow};
use tracing::{debug, info_span};

use super::{Axis, percentage};
use crate::error::QueryError;
use crate::order::{PositionMap, compare_by_order};
use crate::query::{AggregateQuery, OrderBy, QueryExecutor};

/// Counts each distinct value of `axis` among the rows passing `predicate`.
///
/// Rows are count-descending (ties by value) unless `positions` is non-empty,
/// in which case they follow the value order.
pub fn tabulate(
    executor: &dyn QueryExecutor,
    axis: Axis<'_>,
    predicate: &Expr,
    positions: &PositionMap,
) -> Result<SimpleTabResult, QueryError> {
    let column = axis.column;
    let span = info_span!("tabulate", column = %column.name, split = axis.splits());
    span.in_scope(|| -> Result<SimpleTabResult, QueryError> {
        let start = Instant::now();
        let query = AggregateQuery::new(vec![axis.key()])
            .with_predicate(Expr::all([predicate.clone(), axis.null_guard()]))
            .order_by(OrderBy::CountDesc);
        let groups = executor.aggregate(&query)?;

        let total: usize = groups.iter().map(|group| group.count).sum();
        let mut rows: Vec<SimpleTabRow> = groups
            .iter()
            .map(|group| SimpleTabRow {
                value: group.key(0).to_string(),
                count: group.count,
                percentage: percentage(group.count, total),
            })
            .collect();
        if !positions.is_empty() {
            rows.sort_by(|a, b| compare_by_order(&a.value, &b.value, positions));
        }

        debug!(
            column = %column.name,
            groups = rows.len(),
            total,
            duration_ms = start.elapsed().as_millis(),
            "tabulation complete"
        );
        Ok(SimpleTabResult {
            column: column.name.clone(),
            rows,
            total,
        })
    })
}

#[cfg(test)]
mod tests {
    use polars::prelude::{DataFrame, IntoColumn, NamedFrom, Series};
    use survey_model::{Column, ColumnSchema};

    use super::*;
    use crate::frame::FrameExecutor;
    use crate::order::position_map;

    fn city_frame() -> FrameExecutor {
        let values = vec![Some("Shibuya-ku"), Some("Minato-ku"), None, Some("Shibuya-ku")];
        let column = Series::new("city".into(), values).into_column();
        FrameExecutor::new(DataFrame::new(vec![column]).unwrap())
    }

    fn city() -> Column {
        Column::base(1, ColumnSchema::new("city", "String"), false, "\n")
    }

    #[test]
    fn base_columns_drop_nulls() {
        let column = city();
        let result =
            tabulate(&city_frame(), Axis::new(&column, false), &Expr::always(), &PositionMap::new())
                .unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.values(), vec!["Shibuya-ku", "Minato-ku"]);
        assert_eq!(result.row("Shibuya-ku").unwrap().percentage, 66.7);
    }

    #[test]
    fn value_order_overrides_counts() {
        let column = city();
        let positions = position_map(&["Minato-ku"]);
        let result = tabulate(
            &city_frame(),
            Axis::new(&column, false),
            &Expr::always(),
            &positions,
        )
        .unwrap();
        assert_eq!(result.values(), vec!["Minato-ku", "Shibuya-ku"]);
    }

    #[test]
    fn predicate_limits_rows() {
        let column = city();
        let predicate = Expr::col("city").eq(Expr::lit("Minato-ku"));
        let result =
            tabulate(&city_frame(), Axis::new(&column, false), &predicate, &PositionMap::new())
                .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.rows[0].percentage, 100.0);
    }
}
