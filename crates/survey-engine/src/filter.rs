//! Compilation of named filters into row predicates.

use survey_model::{Column, Expr, Filter, FilterCondition};
use tracing::debug;

/// Builds the predicate for `filter` against the active column list.
///
/// `None` and filters without usable conditions compile to
/// [`Expr::always`]. Conditions naming a column that is not in `columns`
/// are skipped.
pub fn compile_filter(filter: Option<&Filter>, columns: &[Column]) -> Expr {
    let Some(filter) = filter else {
        return Expr::always();
    };
    Expr::all(filter.conditions.iter().filter_map(|condition| {
        let compiled = compile_condition(condition, columns);
        if compiled.is_none() {
            debug!(
                filter = %filter.name,
                column = %condition.column,
                "skipping condition on unknown column"
            );
        }
        compiled
    }))
}

fn compile_condition(condition: &FilterCondition, columns: &[Column]) -> Option<Expr> {
    let column = columns.iter().find(|c| c.name == condition.column)?;
    let mut parts = Vec::with_capacity(2);
    if !condition.include_values.is_empty() {
        parts.push(
            column
                .expression
                .clone()
                .in_list(condition.include_values.clone()),
        );
    }
    if !condition.exclude_values.is_empty() {
        parts.push(
            column
                .expression
                .clone()
                .not_in_list(condition.exclude_values.clone()),
        );
    }
    Some(Expr::all(parts))
}

#[cfg(test)]
mod tests {
    use survey_model::{ColumnSchema, Value};

    use super::*;
    use crate::eval::tests::MapRow;
    use crate::eval::{evaluate, passes};

    fn columns() -> Vec<Column> {
        vec![
            Column::base(1, ColumnSchema::new("q1", "String"), false, "\n"),
            Column::base(2, ColumnSchema::new("q2", "String"), false, "\n"),
        ]
    }

    #[test]
    fn no_filter_accepts_everything() {
        assert!(compile_filter(None, &columns()).is_always());
    }

    #[test]
    fn include_and_exclude_combine() {
        let filter = Filter::new(
            "f",
            vec![
                FilterCondition::include("q1", &["a", "b"]),
                FilterCondition::exclude("q2", &["x"]),
            ],
        );
        let predicate = compile_filter(Some(&filter), &columns());
        let row = |q1: &str, q2: &str| MapRow::default().with("q1", q1).with("q2", q2);
        assert!(passes(&predicate, &row("a", "y")));
        assert!(!passes(&predicate, &row("a", "x")));
        assert!(!passes(&predicate, &row("c", "y")));
    }

    #[test]
    fn exclusion_rejects_nulls() {
        let filter = Filter::new("f", vec![FilterCondition::exclude("q1", &["a"])]);
        let predicate = compile_filter(Some(&filter), &columns());
        assert_eq!(evaluate(&predicate, &MapRow::default()), Value::Null);
    }

    #[test]
    fn unknown_columns_are_skipped() {
        let filter = Filter::new(
            "f",
            vec![
                FilterCondition::include("renamed", &["a"]),
                FilterCondition::include("q1", &["a"]),
            ],
        );
        let predicate = compile_filter(Some(&filter), &columns());
        assert_eq!(predicate, Expr::col("q1").in_list(vec!["a".to_string()]));

        let only_unknown = Filter::new("g", vec![FilterCondition::include("renamed", &["a"])]);
        assert!(compile_filter(Some(&only_unknown), &columns()).is_always());
    }
}
