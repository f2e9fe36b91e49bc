//! Base column discovery and multiple-answer detection.

use std::time::Instant;

use survey_model::{AnalysisSettings, Column, Expr};
use tracing::{debug, warn};

use crate::error::{QueryError, SchemaError};
use crate::query::QueryExecutor;

/// Lists the dataset's base columns with 1-based indexes.
///
/// Fails when the dataset cannot be described or counted, or has no
/// columns. A failing multiplicity probe only marks that column single-valued.
pub fn introspect(
    executor: &dyn QueryExecutor,
    settings: &AnalysisSettings,
) -> Result<Vec<Column>, SchemaError> {
    let start = Instant::now();
    let schema = executor
        .describe()
        .map_err(|source| SchemaError::Unavailable { source })?;
    if schema.is_empty() {
        return Err(SchemaError::Empty);
    }
    let row_count = executor
        .count(None)
        .map_err(|source| SchemaError::Unavailable { source })?;

    let columns: Vec<Column> = schema
        .into_iter()
        .enumerate()
        .map(|(pos, column)| {
            let is_multi = settings.has_multi_marker(&column.name)
                || detect_multi_answer(executor, &column.name, settings).unwrap_or_else(|error| {
                    warn!(column = %column.name, %error, "multiple-answer probe failed");
                    false
                });
            Column::base(pos + 1, column, is_multi, settings.line_separator.as_str())
        })
        .collect();

    debug!(
        columns = columns.len(),
        multi_columns = columns.iter().filter(|c| c.is_multi).count(),
        row_count,
        duration_ms = start.elapsed().as_millis(),
        "dataset introspected"
    );
    Ok(columns)
}

/// True when more than `multi_answer_threshold` of the column's non-null
/// values contain the line separator.
pub fn detect_multi_answer(
    executor: &dyn QueryExecutor,
    column: &str,
    settings: &AnalysisSettings,
) -> Result<bool, QueryError> {
    let total = executor.count(Some(&Expr::col(column).is_not_null()))?;
    if total == 0 {
        return Ok(false);
    }
    let with_breaks = executor.count(Some(
        &Expr::col(column).contains(settings.line_separator.as_str()),
    ))?;
    Ok(with_breaks as f64 / total as f64 > settings.multi_answer_threshold)
}

#[cfg(test)]
mod tests {
    use polars::prelude::{DataFrame, IntoColumn, NamedFrom, Series};

    use super::*;
    use crate::frame::FrameExecutor;

    fn executor(columns: Vec<(&str, Vec<Option<&str>>)>) -> FrameExecutor {
        let cols = columns
            .into_iter()
            .map(|(name, values)| Series::new(name.into(), values).into_column())
            .collect();
        FrameExecutor::new(DataFrame::new(cols).unwrap())
    }

    #[test]
    fn marker_in_name_flags_multi() {
        let exec = executor(vec![("好きな色（複数選択可）", vec![Some("赤")])]);
        let columns = introspect(&exec, &AnalysisSettings::default()).unwrap();
        assert!(columns[0].is_multi);
        assert_eq!(columns[0].index, 1);
    }

    #[test]
    fn line_break_share_must_exceed_threshold() {
        let mut values = vec![Some("a"); 19];
        values.push(Some("a\nb"));
        let exec = executor(vec![("q", values.clone())]);
        // exactly 5% is not enough
        let columns = introspect(&exec, &AnalysisSettings::default()).unwrap();
        assert!(!columns[0].is_multi);

        values.push(Some("c\nd"));
        values.push(None);
        let exec = executor(vec![("q", values)]);
        let columns = introspect(&exec, &AnalysisSettings::default()).unwrap();
        assert!(columns[0].is_multi);
    }

    #[test]
    fn all_null_column_is_single_valued() {
        let exec = executor(vec![("q", vec![None, None])]);
        assert!(!detect_multi_answer(&exec, "q", &AnalysisSettings::default()).unwrap());
    }

    #[test]
    fn empty_dataset_is_a_schema_error() {
        let exec = FrameExecutor::new(DataFrame::empty());
        assert!(matches!(
            introspect(&exec, &AnalysisSettings::default()),
            Err(SchemaError::Empty)
        ));
    }
}
