//! Dense matrix rendering of a cross tabulation.

use std::collections::{BTreeSet, HashMap};

use survey_model::{CrossTabPivot, CrossTabResult, PivotCell};

use crate::order::{PositionMap, ValueOrderResolver, sort_by_order};

/// Builds the pivot of `result`.
///
/// Axes hold the distinct observed values, ordered by `resolver` when given
/// and lexicographically otherwise. Cells for pairs that never occurred have
/// `exists == false`.
pub fn to_pivot(result: &CrossTabResult, resolver: Option<&ValueOrderResolver>) -> CrossTabPivot {
    let positions = |column: &str| resolver.map(|r| r.order_for(column)).unwrap_or_default();
    let x_values = ordered_axis(
        result.rows.iter().map(|row| row.x_value.as_str()),
        &positions(&result.x_column),
    );
    let y_values = ordered_axis(
        result.rows.iter().map(|row| row.y_value.as_str()),
        &positions(&result.y_column),
    );

    let x_index = index_of(&x_values);
    let y_index = index_of(&y_values);
    let mut matrix = vec![vec![PivotCell::default(); y_values.len()]; x_values.len()];
    for row in &result.rows {
        let x = x_index.get(row.x_value.as_str());
        let y = y_index.get(row.y_value.as_str());
        if let (Some(&x), Some(&y)) = (x, y) {
            matrix[x][y] = PivotCell {
                count: row.count,
                percentage: row.percentage,
                exists: true,
            };
        }
    }

    CrossTabPivot {
        x_column: result.x_column.clone(),
        y_column: result.y_column.clone(),
        x_values,
        y_values,
        matrix,
        total: result.total,
    }
}

fn ordered_axis<'a>(values: impl Iterator<Item = &'a str>, positions: &PositionMap) -> Vec<String> {
    let mut distinct: Vec<String> = values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    sort_by_order(&mut distinct, positions);
    distinct
}

fn index_of(values: &[String]) -> HashMap<&str, usize> {
    values
        .iter()
        .enumerate()
        .map(|(pos, value)| (value.as_str(), pos))
        .collect()
}
