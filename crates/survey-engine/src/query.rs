//! The narrow query-execution interface the engine runs against.
//!
//! Every engine component speaks to the dataset through [`QueryExecutor`]:
//! one schema probe, one row count and one grouped count query shape.
//! Queries are described with typed [`Expr`] trees, never with query text.

use std::cmp::Ordering;

use survey_model::{ColumnSchema, Expr};

use crate::error::QueryError;

/// One grouping key of an [`AggregateQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupKey {
    pub expr: Expr,
    /// Split the key's text on this separator and count each element.
    pub fan_out: Option<String>,
}

impl GroupKey {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            fan_out: None,
        }
    }

    pub fn fanned_out(expr: Expr, separator: Option<&str>) -> Self {
        Self {
            expr,
            fan_out: separator.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    CountDesc,
    /// Ascending by the key at this position.
    KeyAsc(usize),
}

/// A grouped count: `SELECT keys, COUNT(*) WHERE predicate GROUP BY keys ORDER BY ...`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateQuery {
    pub keys: Vec<GroupKey>,
    pub predicate: Option<Expr>,
    pub order_by: Vec<OrderBy>,
}

impl AggregateQuery {
    pub fn new(keys: Vec<GroupKey>) -> Self {
        Self {
            keys,
            predicate: None,
            order_by: Vec::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: Expr) -> Self {
        self.predicate = if predicate.is_always() {
            None
        } else {
            Some(predicate)
        };
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }
}

/// One output row of an [`AggregateQuery`]. `None` keys are nulls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub keys: Vec<Option<String>>,
    pub count: usize,
}

impl GroupRow {
    /// Key text at `position`, with null rendered as the empty string.
    pub fn key(&self, position: usize) -> &str {
        self.keys
            .get(position)
            .and_then(Option::as_deref)
            .unwrap_or_default()
    }
}

/// Compares two group keys: lexicographic, with null last.
pub fn compare_keys(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sorts rows by `order_by`, falling back to ascending keys so the output
/// never depends on hash order.
pub fn sort_rows(rows: &mut [GroupRow], order_by: &[OrderBy]) {
    rows.sort_by(|a, b| {
        let primary = order_by.iter().fold(Ordering::Equal, |acc, order| {
            acc.then_with(|| match *order {
                OrderBy::CountDesc => b.count.cmp(&a.count),
                OrderBy::KeyAsc(i) => compare_keys(
                    a.keys.get(i).unwrap_or(&None),
                    b.keys.get(i).unwrap_or(&None),
                ),
            })
        });
        primary.then_with(|| {
            a.keys
                .iter()
                .zip(&b.keys)
                .fold(Ordering::Equal, |acc, (x, y)| acc.then_with(|| compare_keys(x, y)))
        })
    });
}

/// Access to a queryable dataset.
///
/// Implementations must be side-effect free; the engine may call them from
/// several threads at once.
pub trait QueryExecutor: Send + Sync {
    /// Base columns as `(name, type)` pairs, in dataset order.
    fn describe(&self) -> Result<Vec<ColumnSchema>, QueryError>;

    /// Number of rows passing `predicate` (all rows when `None`).
    fn count(&self, predicate: Option<&Expr>) -> Result<usize, QueryError>;

    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<GroupRow>, QueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(keys: &[Option<&str>], count: usize) -> GroupRow {
        GroupRow {
            keys: keys.iter().map(|k| k.map(str::to_string)).collect(),
            count,
        }
    }

    #[test]
    fn nulls_sort_last() {
        let mut rows = vec![row(&[None], 1), row(&[Some("b")], 1), row(&[Some("a")], 1)];
        sort_rows(&mut rows, &[OrderBy::KeyAsc(0)]);
        let keys: Vec<_> = rows.iter().map(|r| r.keys[0].clone()).collect();
        assert_eq!(keys, vec![Some("a".into()), Some("b".into()), None]);
    }

    #[test]
    fn count_desc_ties_break_on_keys() {
        let mut rows = vec![row(&[Some("b")], 2), row(&[Some("c")], 5), row(&[Some("a")], 2)];
        sort_rows(&mut rows, &[OrderBy::CountDesc]);
        let keys: Vec<_> = rows.iter().map(|r| r.key(0)).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn x_then_count() {
        let mut rows = vec![
            row(&[Some("2"), Some("p")], 1),
            row(&[Some("1"), Some("q")], 1),
            row(&[Some("1"), Some("r")], 3),
        ];
        sort_rows(&mut rows, &[OrderBy::KeyAsc(0), OrderBy::CountDesc]);
        let pairs: Vec<_> = rows.iter().map(|r| (r.key(0), r.key(1))).collect();
        assert_eq!(pairs, vec![("1", "r"), ("1", "q"), ("2", "p")]);
    }

    #[test]
    fn always_true_predicate_is_dropped() {
        let query = AggregateQuery::new(Vec::new()).with_predicate(Expr::always());
        assert!(query.predicate.is_none());
    }
}
