//! Display order of a column's values.
//!
//! A [`ValueOrderResolver`] asks its strategies in turn and uses the first
//! non-empty position map: explicit column orders, then the label order of
//! rule-based derived columns. An empty map leaves the fallback to the caller.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use survey_model::ColumnOrder;
use tracing::trace;

use crate::derived::DerivedRegistry;

/// Value to display position.
pub type PositionMap = HashMap<String, usize>;

/// Positions of `values`, first occurrence winning.
pub fn position_map<S: AsRef<str>>(values: &[S]) -> PositionMap {
    let mut positions = PositionMap::with_capacity(values.len());
    for (pos, value) in values.iter().enumerate() {
        positions.entry(value.as_ref().to_string()).or_insert(pos);
    }
    positions
}

/// Orders two values: known positions first, ascending, then unknown values
/// lexicographically.
pub fn compare_by_order(a: &str, b: &str, positions: &PositionMap) -> Ordering {
    match (positions.get(a), positions.get(b)) {
        (Some(x), Some(y)) => x.cmp(y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sorts `values` by [`compare_by_order`]. With an empty map this is a
/// plain lexicographic sort.
pub fn sort_by_order<S: AsRef<str>>(values: &mut [S], positions: &PositionMap) {
    values.sort_by(|a, b| compare_by_order(a.as_ref(), b.as_ref(), positions));
}

/// One source of value orders.
pub trait OrderStrategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Position map for `column`, empty when this strategy has no opinion.
    fn positions(&self, column: &str) -> PositionMap;
}

/// Orders declared in the column order document.
#[derive(Debug, Clone, Default)]
pub struct ExplicitOrders {
    orders: HashMap<String, PositionMap>,
}

impl ExplicitOrders {
    /// When a column is listed twice the first entry is used.
    pub fn new(column_orders: &[ColumnOrder]) -> Self {
        let mut orders = HashMap::new();
        for order in column_orders {
            orders
                .entry(order.column.clone())
                .or_insert_with(|| position_map(&order.values));
        }
        Self { orders }
    }
}

impl OrderStrategy for ExplicitOrders {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn positions(&self, column: &str) -> PositionMap {
        self.orders.get(column).cloned().unwrap_or_default()
    }
}

/// Label order of derived columns, as declared by their rules.
#[derive(Debug, Clone, Default)]
pub struct RuleLabelOrders {
    labels: HashMap<String, PositionMap>,
}

impl RuleLabelOrders {
    pub fn new(registry: &DerivedRegistry) -> Self {
        let labels = registry
            .entries()
            .iter()
            .filter_map(|entry| {
                let order = entry.calculation.label_order();
                (!order.is_empty()).then(|| (entry.name().to_string(), position_map(&order)))
            })
            .collect();
        Self { labels }
    }
}

impl OrderStrategy for RuleLabelOrders {
    fn name(&self) -> &'static str {
        "rule labels"
    }

    fn positions(&self, column: &str) -> PositionMap {
        self.labels.get(column).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct ValueOrderResolver {
    strategies: Vec<Box<dyn OrderStrategy>>,
}

impl ValueOrderResolver {
    pub fn new(strategies: Vec<Box<dyn OrderStrategy>>) -> Self {
        Self { strategies }
    }

    /// Explicit orders first, then rule label orders.
    pub fn standard(column_orders: &[ColumnOrder], registry: &DerivedRegistry) -> Self {
        Self::new(vec![
            Box::new(ExplicitOrders::new(column_orders)),
            Box::new(RuleLabelOrders::new(registry)),
        ])
    }

    pub fn order_for(&self, column: &str) -> PositionMap {
        self.strategies
            .iter()
            .map(|strategy| {
                let positions = strategy.positions(column);
                if !positions.is_empty() {
                    trace!(column, strategy = strategy.name(), "value order resolved");
                }
                positions
            })
            .find(|positions| !positions.is_empty())
            .unwrap_or_default()
    }
}
