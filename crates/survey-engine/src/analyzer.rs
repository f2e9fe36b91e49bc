//! The engine instance: one dataset plus its read-only configuration.

use std::time::Instant;

use survey_model::{
    AnalysisSettings, Column, CrossTabPivot, CrossTabResult, Definitions, Expr, Filter,
    FilterImpact, SimpleTabResult,
};
use tracing::{debug, info};

use crate::aggregate::{self, Axis};
use crate::derived::DerivedRegistry;
use crate::error::{EngineError, Result};
use crate::filter::compile_filter;
use crate::order::ValueOrderResolver;
use crate::pivot;
use crate::query::QueryExecutor;
use crate::schema::introspect;

/// Tabulation engine bound to one dataset.
///
/// Columns, derived columns, filters and value orders are resolved once in
/// [`Analyzer::new`] and never change. Every query method recomputes from
/// the dataset. To pick up edited definitions, build a new instance.
#[derive(Debug)]
pub struct Analyzer<E: QueryExecutor> {
    executor: E,
    settings: AnalysisSettings,
    columns: Vec<Column>,
    derived: DerivedRegistry,
    filters: Vec<Filter>,
    orders: ValueOrderResolver,
}

impl<E: QueryExecutor> Analyzer<E> {
    /// Inspects the dataset and compiles `definitions`.
    ///
    /// Fails with [`EngineError::Schema`] when the dataset cannot be read or
    /// has no columns.
    pub fn new(executor: E, definitions: Definitions, settings: AnalysisSettings) -> Result<Self> {
        let start = Instant::now();
        let mut columns = introspect(&executor, &settings)?;
        let derived = DerivedRegistry::build(
            &definitions.derived_columns,
            columns.iter().map(|column| column.name.as_str()),
            &settings,
        );
        let base_count = columns.len();
        columns.extend(derived.columns(base_count + 1));
        let orders = ValueOrderResolver::standard(&definitions.column_orders, &derived);

        info!(
            base_columns = base_count,
            derived_columns = derived.len(),
            filters = definitions.filters.len(),
            duration_ms = start.elapsed().as_millis(),
            "analyzer ready"
        );
        Ok(Self {
            executor,
            settings,
            columns,
            derived,
            filters: definitions.filters,
            orders,
        })
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Base columns followed by derived columns.
    pub fn list_columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Column at a 1-based `index`.
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        index
            .checked_sub(1)
            .and_then(|pos| self.columns.get(pos))
    }

    /// Looks a column up by exact name, then by 1-based index.
    pub fn resolve_column(&self, key: &str) -> Option<&Column> {
        self.find_column(key).or_else(|| {
            key.trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| self.column_at(index))
        })
    }

    pub fn derived(&self) -> &DerivedRegistry {
        &self.derived
    }

    /// Expression behind the derived column `name`.
    pub fn materialize(&self, name: &str) -> Option<&Expr> {
        self.derived.get(name).map(|entry| &entry.expression)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn filter(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|filter| filter.name == name)
    }

    pub fn compile_filter(&self, filter: Option<&Filter>) -> Expr {
        compile_filter(filter, &self.columns)
    }

    pub fn value_order(&self) -> &ValueOrderResolver {
        &self.orders
    }

    /// Frequency table of `column`. `split` is ignored for single-valued
    /// derived columns.
    pub fn tabulate(
        &self,
        column: &Column,
        split: bool,
        filter: Option<&Filter>,
    ) -> Result<SimpleTabResult> {
        let predicate = self.compile_filter(filter);
        let positions = self.orders.order_for(&column.name);
        aggregate::tabulate(
            &self.executor,
            Axis::new(column, split),
            &predicate,
            &positions,
        )
        .map_err(EngineError::aggregation("tabulate"))
    }

    pub fn crosstab(
        &self,
        x_column: &Column,
        y_column: &Column,
        split_x: bool,
        split_y: bool,
        filter: Option<&Filter>,
    ) -> Result<CrossTabResult> {
        let predicate = self.compile_filter(filter);
        aggregate::crosstab(
            &self.executor,
            Axis::new(x_column, split_x),
            Axis::new(y_column, split_y),
            &predicate,
        )
        .map_err(EngineError::aggregation("crosstab"))
    }

    /// Pivot of `result` with axes in this instance's value order.
    pub fn to_pivot(&self, result: &CrossTabResult) -> CrossTabPivot {
        pivot::to_pivot(result, Some(&self.orders))
    }

    /// Rows passing `filter` (all rows for `None`).
    pub fn row_count(&self, filter: Option<&Filter>) -> Result<usize> {
        let predicate = self.compile_filter(filter);
        let predicate = (!predicate.is_always()).then_some(predicate);
        self.executor
            .count(predicate.as_ref())
            .map_err(EngineError::aggregation("count"))
    }

    /// Rows kept and dropped by `filter`.
    pub fn filter_impact(&self, filter: &Filter) -> Result<FilterImpact> {
        let total = self.row_count(None)?;
        let matched = self.row_count(Some(filter))?;
        let impact = FilterImpact::new(filter.name.as_str(), total, matched);
        debug!(
            filter = %filter.name,
            total,
            matched,
            excluded = impact.excluded,
            "filter impact"
        );
        Ok(impact)
    }
}
