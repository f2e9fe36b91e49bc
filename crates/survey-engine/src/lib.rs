//! Derived column, filter and aggregation engine for survey data.
//!
//! # Architecture
//!
//! - **query**: the narrow [`QueryExecutor`] interface every component runs against
//! - **frame**: [`FrameExecutor`], the polars-backed embedded executor
//! - **eval**: the single evaluator giving [`survey_model::Expr`] its meaning
//! - **schema**: base column listing and multiple-answer detection
//! - **derived**: one [`Calculation`] per derived column type
//! - **filter**: named filters compiled to predicates
//! - **aggregate**: simple and cross tabulation
//! - **pivot**: dense, ordered cross tabulation matrices
//! - **order**: value display order resolution
//! - **analyzer**: the [`Analyzer`] façade owning one instance's configuration

pub mod aggregate;
pub mod analyzer;
pub mod derived;
pub mod error;
pub mod eval;
pub mod filter;
pub mod frame;
pub mod order;
pub mod pivot;
pub mod query;
pub mod schema;

pub use aggregate::{Axis, crosstab, percentage, tabulate};
pub use analyzer::Analyzer;
pub use derived::{Calculation, DerivedEntry, DerivedRegistry, build_calculation};
pub use error::{EngineError, QueryError, Result, SchemaError};
pub use eval::{RowSource, evaluate, passes};
pub use filter::compile_filter;
pub use frame::FrameExecutor;
pub use order::{
    ExplicitOrders, OrderStrategy, PositionMap, RuleLabelOrders, ValueOrderResolver,
    position_map, sort_by_order,
};
pub use pivot::to_pivot;
pub use query::{AggregateQuery, GroupKey, GroupRow, OrderBy, QueryExecutor};
pub use schema::{detect_multi_answer, introspect};
