//! Data model for survey tabulation.
//!
//! - **value** / **expr**: scalar values and the typed expression tree
//! - **column**: resolved column metadata
//! - **definition**: declarative derived columns, filters and value orders
//! - **document**: TOML configuration documents and their loaders
//! - **result**: tabulation, cross tabulation and pivot result objects
//! - **settings**: engine tunables and fixed output labels

pub mod column;
pub mod definition;
pub mod document;
pub mod error;
pub mod expr;
pub mod result;
pub mod settings;
pub mod value;

pub use column::{Column, ColumnSchema};
pub use definition::{
    CalculationType, ColumnOrder, CompareAs, Condition, DerivedColumn, Filter, FilterCondition,
    Operator, ParamValue, Rule,
};
pub use document::{
    ColumnOrdersDocument, ConfigDocument, ConfigPaths, Definitions, DerivedColumnsDocument,
    FiltersDocument, LoadedConfig, load_config, load_document, load_settings, parse_document,
    save_document,
};
pub use error::{ConfigError, Result, ValidationError};
pub use expr::{CaseBranch, CompareOp, Expr};
pub use result::{
    CrossTabPivot, CrossTabResult, CrossTabRow, FilterImpact, PivotCell, SimpleTabResult,
    SimpleTabRow,
};
pub use settings::AnalysisSettings;
pub use value::{Value, format_numeric};
