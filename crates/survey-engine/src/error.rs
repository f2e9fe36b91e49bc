//! Error types for engine construction and query execution.

use polars::prelude::PolarsError;
use thiserror::Error;

/// A query against the dataset failed at execution time.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("query execution failed: {0}")]
    Execution(String),
}

impl From<PolarsError> for QueryError {
    fn from(error: PolarsError) -> Self {
        Self::Execution(error.to_string())
    }
}

/// The dataset could not be inspected while constructing an engine.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("dataset is unavailable: {source}")]
    Unavailable {
        #[source]
        source: QueryError,
    },

    #[error("dataset has no columns")]
    Empty,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A tabulation, cross tabulation or count failed. No partial result is kept.
    #[error("{operation} failed: {source}")]
    Aggregation {
        operation: &'static str,
        #[source]
        source: QueryError,
    },

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl EngineError {
    pub(crate) fn aggregation(operation: &'static str) -> impl FnOnce(QueryError) -> Self {
        move |source| Self::Aggregation { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
