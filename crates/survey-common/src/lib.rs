//! Shared utilities for survey crates.
//!
//! This crate provides common utilities used across the survey workspace,
//! including Polars `AnyValue` conversion and lenient date and number parsing.

pub mod date;
pub mod polars;

// Re-export commonly used functions at crate root for convenience
pub use date::parse_lenient_date;
pub use polars::{any_to_value, parse_f64, parse_i64};
