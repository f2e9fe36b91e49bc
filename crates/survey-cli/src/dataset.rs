//! Loading survey responses from CSV.

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::{CsvReadOptions, DataFrame, SerReader};
use tracing::info;

/// Rows sampled for type inference when `infer_types` is set.
const INFERENCE_ROWS: usize = 100;

/// Reads the CSV at `path` with a header row.
///
/// By default every column is read as text so answers like `20180410` or
/// `007` keep their spelling. With `infer_types` polars infers numeric and
/// date columns from the first rows.
pub fn read_survey_csv(path: &Path, infer_types: bool) -> Result<DataFrame> {
    let inference = if infer_types { INFERENCE_ROWS } else { 0 };
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(inference))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to read CSV: {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "survey data loaded"
    );
    Ok(df)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use polars::prelude::DataType;
    use tempfile::TempDir;

    use super::*;

    fn write_csv(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("survey.csv");
        fs::write(&path, body).expect("write csv");
        path
    }

    #[test]
    fn columns_are_text_by_default() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_csv(&dir, "生年月日,点数\n20180410,007\n20170510,42\n");

        let df = read_survey_csv(&path, false).expect("read");

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("生年月日").expect("column").dtype(), &DataType::String);
        let score = df.column("点数").expect("column");
        assert_eq!(score.str().expect("str").get(0), Some("007"));
    }

    #[test]
    fn types_are_inferred_on_request() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_csv(&dir, "点数\n7\n42\n");

        let df = read_survey_csv(&path, true).expect("read");

        assert_eq!(df.column("点数").expect("column").dtype(), &DataType::Int64);
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("absent.csv");

        let err = read_survey_csv(&path, false).unwrap_err();

        assert!(format!("{err:#}").contains("absent.csv"));
    }
}
