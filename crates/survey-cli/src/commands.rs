use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{info, info_span, trace, warn};

use survey_engine::{Analyzer, FrameExecutor};
use survey_model::{
    CalculationType, Column, ConfigDocument, ConfigPaths, CrossTabPivot, CrossTabResult,
    DerivedColumnsDocument, Filter, FilterImpact, SimpleTabResult, load_config, load_document,
    save_document,
};

use crate::dataset::read_survey_csv;
use crate::logging::redact_value;

pub type SurveyAnalyzer = Analyzer<FrameExecutor>;

/// Where the dataset and its configuration documents live.
#[derive(Debug, Clone)]
pub struct SessionSource<'a> {
    pub data: &'a Path,
    pub config_dir: &'a Path,
    pub infer_types: bool,
}

/// Loads the dataset and configuration and builds the analyzer.
///
/// Unusable configuration documents are reported and skipped.
pub fn open_analyzer(source: &SessionSource<'_>) -> Result<SurveyAnalyzer> {
    let span = info_span!("open", data = %source.data.display());
    let _guard = span.enter();

    let df = read_survey_csv(source.data, source.infer_types)?;
    let loaded = load_config(&ConfigPaths::in_dir(source.config_dir));
    if !loaded.errors.is_empty() {
        warn!(
            skipped = loaded.errors.len(),
            config_dir = %source.config_dir.display(),
            "continuing without unusable configuration documents"
        );
    }
    Analyzer::new(FrameExecutor::new(df), loaded.definitions, loaded.settings)
        .with_context(|| format!("Failed to analyze {}", source.data.display()))
}

/// One line of the column listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub is_multi: bool,
    pub is_derived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation: Option<CalculationType>,
    /// `derived` or `multi`, for listings.
    #[serde(skip)]
    pub marker: Option<&'static str>,
}

impl From<&Column> for ColumnSummary {
    fn from(column: &Column) -> Self {
        Self {
            index: column.index,
            name: column.name.clone(),
            data_type: column.data_type.clone(),
            is_multi: column.is_multi,
            is_derived: column.is_derived,
            calculation: column.calculation,
            marker: column.marker(),
        }
    }
}

/// Output of one command, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Columns(Vec<ColumnSummary>),
    Simple(SimpleTabResult),
    Cross(CrossTabResult),
    Pivot(CrossTabPivot),
    Filters(Vec<Filter>),
    Impact(FilterImpact),
    Templates(Vec<TemplateSummary>),
    Imported(ImportSummary),
}

/// One entry of a derived-column template document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSummary {
    /// 0-based, as accepted by `import-templates`.
    pub index: usize,
    pub name: String,
    pub calculation: CalculationType,
    pub description: String,
}

/// Outcome of importing templates into the derived column document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub names: Vec<String>,
    pub target: String,
}

/// Arguments of a cross tabulation request.
#[derive(Debug, Clone, Default)]
pub struct CrossRequest<'a> {
    pub x: &'a str,
    pub y: &'a str,
    pub split_x: bool,
    pub split_y: bool,
    pub filter: Option<&'a str>,
    pub pivot: bool,
}

pub fn run_columns(analyzer: &SurveyAnalyzer) -> Report {
    Report::Columns(
        analyzer
            .list_columns()
            .iter()
            .map(ColumnSummary::from)
            .collect(),
    )
}

pub fn run_simple(
    analyzer: &SurveyAnalyzer,
    column: &str,
    split: bool,
    filter: Option<&str>,
) -> Result<Report> {
    let column = resolve_column(analyzer, column)?;
    let filter = filter.map(|name| resolve_filter(analyzer, name)).transpose()?;
    let result = analyzer
        .tabulate(column, split, filter)
        .with_context(|| format!("Failed to tabulate {}", column.name))?;
    for row in &result.rows {
        trace!(
            column = %result.column,
            value = redact_value(&row.value),
            count = row.count,
            "tabulated value"
        );
    }
    Ok(Report::Simple(result))
}

pub fn run_cross(analyzer: &SurveyAnalyzer, request: &CrossRequest<'_>) -> Result<Report> {
    let x = resolve_column(analyzer, request.x)?;
    let y = resolve_column(analyzer, request.y)?;
    let filter = request
        .filter
        .map(|name| resolve_filter(analyzer, name))
        .transpose()?;
    let result = analyzer
        .crosstab(x, y, request.split_x, request.split_y, filter)
        .with_context(|| format!("Failed to cross tabulate {} by {}", x.name, y.name))?;
    if request.pivot {
        Ok(Report::Pivot(analyzer.to_pivot(&result)))
    } else {
        Ok(Report::Cross(result))
    }
}

pub fn run_filters(analyzer: &SurveyAnalyzer) -> Report {
    Report::Filters(analyzer.filters().to_vec())
}

pub fn run_impact(analyzer: &SurveyAnalyzer, name: &str) -> Result<Report> {
    let filter = resolve_filter(analyzer, name)?;
    let impact = analyzer
        .filter_impact(filter)
        .with_context(|| format!("Failed to count rows for filter {name}"))?;
    Ok(Report::Impact(impact))
}

pub fn run_templates(templates: &Path) -> Result<Report> {
    let document = read_templates(templates)?;
    Ok(Report::Templates(
        document
            .entries()
            .iter()
            .enumerate()
            .map(|(index, template)| TemplateSummary {
                index,
                name: template.name.clone(),
                calculation: template.calculation_type,
                description: template.description.clone(),
            })
            .collect(),
    ))
}

/// Appends the selected templates to `derived_columns.toml` in `config_dir`.
///
/// A target document that exists but does not parse is an error rather than
/// being replaced.
pub fn run_import_templates(
    templates: &Path,
    indices: &[usize],
    config_dir: &Path,
) -> Result<Report> {
    let span = info_span!("import_templates", templates = %templates.display());
    let _guard = span.enter();

    let source = read_templates(templates)?;
    let target = ConfigPaths::in_dir(config_dir).derived_columns;
    let mut document: DerivedColumnsDocument = load_document(&target)
        .with_context(|| format!("Failed to load {}", target.display()))?
        .unwrap_or_default();
    let before = document.len();
    let imported = document.import_templates(source.entries(), indices);
    if imported > 0 {
        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        save_document(&target, &document)
            .with_context(|| format!("Failed to save {}", target.display()))?;
    }
    let names: Vec<String> = document.entries()[before..]
        .iter()
        .map(|column| column.name.clone())
        .collect();
    info!(
        imported,
        requested = indices.len(),
        target = %target.display(),
        "derived column templates imported"
    );
    Ok(Report::Imported(ImportSummary {
        imported,
        names,
        target: target.display().to_string(),
    }))
}

fn read_templates(path: &Path) -> Result<DerivedColumnsDocument> {
    load_document(path)
        .with_context(|| format!("Failed to load templates from {}", path.display()))?
        .ok_or_else(|| anyhow!("template file not found: {}", path.display()))
}

fn resolve_column<'a>(analyzer: &'a SurveyAnalyzer, key: &str) -> Result<&'a Column> {
    analyzer
        .resolve_column(key)
        .ok_or_else(|| anyhow!("unknown column: {key}"))
}

fn resolve_filter<'a>(analyzer: &'a SurveyAnalyzer, name: &str) -> Result<&'a Filter> {
    let filter = analyzer
        .filter(name)
        .ok_or_else(|| anyhow!("unknown filter: {name}"))?;
    for condition in &filter.conditions {
        trace!(
            filter = name,
            column = %condition.column,
            include = ?condition.include_values,
            exclude = ?condition.exclude_values,
            "filter condition"
        );
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use polars::prelude::{Column as FrameColumn, DataFrame};
    use survey_model::{AnalysisSettings, Definitions, FilterCondition};
    use tracing::level_filters::LevelFilter;

    use super::*;

    #[derive(Clone, Default)]
    struct LogSink(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogSink {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
        }
    }

    fn analyzer() -> SurveyAnalyzer {
        let df = DataFrame::new(vec![
            FrameColumn::new("gender".into(), ["F", "M", "F"]),
            FrameColumn::new("color".into(), ["red", "blue", "red"]),
        ])
        .expect("df");
        let definitions = Definitions::new().with_filter(Filter::new(
            "women",
            vec![FilterCondition::include("gender", &["F"])],
        ));
        Analyzer::new(FrameExecutor::new(df), definitions, AnalysisSettings::default())
            .expect("analyzer")
    }

    #[test]
    fn columns_resolve_by_name_or_index() {
        let analyzer = analyzer();
        assert_eq!(resolve_column(&analyzer, "color").expect("name").index, 2);
        assert_eq!(resolve_column(&analyzer, "1").expect("index").name, "gender");
        let err = resolve_column(&analyzer, "9").unwrap_err();
        assert_eq!(err.to_string(), "unknown column: 9");
    }

    #[test]
    fn simple_applies_the_named_filter() {
        let analyzer = analyzer();
        let Report::Simple(result) =
            run_simple(&analyzer, "color", false, Some("women")).expect("simple")
        else {
            panic!("expected a simple tabulation");
        };
        assert_eq!(result.total, 2);
        assert_eq!(result.values(), vec!["red"]);
    }

    #[test]
    fn traces_redact_answers_but_not_filter_config() {
        let analyzer = analyzer();
        let sink = LogSink::default();
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(LevelFilter::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            run_simple(&analyzer, "color", false, Some("women")).expect("simple")
        });

        let logs = sink.contents();
        assert!(logs.contains(r#"include=["F"]"#), "{logs}");
        assert!(logs.contains("[REDACTED]"), "{logs}");
        assert!(!logs.contains(r#"value="red""#), "{logs}");
    }

    #[test]
    fn unknown_filter_is_an_error() {
        let analyzer = analyzer();
        let err = run_impact(&analyzer, "men").unwrap_err();
        assert_eq!(err.to_string(), "unknown filter: men");
    }

    #[test]
    fn cross_can_return_a_pivot() {
        let analyzer = analyzer();
        let request = CrossRequest {
            x: "gender",
            y: "color",
            pivot: true,
            ..CrossRequest::default()
        };
        let Report::Pivot(pivot) = run_cross(&analyzer, &request).expect("cross") else {
            panic!("expected a pivot");
        };
        assert_eq!(pivot.x_values, vec!["F", "M"]);
        assert_eq!(pivot.y_values, vec!["blue", "red"]);
        assert_eq!(pivot.row_total("F"), Some(2));
    }
}
