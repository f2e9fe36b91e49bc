//! End-to-end tests from CSV and config documents to rendered reports.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use survey_cli::commands::{
    CrossRequest, Report, SessionSource, SurveyAnalyzer, open_analyzer, run_columns, run_cross,
    run_filters, run_impact, run_import_templates, run_simple, run_templates,
};
use survey_cli::render::{OutputFormat, render};

const SURVEY_CSV: &str = "\
性別,満足度,生年月日
F,High,20180410
M,Low,20170510
F,Medium,20180402
M,High,
F,Low,20170601
";

const DERIVED: &str = r#"
[[derived_columns]]
name = "学年"
calculation_type = "grade_from_birthdate"
source_columns = ["生年月日"]
[derived_columns.parameters]
target_year = 2025
"#;

const FILTERS: &str = r#"
[[filters]]
name = "女性"
description = "female respondents"
[[filters.conditions]]
column = "性別"
include_values = ["F"]
"#;

const ORDERS: &str = r#"
[[column_orders]]
column = "満足度"
values = ["High", "Medium", "Low"]
"#;

const TEMPLATES: &str = r#"
[[derived_columns]]
name = "学年"
description = "grade in school year 2025"
calculation_type = "grade_from_birthdate"
source_columns = ["生年月日"]
[derived_columns.parameters]
target_year = 2025

[[derived_columns]]
name = "学校種別"
calculation_type = "school_type_from_birthdate"
source_columns = ["生年月日"]
[derived_columns.parameters]
target_year = 2025
"#;

struct Fixture {
    _dir: TempDir,
    data: PathBuf,
    config_dir: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    let data = dir.path().join("survey.csv");
    fs::write(&data, SURVEY_CSV).expect("write csv");
    let config_dir = dir.path().join("configs");
    fs::create_dir(&config_dir).expect("config dir");
    fs::write(config_dir.join("derived_columns.toml"), DERIVED).expect("write derived");
    fs::write(config_dir.join("filters.toml"), FILTERS).expect("write filters");
    fs::write(config_dir.join("column_orders.toml"), ORDERS).expect("write orders");
    Fixture {
        _dir: dir,
        data,
        config_dir,
    }
}

fn open(fixture: &Fixture) -> SurveyAnalyzer {
    open_analyzer(&SessionSource {
        data: &fixture.data,
        config_dir: &fixture.config_dir,
        infer_types: false,
    })
    .expect("analyzer")
}

#[test]
fn columns_include_configured_derived_columns() {
    let fixture = fixture();
    let analyzer = open(&fixture);

    let Report::Columns(columns) = run_columns(&analyzer) else {
        panic!("expected columns");
    };
    let names: Vec<_> = columns.iter().map(|c| (c.index, c.name.as_str())).collect();
    assert_eq!(
        names,
        vec![(1, "性別"), (2, "満足度"), (3, "生年月日"), (4, "学年")]
    );
    assert!(columns[3].is_derived);
}

#[test]
fn filtered_grade_tabulation() {
    let fixture = fixture();
    let analyzer = open(&fixture);

    let report = run_simple(&analyzer, "4", false, Some("女性")).expect("simple");

    let Report::Simple(result) = &report else {
        panic!("expected a simple tabulation");
    };
    insta::assert_json_snapshot!(result, @r#"
    {
      "column": "学年",
      "rows": [
        {
          "value": "小1",
          "count": 2,
          "percentage": 66.7
        },
        {
          "value": "小2",
          "count": 1,
          "percentage": 33.3
        }
      ],
      "total": 3
    }
    "#);
}

#[test]
fn pivot_follows_configured_order() {
    let fixture = fixture();
    let analyzer = open(&fixture);
    let request = CrossRequest {
        x: "満足度",
        y: "性別",
        pivot: true,
        ..CrossRequest::default()
    };

    let Report::Pivot(pivot) = run_cross(&analyzer, &request).expect("cross") else {
        panic!("expected a pivot");
    };

    assert_eq!(pivot.x_values, vec!["High", "Medium", "Low"]);
    assert_eq!(pivot.y_values, vec!["F", "M"]);
    assert!(!pivot.cell("Medium", "M").expect("cell").exists);
    assert_eq!(pivot.total, 5);
}

#[test]
fn impact_reports_kept_and_dropped_rows() {
    let fixture = fixture();
    let analyzer = open(&fixture);

    let report = run_impact(&analyzer, "女性").expect("impact");

    insta::assert_json_snapshot!(report, @r#"
    {
      "filter": "女性",
      "total": 5,
      "matched": 3,
      "excluded": 2
    }
    "#);
}

#[test]
fn filters_render_as_table() {
    let fixture = fixture();
    let analyzer = open(&fixture);

    let text = render(&run_filters(&analyzer), OutputFormat::Table).expect("render");

    assert!(text.contains("女性"));
    assert!(text.contains("性別 in [F]"));
}

#[test]
fn broken_config_document_is_skipped() {
    let fixture = fixture();
    fs::write(fixture.config_dir.join("filters.toml"), "[[filters]\nname = ").expect("write");

    let analyzer = open(&fixture);

    assert!(analyzer.filters().is_empty());
    assert!(analyzer.find_column("学年").is_some());
}

#[test]
fn unknown_column_is_an_error() {
    let fixture = fixture();
    let analyzer = open(&fixture);

    let err = run_simple(&analyzer, "エリア", false, None).unwrap_err();

    assert_eq!(err.to_string(), "unknown column: エリア");
}

#[test]
fn templates_are_listed_with_their_indices() {
    let fixture = fixture();
    let templates = fixture.config_dir.with_file_name("templates.toml");
    fs::write(&templates, TEMPLATES).expect("write templates");

    let Report::Templates(listed) = run_templates(&templates).expect("templates") else {
        panic!("expected templates");
    };

    let names: Vec<_> = listed.iter().map(|t| (t.index, t.name.as_str())).collect();
    assert_eq!(names, vec![(0, "学年"), (1, "学校種別")]);
}

#[test]
fn imported_templates_are_saved_and_usable() {
    let fixture = fixture();
    let templates = fixture.config_dir.with_file_name("templates.toml");
    fs::write(&templates, TEMPLATES).expect("write templates");

    let report =
        run_import_templates(&templates, &[0, 1, 7], &fixture.config_dir).expect("import");

    let Report::Imported(summary) = &report else {
        panic!("expected an import summary");
    };
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.names, vec!["学年 (2)", "学校種別"]);
    let saved =
        fs::read_to_string(fixture.config_dir.join("derived_columns.toml")).expect("read");
    assert!(saved.starts_with('#'));

    let analyzer = open(&fixture);
    let Report::Simple(result) = run_simple(&analyzer, "学校種別", false, None).expect("simple")
    else {
        panic!("expected a simple tabulation");
    };
    assert_eq!(result.total, 5);
    assert!(analyzer.find_column("学年 (2)").is_some());
}

#[test]
fn import_into_a_missing_config_dir_creates_it() {
    let fixture = fixture();
    let templates = fixture.config_dir.with_file_name("templates.toml");
    fs::write(&templates, TEMPLATES).expect("write templates");
    let fresh = fixture.config_dir.with_file_name("fresh");

    run_import_templates(&templates, &[1], &fresh).expect("import");

    let saved = fs::read_to_string(fresh.join("derived_columns.toml")).expect("read");
    assert!(saved.contains("学校種別"));
    assert!(!saved.contains("学年"));
}

#[test]
fn import_refuses_to_overwrite_a_broken_document() {
    let fixture = fixture();
    let templates = fixture.config_dir.with_file_name("templates.toml");
    fs::write(&templates, TEMPLATES).expect("write templates");
    let target = fixture.config_dir.join("derived_columns.toml");
    fs::write(&target, "[[derived_columns]\nname = ").expect("write");

    let err = run_import_templates(&templates, &[0], &fixture.config_dir).unwrap_err();

    assert!(format!("{err:#}").contains("derived_columns.toml"));
    assert_eq!(
        fs::read_to_string(&target).expect("read"),
        "[[derived_columns]\nname = "
    );
}
