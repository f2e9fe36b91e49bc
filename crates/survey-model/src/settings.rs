//! Engine settings and the fixed labels produced by derived columns.

use serde::{Deserialize, Serialize};

/// Label for rows no classification rule matched and no default rule covers.
pub const UNCLASSIFIED_LABEL: &str = "未分類";
/// Birthdate later than the first elementary grade (too young).
pub const BELOW_MINIMUM_LABEL: &str = "小1未満";
/// Birthdate earlier than the last secondary grade (too old).
pub const ABOVE_MAXIMUM_LABEL: &str = "高1以上";
/// Birthdate missing or blank.
pub const NO_DATA_LABEL: &str = "データなし";
/// Birthdate present but not a recognisable date.
pub const INVALID_DATA_LABEL: &str = "データ不正";

pub const DEFAULT_ELEMENTARY_LABEL: &str = "小学生";
pub const DEFAULT_SECONDARY_LABEL: &str = "中学生";
pub const DEFAULT_OTHER_LABEL: &str = "その他";
pub const DEFAULT_BIRTHDATE_COLUMN: &str = "生年月日";

pub const DEFAULT_MERGE_SEPARATOR: &str = "|||";
pub const DEFAULT_TARGET_YEAR: i32 = 2025;
pub const DEFAULT_MULTI_THRESHOLD: f64 = 0.05;

/// Tunables shared by every component of one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Column-name phrases that mark a multiple-answer question.
    pub multi_answer_markers: Vec<String>,
    /// A base column is multi-valued when more than this share of its
    /// non-null values contain a line break.
    pub multi_answer_threshold: f64,
    /// Separator for fanning out base multi-answer columns.
    pub line_separator: String,
    /// Default separator for merge-derived columns.
    pub merge_separator: String,
    /// School year used by birthdate calculations without `target_year`.
    pub default_target_year: i32,
    pub unclassified_label: String,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            multi_answer_markers: ["複数回答可", "複数回答", "（複数選択可）", "複数選択可"]
                .into_iter()
                .map(String::from)
                .collect(),
            multi_answer_threshold: DEFAULT_MULTI_THRESHOLD,
            line_separator: "\n".to_string(),
            merge_separator: DEFAULT_MERGE_SEPARATOR.to_string(),
            default_target_year: DEFAULT_TARGET_YEAR,
            unclassified_label: UNCLASSIFIED_LABEL.to_string(),
        }
    }
}

impl AnalysisSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_year(mut self, year: i32) -> Self {
        self.default_target_year = year;
        self
    }

    pub fn with_multi_threshold(mut self, threshold: f64) -> Self {
        self.multi_answer_threshold = threshold;
        self
    }

    /// True if the column name carries a multiple-answer marker.
    pub fn has_multi_marker(&self, column_name: &str) -> bool {
        self.multi_answer_markers
            .iter()
            .any(|marker| !marker.is_empty() && column_name.contains(marker.as_str()))
    }
}
