//! School grade and school type from a birthdate column.
//!
//! Japanese school years start on April 1st, and a child born on April 1st
//! belongs to the earlier cohort. Grade `g` of elementary school in target
//! year `T` is therefore born in `[T-g-6-04-02, T-g-5-04-02)`.

use chrono::NaiveDate;
use survey_model::settings::{
    ABOVE_MAXIMUM_LABEL, BELOW_MINIMUM_LABEL, DEFAULT_BIRTHDATE_COLUMN, DEFAULT_ELEMENTARY_LABEL,
    DEFAULT_OTHER_LABEL, DEFAULT_SECONDARY_LABEL, INVALID_DATA_LABEL, NO_DATA_LABEL,
};
use survey_model::{AnalysisSettings, CalculationType, CaseBranch, DerivedColumn, Expr};
use tracing::warn;

use super::Calculation;

const ELEMENTARY_GRADES: i32 = 6;
const SECONDARY_GRADES: i32 = 3;

/// One grade: birthdates in `[start, end)` receive `label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeBucket {
    pub label: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl GradeBucket {
    fn new(label: String, birth_year: i32) -> Self {
        Self {
            label,
            start: cohort_start(birth_year),
            end: birth_year.checked_add(1).and_then(cohort_start),
        }
    }

    fn contains(&self, date: &Expr) -> Expr {
        within(date, self.start, self.end)
    }
}

fn cohort_start(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 4, 2)
}

fn within(date: &Expr, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Expr {
    Expr::all([
        date.clone().ge(Expr::lit(start)),
        date.clone().lt(Expr::lit(end)),
    ])
}

/// The nine grade buckets for `target_year`, youngest first:
/// `小1`..`小6` then `中1`..`中3`.
pub fn grade_buckets(target_year: i32) -> Vec<GradeBucket> {
    let elementary = (1..=ELEMENTARY_GRADES)
        .map(|grade| GradeBucket::new(format!("小{grade}"), target_year - grade - 6));
    let secondary = (1..=SECONDARY_GRADES)
        .map(|grade| GradeBucket::new(format!("中{grade}"), target_year - grade - 12));
    elementary.chain(secondary).collect()
}

/// Parameters shared by both birthdate calculations.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BirthdateSource {
    column: String,
    target_year: i32,
}

impl BirthdateSource {
    fn new(definition: &DerivedColumn, settings: &AnalysisSettings) -> Self {
        let column = definition
            .param_str("birthdate_column")
            .or_else(|| definition.source_columns.first().map(String::as_str))
            .unwrap_or(DEFAULT_BIRTHDATE_COLUMN)
            .to_string();
        let target_year = match definition.param_i64("target_year") {
            // keep every bucket year representable
            Some(year) if (1_000..=9_000).contains(&year) => year as i32,
            Some(year) => {
                warn!(
                    column = %definition.name,
                    target_year = year,
                    "target_year out of range, using default"
                );
                settings.default_target_year
            }
            None => settings.default_target_year,
        };
        Self {
            column,
            target_year,
        }
    }

    fn raw(&self) -> Expr {
        Expr::col(self.column.as_str())
    }

    fn date(&self) -> Expr {
        self.raw().to_date()
    }

    fn is_blank(&self) -> Expr {
        let trimmed = self.raw().trim();
        Expr::any([trimmed.clone().is_null(), trimmed.eq(Expr::lit(""))])
    }
}

/// Nine-bucket school grade with sentinels for out-of-range, missing and
/// unparsable birthdates.
#[derive(Debug, Clone)]
pub struct GradeCalculation {
    source: BirthdateSource,
}

impl GradeCalculation {
    pub fn new(definition: &DerivedColumn, settings: &AnalysisSettings) -> Self {
        Self {
            source: BirthdateSource::new(definition, settings),
        }
    }

    pub fn buckets(&self) -> Vec<GradeBucket> {
        grade_buckets(self.source.target_year)
    }
}

impl Calculation for GradeCalculation {
    fn calculation_type(&self) -> CalculationType {
        CalculationType::GradeFromBirthdate
    }

    fn materialize(&self) -> Expr {
        let date = self.source.date();
        let buckets = self.buckets();
        let youngest_end = buckets.first().and_then(|b| b.end);
        let oldest_start = buckets.last().and_then(|b| b.start);

        let mut branches = vec![
            CaseBranch::new(self.source.is_blank(), Expr::lit(NO_DATA_LABEL)),
            CaseBranch::new(date.clone().is_null(), Expr::lit(INVALID_DATA_LABEL)),
        ];
        branches.extend(buckets.iter().map(|bucket| {
            CaseBranch::new(bucket.contains(&date), Expr::lit(bucket.label.as_str()))
        }));
        branches.push(CaseBranch::new(
            date.clone().ge(Expr::lit(youngest_end)),
            Expr::lit(BELOW_MINIMUM_LABEL),
        ));
        branches.push(CaseBranch::new(
            date.lt(Expr::lit(oldest_start)),
            Expr::lit(ABOVE_MAXIMUM_LABEL),
        ));
        Expr::case(branches, Expr::lit(INVALID_DATA_LABEL))
    }
}

/// Elementary, secondary or other. Missing birthdates stay null.
#[derive(Debug, Clone)]
pub struct SchoolTypeCalculation {
    source: BirthdateSource,
    elementary_label: String,
    secondary_label: String,
    other_label: String,
}

impl SchoolTypeCalculation {
    pub fn new(definition: &DerivedColumn, settings: &AnalysisSettings) -> Self {
        let label = |key: &str, default: &str| {
            definition.param_str(key).unwrap_or(default).to_string()
        };
        Self {
            source: BirthdateSource::new(definition, settings),
            elementary_label: label("elementary_label", DEFAULT_ELEMENTARY_LABEL),
            secondary_label: label("secondary_label", DEFAULT_SECONDARY_LABEL),
            other_label: label("other_label", DEFAULT_OTHER_LABEL),
        }
    }
}

impl Calculation for SchoolTypeCalculation {
    fn calculation_type(&self) -> CalculationType {
        CalculationType::SchoolTypeFromBirthdate
    }

    fn materialize(&self) -> Expr {
        let date = self.source.date();
        let buckets = grade_buckets(self.source.target_year);
        let (elementary, secondary) = buckets.split_at(ELEMENTARY_GRADES as usize);
        let span = |group: &[GradeBucket]| {
            // buckets run youngest to oldest, so the oldest start opens the span
            let start = group.last().and_then(|b| b.start);
            let end = group.first().and_then(|b| b.end);
            within(&date, start, end)
        };
        Expr::case(
            vec![
                CaseBranch::new(self.source.is_blank(), Expr::null()),
                CaseBranch::new(span(elementary), Expr::lit(self.elementary_label.as_str())),
                CaseBranch::new(span(secondary), Expr::lit(self.secondary_label.as_str())),
            ],
            Expr::lit(self.other_label.as_str()),
        )
    }
}
