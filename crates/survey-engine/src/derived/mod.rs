//! Derived column calculations.
//!
//! Each [`DerivedColumn`] definition is compiled once into a [`DerivedEntry`]
//! holding its [`Calculation`] and the expression it materializes to. The
//! calculation type is dispatched here and nowhere else.
//!
//! | Type | Calculation | Multi-valued |
//! |------|-------------|--------------|
//! | `rules` | [`RulesCalculation`] | no |
//! | `grade_from_birthdate` | [`GradeCalculation`] | no |
//! | `school_type_from_birthdate` | [`SchoolTypeCalculation`] | no |
//! | `merge` | [`MergeCalculation`] | yes |

mod birthdate;
mod merge;
mod rules;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use survey_model::{AnalysisSettings, CalculationType, Column, DerivedColumn, Expr};
use tracing::warn;

pub use birthdate::{GradeBucket, GradeCalculation, SchoolTypeCalculation, grade_buckets};
pub use merge::MergeCalculation;
pub use rules::{RulesCalculation, condition_expr};

/// Storage type reported for derived columns.
pub const DERIVED_DATA_TYPE: &str = "String (derived)";

/// Behaviour of one `calculation_type`.
pub trait Calculation: fmt::Debug + Send + Sync {
    fn calculation_type(&self) -> CalculationType;

    /// The expression producing this column's value for one row.
    fn materialize(&self) -> Expr;

    /// Whether values hold several answers joined by [`Self::split_separator`].
    fn is_multi_valued(&self) -> bool {
        false
    }

    fn split_separator(&self) -> Option<&str> {
        None
    }

    /// Labels in declaration order, for value ordering. Empty when the
    /// calculation has no natural order.
    fn label_order(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Selects the calculation for a definition.
pub fn build_calculation(
    definition: &DerivedColumn,
    settings: &AnalysisSettings,
) -> Arc<dyn Calculation> {
    match definition.calculation_type {
        CalculationType::Rules => Arc::new(RulesCalculation::new(definition, settings)),
        CalculationType::GradeFromBirthdate => {
            Arc::new(GradeCalculation::new(definition, settings))
        }
        CalculationType::SchoolTypeFromBirthdate => {
            Arc::new(SchoolTypeCalculation::new(definition, settings))
        }
        CalculationType::Merge => Arc::new(MergeCalculation::new(definition, settings)),
    }
}

/// A compiled derived column.
#[derive(Debug, Clone)]
pub struct DerivedEntry {
    pub definition: DerivedColumn,
    pub calculation: Arc<dyn Calculation>,
    pub expression: Expr,
}

impl DerivedEntry {
    pub fn new(definition: DerivedColumn, settings: &AnalysisSettings) -> Self {
        let calculation = build_calculation(&definition, settings);
        let expression = calculation.materialize();
        Self {
            definition,
            calculation,
            expression,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Column metadata for this entry at `index`.
    pub fn column(&self, index: usize) -> Column {
        Column {
            index,
            name: self.definition.name.clone(),
            data_type: DERIVED_DATA_TYPE.to_string(),
            is_multi: self.calculation.is_multi_valued(),
            is_derived: true,
            calculation: Some(self.calculation.calculation_type()),
            expression: self.expression.clone(),
            split_separator: self.calculation.split_separator().map(str::to_string),
        }
    }
}

/// Compiled derived columns in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DerivedRegistry {
    entries: Vec<DerivedEntry>,
}

impl DerivedRegistry {
    /// Compiles `definitions`, dropping any whose name is already taken by
    /// a base column or an earlier definition.
    pub fn build<'a>(
        definitions: &[DerivedColumn],
        base_names: impl IntoIterator<Item = &'a str>,
        settings: &AnalysisSettings,
    ) -> Self {
        let mut taken: HashSet<String> = base_names.into_iter().map(str::to_string).collect();
        let mut entries = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if !taken.insert(definition.name.clone()) {
                warn!(column = %definition.name, "dropping derived column with duplicate name");
                continue;
            }
            entries.push(DerivedEntry::new(definition.clone(), settings));
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[DerivedEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&DerivedEntry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Column metadata numbered from `first_index`.
    pub fn columns(&self, first_index: usize) -> Vec<Column> {
        self.entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| entry.column(first_index + pos))
            .collect()
    }
}
