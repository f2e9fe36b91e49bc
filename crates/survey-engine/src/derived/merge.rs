use survey_model::{AnalysisSettings, CalculationType, DerivedColumn, Expr};

use super::Calculation;

/// Joins the non-empty values of several columns into one multi-valued cell.
#[derive(Debug, Clone)]
pub struct MergeCalculation {
    sources: Vec<String>,
    separator: String,
}

impl MergeCalculation {
    pub fn new(definition: &DerivedColumn, settings: &AnalysisSettings) -> Self {
        let separator = definition
            .param_str("separator")
            .filter(|s| !s.is_empty())
            .unwrap_or(settings.merge_separator.as_str())
            .to_string();
        Self {
            sources: definition.source_columns.clone(),
            separator,
        }
    }
}

impl Calculation for MergeCalculation {
    fn calculation_type(&self) -> CalculationType {
        CalculationType::Merge
    }

    fn materialize(&self) -> Expr {
        let parts = self
            .sources
            .iter()
            .map(|source| Expr::col(source.as_str()))
            .collect();
        Expr::concat_non_empty(parts, self.separator.as_str())
    }

    fn is_multi_valued(&self) -> bool {
        true
    }

    fn split_separator(&self) -> Option<&str> {
        Some(&self.separator)
    }
}

#[cfg(test)]
mod tests {
    use survey_model::{ParamValue, Value};

    use super::*;
    use crate::eval::evaluate;
    use crate::eval::tests::MapRow;

    #[test]
    fn custom_separator() {
        let definition = DerivedColumn::new("m", CalculationType::Merge)
            .with_sources(&["a", "b"])
            .with_parameter("separator", ParamValue::Text(" / ".to_string()));
        let calculation = MergeCalculation::new(&definition, &AnalysisSettings::default());
        let row = MapRow::default().with("a", "x").with("b", " y ");
        assert_eq!(evaluate(&calculation.materialize(), &row), Value::text("x / y"));
        assert_eq!(calculation.split_separator(), Some(" / "));
    }

    #[test]
    fn all_empty_sources_give_null() {
        let definition = DerivedColumn::new("m", CalculationType::Merge).with_sources(&["a", "b"]);
        let calculation = MergeCalculation::new(&definition, &AnalysisSettings::default());
        let row = MapRow::default().with("a", "");
        assert_eq!(evaluate(&calculation.materialize(), &row), Value::Null);
    }
}
