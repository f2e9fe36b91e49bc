//! Declarative definitions loaded from configuration documents.
//!
//! These types mirror the documents one to one. Only the fields relevant
//! to a derived column's [`CalculationType`] are consulted when it is
//! compiled; the rest are carried but ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a derived column computes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    /// Ordered classification rules; the default when the field is absent.
    #[default]
    Rules,
    /// School grade bucket computed from a birthdate.
    GradeFromBirthdate,
    /// Elementary / secondary classification computed from a birthdate.
    SchoolTypeFromBirthdate,
    /// Concatenation of several source columns into one multi-valued field.
    Merge,
}

impl CalculationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::GradeFromBirthdate => "grade_from_birthdate",
            Self::SchoolTypeFromBirthdate => "school_type_from_birthdate",
            Self::Merge => "merge",
        }
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

/// Definition of one virtual column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub calculation_type: CalculationType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParamValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
}

impl DerivedColumn {
    pub fn new(name: impl Into<String>, calculation_type: CalculationType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            calculation_type,
            source_columns: Vec::new(),
            parameters: BTreeMap::new(),
            rules: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: &[&str]) -> Self {
        self.source_columns = sources.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Integer parameter. Floats with no fractional part and numeric text are accepted.
    pub fn param_i64(&self, key: &str) -> Option<i64> {
        match self.parameters.get(key)? {
            ParamValue::Integer(v) => Some(*v),
            ParamValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            ParamValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        match self.parameters.get(key)? {
            ParamValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The fallback rule. When several rules claim the role the first wins.
    pub fn default_rule(&self) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.is_default)
    }
}

/// A classification rule. Its conditions are AND-combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub label: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Rule {
    pub fn new(label: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Self {
            label: label.into(),
            is_default: false,
            conditions,
        }
    }

    pub fn fallback(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            is_default: true,
            conditions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    StartsWith,
    StartsWithAny,
    Contains,
    Between,
    In,
}

/// How `between` bounds are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareAs {
    #[default]
    Text,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "is_text_comparison")]
    pub compare_as: CompareAs,
}

fn is_text_comparison(compare_as: &CompareAs) -> bool {
    *compare_as == CompareAs::Text
}

impl Condition {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            values: Vec::new(),
            compare_as: CompareAs::Text,
        }
    }

    pub fn with_values(
        column: impl Into<String>,
        operator: Operator,
        values: &[&str],
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: String::new(),
            values: values.iter().map(|s| (*s).to_string()).collect(),
            compare_as: CompareAs::Text,
        }
    }

    pub fn numeric(mut self) -> Self {
        self.compare_as = CompareAs::Number;
        self
    }
}

/// A named row filter. Conditions are AND-combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<FilterCondition>,
}

impl Filter {
    pub fn new(name: impl Into<String>, conditions: Vec<FilterCondition>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            conditions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_values: Vec<String>,
}

impl FilterCondition {
    pub fn include(column: impl Into<String>, values: &[&str]) -> Self {
        Self {
            column: column.into(),
            include_values: values.iter().map(|s| (*s).to_string()).collect(),
            exclude_values: Vec::new(),
        }
    }

    pub fn exclude(column: impl Into<String>, values: &[&str]) -> Self {
        Self {
            column: column.into(),
            include_values: Vec::new(),
            exclude_values: values.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Explicit display order for one column's values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOrder {
    pub column: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl ColumnOrder {
    pub fn new(column: impl Into<String>, values: &[&str]) -> Self {
        Self {
            column: column.into(),
            description: String::new(),
            values: values.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculation_type_defaults_to_rules() {
        let def: DerivedColumn = toml::from_str(r#"name = "area""#).unwrap();
        assert_eq!(def.calculation_type, CalculationType::Rules);
        assert!(def.rules.is_empty());
    }

    #[test]
    fn parameters_keep_their_types() {
        let def: DerivedColumn = toml::from_str(
            r#"
name = "grade"
calculation_type = "grade_from_birthdate"
[parameters]
target_year = 2024
birthdate_column = "dob"
ratio = 0.5
"#,
        )
        .unwrap();
        assert_eq!(def.param_i64("target_year"), Some(2024));
        assert_eq!(def.param_str("birthdate_column"), Some("dob"));
        assert_eq!(def.parameters.get("ratio"), Some(&ParamValue::Float(0.5)));
        assert_eq!(def.param_i64("missing"), None);
    }

    #[test]
    fn first_default_rule_wins() {
        let def = DerivedColumn::new("x", CalculationType::Rules)
            .with_rule(Rule::fallback("first"))
            .with_rule(Rule::fallback("second"));
        assert_eq!(def.default_rule().map(|r| r.label.as_str()), Some("first"));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let parsed: Result<Condition, _> =
            toml::from_str("column = \"a\"\noperator = \"like\"\nvalue = \"x\"");
        assert!(parsed.is_err());
    }
}
