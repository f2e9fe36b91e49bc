use survey_common::parse_f64;
use survey_model::{
    AnalysisSettings, CalculationType, CaseBranch, CompareAs, Condition, DerivedColumn, Expr,
    Operator, Rule,
};
use tracing::warn;

use super::Calculation;

/// First matching rule wins; unmatched rows take the default rule's label
/// or the unclassified label.
#[derive(Debug, Clone)]
pub struct RulesCalculation {
    rules: Vec<Rule>,
    fallback: String,
}

impl RulesCalculation {
    pub fn new(definition: &DerivedColumn, settings: &AnalysisSettings) -> Self {
        let defaults = definition.rules.iter().filter(|rule| rule.is_default).count();
        if defaults > 1 {
            warn!(
                column = %definition.name,
                defaults,
                "several default rules, using the first"
            );
        }
        let fallback = definition
            .default_rule()
            .map_or_else(|| settings.unclassified_label.clone(), |rule| rule.label.clone());
        Self {
            rules: definition.rules.clone(),
            fallback,
        }
    }
}

impl Calculation for RulesCalculation {
    fn calculation_type(&self) -> CalculationType {
        CalculationType::Rules
    }

    fn materialize(&self) -> Expr {
        let branches = self
            .rules
            .iter()
            .filter(|rule| !rule.is_default && !rule.conditions.is_empty())
            .map(|rule| {
                CaseBranch::new(
                    Expr::all(rule.conditions.iter().map(condition_expr)),
                    Expr::lit(rule.label.as_str()),
                )
            })
            .collect();
        Expr::case(branches, Expr::lit(self.fallback.as_str()))
    }

    fn label_order(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !labels.contains(&rule.label) {
                labels.push(rule.label.clone());
            }
        }
        labels
    }
}

/// Predicate for one rule condition over the trimmed cell text.
pub fn condition_expr(condition: &Condition) -> Expr {
    let subject = || Expr::col(condition.column.as_str()).trim();
    match condition.operator {
        Operator::Equals => subject().eq(Expr::lit(condition.value.as_str())),
        Operator::StartsWith => subject().starts_with(condition.value.as_str()),
        Operator::Contains => subject().contains(condition.value.as_str()),
        Operator::StartsWithAny => Expr::any(
            value_set(condition)
                .into_iter()
                .map(|prefix| subject().starts_with(prefix)),
        ),
        Operator::In => subject().in_list(value_set(condition)),
        Operator::Between => between(condition, subject()),
    }
}

/// `values`, or the single `value` when no list was given.
fn value_set(condition: &Condition) -> Vec<String> {
    if condition.values.is_empty() && !condition.value.is_empty() {
        vec![condition.value.clone()]
    } else {
        condition.values.clone()
    }
}

/// Inclusive range check. Bounds are `values[0]` and `values[1]`, with
/// `value` standing in for a missing lower bound.
fn between(condition: &Condition, subject: Expr) -> Expr {
    let lower = condition
        .values
        .first()
        .map(String::as_str)
        .or(Some(condition.value.as_str()).filter(|v| !v.is_empty()));
    let upper = condition.values.get(1).map(String::as_str);
    let (Some(lower), Some(upper)) = (lower, upper) else {
        return Expr::never();
    };
    match condition.compare_as {
        CompareAs::Text => Expr::all([
            subject.clone().ge(Expr::lit(lower)),
            subject.le(Expr::lit(upper)),
        ]),
        CompareAs::Number => match (parse_f64(lower), parse_f64(upper)) {
            (Some(lower), Some(upper)) => {
                let number = subject.to_number();
                Expr::all([
                    number.clone().ge(Expr::lit(lower)),
                    number.le(Expr::lit(upper)),
                ])
            }
            _ => Expr::never(),
        },
    }
}
