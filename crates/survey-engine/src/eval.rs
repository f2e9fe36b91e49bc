//! Row-wise evaluation of [`Expr`] trees.
//!
//! Boolean operators follow SQL three-valued logic: a predicate passes only
//! when it evaluates to `Bool(true)`; null and non-boolean results fail it.

use std::cmp::Ordering;

use survey_common::{parse_f64, parse_i64, parse_lenient_date};
use survey_model::{CompareOp, Expr, Value};

/// Cell access for one row. Unknown columns read as [`Value::Null`].
pub trait RowSource {
    fn value(&self, column: &str) -> Value;
}

/// Evaluates `expr` against a single row.
pub fn evaluate(expr: &Expr, row: &dyn RowSource) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Column(name) => row.value(name),
        Expr::Trim(inner) => match evaluate(inner, row).as_text() {
            Some(text) => Value::text(text.trim()),
            None => Value::Null,
        },
        Expr::ToDate(inner) => to_date(evaluate(inner, row)),
        Expr::ToNumber(inner) => to_number(evaluate(inner, row)),
        Expr::Compare { op, left, right } => {
            let left = evaluate(left, row);
            let right = evaluate(right, row);
            left.compare(&right)
                .map_or(Value::Null, |ordering| Value::Bool(matches(*op, ordering)))
        }
        Expr::StartsWith { expr, prefix } => {
            text_test(&evaluate(expr, row), &evaluate(prefix, row), |s, p| s.starts_with(p))
        }
        Expr::Contains { expr, needle } => {
            text_test(&evaluate(expr, row), &evaluate(needle, row), |s, n| s.contains(n))
        }
        Expr::InList {
            expr,
            values,
            negated,
        } => match evaluate(expr, row).as_text() {
            Some(text) => {
                let found = values.iter().any(|v| v.as_str() == text.as_ref());
                Value::Bool(found != *negated)
            }
            None => Value::Null,
        },
        Expr::IsNull(inner) => Value::Bool(evaluate(inner, row).is_null()),
        Expr::And(operands) => {
            let mut unknown = false;
            for operand in operands {
                match evaluate(operand, row).as_bool() {
                    Some(false) => return Value::Bool(false),
                    Some(true) => {}
                    None => unknown = true,
                }
            }
            if unknown { Value::Null } else { Value::Bool(true) }
        }
        Expr::Or(operands) => {
            let mut unknown = false;
            for operand in operands {
                match evaluate(operand, row).as_bool() {
                    Some(true) => return Value::Bool(true),
                    Some(false) => {}
                    None => unknown = true,
                }
            }
            if unknown { Value::Null } else { Value::Bool(false) }
        }
        Expr::Not(inner) => evaluate(inner, row)
            .as_bool()
            .map_or(Value::Null, |b| Value::Bool(!b)),
        Expr::Case {
            branches,
            otherwise,
        } => branches
            .iter()
            .find(|branch| passes(&branch.when, row))
            .map_or_else(|| evaluate(otherwise, row), |branch| evaluate(&branch.then, row)),
        Expr::ConcatNonEmpty { parts, separator } => {
            let pieces: Vec<String> = parts
                .iter()
                .filter_map(|part| evaluate(part, row).into_text())
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .collect();
            if pieces.is_empty() {
                Value::Null
            } else {
                Value::Text(pieces.join(separator))
            }
        }
    }
}

/// True only when `predicate` evaluates to `Bool(true)`.
pub fn passes(predicate: &Expr, row: &dyn RowSource) -> bool {
    evaluate(predicate, row).as_bool() == Some(true)
}

fn matches(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

fn text_test(subject: &Value, pattern: &Value, test: impl Fn(&str, &str) -> bool) -> Value {
    match (subject.as_text(), pattern.as_text()) {
        (Some(subject), Some(pattern)) => Value::Bool(test(&subject, &pattern)),
        _ => Value::Null,
    }
}

fn to_date(value: Value) -> Value {
    match value {
        Value::Date(date) => Value::Date(date),
        Value::Text(text) => parse_lenient_date(&text).map_or(Value::Null, Value::Date),
        Value::Int(v) => parse_lenient_date(&v.to_string()).map_or(Value::Null, Value::Date),
        _ => Value::Null,
    }
}

fn to_number(value: Value) -> Value {
    match value {
        Value::Int(_) | Value::Float(_) => value,
        Value::Text(text) => parse_i64(&text)
            .map(Value::Int)
            .or_else(|| parse_f64(&text).map(Value::Float))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use survey_model::CaseBranch;

    use super::*;

    /// A single in-memory row for evaluator tests.
    #[derive(Default)]
    pub(crate) struct MapRow(pub HashMap<String, Value>);

    impl MapRow {
        pub(crate) fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
            self.0.insert(column.to_string(), value.into());
            self
        }
    }

    impl RowSource for MapRow {
        fn value(&self, column: &str) -> Value {
            self.0.get(column).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn trim_renders_non_text() {
        let row = MapRow::default().with("n", 42i64).with("s", "  a b  ");
        assert_eq!(evaluate(&Expr::col("n").trim(), &row), Value::text("42"));
        assert_eq!(evaluate(&Expr::col("s").trim(), &row), Value::text("a b"));
        assert_eq!(evaluate(&Expr::col("missing").trim(), &row), Value::Null);
    }

    #[test]
    fn three_valued_logic() {
        let row = MapRow::default().with("a", "x");
        let unknown = Expr::col("missing").eq(Expr::lit("x"));
        let yes = Expr::col("a").eq(Expr::lit("x"));
        let no = Expr::col("a").eq(Expr::lit("y"));

        assert_eq!(evaluate(&unknown, &row), Value::Null);
        assert_eq!(
            evaluate(&Expr::And(vec![unknown.clone(), no.clone()]), &row),
            Value::Bool(false)
        );
        assert_eq!(evaluate(&Expr::And(vec![unknown.clone(), yes.clone()]), &row), Value::Null);
        assert_eq!(evaluate(&Expr::Or(vec![unknown.clone(), yes]), &row), Value::Bool(true));
        assert_eq!(evaluate(&Expr::Or(vec![unknown.clone(), no]), &row), Value::Null);
        assert_eq!(evaluate(&unknown.clone().not(), &row), Value::Null);
        assert!(!passes(&unknown, &row));
        assert!(passes(&Expr::And(Vec::new()), &row));
        assert!(!passes(&Expr::Or(Vec::new()), &row));
    }

    #[test]
    fn in_list_with_null_is_unknown_either_way() {
        let row = MapRow::default();
        let values = vec!["a".to_string()];
        assert_eq!(evaluate(&Expr::col("x").in_list(values.clone()), &row), Value::Null);
        assert_eq!(evaluate(&Expr::col("x").not_in_list(values), &row), Value::Null);
    }

    #[test]
    fn prefix_match_is_literal() {
        let row = MapRow::default().with("addr", "渋谷区1-2");
        assert!(passes(&Expr::col("addr").starts_with("渋谷区"), &row));
        assert!(!passes(&Expr::col("addr").starts_with("%"), &row));
        assert!(!passes(&Expr::col("addr").contains("_"), &row));
    }

    #[test]
    fn dates_and_numbers() {
        let row = MapRow::default()
            .with("compact", 20180410i64)
            .with("text", "2018/04/10")
            .with("bad", "spring")
            .with("num", " 12 ");
        let expected = Value::Date(NaiveDate::from_ymd_opt(2018, 4, 10).unwrap());
        assert_eq!(evaluate(&Expr::col("compact").to_date(), &row), expected);
        assert_eq!(evaluate(&Expr::col("text").to_date(), &row), expected);
        assert_eq!(evaluate(&Expr::col("bad").to_date(), &row), Value::Null);
        assert_eq!(evaluate(&Expr::col("num").to_number(), &row), Value::Int(12));
        assert!(passes(
            &Expr::col("num").to_number().ge(Expr::lit(10.5)),
            &row
        ));
    }

    #[test]
    fn case_takes_first_true_branch() {
        let row = MapRow::default().with("a", "x");
        let expr = Expr::case(
            vec![
                CaseBranch::new(Expr::col("missing").eq(Expr::lit("x")), Expr::lit("null-branch")),
                CaseBranch::new(Expr::col("a").eq(Expr::lit("x")), Expr::lit("first")),
                CaseBranch::new(Expr::always(), Expr::lit("second")),
            ],
            Expr::lit("else"),
        );
        assert_eq!(evaluate(&expr, &row), Value::text("first"));
    }

    #[test]
    fn concat_skips_blank_parts() {
        let row = MapRow::default().with("a", " x ").with("b", "  ").with("c", "y");
        let parts = vec![Expr::col("a"), Expr::col("b"), Expr::col("missing"), Expr::col("c")];
        assert_eq!(
            evaluate(&Expr::concat_non_empty(parts, "|||"), &row),
            Value::text("x|||y")
        );
        let empty = Expr::concat_non_empty(vec![Expr::col("b")], "|||");
        assert_eq!(evaluate(&empty, &row), Value::Null);
    }
}
