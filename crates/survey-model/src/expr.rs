//! Typed column expressions.
//!
//! Derived columns, filters and tabulation keys are all described as an
//! [`Expr`] tree. Literal values live inside the tree as [`Value`]s, so
//! values taken from configuration documents are never spliced into query
//! text. The tree is interpreted by a single evaluator in `survey-engine`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Comparison operators for [`Expr::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// One `when -> then` arm of a [`Expr::Case`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBranch {
    pub when: Expr,
    pub then: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Value),
    /// Reference to a base dataset column. Unknown names evaluate to null.
    Column(String),
    /// Text rendering of the operand with surrounding whitespace removed.
    Trim(Box<Expr>),
    /// Lenient date parse; null when the operand does not look like a date.
    ToDate(Box<Expr>),
    /// Numeric parse; null when the operand is not a number.
    ToNumber(Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    StartsWith {
        expr: Box<Expr>,
        prefix: Box<Expr>,
    },
    Contains {
        expr: Box<Expr>,
        needle: Box<Expr>,
    },
    /// Membership of the operand's text in `values`.
    InList {
        expr: Box<Expr>,
        values: Vec<String>,
        negated: bool,
    },
    IsNull(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// First branch whose condition is true wins, otherwise `otherwise`.
    Case {
        branches: Vec<CaseBranch>,
        otherwise: Box<Expr>,
    },
    /// Joins the trimmed, non-empty parts with `separator`; null if none remain.
    ConcatNonEmpty {
        parts: Vec<Expr>,
        separator: String,
    },
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn null() -> Self {
        Self::Literal(Value::Null)
    }

    pub fn col(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// The predicate that accepts every row.
    pub fn always() -> Self {
        Self::Literal(Value::Bool(true))
    }

    /// The predicate that rejects every row.
    pub fn never() -> Self {
        Self::Literal(Value::Bool(false))
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Self::Literal(Value::Bool(true)))
    }

    pub fn trim(self) -> Self {
        Self::Trim(Box::new(self))
    }

    pub fn to_date(self) -> Self {
        Self::ToDate(Box::new(self))
    }

    pub fn to_number(self) -> Self {
        Self::ToNumber(Box::new(self))
    }

    pub fn compare(self, op: CompareOp, right: Expr) -> Self {
        Self::Compare {
            op,
            left: Box::new(self),
            right: Box::new(right),
        }
    }

    pub fn eq(self, right: Expr) -> Self {
        self.compare(CompareOp::Eq, right)
    }

    pub fn lt(self, right: Expr) -> Self {
        self.compare(CompareOp::Lt, right)
    }

    pub fn le(self, right: Expr) -> Self {
        self.compare(CompareOp::Le, right)
    }

    pub fn gt(self, right: Expr) -> Self {
        self.compare(CompareOp::Gt, right)
    }

    pub fn ge(self, right: Expr) -> Self {
        self.compare(CompareOp::Ge, right)
    }

    pub fn starts_with(self, prefix: impl Into<Value>) -> Self {
        Self::StartsWith {
            expr: Box::new(self),
            prefix: Box::new(Self::lit(prefix)),
        }
    }

    pub fn contains(self, needle: impl Into<Value>) -> Self {
        Self::Contains {
            expr: Box::new(self),
            needle: Box::new(Self::lit(needle)),
        }
    }

    pub fn in_list(self, values: Vec<String>) -> Self {
        Self::InList {
            expr: Box::new(self),
            values,
            negated: false,
        }
    }

    pub fn not_in_list(self, values: Vec<String>) -> Self {
        Self::InList {
            expr: Box::new(self),
            values,
            negated: true,
        }
    }

    pub fn is_null(self) -> Self {
        Self::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Self {
        self.is_null().not()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Conjunction of `exprs`, dropping always-true operands.
    ///
    /// An empty input yields [`Expr::always`]; a single operand is returned as is.
    pub fn all(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let mut operands: Vec<Expr> = exprs.into_iter().filter(|e| !e.is_always()).collect();
        match operands.len() {
            0 => Self::always(),
            1 => operands.remove(0),
            _ => Self::And(operands),
        }
    }

    /// Disjunction of `exprs`. An empty input yields [`Expr::never`].
    pub fn any(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let mut operands: Vec<Expr> = exprs.into_iter().collect();
        match operands.len() {
            0 => Self::never(),
            1 => operands.remove(0),
            _ => Self::Or(operands),
        }
    }

    pub fn case(branches: Vec<CaseBranch>, otherwise: Expr) -> Self {
        Self::Case {
            branches,
            otherwise: Box::new(otherwise),
        }
    }

    pub fn concat_non_empty(parts: Vec<Expr>, separator: impl Into<String>) -> Self {
        Self::ConcatNonEmpty {
            parts,
            separator: separator.into(),
        }
    }

    /// Names of every dataset column the expression reads.
    pub fn referenced_columns(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_columns(&mut names);
        names
    }

    fn collect_columns<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Column(name) => {
                names.insert(name.as_str());
            }
            Self::Trim(e)
            | Self::ToDate(e)
            | Self::ToNumber(e)
            | Self::IsNull(e)
            | Self::Not(e) => {
                e.collect_columns(names);
            }
            Self::InList { expr, .. } => expr.collect_columns(names),
            Self::Compare { left, right, .. } => {
                left.collect_columns(names);
                right.collect_columns(names);
            }
            Self::StartsWith { expr, prefix: other } | Self::Contains { expr, needle: other } => {
                expr.collect_columns(names);
                other.collect_columns(names);
            }
            Self::And(exprs) | Self::Or(exprs) => {
                for e in exprs {
                    e.collect_columns(names);
                }
            }
            Self::Case {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    branch.when.collect_columns(names);
                    branch.then.collect_columns(names);
                }
                otherwise.collect_columns(names);
            }
            Self::ConcatNonEmpty { parts, .. } => {
                for part in parts {
                    part.collect_columns(names);
                }
            }
        }
    }
}

impl CaseBranch {
    pub fn new(when: Expr, then: Expr) -> Self {
        Self { when, then }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_simplifies() {
        assert!(Expr::all(Vec::new()).is_always());
        assert_eq!(Expr::all(vec![Expr::always(), Expr::col("a")]), Expr::col("a"));
        assert!(matches!(
            Expr::all(vec![Expr::col("a"), Expr::col("b")]),
            Expr::And(ref v) if v.len() == 2
        ));
    }

    #[test]
    fn any_of_nothing_never_matches() {
        assert_eq!(Expr::any(Vec::new()), Expr::never());
    }

    #[test]
    fn referenced_columns_walks_tree() {
        let expr = Expr::case(
            vec![CaseBranch::new(
                Expr::col("a").trim().eq(Expr::lit("x")),
                Expr::lit("A"),
            )],
            Expr::concat_non_empty(vec![Expr::col("b"), Expr::col("c")], "|"),
        );
        let names: Vec<&str> = expr.referenced_columns().into_iter().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn literals_stay_values() {
        let expr = Expr::col("city").eq(Expr::lit("'; DROP TABLE t; --"));
        let Expr::Compare { right, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(*right, Expr::lit("'; DROP TABLE t; --"));
    }
}
