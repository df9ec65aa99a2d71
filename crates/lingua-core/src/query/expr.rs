//! Predicate AST.
//!
//! Pure, schema-agnostic representation of query predicates. Paths are
//! logical names with optional trailing operator tokens
//! (`title__icontains`); all interpretation happens in later passes:
//! rewriting (schema-aware) and evaluation.

use crate::{traits::FieldValue, value::Value};
use std::ops::{BitAnd, BitOr, Not};

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    IsNull,
}

impl CompareOp {
    /// Parse a trailing path token into an operator, if it is one.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ne" => Some(Self::Ne),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "in" => Some(Self::In),
            "contains" => Some(Self::Contains),
            "icontains" => Some(Self::IContains),
            "startswith" => Some(Self::StartsWith),
            "endswith" => Some(Self::EndsWith),
            "isnull" => Some(Self::IsNull),
            _ => None,
        }
    }

    /// Evaluate `lhs <op> rhs`. Null behaves like SQL NULL: ordered
    /// comparisons against it never match; equality matches only via
    /// an explicitly Null right-hand side or `IsNull`.
    #[must_use]
    pub fn apply(self, lhs: &Value, rhs: &Value) -> bool {
        match self {
            Self::Eq => {
                if rhs.is_null() {
                    lhs.is_null()
                } else {
                    lhs.loosely_equals(rhs)
                }
            }
            Self::Ne => !Self::Eq.apply(lhs, rhs),
            Self::Lt | Self::Lte | Self::Gt | Self::Gte => {
                if lhs.is_null() || rhs.is_null() {
                    return false;
                }
                let ord = lhs.compare(rhs);
                match self {
                    Self::Lt => ord.is_lt(),
                    Self::Lte => ord.is_le(),
                    Self::Gt => ord.is_gt(),
                    Self::Gte => ord.is_ge(),
                    _ => unreachable!(),
                }
            }
            Self::In => match rhs {
                Value::List(items) => items.iter().any(|item| lhs.loosely_equals(item)),
                _ => false,
            },
            Self::Contains => text_op(lhs, rhs, |l, r| l.contains(r)),
            Self::IContains => {
                text_op(lhs, rhs, |l, r| l.to_lowercase().contains(&r.to_lowercase()))
            }
            Self::StartsWith => text_op(lhs, rhs, |l, r| l.starts_with(r)),
            Self::EndsWith => text_op(lhs, rhs, |l, r| l.ends_with(r)),
            Self::IsNull => match rhs {
                Value::Bool(expected) => lhs.is_null() == *expected,
                _ => false,
            },
        }
    }
}

fn text_op(lhs: &Value, rhs: &Value, op: impl FnOnce(&str, &str) -> bool) -> bool {
    match (lhs, rhs) {
        (Value::Text(l), Value::Text(r)) => op(l, r),
        _ => false,
    }
}

///
/// Condition
///
/// One predicate leaf: a logical path (operator suffix included) and a
/// right-hand value.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub path: String,
    pub value: Value,
}

///
/// FilterExpr
///
/// Composable predicate tree; the positional-logical-expression surface.
/// `a & b`, `a | b`, and `!a` build the tree.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Cond(Condition),
}

impl FilterExpr {
    /// Leaf condition from a logical path and any convertible value.
    #[must_use]
    pub fn cond(path: impl Into<String>, value: impl FieldValue) -> Self {
        Self::Cond(Condition {
            path: path.into(),
            value: value.to_value(),
        })
    }

    /// Leaf condition with an already-built [`Value`].
    #[must_use]
    pub fn cond_value(path: impl Into<String>, value: Value) -> Self {
        Self::Cond(Condition {
            path: path.into(),
            value,
        })
    }

    /// Walk every leaf condition.
    pub fn for_each_condition<'a>(&'a self, f: &mut impl FnMut(&'a Condition)) {
        match self {
            Self::And(items) | Self::Or(items) => {
                for item in items {
                    item.for_each_condition(f);
                }
            }
            Self::Not(inner) => inner.for_each_condition(f),
            Self::Cond(cond) => f(cond),
        }
    }
}

impl BitAnd for FilterExpr {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        match self {
            Self::And(mut items) => {
                items.push(rhs);
                Self::And(items)
            }
            lhs => Self::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for FilterExpr {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        match self {
            Self::Or(mut items) => {
                items.push(rhs);
                Self::Or(items)
            }
            lhs => Self::Or(vec![lhs, rhs]),
        }
    }
}

impl Not for FilterExpr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

///
/// SortKey
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortKey {
    pub path: String,
    pub descending: bool,
}

impl SortKey {
    /// Parse a `-`-prefixed ordering key.
    #[must_use]
    pub fn parse(key: &str) -> Self {
        key.strip_prefix('-').map_or_else(
            || Self {
                path: key.to_string(),
                descending: false,
            },
            |rest| Self {
                path: rest.to_string(),
                descending: true,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_handles_null() {
        assert!(CompareOp::Eq.apply(&Value::Null, &Value::Null));
        assert!(!CompareOp::Eq.apply(&Value::Int(1), &Value::Null));
        assert!(!CompareOp::Lt.apply(&Value::Null, &Value::Int(1)));
    }

    #[test]
    fn text_operators() {
        let hay = Value::text("Hello World");
        assert!(CompareOp::Contains.apply(&hay, &Value::text("lo W")));
        assert!(!CompareOp::Contains.apply(&hay, &Value::text("lo w")));
        assert!(CompareOp::IContains.apply(&hay, &Value::text("LO W")));
        assert!(CompareOp::StartsWith.apply(&hay, &Value::text("Hell")));
        assert!(CompareOp::EndsWith.apply(&hay, &Value::text("rld")));
    }

    #[test]
    fn in_operator_coerces_int_uint() {
        let rhs = Value::List(vec![Value::Int(3), Value::Int(5)]);
        assert!(CompareOp::In.apply(&Value::Uint(5), &rhs));
        assert!(!CompareOp::In.apply(&Value::Uint(4), &rhs));
    }

    #[test]
    fn expr_operators_compose() {
        let expr = (FilterExpr::cond("a", 1i64) & FilterExpr::cond("b", 2i64))
            | !FilterExpr::cond("c", 3i64);
        match expr {
            FilterExpr::Or(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn sort_key_parses_direction() {
        assert_eq!(
            SortKey::parse("-shared_field"),
            SortKey {
                path: "shared_field".to_string(),
                descending: true
            }
        );
        assert!(!SortKey::parse("title").descending);
    }
}
