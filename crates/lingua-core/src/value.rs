use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error as ThisError;

///
/// Value
///
/// Untyped field value used by rows, predicates, and projections.
///
/// Null → the field's value is Option::None (i.e. SQL NULL).
/// Unit → internal placeholder for RHS; not a real value.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
    /// Ordered list of values. Used for `In` right-hand sides and
    /// values-list transport. List order is preserved.
    List(Vec<Self>),
    Null,
    Unit,
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Deterministic cross-variant ordering used by order-by evaluation.
    ///
    /// Null sorts before everything; numeric variants compare by value
    /// across Int/Uint; otherwise variants compare by tag then payload.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.cmp(b),
            (Self::Int(a), Self::Uint(b)) => cmp_int_uint(*a, *b),
            (Self::Uint(a), Self::Int(b)) => cmp_int_uint(*b, *a).reverse(),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) => tag(a).cmp(&tag(b)),
        }
    }

    /// Value equality with Int/Uint cross-coercion, as used by predicates.
    #[must_use]
    pub fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Uint(b)) => cmp_int_uint(*a, *b) == Ordering::Equal,
            (Self::Uint(a), Self::Int(b)) => cmp_int_uint(*b, *a) == Ordering::Equal,
            (a, b) => a == b,
        }
    }
}

const fn cmp_int_uint(a: i64, b: u64) -> Ordering {
    if a < 0 {
        Ordering::Less
    } else {
        let a = a as u64;
        if a < b {
            Ordering::Less
        } else if a > b {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

const fn tag(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Uint(_) => 2,
        Value::Text(_) => 3,
        Value::List(_) => 4,
        Value::Unit => 5,
    }
}

///
/// CoercionError
///
/// A row value did not match the field's declared Rust type.
///

#[derive(Debug, ThisError)]
#[error("field '{field}' cannot be read as {expected}")]
pub struct CoercionError {
    pub field: String,
    pub expected: &'static str,
}

impl CoercionError {
    #[must_use]
    pub fn new(field: impl Into<String>, expected: &'static str) -> Self {
        Self {
            field: field.into(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_first() {
        assert_eq!(Value::Null.compare(&Value::Int(-5)), Ordering::Less);
        assert_eq!(Value::Uint(0).compare(&Value::Null), Ordering::Greater);
    }

    #[test]
    fn int_uint_cross_comparison() {
        assert_eq!(Value::Int(-1).compare(&Value::Uint(0)), Ordering::Less);
        assert_eq!(Value::Int(5).compare(&Value::Uint(5)), Ordering::Equal);
        assert!(Value::Uint(9).loosely_equals(&Value::Int(9)));
        assert!(!Value::Uint(9).loosely_equals(&Value::Int(-9)));
    }

    #[test]
    fn list_ordering_is_lexicographic() {
        let a = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(0)]);
        assert_eq!(a.compare(&b), Ordering::Less);
    }
}
