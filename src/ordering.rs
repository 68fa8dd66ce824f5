//! Equality and ordering.
//!
//! Ordering is only meaningful for number×number and string×string. Any other pair of
//! matching variants is `Equal` when structurally equal and `Incomparable` otherwise;
//! mismatched variants are always `Incomparable`. `PartialOrd` maps `Incomparable` to
//! `None`, so `<`, `<=`, `>` and `>=` all answer `false` for such pairs.

use std::cmp::Ordering;

use crate::value::JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Less,
    Equal,
    Greater,
    Incomparable,
}

impl Comparison {
    pub fn to_ordering(self) -> Option<Ordering> {
        match self {
            Comparison::Less => Some(Ordering::Less),
            Comparison::Equal => Some(Ordering::Equal),
            Comparison::Greater => Some(Ordering::Greater),
            Comparison::Incomparable => None,
        }
    }
}

impl From<Option<Ordering>> for Comparison {
    fn from(ord: Option<Ordering>) -> Self {
        match ord {
            Some(Ordering::Less) => Comparison::Less,
            Some(Ordering::Equal) => Comparison::Equal,
            Some(Ordering::Greater) => Comparison::Greater,
            None => Comparison::Incomparable,
        }
    }
}

impl JsonValue {
    pub fn compare(&self, other: &JsonValue) -> Comparison {
        match (self, other) {
            (JsonValue::Number(a), JsonValue::Number(b)) => a.numeric_cmp(b).into(),
            (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)).into(),
            (JsonValue::Bool(_), JsonValue::Bool(_))
            | (JsonValue::Array(_), JsonValue::Array(_))
            | (JsonValue::Object(_), JsonValue::Object(_))
            | (JsonValue::Null, JsonValue::Null)
            | (JsonValue::Error(_), JsonValue::Error(_)) => {
                if self == other {
                    Comparison::Equal
                } else {
                    Comparison::Incomparable
                }
            }
            _ => Comparison::Incomparable,
        }
    }
}

impl PartialEq for JsonValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsonValue::Number(a), JsonValue::Number(b)) => a == b,
            (JsonValue::String(a), JsonValue::String(b)) => a == b,
            (JsonValue::Bool(a), JsonValue::Bool(b)) => a == b,
            (JsonValue::Array(a), JsonValue::Array(b)) => a == b,
            (JsonValue::Object(a), JsonValue::Object(b)) => a == b,
            (JsonValue::Null, JsonValue::Null) => true,
            (JsonValue::Error(a), JsonValue::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for JsonValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other).to_ordering()
    }
}
