//! Error taxonomy.
//!
//! Read paths never fail: they hand back a `JsonValue::Error(ErrorKind)` instead.
//! `JsonError` is reserved for write paths (strict merge, serialization, typed decode)
//! and for callers that want to turn a terminal error value into a raised error.

use crate::value::JsonType;

// ————————————————————————————————————————————————————————————————————————————
// ERROR KINDS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorKind {
    #[error("It is an unsupported type.")]
    UnsupportedType,
    #[error("Array Index is out of bounds.")]
    IndexOutOfBounds,
    #[error("Element too deep. Increase the depth limit and make sure there is no reference loop.")]
    ElementTooDeep,
    #[error("Value has the wrong type for this access.")]
    WrongType,
    #[error("Dictionary key does not exist.")]
    NotExist,
    #[error("JSON is invalid.")]
    InvalidEncoding,
}

impl ErrorKind {
    pub const DOMAIN: &'static str = "dynjson";

    /// Stable numeric code, kept compatible with payloads that persisted them.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::UnsupportedType => 999,
            ErrorKind::IndexOutOfBounds => 900,
            ErrorKind::ElementTooDeep => 902,
            ErrorKind::WrongType => 901,
            ErrorKind::NotExist => 500,
            ErrorKind::InvalidEncoding => 490,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        [
            ErrorKind::UnsupportedType,
            ErrorKind::IndexOutOfBounds,
            ErrorKind::ElementTooDeep,
            ErrorKind::WrongType,
            ErrorKind::NotExist,
            ErrorKind::InvalidEncoding,
        ]
        .into_iter()
        .find(|kind| kind.code() == code)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RAISED ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    /// A terminal error value surfaced at a caller boundary.
    #[error("{0}")]
    Value(ErrorKind),

    #[error("couldn't merge, because the values differ in type on top level ({base} vs {overlay})")]
    MergeTypeMismatch { base: JsonType, overlay: JsonType },

    #[error("top-level value must be an array or an object, found {0}")]
    InvalidRoot(JsonType),

    #[error("value at {path} is not representable as JSON: {kind}")]
    NotRepresentable { path: String, kind: ErrorKind },

    #[error("at JSON path {path} → {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl JsonError {
    /// Closest member of the closed taxonomy, for callers that only track kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JsonError::Value(kind) => *kind,
            JsonError::MergeTypeMismatch { .. } => ErrorKind::WrongType,
            JsonError::InvalidRoot(_) => ErrorKind::InvalidEncoding,
            JsonError::NotRepresentable { kind, .. } => *kind,
            JsonError::Decode { .. } | JsonError::Serde(_) => ErrorKind::UnsupportedType,
        }
    }
}

impl From<ErrorKind> for JsonError {
    fn from(kind: ErrorKind) -> Self {
        JsonError::Value(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_lookup() {
        for kind in [
            ErrorKind::UnsupportedType,
            ErrorKind::IndexOutOfBounds,
            ErrorKind::ElementTooDeep,
            ErrorKind::WrongType,
            ErrorKind::NotExist,
            ErrorKind::InvalidEncoding,
        ] {
            assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ErrorKind::from_code(1), None);
    }

    #[test]
    fn merge_mismatch_maps_to_wrong_type() {
        let err = JsonError::MergeTypeMismatch { base: JsonType::Object, overlay: JsonType::Array };
        assert_eq!(err.kind(), ErrorKind::WrongType);
        assert!(err.to_string().contains("object vs array"));
    }
}
