//! The dynamic JSON value.
//!
//! `JsonValue` is a closed tagged union over the five JSON shapes plus `Null` and an
//! `Error` state. The error state is an ordinary value: every read path is total, and a
//! failed lookup degrades into `Error(kind)` that further lookups pass through unchanged.
pub mod number;

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, CONTROLS};
use regex::Regex;

use crate::error::{ErrorKind, JsonError};

pub use number::Number;

// ------------------------------- Policy ---------------------------------- //

/// Nesting depth accepted by parse, wrap and serialize unless overridden.
pub const DEFAULT_MAX_DEPTH: usize = 128;

// ------------------------------- Types ----------------------------------- //

#[derive(Debug, Clone, Default)]
pub enum JsonValue {
    Number(Number),
    String(String),
    Bool(bool),
    Array(Vec<JsonValue>),
    Object(BTreeMap<String, JsonValue>),
    #[default]
    Null,
    Error(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Number,
    String,
    Bool,
    Array,
    Object,
    Null,
    Unknown,
}

/// Structural limits shared by parsing, wrapping and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
}

impl Limits {
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Bool => "bool",
            JsonType::Array => "array",
            JsonType::Object => "object",
            JsonType::Null => "null",
            JsonType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

pub(crate) static EMPTY_OBJECT: BTreeMap<String, JsonValue> = BTreeMap::new();

// ---------------------------- Classification ----------------------------- //

impl JsonValue {
    pub fn json_type(&self) -> JsonType {
        match self {
            JsonValue::Number(_) => JsonType::Number,
            JsonValue::String(_) => JsonType::String,
            JsonValue::Bool(_) => JsonType::Bool,
            JsonValue::Array(_) => JsonType::Array,
            JsonValue::Object(_) => JsonType::Object,
            JsonValue::Null => JsonType::Null,
            JsonValue::Error(_) => JsonType::Unknown,
        }
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            JsonValue::Error(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Neither an error nor null.
    pub fn is_valid(&self) -> bool {
        !matches!(self, JsonValue::Error(_) | JsonValue::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonValue::Error(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, JsonValue::Bool(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, JsonValue::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsonValue::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, JsonValue::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsonValue::Object(_))
    }

    /// Surface a terminal error value as a raised error; any other value passes.
    pub fn into_result(self) -> Result<JsonValue, JsonError> {
        match self {
            JsonValue::Error(kind) => Err(JsonError::Value(kind)),
            other => Ok(other),
        }
    }
}

// ---------------------------- Collections -------------------------------- //

impl JsonValue {
    pub fn as_array(&self) -> Option<&Vec<JsonValue>> {
        match self {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<JsonValue>> {
        match self {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn array_value(&self) -> &[JsonValue] {
        self.as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, JsonValue>> {
        match self {
            JsonValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, JsonValue>> {
        match self {
            JsonValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn object_value(&self) -> &BTreeMap<String, JsonValue> {
        self.as_object().unwrap_or(&EMPTY_OBJECT)
    }

    pub fn as_null(&self) -> Option<()> {
        self.is_null().then_some(())
    }

    /// `(key, value)` pairs: array positions as decimal strings, object keys sorted.
    /// Scalars, null and errors yield nothing.
    pub fn entries(&self) -> Box<dyn Iterator<Item = (String, &JsonValue)> + '_> {
        match self {
            JsonValue::Array(items) => {
                Box::new(items.iter().enumerate().map(|(i, v)| (i.to_string(), v)))
            }
            JsonValue::Object(map) => Box::new(map.iter().map(|(k, v)| (k.clone(), v))),
            _ => Box::new(std::iter::empty()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            JsonValue::Array(items) => items.len(),
            JsonValue::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// --------------------------------- URL ----------------------------------- //

/// Bytes escaped when percent-encoding a URL candidate: everything outside the query-allowed set.
const URL_QUERY_ALLOWED: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

static PERCENT_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("%[0-9A-Fa-f]{2}").expect("valid percent-escape pattern")
});

impl JsonValue {
    /// Absolute URL held in a string. Strings that already carry a percent escape are
    /// parsed verbatim so `%` is never escaped twice.
    pub fn as_url(&self) -> Option<url::Url> {
        let JsonValue::String(s) = self else { return None };
        if PERCENT_ESCAPE.is_match(s) {
            url::Url::parse(s).ok()
        } else {
            let encoded = percent_encoding::utf8_percent_encode(s, URL_QUERY_ALLOWED).to_string();
            url::Url::parse(&encoded).ok()
        }
    }
}

// ------------------------------ Literals --------------------------------- //

impl From<bool> for JsonValue {
    fn from(v: bool) -> Self {
        JsonValue::Bool(v)
    }
}

impl From<&str> for JsonValue {
    fn from(v: &str) -> Self {
        JsonValue::String(v.to_owned())
    }
}

impl From<String> for JsonValue {
    fn from(v: String) -> Self {
        JsonValue::String(v)
    }
}

impl From<Number> for JsonValue {
    fn from(v: Number) -> Self {
        JsonValue::Number(v)
    }
}

impl From<ErrorKind> for JsonValue {
    fn from(kind: ErrorKind) -> Self {
        JsonValue::Error(kind)
    }
}

macro_rules! value_from_number {
    ($($t:ty),*) => {$(
        impl From<$t> for JsonValue {
            fn from(v: $t) -> Self { JsonValue::Number(Number::from(v)) }
        }
    )*};
}

value_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl From<Vec<JsonValue>> for JsonValue {
    fn from(v: Vec<JsonValue>) -> Self {
        JsonValue::Array(v)
    }
}

impl From<BTreeMap<String, JsonValue>> for JsonValue {
    fn from(v: BTreeMap<String, JsonValue>) -> Self {
        JsonValue::Object(v)
    }
}

impl<T: Into<JsonValue>> From<Option<T>> for JsonValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(JsonValue::Null, Into::into)
    }
}

impl<T: Into<JsonValue>> FromIterator<T> for JsonValue {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        JsonValue::Array(iter.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for JsonValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        JsonValue::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ------------------------------- Display --------------------------------- //

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonValue::Error(kind) => write!(f, "error({kind})"),
            other => match serde_json::to_string(other) {
                Ok(text) => f.write_str(&text),
                Err(_) => write!(f, "{other:?}"),
            },
        }
    }
}
