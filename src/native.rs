//! Classification of native data into `JsonValue`.
//!
//! `Native` is the closed set of shapes `wrap` understands. Anything outside it travels as
//! `Native::Other` and is offered to the registered converters, in registration order,
//! before it ends up as `Error(UnsupportedType)`.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use log::trace;

use crate::error::ErrorKind;
use crate::value::{JsonValue, Limits, Number};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub enum Native {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Raw document bytes; parsed on wrap.
    Bytes(Vec<u8>),
    Array(Vec<Native>),
    Map(BTreeMap<String, Native>),
    /// Possibly nested optionals; flattened by `unwrap`.
    Optional(Option<Box<Native>>),
    Json(JsonValue),
    Other(Box<dyn Any + Send + Sync>),
}

/// Fallback classification for `Native::Other` payloads.
pub trait Converter: Send + Sync {
    fn convert(&self, value: &(dyn Any + Send + Sync)) -> Option<JsonValue>;
}

impl<F> Converter for F
where
    F: Fn(&(dyn Any + Send + Sync)) -> Option<JsonValue> + Send + Sync,
{
    fn convert(&self, value: &(dyn Any + Send + Sync)) -> Option<JsonValue> {
        self(value)
    }
}

/// Configured classifier: null sentinels, converters and depth limit.
#[derive(Default)]
pub struct Wrapper {
    sentinels: Vec<String>,
    converters: Vec<Box<dyn Converter>>,
    limits: Limits,
}

// ————————————————————————————————————————————————————————————————————————————
// UNWRAP
// ————————————————————————————————————————————————————————————————————————————

fn is_null_sentinel(s: &str, sentinels: &[String]) -> bool {
    s.eq_ignore_ascii_case("nil")
        || s.eq_ignore_ascii_case("null")
        || sentinels.iter().any(|x| x.to_lowercase() == s.to_lowercase())
}

/// Normalize one level: null sentinels and `Null` become absent, optionals are flattened
/// to their innermost present value.
pub fn unwrap(native: Native, sentinels: &[String]) -> Option<Native> {
    match native {
        Native::Str(s) if is_null_sentinel(&s, sentinels) => None,
        Native::Null => None,
        Native::Optional(inner) => unwrap(*inner?, sentinels),
        other => Some(other),
    }
}

/// `unwrap` applied through arrays and maps; absent elements and values are dropped.
pub fn deep_unwrap(native: Native, sentinels: &[String]) -> Option<Native> {
    match unwrap(native, sentinels)? {
        Native::Array(items) => Some(Native::Array(
            items.into_iter().filter_map(|x| deep_unwrap(x, sentinels)).collect(),
        )),
        Native::Map(map) => Some(Native::Map(
            map.into_iter()
                .filter_map(|(k, v)| deep_unwrap(v, sentinels).map(|v| (k, v)))
                .collect(),
        )),
        other => Some(other),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// WRAP
// ————————————————————————————————————————————————————————————————————————————

impl Wrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra strings (case-insensitive) that read as absent, next to `nil` and `null`.
    pub fn treat_as_null(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinels.push(sentinel.into());
        self
    }

    pub fn with_converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converters.push(Box::new(converter));
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn sentinels(&self) -> &[String] {
        &self.sentinels
    }

    pub fn wrap(&self, native: Native) -> JsonValue {
        self.wrap_at(native, 0)
    }

    /// Classify an arbitrary value: known types by downcast, then converters.
    pub fn wrap_any(&self, value: Box<dyn Any + Send + Sync>) -> JsonValue {
        self.wrap(Native::from_any(value))
    }

    fn wrap_at(&self, native: Native, depth: usize) -> JsonValue {
        if depth > self.limits.max_depth {
            return JsonValue::Error(ErrorKind::ElementTooDeep);
        }
        let Some(native) = unwrap(native, &self.sentinels) else {
            return JsonValue::Null;
        };
        match native {
            Native::Json(value) => value,
            Native::Bool(b) => JsonValue::Bool(b),
            Native::Int(i) => JsonValue::Number(Number::from(i)),
            Native::UInt(u) => JsonValue::Number(Number::from(u)),
            Native::Float(f) => JsonValue::Number(Number::from(f)),
            Native::Str(s) => JsonValue::String(s),
            Native::Bytes(bytes) => JsonValue::parse_with(&bytes, &self.limits),
            Native::Array(items) => JsonValue::Array(
                items.into_iter().map(|x| self.wrap_at(x, depth + 1)).collect(),
            ),
            Native::Map(map) => JsonValue::Object(
                map.into_iter().map(|(k, v)| (k, self.wrap_at(v, depth + 1))).collect(),
            ),
            Native::Other(any) => self.convert(any.as_ref()),
            // unwrap already flattened these
            Native::Null | Native::Optional(_) => JsonValue::Null,
        }
    }

    fn convert(&self, value: &(dyn Any + Send + Sync)) -> JsonValue {
        for (i, converter) in self.converters.iter().enumerate() {
            if let Some(json) = converter.convert(value) {
                trace!("custom converter #{i} classified a native value");
                return json;
            }
        }
        JsonValue::Error(ErrorKind::UnsupportedType)
    }
}

impl JsonValue {
    /// Classify native data with the default `Wrapper`.
    pub fn wrap(native: impl Into<Native>) -> JsonValue {
        Wrapper::default().wrap(native.into())
    }

    /// Wrap then serialize; `None` when the result is not a valid document.
    pub fn data_of(native: impl Into<Native>, pretty: bool) -> Option<Vec<u8>> {
        JsonValue::wrap(native).serialize(pretty).ok()
    }

    pub fn string_of(native: impl Into<Native>, pretty: bool) -> Option<String> {
        JsonValue::data_of(native, pretty).and_then(|bytes| String::from_utf8(bytes).ok())
    }

    pub fn sure_string_of(
        native: impl Into<Native>,
        pretty: bool,
        or: impl FnOnce() -> String,
    ) -> String {
        JsonValue::string_of(native, pretty).unwrap_or_else(or)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSIONS INTO NATIVE
// ————————————————————————————————————————————————————————————————————————————

impl Native {
    /// Downcast against the finite set of known types; everything else stays `Other`.
    pub fn from_any(value: Box<dyn Any + Send + Sync>) -> Native {
        macro_rules! try_downcast {
            ($value:ident, $($t:ty),*) => {$(
                let $value = match $value.downcast::<$t>() {
                    Ok(x) => return Native::from(*x),
                    Err(other) => other,
                };
            )*};
        }
        try_downcast!(
            value,
            JsonValue, bool, String, &'static str,
            i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64,
            Vec<JsonValue>, BTreeMap<String, JsonValue>, Option<JsonValue>, Option<String>
        );
        Native::Other(value)
    }

    pub fn other<T: Any + Send + Sync>(value: T) -> Native {
        Native::Other(Box::new(value))
    }
}

impl From<JsonValue> for Native {
    fn from(v: JsonValue) -> Self {
        Native::Json(v)
    }
}

impl From<bool> for Native {
    fn from(v: bool) -> Self {
        Native::Bool(v)
    }
}

impl From<String> for Native {
    fn from(v: String) -> Self {
        Native::Str(v)
    }
}

impl From<&str> for Native {
    fn from(v: &str) -> Self {
        Native::Str(v.to_owned())
    }
}

macro_rules! native_from_int {
    ($variant:ident as $wide:ty: $($t:ty),*) => {$(
        impl From<$t> for Native {
            fn from(v: $t) -> Self { Native::$variant(v as $wide) }
        }
    )*};
}

native_from_int!(Int as i64: i8, i16, i32, i64, isize);
native_from_int!(UInt as u64: u8, u16, u32, u64, usize);

impl From<f32> for Native {
    fn from(v: f32) -> Self {
        Native::Float(f64::from(v))
    }
}

impl From<f64> for Native {
    fn from(v: f64) -> Self {
        Native::Float(v)
    }
}

impl<T: Into<Native>> From<Vec<T>> for Native {
    fn from(v: Vec<T>) -> Self {
        Native::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Native>> From<BTreeMap<String, T>> for Native {
    fn from(v: BTreeMap<String, T>) -> Self {
        Native::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Native>> From<std::collections::HashMap<String, T>> for Native {
    fn from(v: std::collections::HashMap<String, T>) -> Self {
        Native::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Native>> From<Option<T>> for Native {
    fn from(v: Option<T>) -> Self {
        Native::Optional(v.map(|x| Box::new(x.into())))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Native::Null => f.write_str("Null"),
            Native::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Native::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Native::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            Native::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Native::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Native::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Native::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Native::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Native::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            Native::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Native::Other(_) => f.write_str("Other(..)"),
        }
    }
}

impl PartialEq for Native {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Native::Null, Native::Null) => true,
            (Native::Bool(a), Native::Bool(b)) => a == b,
            (Native::Int(a), Native::Int(b)) => a == b,
            (Native::UInt(a), Native::UInt(b)) => a == b,
            (Native::Float(a), Native::Float(b)) => a == b,
            (Native::Str(a), Native::Str(b)) => a == b,
            (Native::Bytes(a), Native::Bytes(b)) => a == b,
            (Native::Array(a), Native::Array(b)) => a == b,
            (Native::Map(a), Native::Map(b)) => a == b,
            (Native::Optional(a), Native::Optional(b)) => a == b,
            (Native::Json(a), Native::Json(b)) => a == b,
            // opaque payloads have no equality
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Point {
        x: i64,
        y: i64,
    }

    fn nested_optional(inner: Option<Native>) -> Native {
        Native::Optional(Some(Box::new(Native::Optional(inner.map(Box::new)))))
    }

    #[test]
    fn null_sentinels_are_absent() {
        assert_eq!(unwrap(Native::from("NULL"), &[]), None);
        assert_eq!(unwrap(Native::from("Nil"), &[]), None);
        assert_eq!(unwrap(Native::from("none"), &["NONE".to_string()]), None);
        assert_eq!(unwrap(Native::from("nothing"), &[]), Some(Native::from("nothing")));
        assert_eq!(unwrap(Native::Null, &[]), None);
    }

    #[test]
    fn nested_optionals_flatten() {
        assert_eq!(unwrap(nested_optional(Some(Native::from(7))), &[]), Some(Native::Int(7)));
        assert_eq!(unwrap(nested_optional(None), &[]), None);
        assert_eq!(unwrap(nested_optional(Some(Native::from("null"))), &[]), None);
    }

    #[test]
    fn deep_unwrap_drops_absent_children() {
        let map: BTreeMap<String, Native> = [
            ("keep".to_string(), Native::from(1)),
            ("drop".to_string(), Native::from("nil")),
            (
                "list".to_string(),
                Native::Array(vec![Native::Null, Native::from("x"), nested_optional(None)]),
            ),
        ]
        .into_iter()
        .collect();
        let out = deep_unwrap(Native::Map(map), &[]);
        let expected: BTreeMap<String, Native> = [
            ("keep".to_string(), Native::Int(1)),
            ("list".to_string(), Native::Array(vec![Native::from("x")])),
        ]
        .into_iter()
        .collect();
        assert_eq!(out, Some(Native::Map(expected)));
    }

    #[test]
    fn deep_unwrap_is_idempotent() {
        let build = || {
            Native::Array(vec![
                Native::from("null"),
                nested_optional(Some(Native::Array(vec![Native::from(1), Native::Null]))),
                Native::from("ok"),
            ])
        };
        let once = deep_unwrap(build(), &[]);
        let twice = once.and_then(|x| deep_unwrap(x, &[]));
        assert_eq!(twice, deep_unwrap(build(), &[]));
    }

    #[test]
    fn wrap_classifies_known_shapes() {
        let map: BTreeMap<String, Native> = [
            ("flag".to_string(), Native::from(true)),
            ("n".to_string(), Native::from(3u8)),
            ("f".to_string(), Native::from(1.5f32)),
            ("s".to_string(), Native::from("text")),
            ("gone".to_string(), Native::from("null")),
            ("list".to_string(), Native::from(vec![1i32, 2])),
        ]
        .into_iter()
        .collect();
        let value = JsonValue::wrap(Native::Map(map));
        let expected = JsonValue::from(json!({
            "flag": true, "n": 3, "f": 1.5, "s": "text", "gone": null, "list": [1, 2]
        }));
        assert_eq!(value, expected);
    }

    #[test]
    fn wrap_passes_json_through_and_parses_bytes() {
        let inner = JsonValue::from(json!({"a": [1]}));
        assert_eq!(JsonValue::wrap(inner.clone()), inner);
        assert_eq!(JsonValue::wrap(Native::Bytes(br#"{"a":[1]}"#.to_vec())), inner);
        assert_eq!(
            JsonValue::wrap(Native::Bytes(b"{oops".to_vec())),
            JsonValue::Error(ErrorKind::InvalidEncoding)
        );
    }

    #[test]
    fn unknown_types_are_unsupported_without_converter() {
        let value = Wrapper::new().wrap(Native::other(Point { x: 1, y: 2 }));
        assert_eq!(value, JsonValue::Error(ErrorKind::UnsupportedType));
    }

    #[test]
    fn converters_run_in_registration_order() {
        let wrapper = Wrapper::new()
            .with_converter(|_: &(dyn Any + Send + Sync)| None::<JsonValue>)
            .with_converter(|v: &(dyn Any + Send + Sync)| {
                v.downcast_ref::<Point>()
                    .map(|p| [("x", p.x), ("y", p.y)].into_iter().collect::<JsonValue>())
            })
            .with_converter(|_: &(dyn Any + Send + Sync)| Some(JsonValue::from("never reached")));
        let value = wrapper.wrap(Native::other(Point { x: 1, y: 2 }));
        assert_eq!(value, JsonValue::from(json!({"x": 1, "y": 2})));
    }

    #[test]
    fn from_any_downcasts_known_types() {
        assert_eq!(Wrapper::new().wrap_any(Box::new(5u16)), JsonValue::from(5));
        assert_eq!(Wrapper::new().wrap_any(Box::new(String::from("nil"))), JsonValue::Null);
        let boxed = Box::new(Some(JsonValue::from(true)));
        assert_eq!(Wrapper::new().wrap_any(boxed), JsonValue::from(true));
        assert_eq!(
            Wrapper::new().wrap_any(Box::new(Point { x: 0, y: 0 })),
            JsonValue::Error(ErrorKind::UnsupportedType)
        );
    }

    #[test]
    fn custom_sentinels_apply_through_wrap() {
        let wrapper = Wrapper::new().treat_as_null("n/a");
        let value = wrapper.wrap(Native::from(vec!["N/A", "x"]));
        assert_eq!(value, JsonValue::from(json!([null, "x"])));
    }

    #[test]
    fn wrap_depth_is_limited() {
        let mut native = Native::from(1);
        for _ in 0..4 {
            native = Native::Array(vec![native]);
        }
        let value = Wrapper::new().with_limits(Limits::new(2)).wrap(native);
        let too_deep = JsonValue::Array(vec![JsonValue::Error(ErrorKind::ElementTooDeep)]);
        assert_eq!(value, JsonValue::Array(vec![JsonValue::Array(vec![too_deep])]));
    }

    #[test]
    fn data_of_requires_a_document_root() {
        assert_eq!(JsonValue::string_of(vec![1, 2], false).as_deref(), Some("[1,2]"));
        assert_eq!(JsonValue::string_of(5, false), None);
        assert_eq!(JsonValue::sure_string_of(5, false, || "Empty".to_string()), "Empty");
    }
}
