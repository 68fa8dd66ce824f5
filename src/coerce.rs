//! Scalar coercion.
//!
//! When the requested type differs from the stored variant, a fixed cascade is tried;
//! the first step that succeeds wins. Optional accessors (`as_*`) return `None` when the
//! cascade fails, the `*_value` accessors fall back to the zero value of the type.
//!
//! | requested | from bool | from number            | from string                          |
//! |-----------|-----------|------------------------|--------------------------------------|
//! | bool      | exact     | nonzero                | yes/no words, then decimal nonzero   |
//! | integer   | 0 / 1     | checked, floats truncate toward zero | integer parse of that width |
//! | float     | 0 / 1     | widen                  | finite decimal parse                 |
//! | string    | "true"/"false" | canonical text    | exact                                |
//!
//! `Coercer` adds custom coercions that run after the built-in cascade, in registration
//! order.

use std::collections::BTreeMap;

use log::trace;

use crate::value::{EMPTY_OBJECT, JsonValue, Number};

const TRUE_WORDS: [&str; 5] = ["true", "t", "y", "yes", "1"];
const FALSE_WORDS: [&str; 5] = ["false", "f", "n", "no", "0"];

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Target family handed to custom coercions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

/// A type that can be read out of a `JsonValue` through the coercion cascade.
pub trait Coerce: Sized {
    const KIND: ScalarKind;

    fn coerce(value: &JsonValue) -> Option<Self>;

    /// Fallback of the non-optional accessors.
    fn zero() -> Self;
}

/// Custom coercion: re-express `value` so the built-in step for `kind` accepts it.
pub trait CustomCoercion: Send + Sync {
    fn coerce(&self, value: &JsonValue, kind: ScalarKind) -> Option<JsonValue>;
}

impl<F> CustomCoercion for F
where
    F: Fn(&JsonValue, ScalarKind) -> Option<JsonValue> + Send + Sync,
{
    fn coerce(&self, value: &JsonValue, kind: ScalarKind) -> Option<JsonValue> {
        self(value, kind)
    }
}

#[derive(Default)]
pub struct Coercer {
    custom: Vec<Box<dyn CustomCoercion>>,
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT-IN CASCADE
// ————————————————————————————————————————————————————————————————————————————

/// Decimal text as a finite number; `NaN`/`inf` spellings are not decimals.
fn parse_decimal(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(u) = text.parse::<u64>() {
        return Some(Number::PositiveInteger(u));
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    text.parse::<f64>().ok().filter(|f| f.is_finite()).map(Number::from_f64)
}

fn coerce_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => Some(!n.is_zero()),
        JsonValue::String(s) => {
            let lowered = s.to_lowercase();
            if TRUE_WORDS.contains(&lowered.as_str()) {
                Some(true)
            } else if FALSE_WORDS.contains(&lowered.as_str()) {
                Some(false)
            } else {
                parse_decimal(s).map(|n| !n.is_zero())
            }
        }
        _ => None,
    }
}

fn coerce_number(value: &JsonValue) -> Option<Number> {
    match value {
        JsonValue::Number(n) => Some(*n),
        JsonValue::Bool(b) => Some(Number::from(u8::from(*b))),
        JsonValue::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn coerce_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

macro_rules! coerce_integer {
    ($($t:ty),*) => {$(
        impl Coerce for $t {
            const KIND: ScalarKind = ScalarKind::Integer;

            fn coerce(value: &JsonValue) -> Option<Self> {
                match value {
                    JsonValue::Bool(b) => Some(<$t>::from(*b)),
                    JsonValue::Number(n) => n.truncated().and_then(|i| <$t>::try_from(i).ok()),
                    JsonValue::String(s) => s.trim().parse::<$t>().ok(),
                    _ => None,
                }
            }

            fn zero() -> Self { 0 }
        }
    )*};
}

coerce_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Coerce for f64 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn coerce(value: &JsonValue) -> Option<Self> {
        coerce_number(value).map(|n| n.as_f64())
    }

    fn zero() -> Self {
        0.0
    }
}

impl Coerce for f32 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn coerce(value: &JsonValue) -> Option<Self> {
        coerce_number(value)
            .map(|n| n.as_f64() as f32)
            .filter(|f| f.is_finite())
    }

    fn zero() -> Self {
        0.0
    }
}

impl Coerce for Number {
    const KIND: ScalarKind = ScalarKind::Float;

    fn coerce(value: &JsonValue) -> Option<Self> {
        coerce_number(value)
    }

    fn zero() -> Self {
        Number::PositiveInteger(0)
    }
}

impl Coerce for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn coerce(value: &JsonValue) -> Option<Self> {
        coerce_bool(value)
    }

    fn zero() -> Self {
        false
    }
}

impl Coerce for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn coerce(value: &JsonValue) -> Option<Self> {
        coerce_string(value)
    }

    fn zero() -> Self {
        String::new()
    }
}

impl Coerce for Vec<JsonValue> {
    const KIND: ScalarKind = ScalarKind::Array;

    fn coerce(value: &JsonValue) -> Option<Self> {
        value.as_array().cloned()
    }

    fn zero() -> Self {
        Vec::new()
    }
}

impl Coerce for BTreeMap<String, JsonValue> {
    const KIND: ScalarKind = ScalarKind::Object;

    fn coerce(value: &JsonValue) -> Option<Self> {
        value.as_object().cloned()
    }

    fn zero() -> Self {
        EMPTY_OBJECT.clone()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ACCESSORS
// ————————————————————————————————————————————————————————————————————————————

macro_rules! accessors {
    ($($opt:ident / $val:ident: $t:ty),* $(,)?) => {
        impl JsonValue {$(
            pub fn $opt(&self) -> Option<$t> { <$t as Coerce>::coerce(self) }
            pub fn $val(&self) -> $t { self.$opt().unwrap_or_else(<$t as Coerce>::zero) }
        )*}
    };
}

accessors!(
    as_bool / bool_value: bool,
    as_i8 / i8_value: i8,
    as_i16 / i16_value: i16,
    as_i32 / i32_value: i32,
    as_i64 / i64_value: i64,
    as_isize / isize_value: isize,
    as_u8 / u8_value: u8,
    as_u16 / u16_value: u16,
    as_u32 / u32_value: u32,
    as_u64 / u64_value: u64,
    as_usize / usize_value: usize,
    as_f32 / f32_value: f32,
    as_f64 / f64_value: f64,
    as_number / number_value: Number,
    as_string / string_value: String,
);

impl JsonValue {
    /// Generic form of the `as_*` accessors.
    pub fn coerce<T: Coerce>(&self) -> Option<T> {
        T::coerce(self)
    }

    pub fn coerce_or_zero<T: Coerce>(&self) -> T {
        T::coerce(self).unwrap_or_else(T::zero)
    }

    /// Exact string payload, no coercion.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CUSTOM COERCIONS
// ————————————————————————————————————————————————————————————————————————————

impl Coercer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, coercion: impl CustomCoercion + 'static) -> Self {
        self.custom.push(Box::new(coercion));
        self
    }

    pub fn register(&mut self, coercion: impl CustomCoercion + 'static) {
        self.custom.push(Box::new(coercion));
    }

    /// Built-in cascade first, then each custom coercion in registration order.
    pub fn coerce<T: Coerce>(&self, value: &JsonValue) -> Option<T> {
        T::coerce(value).or_else(|| {
            self.custom.iter().enumerate().find_map(|(i, custom)| {
                let rewritten = custom.coerce(value, T::KIND)?;
                trace!("custom coercion #{i} rewrote a {} for {:?}", value.json_type(), T::KIND);
                T::coerce(&rewritten)
            })
        })
    }

    pub fn coerce_or_zero<T: Coerce>(&self, value: &JsonValue) -> T {
        self.coerce(value).unwrap_or_else(T::zero)
    }
}
