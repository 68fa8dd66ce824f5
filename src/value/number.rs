use std::cmp::Ordering;
use std::fmt;

use ordered_float::OrderedFloat;

/// Numeric payload of `JsonValue::Number`.
///
/// Integers keep their exact value; everything else is a float. Comparisons are numeric
/// across representations, so `1` and `1.0` are equal.
#[derive(Debug, Copy, Clone)]
pub enum Number {
    PositiveInteger(u64),
    NegativeInteger(i64),
    Float(OrderedFloat<f64>),
}

impl Number {
    pub fn from_f64(f: f64) -> Self {
        Number::Float(OrderedFloat(f))
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, Number::Float(_))
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Number::Float(f) => f.0.is_finite(),
            _ => true,
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Number::PositiveInteger(u) => u == 0,
            Number::NegativeInteger(i) => i == 0,
            Number::Float(f) => f.0 == 0.0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::PositiveInteger(u) => u as f64,
            Number::NegativeInteger(i) => i as f64,
            Number::Float(f) => f.0,
        }
    }

    /// Exact integer value, if the number is stored as one.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Number::PositiveInteger(u) => Some(i128::from(u)),
            Number::NegativeInteger(i) => Some(i128::from(i)),
            Number::Float(_) => None,
        }
    }

    /// Integer value with floats truncated toward zero; `None` for NaN/infinity.
    pub fn truncated(&self) -> Option<i128> {
        match *self {
            Number::Float(f) => {
                let t = f.0.trunc();
                // i128 covers every f64 that fits any integer width we hand out
                if t.is_finite() && t >= i128::MIN as f64 && t <= i128::MAX as f64 {
                    Some(t as i128)
                } else {
                    None
                }
            }
            _ => self.as_i128(),
        }
    }

    pub(crate) fn numeric_cmp(&self, other: &Number) -> Option<Ordering> {
        match (self.as_i128(), other.as_i128()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            (Some(a), None) => cmp_int_float(a, other.as_f64()),
            (None, Some(b)) => cmp_int_float(b, self.as_f64()).map(Ordering::reverse),
            (None, None) => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

/// Exact comparison of a stored integer (always within `[-2^63, 2^64)`) against a float.
fn cmp_int_float(int: i128, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float >= 2f64.powi(64) {
        return Some(Ordering::Less);
    }
    if float < -(2f64.powi(63)) {
        return Some(Ordering::Greater);
    }
    let whole = float.trunc();
    // exact: |whole| < 2^64
    match int.cmp(&(whole as i128)) {
        Ordering::Equal => whole.partial_cmp(&float),
        ord => Some(ord),
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.numeric_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.numeric_cmp(other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::PositiveInteger(u) => write!(f, "{u}"),
            Number::NegativeInteger(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{}", x.0),
        }
    }
}

macro_rules! number_from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Number {
            fn from(v: $t) -> Self {
                let v = v as i64;
                if v < 0 {
                    Number::NegativeInteger(v)
                } else {
                    Number::PositiveInteger(v as u64)
                }
            }
        }
    )*};
}

macro_rules! number_from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Number {
            fn from(v: $t) -> Self { Number::PositiveInteger(v as u64) }
        }
    )*};
}

number_from_signed!(i8, i16, i32, i64, isize);
number_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::from_f64(v)
    }
}

impl From<f32> for Number {
    fn from(v: f32) -> Self {
        Number::from_f64(f64::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_and_floats_compare_numerically() {
        assert_eq!(Number::from(1u8), Number::from(1.0));
        assert_eq!(Number::from(-3i32), Number::NegativeInteger(-3));
        assert!(Number::from(2) < Number::from(2.5));
        assert!(Number::from(-1) < Number::from(0u64));
    }

    #[test]
    fn large_integers_do_not_collapse_through_f64() {
        let a = Number::PositiveInteger(u64::MAX);
        let b = Number::PositiveInteger(u64::MAX - 1);
        assert_ne!(a, b);
        assert!(b < a);
    }

    #[test]
    fn mixed_comparisons_are_exact_near_the_u64_edge() {
        let max = Number::PositiveInteger(u64::MAX);
        let below = Number::PositiveInteger(u64::MAX - 1);
        let two_pow_64 = Number::from(u64::MAX as f64);
        assert_ne!(max, two_pow_64);
        assert_ne!(below, two_pow_64);
        assert!(max < two_pow_64);
        assert!(below < two_pow_64);

        let two_pow_53 = 2f64.powi(53);
        assert!(Number::from(2u64.pow(53) + 1) > Number::from(two_pow_53));
        assert_eq!(Number::from(2u64.pow(53)), Number::from(two_pow_53));
        assert_eq!(Number::from(i64::MIN), Number::from(i64::MIN as f64));
    }

    #[test]
    fn fractions_and_infinities_against_integers() {
        assert!(Number::from(0) > Number::from(-0.5));
        assert!(Number::from(0) < Number::from(0.5));
        assert!(Number::from(-3) < Number::from(-2.5));
        assert!(Number::from(-2) > Number::from(-2.5));
        assert!(Number::from(u64::MAX) < Number::from(f64::INFINITY));
        assert!(Number::from(i64::MIN) > Number::from(f64::NEG_INFINITY));
        assert_eq!(Number::from(1).partial_cmp(&Number::from(f64::NAN)), None);
        assert_eq!(Number::from(f64::NAN).partial_cmp(&Number::from(1)), None);
        assert!(Number::from(2.5) > Number::from(2));
    }

    #[test]
    fn truncation_is_toward_zero() {
        assert_eq!(Number::from(3.9).truncated(), Some(3));
        assert_eq!(Number::from(-3.9).truncated(), Some(-3));
        assert_eq!(Number::from(f64::NAN).truncated(), None);
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(Number::from(3.0).to_string(), "3");
        assert_eq!(Number::from(3.5).to_string(), "3.5");
        assert_eq!(Number::from(-12).to_string(), "-12");
    }
}
