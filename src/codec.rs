//! Bytes in, bytes out, and the serde bridge.
//!
//! Parsing goes through `serde_json` with a depth-tracking seed, so a document that is too
//! deep is told apart from one that is malformed. Serialization validates first: only an
//! array or object root, no error nodes, no non-finite floats, nothing past the depth
//! limit. Keys come out sorted because objects are `BTreeMap`s.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::de::{self, DeserializeOwned, DeserializeSeed, Visitor};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

mod ser;

use crate::error::{ErrorKind, JsonError};
use crate::path::{PathKey, render_path};
use crate::value::{JsonValue, Limits, Number};

use self::ser::ValueSerializer;

// ————————————————————————————————————————————————————————————————————————————
// PARSE
// ————————————————————————————————————————————————————————————————————————————

impl JsonValue {
    /// Parse a document with the default limits. Never fails: the result is either the
    /// parsed array/object or `Error(InvalidEncoding | ElementTooDeep)`.
    pub fn parse(bytes: &[u8]) -> JsonValue {
        JsonValue::parse_with(bytes, &Limits::default())
    }

    pub fn parse_with(bytes: &[u8], limits: &Limits) -> JsonValue {
        let tripped = Cell::new(false);
        let mut de = serde_json::Deserializer::from_slice(bytes);
        // depth is enforced by the seed below
        de.disable_recursion_limit();
        let seed = DepthSeed { depth: 0, limits, tripped: &tripped };
        let parsed = seed.deserialize(&mut de).and_then(|value| de.end().map(|()| value));

        match parsed {
            Ok(value @ (JsonValue::Array(_) | JsonValue::Object(_))) => value,
            Ok(other) => {
                debug!("rejected document with a {} root", other.json_type());
                JsonValue::Error(ErrorKind::InvalidEncoding)
            }
            Err(err) if tripped.get() => {
                debug!("document nested deeper than {}: {err}", limits.max_depth);
                JsonValue::Error(ErrorKind::ElementTooDeep)
            }
            Err(err) => {
                debug!("malformed document: {err}");
                JsonValue::Error(ErrorKind::InvalidEncoding)
            }
        }
    }

    pub fn parse_str(text: &str) -> JsonValue {
        JsonValue::parse(text.as_bytes())
    }

    /// Text given as raw bytes; bytes that are not UTF-8 yield `Null`.
    pub fn parse_utf8(bytes: &[u8]) -> JsonValue {
        match std::str::from_utf8(bytes) {
            Ok(text) => JsonValue::parse_str(text),
            Err(err) => {
                debug!("input is not UTF-8: {err}");
                JsonValue::Null
            }
        }
    }
}

impl FromStr for JsonValue {
    type Err = JsonError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        JsonValue::parse_str(text).into_result()
    }
}

struct DepthSeed<'a> {
    depth: usize,
    limits: &'a Limits,
    tripped: &'a Cell<bool>,
}

impl<'a> DepthSeed<'a> {
    fn child(&self) -> DepthSeed<'a> {
        DepthSeed { depth: self.depth + 1, limits: self.limits, tripped: self.tripped }
    }
}

impl<'de> DeserializeSeed<'de> for DepthSeed<'_> {
    type Value = JsonValue;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        if self.depth > self.limits.max_depth {
            self.tripped.set(true);
            return Err(de::Error::custom(ErrorKind::ElementTooDeep));
        }
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for DepthSeed<'_> {
    type Value = JsonValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
        Ok(JsonValue::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
        Ok(JsonValue::Number(Number::from(value)))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
        Ok(JsonValue::Number(Number::PositiveInteger(value)))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
        Ok(JsonValue::Number(Number::from_f64(value)))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
        Ok(JsonValue::String(value.to_string()))
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
        Ok(JsonValue::String(value))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(JsonValue::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(self.child())? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        let mut entries = std::collections::BTreeMap::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(self.child())?;
            entries.insert(key, value);
        }
        Ok(JsonValue::Object(entries))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SERIALIZE
// ————————————————————————————————————————————————————————————————————————————

impl JsonValue {
    pub fn serialize(&self, pretty: bool) -> Result<Vec<u8>, JsonError> {
        self.serialize_with(pretty, &Limits::default())
    }

    pub fn serialize_with(&self, pretty: bool, limits: &Limits) -> Result<Vec<u8>, JsonError> {
        self.check_representable(limits)?;
        let bytes = if pretty {
            serde_json::to_vec_pretty(self)?
        } else {
            serde_json::to_vec(self)?
        };
        Ok(bytes)
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String, JsonError> {
        let bytes = self.serialize(pretty)?;
        // serde_json only ever writes UTF-8
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn check_representable(&self, limits: &Limits) -> Result<(), JsonError> {
        if !matches!(self, JsonValue::Array(_) | JsonValue::Object(_)) {
            return Err(JsonError::InvalidRoot(self.json_type()));
        }
        self.check_node(&mut Vec::new(), 0, limits)
    }

    fn check_node(
        &self,
        path: &mut Vec<PathKey>,
        depth: usize,
        limits: &Limits,
    ) -> Result<(), JsonError> {
        let reject = |kind: ErrorKind, path: &[PathKey]| {
            Err(JsonError::NotRepresentable { path: render_path(path), kind })
        };
        if depth > limits.max_depth {
            return reject(ErrorKind::ElementTooDeep, path.as_slice());
        }
        match self {
            JsonValue::Error(kind) => reject(*kind, path.as_slice()),
            JsonValue::Number(n) if !n.is_finite() => {
                reject(ErrorKind::UnsupportedType, path.as_slice())
            }
            JsonValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    path.push(PathKey::Index(i));
                    item.check_node(path, depth + 1, limits)?;
                    path.pop();
                }
                Ok(())
            }
            JsonValue::Object(map) => {
                for (key, item) in map {
                    path.push(PathKey::Key(key.clone()));
                    item.check_node(path, depth + 1, limits)?;
                    path.pop();
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Serialize for JsonValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            JsonValue::Null => serializer.serialize_unit(),
            JsonValue::Bool(b) => serializer.serialize_bool(*b),
            JsonValue::Number(Number::PositiveInteger(u)) => serializer.serialize_u64(*u),
            JsonValue::Number(Number::NegativeInteger(i)) => serializer.serialize_i64(*i),
            JsonValue::Number(Number::Float(f)) if !f.0.is_finite() => {
                Err(S::Error::custom(format!("non-finite float {} is not representable", f.0)))
            }
            JsonValue::Number(Number::Float(f)) => serializer.serialize_f64(f.0),
            JsonValue::String(s) => serializer.serialize_str(s),
            JsonValue::Array(items) => serializer.collect_seq(items),
            JsonValue::Object(map) => serializer.collect_map(map),
            JsonValue::Error(kind) => Err(S::Error::custom(format!("error value ({kind})"))),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DESERIALIZE
// ————————————————————————————————————————————————————————————————————————————

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = JsonValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
        Ok(JsonValue::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
        Ok(JsonValue::Number(Number::from(value)))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
        Ok(JsonValue::Number(Number::PositiveInteger(value)))
    }

    fn visit_i128<E>(self, value: i128) -> Result<Self::Value, E> {
        Ok(JsonValue::Number(match (u64::try_from(value), i64::try_from(value)) {
            (Ok(u), _) => Number::PositiveInteger(u),
            (_, Ok(i)) => Number::NegativeInteger(i),
            _ => Number::from_f64(value as f64),
        }))
    }

    fn visit_u128<E>(self, value: u128) -> Result<Self::Value, E> {
        Ok(JsonValue::Number(match u64::try_from(value) {
            Ok(u) => Number::PositiveInteger(u),
            Err(_) => Number::from_f64(value as f64),
        }))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
        Ok(JsonValue::Number(Number::from_f64(value)))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
        Ok(JsonValue::String(value.to_string()))
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
        Ok(JsonValue::String(value))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(JsonValue::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(JsonValue::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        let mut entries = std::collections::BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, JsonValue>()? {
            entries.insert(key, value);
        }
        Ok(JsonValue::Object(entries))
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPED BRIDGE
// ————————————————————————————————————————————————————————————————————————————

impl JsonValue {
    /// Any serializable value as a `JsonValue`; scalars are allowed here.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<JsonValue, JsonError> {
        Ok(value.serialize(ValueSerializer)?)
    }

    /// Deserialize into `T`; failures carry the JSON path of the offending element.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, JsonError> {
        let value = serde_json::Value::try_from(self)?;
        serde_path_to_error::deserialize::<_, T>(value).map_err(|err| JsonError::Decode {
            path: err.path().to_string(),
            source: err.into_inner(),
        })
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(b),
            serde_json::Value::Number(n) => JsonValue::Number(match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => Number::PositiveInteger(u),
                (_, Some(i)) => Number::NegativeInteger(i),
                _ => Number::from_f64(n.as_f64().unwrap_or(f64::NAN)),
            }),
            serde_json::Value::String(s) => JsonValue::String(s),
            serde_json::Value::Array(items) => items.into_iter().map(JsonValue::from).collect(),
            serde_json::Value::Object(map) => {
                JsonValue::Object(map.into_iter().map(|(k, v)| (k, JsonValue::from(v))).collect())
            }
        }
    }
}

impl TryFrom<&JsonValue> for serde_json::Value {
    type Error = JsonError;

    fn try_from(value: &JsonValue) -> Result<Self, Self::Error> {
        value.to_serde(&mut Vec::new())
    }
}

impl TryFrom<JsonValue> for serde_json::Value {
    type Error = JsonError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        serde_json::Value::try_from(&value)
    }
}

impl JsonValue {
    fn to_serde(&self, path: &mut Vec<PathKey>) -> Result<serde_json::Value, JsonError> {
        let reject = |kind: ErrorKind, path: &[PathKey]| JsonError::NotRepresentable {
            path: render_path(path),
            kind,
        };
        Ok(match self {
            JsonValue::Null => serde_json::Value::Null,
            JsonValue::Bool(b) => serde_json::Value::Bool(*b),
            JsonValue::Number(Number::PositiveInteger(u)) => serde_json::Value::from(*u),
            JsonValue::Number(Number::NegativeInteger(i)) => serde_json::Value::from(*i),
            JsonValue::Number(Number::Float(f)) => serde_json::Number::from_f64(f.0)
                .map(serde_json::Value::Number)
                .ok_or_else(|| reject(ErrorKind::UnsupportedType, path.as_slice()))?,
            JsonValue::String(s) => serde_json::Value::String(s.clone()),
            JsonValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.push(PathKey::Index(i));
                    out.push(item.to_serde(path)?);
                    path.pop();
                }
                serde_json::Value::Array(out)
            }
            JsonValue::Object(map) => {
                let mut out = serde_json::Map::new();
                for (key, item) in map {
                    path.push(PathKey::Key(key.clone()));
                    out.insert(key.clone(), item.to_serde(path)?);
                    path.pop();
                }
                serde_json::Value::Object(out)
            }
            JsonValue::Error(kind) => return Err(reject(*kind, path.as_slice())),
        })
    }
}
