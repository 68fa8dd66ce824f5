//! `serde::Serializer` that builds a `JsonValue` directly.
//!
//! Integers keep their exact representation and non-finite floats are an error instead of
//! turning into `null`. Enum layout matches serde_json's externally tagged form.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::ser::{self, Error as _};
use serde_json::Error;

use crate::value::{JsonValue, Number};

pub(crate) struct ValueSerializer;

pub(crate) struct SeqBuilder {
    items: Vec<JsonValue>,
}

pub(crate) struct VariantSeqBuilder {
    variant: &'static str,
    items: Vec<JsonValue>,
}

pub(crate) struct MapBuilder {
    entries: BTreeMap<String, JsonValue>,
    next_key: Option<String>,
}

pub(crate) struct VariantMapBuilder {
    variant: &'static str,
    entries: BTreeMap<String, JsonValue>,
}

fn tagged(variant: &str, value: JsonValue) -> JsonValue {
    JsonValue::Object(BTreeMap::from([(variant.to_owned(), value)]))
}

/// Object keys: strings as is, numbers and booleans by their text.
fn map_key(key: JsonValue) -> Result<String, Error> {
    match key {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        other => Err(Error::custom(format!(
            "map key must be a string, found {}",
            other.json_type()
        ))),
    }
}

impl ser::Serializer for ValueSerializer {
    type Ok = JsonValue;
    type Error = Error;
    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = VariantSeqBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = VariantMapBuilder;

    fn serialize_bool(self, v: bool) -> Result<JsonValue, Error> {
        Ok(JsonValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<JsonValue, Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<JsonValue, Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<JsonValue, Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<JsonValue, Error> {
        Ok(JsonValue::Number(Number::from(v)))
    }

    fn serialize_i128(self, v: i128) -> Result<JsonValue, Error> {
        match (u64::try_from(v), i64::try_from(v)) {
            (Ok(u), _) => self.serialize_u64(u),
            (_, Ok(i)) => self.serialize_i64(i),
            _ => Err(Error::custom(format!("integer {v} is out of range"))),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<JsonValue, Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<JsonValue, Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<JsonValue, Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<JsonValue, Error> {
        Ok(JsonValue::Number(Number::PositiveInteger(v)))
    }

    fn serialize_u128(self, v: u128) -> Result<JsonValue, Error> {
        match u64::try_from(v) {
            Ok(u) => self.serialize_u64(u),
            Err(_) => Err(Error::custom(format!("integer {v} is out of range"))),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<JsonValue, Error> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<JsonValue, Error> {
        if v.is_finite() {
            Ok(JsonValue::Number(Number::from_f64(v)))
        } else {
            Err(Error::custom(format!("non-finite float {v} is not representable")))
        }
    }

    fn serialize_char(self, v: char) -> Result<JsonValue, Error> {
        Ok(JsonValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<JsonValue, Error> {
        Ok(JsonValue::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<JsonValue, Error> {
        Ok(v.iter().copied().collect())
    }

    fn serialize_none(self) -> Result<JsonValue, Error> {
        Ok(JsonValue::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<JsonValue, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<JsonValue, Error> {
        Ok(JsonValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<JsonValue, Error> {
        Ok(JsonValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<JsonValue, Error> {
        Ok(JsonValue::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<JsonValue, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<JsonValue, Error> {
        Ok(tagged(variant, value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder, Error> {
        Ok(SeqBuilder { items: Vec::with_capacity(len.unwrap_or(0)) })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqBuilder, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqBuilder, Error> {
        Ok(VariantSeqBuilder { variant, items: Vec::with_capacity(len) })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapBuilder, Error> {
        Ok(MapBuilder { entries: BTreeMap::new(), next_key: None })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapBuilder, Error> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantMapBuilder, Error> {
        Ok(VariantMapBuilder { variant, entries: BTreeMap::new() })
    }
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = JsonValue;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<JsonValue, Error> {
        Ok(JsonValue::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = JsonValue;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<JsonValue, Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = JsonValue;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<JsonValue, Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleVariant for VariantSeqBuilder {
    type Ok = JsonValue;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<JsonValue, Error> {
        Ok(tagged(self.variant, JsonValue::Array(self.items)))
    }
}

impl ser::SerializeMap for MapBuilder {
    type Ok = JsonValue;
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Error> {
        self.next_key = Some(map_key(key.serialize(ValueSerializer)?)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| Error::custom("map value without a key"))?;
        self.entries.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<JsonValue, Error> {
        Ok(JsonValue::Object(self.entries))
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = JsonValue;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.entries.insert(key.to_owned(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<JsonValue, Error> {
        ser::SerializeMap::end(self)
    }
}

impl ser::SerializeStructVariant for VariantMapBuilder {
    type Ok = JsonValue;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.entries.insert(key.to_owned(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<JsonValue, Error> {
        Ok(tagged(self.variant, JsonValue::Object(self.entries)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    enum Shape {
        Unit,
        Newtype(u8),
        Tuple(i32, i32),
        Struct { w: f64 },
    }

    fn encode<T: Serialize>(value: &T) -> Result<JsonValue, Error> {
        value.serialize(ValueSerializer)
    }

    #[test]
    fn enums_are_externally_tagged() {
        let shapes = [
            Shape::Unit,
            Shape::Newtype(3),
            Shape::Tuple(1, -1),
            Shape::Struct { w: 0.5 },
        ];
        let encoded = encode(&shapes).unwrap();
        let expected = json!(["Unit", {"Newtype": 3}, {"Tuple": [1, -1]}, {"Struct": {"w": 0.5}}]);
        assert_eq!(encoded, JsonValue::from(expected));
    }

    #[test]
    fn integer_map_keys_become_text() {
        let map = HashMap::from([(1u32, "a"), (20u32, "b")]);
        assert_eq!(encode(&map).unwrap(), JsonValue::from(json!({"1": "a", "20": "b"})));
        let bad = BTreeMap::from([(vec![1], 1)]);
        assert!(encode(&bad).is_err());
    }

    #[test]
    fn integers_stay_exact() {
        assert_eq!(
            encode(&u64::MAX).unwrap(),
            JsonValue::Number(Number::PositiveInteger(u64::MAX))
        );
        assert_eq!(encode(&i128::from(i64::MIN)).unwrap(), JsonValue::from(i64::MIN));
        assert!(encode(&u128::MAX).is_err());
    }

    #[test]
    fn non_finite_floats_are_errors() {
        assert!(encode(&f64::NAN).is_err());
        assert!(encode(&f32::NEG_INFINITY).is_err());
        assert!(encode(&Some(vec![f64::INFINITY])).is_err());
        assert_eq!(encode(&1.5f32).unwrap(), JsonValue::from(1.5));
    }

    #[test]
    fn options_units_and_chars() {
        assert_eq!(encode(&None::<u8>).unwrap(), JsonValue::Null);
        assert_eq!(encode(&()).unwrap(), JsonValue::Null);
        assert_eq!(encode(&'x').unwrap(), JsonValue::from("x"));
        assert_eq!(encode(&(1, "two")).unwrap(), JsonValue::from(json!([1, "two"])));
    }
}
