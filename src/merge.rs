//! Deep merge.
//!
//! The top level is strict: both sides must be the same variant, otherwise the merge fails
//! and the base is left as it was. Below the top level a variant mismatch is not an error,
//! the overlay simply replaces the base.

use std::mem;

use log::warn;

use crate::error::JsonError;
use crate::value::JsonValue;

impl JsonValue {
    /// Merge `overlay` into `self`.
    ///
    /// - object × object: union of keys, shared keys merged recursively
    /// - array × array: concatenation
    /// - any other pair of matching variants: overlay wins
    pub fn merge(&mut self, overlay: &JsonValue) -> Result<(), JsonError> {
        self.merge_with(overlay, true)
    }

    /// Non-mutating form of [`JsonValue::merge`].
    pub fn merged(&self, overlay: &JsonValue) -> Result<JsonValue, JsonError> {
        let mut out = self.clone();
        out.merge(overlay)?;
        Ok(out)
    }

    fn merge_with(&mut self, overlay: &JsonValue, typecheck: bool) -> Result<(), JsonError> {
        if mem::discriminant(self) != mem::discriminant(overlay) {
            if typecheck {
                let err = JsonError::MergeTypeMismatch {
                    base: self.json_type(),
                    overlay: overlay.json_type(),
                };
                warn!("{err}");
                return Err(err);
            }
            *self = overlay.clone();
            return Ok(());
        }
        match (self, overlay) {
            (JsonValue::Object(base), JsonValue::Object(over)) => {
                for (key, value) in over {
                    match base.get_mut(key) {
                        Some(existing) => existing.merge_with(value, false)?,
                        None => {
                            base.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            (JsonValue::Array(base), JsonValue::Array(over)) => {
                base.extend(over.iter().cloned());
            }
            (base, over) => *base = over.clone(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::JsonType;
    use serde_json::json;

    fn v(json: serde_json::Value) -> JsonValue {
        JsonValue::from(json)
    }

    #[test]
    fn objects_union_their_keys() {
        let mut base = v(json!({"a": 1, "b": {"x": 1}}));
        base.merge(&v(json!({"c": 3, "b": {"y": 2}}))).unwrap();
        assert_eq!(base, v(json!({"a": 1, "b": {"x": 1, "y": 2}, "c": 3})));
    }

    #[test]
    fn arrays_concatenate() {
        let merged = v(json!([1, 2])).merged(&v(json!([2, "x"]))).unwrap();
        assert_eq!(merged, v(json!([1, 2, 2, "x"])));
    }

    #[test]
    fn nested_arrays_concatenate_too() {
        let merged = v(json!({"tags": ["a"]})).merged(&v(json!({"tags": ["b"]}))).unwrap();
        assert_eq!(merged, v(json!({"tags": ["a", "b"]})));
    }

    #[test]
    fn overlay_wins_on_shared_scalars() {
        let base = v(json!({"a": 1, "s": "old"}));
        let merged = base.merged(&v(json!({"a": 2.5, "s": "new"}))).unwrap();
        assert_eq!(merged, v(json!({"a": 2.5, "s": "new"})));
    }

    #[test]
    fn nested_type_mismatch_is_replaced() {
        let merged = v(json!({"a": {"deep": true}})).merged(&v(json!({"a": [1]}))).unwrap();
        assert_eq!(merged, v(json!({"a": [1]})));
        let merged = v(json!({"a": null})).merged(&v(json!({"a": "set"}))).unwrap();
        assert_eq!(merged["a"], JsonValue::from("set"));
    }

    #[test]
    fn top_level_mismatch_fails_and_leaves_base_untouched() {
        let mut base = v(json!({"a": 1}));
        let err = base.merge(&v(json!([1]))).unwrap_err();
        assert!(matches!(
            err,
            JsonError::MergeTypeMismatch { base: JsonType::Object, overlay: JsonType::Array }
        ));
        assert_eq!(err.kind(), ErrorKind::WrongType);
        assert_eq!(base, v(json!({"a": 1})));
    }

    #[test]
    fn matching_scalars_at_the_top_take_the_overlay() {
        let mut base = JsonValue::from(1);
        base.merge(&JsonValue::from(2)).unwrap();
        assert_eq!(base, JsonValue::from(2));
        assert!(JsonValue::from(1).merged(&JsonValue::from("1")).is_err());
    }

    #[test]
    fn merge_does_not_touch_the_overlay() {
        let overlay = v(json!({"a": [1]}));
        let mut base = v(json!({"a": [0]}));
        base.merge(&overlay).unwrap();
        base.merge(&overlay).unwrap();
        assert_eq!(base, v(json!({"a": [0, 1, 1]})));
        assert_eq!(overlay, v(json!({"a": [1]})));
    }
}
