//! Path access: `json["a"]["b"][0]`, `at_path`, `set_path`.
//!
//! Reads are total and return borrowed values; misses come back as one of the static
//! error values below. A value that is already an error is returned as is, so a chain of
//! lookups stops inspecting children as soon as one step fails.

use std::fmt;
use std::ops::Index;

use log::debug;

use crate::error::ErrorKind;
use crate::value::JsonValue;

static INDEX_OUT_OF_BOUNDS: JsonValue = JsonValue::Error(ErrorKind::IndexOutOfBounds);
static NOT_EXIST: JsonValue = JsonValue::Error(ErrorKind::NotExist);
static WRONG_TYPE: JsonValue = JsonValue::Error(ErrorKind::WrongType);

/// One step of a path: an array index or an object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Index(usize),
    Key(String),
}

impl From<usize> for PathKey {
    fn from(i: usize) -> Self {
        PathKey::Index(i)
    }
}

impl From<&str> for PathKey {
    fn from(k: &str) -> Self {
        PathKey::Key(k.to_owned())
    }
}

impl From<String> for PathKey {
    fn from(k: String) -> Self {
        PathKey::Key(k)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Index(i) => write!(f, "[{i}]"),
            PathKey::Key(k) => write!(f, ".{k}"),
        }
    }
}

/// Build a `Vec<PathKey>` from mixed keys and indices: `path!["list", 0, "name"]`.
#[macro_export]
macro_rules! path {
    ($($key:expr),* $(,)?) => {
        vec![$($crate::path::PathKey::from($key)),*]
    };
}

// ------------------------------- Reads ----------------------------------- //

impl JsonValue {
    pub fn get_index(&self, index: usize) -> &JsonValue {
        match self {
            JsonValue::Array(items) => items.get(index).unwrap_or(&INDEX_OUT_OF_BOUNDS),
            JsonValue::Error(_) => self,
            _ => &WRONG_TYPE,
        }
    }

    pub fn get_key(&self, key: &str) -> &JsonValue {
        match self {
            JsonValue::Object(map) => map.get(key).unwrap_or(&NOT_EXIST),
            JsonValue::Error(_) => self,
            _ => &WRONG_TYPE,
        }
    }

    pub fn get(&self, key: impl Into<PathKey>) -> &JsonValue {
        self.step(&key.into())
    }

    fn step(&self, key: &PathKey) -> &JsonValue {
        match key {
            PathKey::Index(i) => self.get_index(*i),
            PathKey::Key(k) => self.get_key(k),
        }
    }

    /// Left fold of single steps; the empty path is the value itself.
    pub fn at_path(&self, path: &[PathKey]) -> &JsonValue {
        path.iter().fold(self, |acc, key| acc.step(key))
    }

    /// First key matching `key` case-insensitively, in sorted key order.
    pub fn get_ignore_case(&self, key: &str) -> &JsonValue {
        self.search_ignore_case(&[key])
    }

    /// First of several keys present, compared case-insensitively.
    pub fn search_ignore_case(&self, keys: &[&str]) -> &JsonValue {
        let JsonValue::Object(map) = self else {
            return self.wrong_type();
        };
        keys.iter()
            .find_map(|wanted| {
                map.iter()
                    .find(|(k, _)| k.to_lowercase() == wanted.to_lowercase())
                    .map(|(_, v)| v)
            })
            .unwrap_or(&NOT_EXIST)
    }

    /// First of several keys present (exact match).
    pub fn get_any(&self, keys: &[&str]) -> &JsonValue {
        let JsonValue::Object(map) = self else {
            return self.wrong_type();
        };
        keys.iter().find_map(|k| map.get(*k)).unwrap_or(&NOT_EXIST)
    }

    /// Element at `key`, with a string element holding a valid JSON document replaced by
    /// the parsed document.
    pub fn get_parsed(&self, key: impl Into<PathKey>) -> JsonValue {
        match self.get(key) {
            JsonValue::String(text) => {
                let parsed = JsonValue::parse_str(text);
                if parsed.is_valid() {
                    parsed
                } else {
                    JsonValue::String(text.clone())
                }
            }
            other => other.clone(),
        }
    }

    fn wrong_type(&self) -> &JsonValue {
        if self.is_error() {
            self
        } else {
            &WRONG_TYPE
        }
    }
}

impl Index<usize> for JsonValue {
    type Output = JsonValue;

    fn index(&self, index: usize) -> &JsonValue {
        self.get_index(index)
    }
}

impl Index<&str> for JsonValue {
    type Output = JsonValue;

    fn index(&self, key: &str) -> &JsonValue {
        self.get_key(key)
    }
}

impl Index<&[PathKey]> for JsonValue {
    type Output = JsonValue;

    fn index(&self, path: &[PathKey]) -> &JsonValue {
        self.at_path(path)
    }
}

// ------------------------------- Writes ---------------------------------- //

impl JsonValue {
    /// Write `new` at `path`; returns whether anything was written.
    ///
    /// Objects gain missing keys, including missing intermediate objects when the next
    /// step is a key. Arrays are never extended, and a step through an out-of-bounds index
    /// or a non-container rejects the whole write, leaving `self` untouched.
    pub fn set_path(&mut self, path: &[PathKey], new: JsonValue) -> bool {
        if !self.can_write(path) {
            debug!("rejected write at {}", render_path(path));
            return false;
        }
        self.write(path, new);
        true
    }

    /// Consuming variant of `set_path` that hands back the rebuilt value.
    pub fn with_path(mut self, path: &[PathKey], new: JsonValue) -> JsonValue {
        self.set_path(path, new);
        self
    }

    pub fn set(&mut self, key: impl Into<PathKey>, new: JsonValue) -> bool {
        self.set_path(&[key.into()], new)
    }

    /// Replace every key equal to `key` case-insensitively with `key` itself.
    pub fn set_ignore_case(&mut self, key: &str, new: JsonValue) -> bool {
        let JsonValue::Object(map) = self else { return false };
        let lowered = key.to_lowercase();
        map.retain(|k, _| k.to_lowercase() != lowered);
        map.insert(key.to_owned(), new);
        true
    }

    /// Multi-key write: always targets the first key.
    pub fn set_any(&mut self, keys: &[&str], new: JsonValue) -> bool {
        match (self, keys.first()) {
            (JsonValue::Object(map), Some(first)) => {
                map.insert((*first).to_owned(), new);
                true
            }
            _ => false,
        }
    }

    fn can_write(&self, path: &[PathKey]) -> bool {
        let Some((first, rest)) = path.split_first() else {
            return false;
        };
        match (self, first) {
            (JsonValue::Object(map), PathKey::Key(k)) => match map.get(k) {
                Some(child) => rest.is_empty() || child.can_write(rest),
                // a missing key only grows into an object when the next step is a key
                None => match rest.first() {
                    None => true,
                    Some(PathKey::Key(_)) => JsonValue::Object(Default::default()).can_write(rest),
                    Some(PathKey::Index(_)) => false,
                },
            },
            (JsonValue::Array(items), PathKey::Index(i)) => match items.get(*i) {
                Some(child) => rest.is_empty() || child.can_write(rest),
                None => false,
            },
            _ => false,
        }
    }

    fn write(&mut self, path: &[PathKey], new: JsonValue) {
        let Some((first, rest)) = path.split_first() else {
            *self = new;
            return;
        };
        let child = match self {
            JsonValue::Object(map) => {
                let PathKey::Key(k) = first else { return };
                map.entry(k.clone()).or_insert_with(|| JsonValue::Object(Default::default()))
            }
            JsonValue::Array(items) => {
                let PathKey::Index(i) = first else { return };
                match items.get_mut(*i) {
                    Some(child) => child,
                    None => return,
                }
            }
            _ => return,
        };
        child.write(rest, new);
    }
}

pub(crate) fn render_path(path: &[PathKey]) -> String {
    let mut out = String::from("$");
    for key in path {
        out.push_str(&key.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> JsonValue {
        JsonValue::from(json!({
            "list": [{"name": "a"}, {"name": "b"}],
            "Mixed": {"Key": 1},
            "nested": "{\"inner\": [1, 2]}",
            "plain": "not json",
            "scalar": 3
        }))
    }

    #[test]
    fn chained_index_reads() {
        let v = sample();
        assert_eq!(v["list"][1]["name"], JsonValue::from("b"));
        assert_eq!(v.at_path(&path!["list", 0, "name"]), &JsonValue::from("a"));
    }

    #[test]
    fn misses_classify_the_failure() {
        let v = sample();
        assert_eq!(v["missing"], JsonValue::Error(ErrorKind::NotExist));
        assert_eq!(v["list"][5], JsonValue::Error(ErrorKind::IndexOutOfBounds));
        assert_eq!(v["scalar"][0], JsonValue::Error(ErrorKind::WrongType));
        assert_eq!(v["list"]["name"], JsonValue::Error(ErrorKind::WrongType));
    }

    #[test]
    fn errors_propagate_unchanged() {
        let v = JsonValue::from(json!([1, 2]));
        let oob = v.get(5usize);
        assert_eq!(oob, &JsonValue::Error(ErrorKind::IndexOutOfBounds));
        assert_eq!(oob["x"], JsonValue::Error(ErrorKind::IndexOutOfBounds));
        assert_eq!(oob[0]["y"][3], JsonValue::Error(ErrorKind::IndexOutOfBounds));
        assert_eq!(oob.get_any(&["x"]), &JsonValue::Error(ErrorKind::IndexOutOfBounds));
    }

    #[test]
    fn path_fold_matches_single_steps() {
        let v = sample();
        let path = path!["list", 1, "name"];
        for split in 0..=path.len() {
            let (head, tail) = path.split_at(split);
            assert_eq!(v.at_path(&path), v.at_path(head).at_path(tail));
        }
        assert_eq!(v.at_path(&[]), &v);
    }

    #[test]
    fn case_insensitive_and_multi_key_reads() {
        let v = sample();
        assert_eq!(v["Mixed"].get_ignore_case("KEY"), &JsonValue::from(1));
        assert_eq!(
            v.search_ignore_case(&["absent", "mixed"])["key"],
            JsonValue::Error(ErrorKind::NotExist)
        );
        assert_eq!(v.search_ignore_case(&["absent", "SCALAR"]), &JsonValue::from(3));
        assert_eq!(v.get_any(&["nope", "scalar", "plain"]), &JsonValue::from(3));
        assert_eq!(v.get_any(&["nope"]), &JsonValue::Error(ErrorKind::NotExist));
        assert_eq!(v["scalar"].get_any(&["x"]), &JsonValue::Error(ErrorKind::WrongType));
    }

    #[test]
    fn embedded_documents_are_parsed_on_request() {
        let v = sample();
        assert_eq!(v.get_parsed("nested"), JsonValue::from(json!({"inner": [1, 2]})));
        assert_eq!(v.get_parsed("plain"), JsonValue::from("not json"));
        assert_eq!(v.get_parsed("scalar"), JsonValue::from(3));
        assert_eq!(v.get_parsed("missing"), JsonValue::Error(ErrorKind::NotExist));
        assert_eq!(v["list"].get_parsed(9usize), JsonValue::Error(ErrorKind::IndexOutOfBounds));
    }

    #[test]
    fn set_replaces_and_inserts() {
        let mut v = sample();
        assert!(v.set_path(&path!["list", 0, "name"], JsonValue::from("z")));
        assert!(v.set("added", JsonValue::from(true)));
        assert_eq!(v["list"][0]["name"], JsonValue::from("z"));
        assert_eq!(v["added"], JsonValue::from(true));
        // sibling untouched
        assert_eq!(v["list"][1]["name"], JsonValue::from("b"));
    }

    #[test]
    fn set_creates_missing_intermediate_objects() {
        let mut v = JsonValue::from(json!({}));
        assert!(v.set_path(&path!["a", "b", "c"], JsonValue::from(1)));
        assert_eq!(v, JsonValue::from(json!({"a": {"b": {"c": 1}}})));
    }

    #[test]
    fn set_never_extends_arrays() {
        let mut v = JsonValue::from(json!({"list": [1]}));
        let before = v.clone();
        assert!(!v.set_path(&path!["list", 3], JsonValue::from(2)));
        assert!(!v.set_path(&path!["list", 3, "x"], JsonValue::from(2)));
        assert!(!v.set_path(&path!["fresh", 0], JsonValue::from(2)));
        assert_eq!(v, before);
    }

    #[test]
    fn rejected_writes_leave_no_partial_state() {
        let mut v = JsonValue::from(json!({"a": 1}));
        let before = v.clone();
        assert!(!v.set_path(&path!["b", "c", 0], JsonValue::from(2)));
        assert!(!v.set_path(&path!["a", "x"], JsonValue::from(2)));
        assert!(!v.set_path(&[], JsonValue::from(2)));
        assert_eq!(v, before);
    }

    #[test]
    fn with_path_returns_the_rebuilt_value() {
        let v = JsonValue::from(json!({"a": [0, {"b": 1}]}));
        let updated = v.clone().with_path(&path!["a", 1, "b"], JsonValue::from(2));
        assert_eq!(updated["a"][1]["b"], JsonValue::from(2));
        assert_eq!(v["a"][1]["b"], JsonValue::from(1));
    }

    #[test]
    fn case_insensitive_set_collapses_variants() {
        let mut v = JsonValue::from(json!({"Name": 1, "NAME": 2, "other": 3}));
        assert!(v.set_ignore_case("name", JsonValue::from(9)));
        assert_eq!(v, JsonValue::from(json!({"name": 9, "other": 3})));
        assert!(!JsonValue::from(1).set_ignore_case("x", JsonValue::Null));
    }

    #[test]
    fn multi_key_set_targets_the_first_key() {
        let mut v = JsonValue::from(json!({"b": 1}));
        assert!(v.set_any(&["a", "b"], JsonValue::from(2)));
        assert_eq!(v, JsonValue::from(json!({"a": 2, "b": 1})));
        assert!(!v.set_any(&[], JsonValue::from(2)));
    }

    #[test]
    fn render_path_is_readable() {
        assert_eq!(render_path(&path!["a", 0, "b"]), "$.a[0].b");
    }
}
