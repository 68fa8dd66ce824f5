//! Dynamic JSON values with total, error-carrying reads.
//!
//! ```
//! use dynjson::{JsonValue, ErrorKind};
//!
//! let doc = JsonValue::parse(br#"{"users": [{"name": "ada", "admin": "YES"}]}"#);
//! assert_eq!(doc["users"][0]["name"].as_str(), Some("ada"));
//! assert_eq!(doc["users"][0]["admin"].as_bool(), Some(true));
//! assert_eq!(doc["users"][3]["name"].error(), Some(ErrorKind::IndexOutOfBounds));
//! ```
pub mod codec;
pub mod coerce;
pub mod error;
pub mod merge;
pub mod native;
pub mod ordering;
pub mod path;
pub mod value;

pub use coerce::{Coerce, Coercer, CustomCoercion, ScalarKind};
pub use error::{ErrorKind, JsonError};
pub use native::{Converter, Native, Wrapper, deep_unwrap, unwrap};
pub use ordering::Comparison;
pub use path::PathKey;
pub use value::{DEFAULT_MAX_DEPTH, JsonType, JsonValue, Limits, Number};
