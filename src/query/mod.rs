//! `application/x-www-form-urlencoded` codec with nested brackets.
//!
//! Keys follow the bracket convention:
//!
//! - `key=v` sets a leaf,
//! - `key[]=v` appends to a list,
//! - `key[sub]=v` sets a map entry,
//! - brackets chain, `key[a][b]=v` nests maps.
//!
//! ```
//! use plume::query::{self, Value};
//!
//! let params = query::decode("user[name]=john&tags[]=a&tags[]=b").unwrap();
//! assert_eq!(params["user"]["name"], "john");
//! assert_eq!(params["tags"], Value::from(vec!["a".into(), "b".into()]));
//!
//! assert_eq!(query::encode_map(&params).unwrap(), "tags[]=a&tags[]=b&user[name]=john");
//! ```
//!
//! Decoding duplicate keys keeps the last occurrence, while [`encode_pairs`] keeps the first
//! occurrence of duplicate top level keys.
use std::{collections::BTreeMap, ops::Index};

use crate::upload::Upload;

mod decoder;
mod encoder;
mod error;


pub use decoder::{DecodeOptions, Decoder, Utf8, decode, decode_with, decode_www_form};
pub use encoder::{encode, encode_map, encode_pairs, encode_www_form};
pub use error::{EncodeError, InvalidQuery};

/// Decoded parameters, keyed by name.
pub type Map = BTreeMap<String, Value>;

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Absent value, encoded as an empty value and never produced by decoding.
    Null,
    /// Leaf value.
    String(String),
    /// Values from `key[]`.
    List(Vec<Value>),
    /// Values from `key[sub]`.
    Map(Map),
    /// File backed multipart part.
    File(Upload),
}

static NULL: Value = Value::Null;

impl Value {
    /// Returns the string if this is a leaf.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Returns the map if this is a map.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the upload if this is a file part.
    pub fn as_file(&self) -> Option<&Upload> {
        match self {
            Value::File(upload) => Some(upload),
            _ => None,
        }
    }

    /// Returns the entry of a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// Returns `true` if this is [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Index<&str> for Value {
    type Output = Value;

    /// Returns the map entry, or [`Value::Null`] for missing keys and non map values.
    fn index(&self, key: &str) -> &Self::Output {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// Returns the list element, or [`Value::Null`] when out of bounds or not a list.
    fn index(&self, idx: usize) -> &Self::Output {
        self.as_list().and_then(|list| list.get(idx)).unwrap_or(&NULL)
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<Upload> for Value {
    fn from(value: Upload) -> Self {
        Value::File(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
