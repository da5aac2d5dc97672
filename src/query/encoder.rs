use std::{borrow::Borrow, collections::HashSet};

use super::{EncodeError, Map, Value};
use crate::matches::{HEX, form_unreserved};

/// Encode a [`Value::Map`] into a query string.
pub fn encode(value: &Value) -> Result<String, EncodeError> {
    match value {
        Value::Map(map) => encode_map(map),
        _ => Err(EncodeError::NotAMap),
    }
}

/// Encode a map into a query string.
///
/// # Examples
///
/// ```
/// use plume::query::{Map, Value, encode_map};
///
/// let mut user = Map::new();
/// user.insert("name".into(), "john doe".into());
/// user.insert("nick".into(), Value::Null);
///
/// let mut map = Map::new();
/// map.insert("user".into(), Value::Map(user));
///
/// assert_eq!(encode_map(&map).unwrap(), "user[name]=john+doe&user[nick]=");
/// ```
pub fn encode_map(map: &Map) -> Result<String, EncodeError> {
    let mut out = Vec::with_capacity(map.len());
    for (key, value) in map {
        encode_pair(&mut out, &encode_www_form(key), value)?;
    }
    Ok(out.join("&"))
}

/// Encode ordered pairs into a query string.
///
/// When a top level key is repeated only the first occurrence is encoded.
///
/// ```
/// use plume::query::{Value, encode_pairs};
///
/// let pairs = [("foo", Value::from("bar")), ("foo", Value::from("baz"))];
/// assert_eq!(encode_pairs(pairs).unwrap(), "foo=bar");
/// ```
pub fn encode_pairs<I, K, V>(pairs: I) -> Result<String, EncodeError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Borrow<Value>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (key, value) in pairs {
        let key = key.as_ref();
        if !seen.insert(key.to_owned()) {
            continue;
        }
        encode_pair(&mut out, &encode_www_form(key), value.borrow())?;
    }

    Ok(out.join("&"))
}

fn encode_pair(out: &mut Vec<String>, field: &str, value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::Null => out.push(format!("{field}=")),
        Value::String(value) => out.push(format!("{field}={}", encode_www_form(value))),
        Value::Map(map) => {
            for (key, value) in map {
                encode_pair(out, &format!("{field}[{}]", encode_www_form(key)), value)?;
            }
        }
        Value::List(list) => {
            let item = format!("{field}[]");
            for value in list {
                match value {
                    Value::List(_) => return Err(EncodeError::ListInList(field.into())),
                    Value::Map(_) => {
                        let mut pairs = Vec::with_capacity(1);
                        encode_pair(&mut pairs, &item, value)?;
                        if pairs.len() != 1 {
                            return Err(EncodeError::MapInList(field.into()));
                        }
                        out.append(&mut pairs);
                    }
                    _ => encode_pair(out, &item, value)?,
                }
            }
        }
        Value::File(_) => return Err(EncodeError::File(field.into())),
    }
    Ok(())
}

/// Percent encode a form component, mapping space to `+`.
pub fn encode_www_form(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        if form_unreserved(byte) {
            out.push(byte as char);
        } else if byte == b' ' {
            out.push('+');
        } else {
            out.push('%');
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0xf) as usize] as char);
        }
    }
    out
}
