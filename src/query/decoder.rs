use http::StatusCode;
use std::{borrow::Cow, collections::HashMap};

use super::{InvalidQuery, Map, Value};
use crate::matches::hex_value;

/// How invalid UTF-8 in decoded bytes is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Utf8 {
    /// Fail with [`InvalidQuery`].
    #[default]
    Reject,
    /// Replace invalid sequences with `U+FFFD`.
    Lossy,
}

/// Options for [`decode_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// UTF-8 validation policy.
    pub utf8: Utf8,
    /// Status code carried by returned [`InvalidQuery`] errors, `400` by default.
    pub status: StatusCode,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { utf8: Utf8::Reject, status: StatusCode::BAD_REQUEST }
    }
}

impl DecodeOptions {
    /// Set the UTF-8 validation policy.
    pub fn with_utf8(mut self, utf8: Utf8) -> Self {
        self.utf8 = utf8;
        self
    }

    /// Set the status code of returned errors.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

/// Decode a query string with default [`DecodeOptions`].
///
/// # Examples
///
/// ```
/// let params = plume::query::decode("foo=bar&foo=baz").unwrap();
/// assert_eq!(params["foo"], "baz");
/// ```
pub fn decode(query: impl AsRef<[u8]>) -> Result<Map, InvalidQuery> {
    decode_with(query, &DecodeOptions::default())
}

/// Decode a query string.
///
/// Pairs are separated by `&`, key and value by the first `=`. A pair without `=` has an empty
/// value. Empty pairs and pairs with an empty key are skipped.
pub fn decode_with(query: impl AsRef<[u8]>, options: &DecodeOptions) -> Result<Map, InvalidQuery> {
    let mut decoder = Decoder::new();

    for pair in query.as_ref().split(|&b| b == b'&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &b""[..]),
        };

        let key = decode_www_form(key, options)?;
        let value = decode_www_form(value, options)?;
        decoder.push(&key, Value::String(value));
    }

    Ok(decoder.finish())
}

/// Percent decode a form component, mapping `+` to space.
pub fn decode_www_form(input: &[u8], options: &DecodeOptions) -> Result<String, InvalidQuery> {
    let bytes = if input.iter().any(|b| matches!(b, b'%' | b'+')) {
        let mut buf = Vec::with_capacity(input.len());
        let mut iter = input.iter().enumerate();

        while let Some((i, &byte)) = iter.next() {
            match byte {
                b'+' => buf.push(b' '),
                b'%' => {
                    let hi = input.get(i + 1).copied().and_then(hex_value);
                    let lo = input.get(i + 2).copied().and_then(hex_value);
                    let (Some(hi), Some(lo)) = (hi, lo) else {
                        let end = (i + 3).min(input.len());
                        return Err(InvalidQuery::new(
                            format!(
                                "invalid urlencoded params, got {}",
                                String::from_utf8_lossy(&input[i..end])
                            ),
                            options.status,
                        ));
                    };
                    buf.push(hi << 4 | lo);
                    iter.nth(1);
                }
                _ => buf.push(byte),
            }
        }

        Cow::Owned(buf)
    } else {
        Cow::Borrowed(input)
    };

    match options.utf8 {
        Utf8::Lossy => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Utf8::Reject => match bytes {
            Cow::Borrowed(b) => std::str::from_utf8(b).map(Into::into).map_err(|_| invalid_utf8(options)),
            Cow::Owned(b) => String::from_utf8(b).map_err(|_| invalid_utf8(options)),
        },
    }
}

fn invalid_utf8(options: &DecodeOptions) -> InvalidQuery {
    InvalidQuery::new("invalid UTF-8 on urlencoded params", options.status)
}

// ===== Decoder =====

/// Incremental bracket aware decoder.
///
/// Every pushed key is split into its bracket segments and recorded as flat
/// `(level, subkey, entry)` triples, where a level is either the root or a key prefix such as
/// `user[address]`. Intermediate segments record a pointer to the child level. [`finish`]
/// resolves the root level, materializing each level as a list when its first subkey is empty
/// and as a map otherwise.
///
/// [`finish`]: Decoder::finish
#[derive(Debug, Default)]
pub struct Decoder {
    levels: HashMap<String, Vec<(String, Entry)>>,
    anonymous: usize,
}

#[derive(Debug)]
enum Entry {
    Value(Value),
    Level(String),
}

impl Decoder {
    /// Create new empty [`Decoder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an already percent decoded key and its value.
    pub fn push(&mut self, key: &str, value: Value) {
        if key.is_empty() {
            return;
        }

        let (root, subkeys) = split_key(key);

        let mut level = String::new();
        let mut key = root.to_owned();

        for sub in subkeys {
            let child = if key.is_empty() {
                // `list[][..]`, every occurrence starts a new element
                self.anonymous += 1;
                format!("{level}[]{}", self.anonymous)
            } else if level.is_empty() {
                key.clone()
            } else {
                format!("{level}[{key}]")
            };

            self.record(&level, key, Entry::Level(child.clone()));
            level = child;
            key = sub.to_owned();
        }

        self.record(&level, key, Entry::Value(value));
    }

    fn record(&mut self, level: &str, key: String, entry: Entry) {
        match self.levels.get_mut(level) {
            Some(entries) => entries.push((key, entry)),
            None => {
                self.levels.insert(level.to_owned(), vec![(key, entry)]);
            }
        }
    }

    /// Resolve all recorded pairs.
    pub fn finish(mut self) -> Map {
        match self.levels.remove("") {
            Some(entries) => self.build_map(entries),
            None => Map::new(),
        }
    }

    fn resolve(&mut self, entry: Entry) -> Value {
        let level = match entry {
            Entry::Value(value) => return value,
            Entry::Level(level) => level,
        };

        let entries = self.levels.remove(&level).unwrap_or_default();

        match entries.first() {
            Some((sub, _)) if sub.is_empty() => Value::List(self.build_list(entries)),
            _ => Value::Map(self.build_map(entries)),
        }
    }

    fn build_map(&mut self, entries: Vec<(String, Entry)>) -> Map {
        // last occurrence wins, only surviving pointers are resolved
        let mut last = HashMap::with_capacity(entries.len());
        for (key, entry) in entries {
            if !key.is_empty() {
                last.insert(key, entry);
            }
        }

        last.into_iter()
            .map(|(key, entry)| (key, self.resolve(entry)))
            .collect()
    }

    fn build_list(&mut self, entries: Vec<(String, Entry)>) -> Vec<Value> {
        entries
            .into_iter()
            .filter(|(key, _)| key.is_empty())
            .map(|(_, entry)| self.resolve(entry))
            .collect()
    }
}

/// Split `root[a][b]` into `root` and `[a, b]`.
///
/// A key starting with a bracket or with an unclosed bracket is a plain leaf. Text after the
/// last closing bracket is ignored.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let open = match key.find('[') {
        Some(0) | None => return (key, Vec::new()),
        Some(open) => open,
    };

    let mut subkeys = Vec::new();
    let mut rest = &key[open..];

    while let Some(inner) = rest.strip_prefix('[') {
        match inner.find(']') {
            Some(close) => {
                subkeys.push(&inner[..close]);
                rest = &inner[close + 1..];
            }
            None => return (key, Vec::new()),
        }
    }

    (&key[..open], subkeys)
}

#[test]
fn test_split_key() {
    assert_eq!(split_key("foo"), ("foo", vec![]));
    assert_eq!(split_key("foo[]"), ("foo", vec![""]));
    assert_eq!(split_key("foo[bar]"), ("foo", vec!["bar"]));
    assert_eq!(split_key("foo[bar][]"), ("foo", vec!["bar", ""]));
    assert_eq!(split_key("foo[bar]baz[qux]"), ("foo", vec!["bar"]));
    assert_eq!(split_key("foo[bar"), ("foo[bar", vec![]));
    assert_eq!(split_key("[bar]"), ("[bar]", vec![]));
}
