//! Ordered HTTP header list.
//!
//! Connection headers are kept as an ordered list of `(key, value)` pairs. Keys are expected to
//! be lowercase. [`Headers::put`] keeps keys unique, while [`Headers::append`] allows repeated
//! keys such as `set-cookie`.
mod error;
mod iter;


pub use error::InvalidHeader;
pub use iter::{GetAll, Iter};

/// Ordered list of header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Create new empty [`Headers`].
    ///
    /// This function does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create new empty [`Headers`] with at least the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    /// Returns the number of fields, counting repeated keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `true` if a field with given key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Returns the first value of given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    /// Returns an iterator over every value of given key, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> GetAll<'a> {
        GetAll::new(self.fields.iter(), key)
    }

    /// Set the value of given key.
    ///
    /// The first existing field with the same key is replaced in place and the following ones are
    /// removed, otherwise the field is appended.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.fields.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                self.fields[pos].1 = value;
                let mut idx = 0;
                self.fields.retain(|(k, _)| {
                    let keep = idx <= pos || *k != key;
                    idx += 1;
                    keep
                });
            }
            None => self.fields.push((key, value)),
        }
    }

    /// Append a field at the end, regardless of existing keys.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// Insert fields at the start, keeping their order.
    pub fn prepend<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let prepended = headers.into_iter().map(|(k, v)| (k.into(), v.into()));
        self.fields.splice(0..0, prepended);
    }

    /// Remove every field with given key, returns `true` if any field was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let len = self.fields.len();
        self.fields.retain(|(k, _)| k != key);
        len != self.fields.len()
    }

    /// Returns an iterator over `(key, value)` pairs, in order.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.fields.iter())
    }

    /// Clears the list, keeping the allocated memory for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Headers {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.fields
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);

    type IntoIter = std::vec::IntoIter<(String, String)>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

// ===== Validation =====

/// Check that a header key contains no uppercase ascii.
pub fn validate_key(key: &str) -> Result<(), InvalidHeader> {
    if key.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(InvalidHeader::Uppercase(key.into()));
    }
    Ok(())
}

/// Check that a header value contains no carriage return or line feed.
pub fn validate_value(key: &str, value: &str) -> Result<(), InvalidHeader> {
    if value.bytes().any(|b| matches!(b, b'\r' | b'\n')) {
        return Err(InvalidHeader::Newline(key.into()));
    }
    Ok(())
}
