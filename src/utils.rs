//! Content type and header parameter parsing.
use std::collections::BTreeMap;

/// A parsed media type, such as `multipart/form-data; boundary=x`.
///
/// Type, subtype and parameter names are lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub kind: String,
    pub subtype: String,
    pub params: BTreeMap<String, String>,
}

impl MediaType {
    /// Returns a parameter value, the name must be lowercase.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns `true` if this media type is matched by `pattern`.
    ///
    /// A pattern is either `*/*`, `type/*` or an exact `type/subtype`.
    ///
    /// ```
    /// let media = plume::utils::content_type("text/html; charset=utf-8").unwrap();
    /// assert!(media.matches("*/*"));
    /// assert!(media.matches("text/*"));
    /// assert!(media.matches("text/html"));
    /// assert!(!media.matches("text/plain"));
    /// ```
    pub fn matches(&self, pattern: &str) -> bool {
        let Some((kind, subtype)) = pattern.split_once('/') else {
            return false;
        };
        (kind == "*" || kind.eq_ignore_ascii_case(&self.kind))
            && (subtype == "*" || subtype.eq_ignore_ascii_case(&self.subtype))
    }
}

/// Parse a `content-type` header value.
///
/// Returns `None` if the value is not a `type/subtype` pair.
pub fn content_type(value: &str) -> Option<MediaType> {
    let (essence, rest) = value.split_once(';').unwrap_or((value, ""));
    let (kind, subtype) = essence.split_once('/')?;
    let kind = kind.trim();
    let subtype = subtype.trim();

    if !is_token(kind) || !is_token(subtype) {
        return None;
    }

    Some(MediaType {
        kind: kind.to_ascii_lowercase(),
        subtype: subtype.to_ascii_lowercase(),
        params: params(rest),
    })
}

/// Parse `;` separated header parameters, such as `form-data; name="a"; filename="b.txt"`.
///
/// Names are lowercased and quoted values are unescaped. Segments without `=` are ignored. When
/// a name is repeated the first occurrence wins.
pub fn params(value: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let mut rest = value;

    while !rest.is_empty() {
        let (segment, value, next) = next_param(rest);
        rest = next;

        let Some(name) = segment else {
            continue;
        };
        params.entry(name.to_ascii_lowercase()).or_insert(value);
    }

    params
}

/// Returns the next `(name, value)` and the unparsed remainder.
fn next_param(input: &str) -> (Option<&str>, String, &str) {
    let input = input.trim_start_matches([';', ' ', '\t']);

    let name_end = input.find(['=', ';']).unwrap_or(input.len());
    let name = input[..name_end].trim();

    if !input[name_end..].starts_with('=') {
        return (None, String::new(), &input[name_end..]);
    }

    let value = input[name_end + 1..].trim_start();

    if let Some(quoted) = value.strip_prefix('"') {
        let mut out = String::new();
        let mut chars = quoted.char_indices();
        while let Some((i, ch)) = chars.next() {
            match ch {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => return (Some(name).filter(|n| !n.is_empty()), out, &quoted[i + 1..]),
                _ => out.push(ch),
            }
        }
        return (Some(name).filter(|n| !n.is_empty()), out, "");
    }

    let end = value.find(';').unwrap_or(value.len());
    let name = Some(name).filter(|n| !n.is_empty());
    (name, value[..end].trim().to_owned(), &value[end..])
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
