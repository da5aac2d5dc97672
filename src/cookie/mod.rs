//! `Cookie` and `Set-Cookie` codec.
use std::{
    collections::BTreeMap,
    fmt::Write,
    time::{Duration, SystemTime},
};

use crate::common::httpdate;

#[cfg(test)]
mod test;

/// Maximum size of a serialized response cookie.
pub const MAX_COOKIE_SIZE: usize = 4096;

/// Decode a request `cookie` header.
///
/// Keys starting with `$` and empty keys are discarded. When a key is repeated the first
/// occurrence wins.
///
/// ```
/// let cookies = plume::cookie::decode("a=1; $Version=1; b=2; a=3");
/// assert_eq!(cookies.get("a").map(String::as_str), Some("1"));
/// assert_eq!(cookies.len(), 2);
/// ```
pub fn decode(header: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    decode_into(&mut cookies, header);
    cookies
}

/// Decode a request `cookie` header into existing cookies, keeping existing keys.
pub fn decode_into(cookies: &mut BTreeMap<String, String>, header: &str) {
    for pair in header.split(';') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = key.trim();
        if key.is_empty() || key.starts_with('$') {
            continue;
        }
        cookies
            .entry(key.to_owned())
            .or_insert_with(|| value.trim().to_owned());
    }
}

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    /// Returns the attribute value.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes of a response cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// `Path`, `/` by default.
    pub path: String,
    pub domain: Option<String>,
    /// `Max-Age` in seconds.
    pub max_age: Option<i64>,
    pub expires: Option<SystemTime>,
    /// `Secure`, when unset it follows the connection scheme.
    pub secure: Option<bool>,
    /// `HttpOnly`, `true` by default.
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    /// Raw attributes appended as is.
    pub extra: Option<String>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".into(),
            domain: None,
            max_age: None,
            expires: None,
            secure: None,
            http_only: true,
            same_site: None,
            extra: None,
        }
    }
}

impl CookieOptions {
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

/// A pending response cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCookie {
    pub value: String,
    pub options: CookieOptions,
}

impl ResponseCookie {
    /// Create a cookie that instructs the client to remove `key`.
    pub fn deleted(mut options: CookieOptions) -> Self {
        options.max_age = Some(0);
        options.expires = Some(SystemTime::UNIX_EPOCH);
        Self { value: String::new(), options }
    }

    /// Returns `true` if this cookie removes the client value.
    pub fn is_deleted(&self) -> bool {
        self.options.max_age == Some(0)
    }
}

/// Encode a `set-cookie` header value, using the current time to derive `Expires`.
pub fn encode(key: &str, cookie: &ResponseCookie) -> String {
    encode_at(key, cookie, SystemTime::now())
}

/// Encode a `set-cookie` header value.
///
/// When only `max_age` is given, `Expires` is derived from `now`.
///
/// ```
/// use std::time::SystemTime;
/// use plume::cookie::{CookieOptions, ResponseCookie, encode_at};
///
/// let cookie = ResponseCookie { value: "1".into(), options: CookieOptions::default() };
/// assert_eq!(encode_at("a", &cookie, SystemTime::UNIX_EPOCH), "a=1; Path=/; HttpOnly");
/// ```
pub fn encode_at(key: &str, cookie: &ResponseCookie, now: SystemTime) -> String {
    let ResponseCookie { value, options } = cookie;
    let mut out = format!("{key}={value}; Path={}", options.path);

    if let Some(domain) = &options.domain {
        let _ = write!(out, "; Domain={domain}");
    }

    if let Some(max_age) = options.max_age {
        let _ = write!(out, "; Max-Age={max_age}");
    }

    let expires = options.expires.or_else(|| {
        let max_age = options.max_age?;
        Some(match u64::try_from(max_age) {
            Ok(secs) => now.checked_add(Duration::from_secs(secs)).unwrap_or(now),
            Err(_) => SystemTime::UNIX_EPOCH,
        })
    });
    if let Some(expires) = expires {
        let date = httpdate(expires);
        out.push_str("; Expires=");
        out.push_str(std::str::from_utf8(&date).unwrap_or_default());
    }

    if options.secure == Some(true) {
        out.push_str("; Secure");
    }

    if options.http_only {
        out.push_str("; HttpOnly");
    }

    if let Some(same_site) = options.same_site {
        out.push_str("; SameSite=");
        out.push_str(same_site.as_str());
    }

    if let Some(extra) = &options.extra {
        out.push_str("; ");
        out.push_str(extra);
    }

    out
}
