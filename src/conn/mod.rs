//! The connection record threaded through plugs.
//!
//! A [`Conn`] is created once per request by the adapter, passed by value from plug to plug and
//! mutated through `&mut self` methods. The response moves through [`State`], once a terminal
//! state is reached no response field can be changed anymore.
use bytes::Bytes;
use http::{Method, StatusCode, Uri};
use std::{collections::BTreeMap, fmt, net::IpAddr};

use crate::{
    adapter::Adapter,
    common::Extensions,
    cookie::{self, CookieOptions, ResponseCookie},
    headers::{Headers, validate_key, validate_value},
    query::{self, DecodeOptions, Map, Value},
};

mod error;
mod read;
mod send;

#[cfg(test)]
mod test;

pub use error::ConnError;
pub use read::PartHeaders;

/// Response state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No response is set.
    Unset,
    /// A response is set but not sent.
    Set,
    /// A chunked response is being started.
    SetChunked,
    /// A file response is being started.
    SetFile,
    /// The response is sent.
    Sent,
    /// A chunked response is started.
    Chunked,
    /// A file response is sent.
    File,
    /// The connection is upgraded to another protocol.
    Upgraded,
}

impl State {
    /// Returns `true` if the response can no longer be changed.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, State::Sent | State::Chunked | State::File | State::Upgraded)
    }
}

/// Request scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub const fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// A field that is only available after its fetch operation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fetch<T> {
    #[default]
    Unfetched,
    Fetched(T),
}

impl<T> Fetch<T> {
    /// Returns the value if it is fetched.
    pub fn get(&self) -> Option<&T> {
        match self {
            Fetch::Unfetched => None,
            Fetch::Fetched(value) => Some(value),
        }
    }

    pub const fn is_fetched(&self) -> bool {
        matches!(self, Fetch::Fetched(_))
    }
}

/// Request data an adapter creates a connection from.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub remote_ip: IpAddr,
    pub headers: Headers,
}

type BeforeSend<A> = Box<dyn FnOnce(&mut Conn<A>) -> Result<(), ConnError> + Send>;

/// A request and its response, in the making.
pub struct Conn<A> {
    adapter: A,

    method: Method,
    scheme: Scheme,
    host: String,
    port: u16,
    remote_ip: IpAddr,
    path_info: Vec<String>,
    script_name: Vec<String>,
    request_path: String,
    query_string: String,
    req_headers: Headers,

    status: Option<StatusCode>,
    resp_headers: Headers,
    resp_body: Option<Bytes>,
    resp_cookies: BTreeMap<String, ResponseCookie>,
    state: State,
    halted: bool,
    before_send: Vec<BeforeSend<A>>,

    query_params: Fetch<Map>,
    body_params: Fetch<Map>,
    params: Fetch<Map>,
    path_params: Map,
    req_cookies: Fetch<BTreeMap<String, String>>,
    cookies: Fetch<BTreeMap<String, String>>,

    assigns: Extensions,
    private: Extensions,
    validate_header_keys: bool,
}

impl<A: Adapter> Conn<A> {
    /// Create new [`Conn`] from a request head.
    ///
    /// Request header keys are lowercased. Host and port are taken from the uri authority,
    /// falling back to the `host` header.
    pub fn new(adapter: A, head: RequestHead) -> Self {
        let RequestHead { method, uri, remote_ip, headers } = head;

        let scheme = match uri.scheme_str() {
            Some(s) if s.eq_ignore_ascii_case("https") => Scheme::Https,
            _ => Scheme::Http,
        };

        let req_headers: Headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();

        let (host, port) = match uri.host() {
            Some(host) => (host.to_owned(), uri.port_u16()),
            None => match req_headers.get("host") {
                Some(value) => split_host(value),
                None => (String::new(), None),
            },
        };

        let request_path = match uri.path() {
            "" => "/".to_owned(),
            path => path.to_owned(),
        };

        Self {
            adapter,
            method,
            scheme,
            host,
            port: port.unwrap_or(scheme.default_port()),
            remote_ip,
            path_info: split_path(&request_path),
            script_name: Vec::new(),
            request_path,
            query_string: uri.query().unwrap_or_default().to_owned(),
            req_headers,
            status: None,
            resp_headers: Headers::from_iter([("cache-control", "max-age=0, private, must-revalidate")]),
            resp_body: None,
            resp_cookies: BTreeMap::new(),
            state: State::Unset,
            halted: false,
            before_send: Vec::new(),
            query_params: Fetch::Unfetched,
            body_params: Fetch::Unfetched,
            params: Fetch::Unfetched,
            path_params: Map::new(),
            req_cookies: Fetch::Unfetched,
            cookies: Fetch::Unfetched,
            assigns: Extensions::new(),
            private: Extensions::new(),
            validate_header_keys: cfg!(debug_assertions),
        }
    }

    /// Enable or disable lowercase validation of header keys.
    pub fn set_validate_header_keys(&mut self, enabled: bool) -> &mut Self {
        self.validate_header_keys = enabled;
        self
    }

    // ===== Request =====

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn remote_ip(&self) -> IpAddr {
        self.remote_ip
    }

    /// Request path split into segments.
    pub fn path_info(&self) -> &[String] {
        &self.path_info
    }

    /// Path segments consumed by a mounting router.
    pub fn script_name(&self) -> &[String] {
        &self.script_name
    }

    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn req_headers(&self) -> &Headers {
        &self.req_headers
    }

    /// Returns the first request header value of given key.
    pub fn get_req_header(&self, key: &str) -> Option<&str> {
        self.req_headers.get(key)
    }

    /// Set a request header.
    pub fn put_req_header(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, ConnError> {
        let (key, value) = self.validate(key.into(), value.into())?;
        self.req_headers.put(key, value);
        Ok(self)
    }

    /// Remove a request header.
    pub fn delete_req_header(&mut self, key: &str) -> &mut Self {
        self.req_headers.remove(key);
        self
    }

    /// Reconstruct the request url, omitting the default port of the scheme.
    pub fn request_url(&self) -> String {
        let mut url = format!("{}://{}", self.scheme.as_str(), self.host);
        if self.port != self.scheme.default_port() {
            url.push(':');
            url.push_str(itoa::Buffer::new().format(self.port));
        }
        url.push_str(&self.request_path);
        if !self.query_string.is_empty() {
            url.push('?');
            url.push_str(&self.query_string);
        }
        url
    }

    /// Returns the adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Returns the adapter mutably.
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    // ===== Response =====

    pub fn state(&self) -> State {
        self.state
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn resp_headers(&self) -> &Headers {
        &self.resp_headers
    }

    /// Returns the response body, after sending it is the body the adapter reported.
    pub fn resp_body(&self) -> Option<&Bytes> {
        self.resp_body.as_ref()
    }

    /// Returns the first response header value of given key.
    pub fn get_resp_header(&self, key: &str) -> Option<&str> {
        self.resp_headers.get(key)
    }

    /// Set the response status.
    pub fn put_status(&mut self, status: StatusCode) -> Result<&mut Self, ConnError> {
        self.ensure_unsent()?;
        self.status = Some(status);
        Ok(self)
    }

    /// Set a response header, replacing existing values in place.
    pub fn put_resp_header(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, ConnError> {
        self.ensure_unsent()?;
        let (key, value) = self.validate(key.into(), value.into())?;
        self.resp_headers.put(key, value);
        Ok(self)
    }

    /// Insert response headers before the existing ones.
    pub fn prepend_resp_headers<I, K, V>(&mut self, headers: I) -> Result<&mut Self, ConnError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_unsent()?;
        let headers = headers
            .into_iter()
            .map(|(k, v)| self.validate(k.into(), v.into()))
            .collect::<Result<Vec<_>, _>>()?;
        self.resp_headers.prepend(headers);
        Ok(self)
    }

    /// Put every given response header.
    pub fn merge_resp_headers<I, K, V>(&mut self, headers: I) -> Result<&mut Self, ConnError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_unsent()?;
        let headers = headers
            .into_iter()
            .map(|(k, v)| self.validate(k.into(), v.into()))
            .collect::<Result<Vec<_>, _>>()?;
        for (key, value) in headers {
            self.resp_headers.put(key, value);
        }
        Ok(self)
    }

    /// Remove a response header.
    pub fn delete_resp_header(&mut self, key: &str) -> Result<&mut Self, ConnError> {
        self.ensure_unsent()?;
        self.resp_headers.remove(key);
        Ok(self)
    }

    /// Set a response header to `initial`, or to the result of `f` if it already exists.
    pub fn update_resp_header<F>(
        &mut self,
        key: impl Into<String>,
        initial: impl Into<String>,
        f: F,
    ) -> Result<&mut Self, ConnError>
    where
        F: FnOnce(&str) -> String,
    {
        let key = key.into();
        let value = match self.resp_headers.get(&key) {
            Some(existing) => f(existing),
            None => initial.into(),
        };
        self.put_resp_header(key, value)
    }

    /// Set the `content-type` response header, with an optional charset.
    pub fn put_resp_content_type(
        &mut self,
        content_type: &str,
        charset: Option<&str>,
    ) -> Result<&mut Self, ConnError> {
        let value = match charset {
            Some(charset) => format!("{content_type}; charset={charset}"),
            None => content_type.to_owned(),
        };
        self.put_resp_header("content-type", value)
    }

    /// Register a callback that runs right before the response is sent.
    ///
    /// Callbacks run in reverse registration order.
    pub fn register_before_send<F>(&mut self, callback: F) -> Result<&mut Self, ConnError>
    where
        F: FnOnce(&mut Conn<A>) -> Result<(), ConnError> + Send + 'static,
    {
        self.ensure_unsent()?;
        self.before_send.push(Box::new(callback));
        Ok(self)
    }

    // ===== Pipeline =====

    /// Stop the pipeline after the current plug.
    pub fn halt(&mut self) -> &mut Self {
        self.halted = true;
        self
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    // ===== Storage =====

    /// Store application data.
    pub fn assign<T: Send + 'static>(&mut self, value: T) -> &mut Self {
        self.assigns.insert(value);
        self
    }

    pub fn assigns(&self) -> &Extensions {
        &self.assigns
    }

    pub fn assigns_mut(&mut self) -> &mut Extensions {
        &mut self.assigns
    }

    /// Store library data.
    pub fn put_private<T: Send + 'static>(&mut self, value: T) -> &mut Self {
        self.private.insert(value);
        self
    }

    pub fn private(&self) -> &Extensions {
        &self.private
    }

    pub fn private_mut(&mut self) -> &mut Extensions {
        &mut self.private
    }

    // ===== Params =====

    pub fn query_params(&self) -> &Fetch<Map> {
        &self.query_params
    }

    pub fn body_params(&self) -> &Fetch<Map> {
        &self.body_params
    }

    /// Query, body and path params merged, in increasing precedence.
    pub fn params(&self) -> &Fetch<Map> {
        &self.params
    }

    pub fn path_params(&self) -> &Map {
        &self.path_params
    }

    /// Returns a merged param.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get()?.get(key)
    }

    /// Decode the query string into the query params.
    ///
    /// Does nothing if query params are already fetched.
    pub fn fetch_query_params(&mut self, options: &DecodeOptions) -> Result<&mut Self, ConnError> {
        if self.query_params.is_fetched() {
            return Ok(self);
        }
        let params = query::decode_with(&self.query_string, options)?;
        self.query_params = Fetch::Fetched(params);
        self.merge_params();
        Ok(self)
    }

    /// Set the body params, usually by a body parser.
    pub fn put_body_params(&mut self, params: Map) -> &mut Self {
        self.body_params = Fetch::Fetched(params);
        self.merge_params();
        self
    }

    /// Set the path params, usually by a router.
    pub fn put_path_params(&mut self, params: Map) -> &mut Self {
        self.path_params = params;
        self.merge_params();
        self
    }

    fn merge_params(&mut self) {
        let mut params = Map::new();
        let layers = [self.query_params.get(), self.body_params.get(), Some(&self.path_params)];
        for layer in layers.into_iter().flatten() {
            params.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        self.params = Fetch::Fetched(params);
    }

    // ===== Cookies =====

    pub fn req_cookies(&self) -> &Fetch<BTreeMap<String, String>> {
        &self.req_cookies
    }

    /// Request cookies overlaid with pending response cookies.
    pub fn cookies(&self) -> &Fetch<BTreeMap<String, String>> {
        &self.cookies
    }

    /// Pending response cookies.
    pub fn resp_cookies(&self) -> &BTreeMap<String, ResponseCookie> {
        &self.resp_cookies
    }

    /// Decode the `cookie` request headers.
    pub fn fetch_cookies(&mut self) -> &mut Self {
        if !self.req_cookies.is_fetched() {
            let mut req_cookies = BTreeMap::new();
            for header in self.req_headers.get_all("cookie") {
                cookie::decode_into(&mut req_cookies, header);
            }
            self.req_cookies = Fetch::Fetched(req_cookies);
        }

        let mut cookies = self.req_cookies.get().cloned().unwrap_or_default();
        for (key, cookie) in &self.resp_cookies {
            if cookie.is_deleted() {
                cookies.remove(key);
            } else {
                cookies.insert(key.clone(), cookie.value.clone());
            }
        }
        self.cookies = Fetch::Fetched(cookies);
        self
    }

    /// Record a response cookie.
    ///
    /// `secure` defaults to whether the request scheme is https. Fails with
    /// [`ConnError::InvalidHeader`] if the serialized cookie contains a CR or LF.
    pub fn put_resp_cookie(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        options: CookieOptions,
    ) -> Result<&mut Self, ConnError> {
        let options = self.cookie_options(options);
        let cookie = ResponseCookie { value: value.into(), options };
        self.record_cookie(key.into(), cookie)
    }

    /// Record a response cookie that removes `key` from the client.
    pub fn delete_resp_cookie(
        &mut self,
        key: impl Into<String>,
        options: CookieOptions,
    ) -> Result<&mut Self, ConnError> {
        let options = self.cookie_options(options);
        self.record_cookie(key.into(), ResponseCookie::deleted(options))
    }

    fn cookie_options(&self, mut options: CookieOptions) -> CookieOptions {
        if options.secure.is_none() {
            options.secure = Some(self.scheme == Scheme::Https);
        }
        options
    }

    fn record_cookie(&mut self, key: String, cookie: ResponseCookie) -> Result<&mut Self, ConnError> {
        self.ensure_unsent()?;
        validate_value("set-cookie", &cookie::encode(&key, &cookie))?;
        if let Fetch::Fetched(cookies) = &mut self.cookies {
            if cookie.is_deleted() {
                cookies.remove(&key);
            } else {
                cookies.insert(key.clone(), cookie.value.clone());
            }
        }
        self.resp_cookies.insert(key, cookie);
        Ok(self)
    }

    // ===== Helpers =====

    fn ensure_unsent(&self) -> Result<(), ConnError> {
        if self.state.is_terminal() {
            return Err(ConnError::AlreadySent);
        }
        Ok(())
    }

    fn validate(&self, key: String, value: String) -> Result<(String, String), ConnError> {
        if self.validate_header_keys {
            validate_key(&key)?;
        }
        validate_value(&key, &value)?;
        Ok((key, value))
    }
}

impl<A> fmt::Debug for Conn<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conn")
            .field("method", &self.method)
            .field("host", &self.host)
            .field("request_path", &self.request_path)
            .field("query_string", &self.query_string)
            .field("status", &self.status)
            .field("state", &self.state)
            .field("halted", &self.halted)
            .field("req_headers", &self.req_headers)
            .field("resp_headers", &self.resp_headers)
            .finish_non_exhaustive()
    }
}

fn split_host(value: &str) -> (String, Option<u16>) {
    // `[::1]:8080` keeps its brackets
    if let Some(end) = value.rfind(']') {
        let port = value[end + 1..].strip_prefix(':').and_then(|p| p.parse().ok());
        return (value[..=end].to_owned(), port);
    }
    match value.rsplit_once(':') {
        Some((host, port)) => (host.to_owned(), port.parse().ok()),
        None => (value.to_owned(), None),
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}
