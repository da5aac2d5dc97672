//! In memory adapter for tests.
//!
//! ```
//! use http::{Method, StatusCode};
//! use plume::testing;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut conn = testing::conn(Method::GET, "/hello?name=world".parse().unwrap(), "");
//! conn.send_resp(StatusCode::OK, "hi").await.unwrap();
//!
//! let sent = conn.adapter().sent().unwrap();
//! assert_eq!(sent.status, StatusCode::OK);
//! assert_eq!(sent.body, "hi");
//! # }
//! ```
use bytes::Bytes;
use http::{Method, StatusCode, Uri, Version};
use std::{
    net::{IpAddr, Ipv4Addr},
    path::Path,
};

use crate::{
    adapter::{Adapter, AdapterError, PeerData},
    body::{Read, ReadOptions},
    common::concat,
    conn::{Conn, RequestHead},
    headers::Headers,
};

/// A response recorded by [`TestAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentResponse {
    pub status: StatusCode,
    pub headers: Headers,
    /// Full body, for chunked responses every chunk sent so far.
    pub body: Bytes,
}

/// An [`Adapter`] that serves a fixed request body and records what is sent.
#[derive(Debug, Clone)]
pub struct TestAdapter {
    body: Bytes,
    chunk_size: Option<usize>,
    stalled: bool,
    failing_sends: usize,
    sent: Option<SentResponse>,
    informs: Vec<(StatusCode, Headers)>,
    pushes: Vec<(String, Headers)>,
    upgrade: Option<String>,
    peer: PeerData,
    version: Version,
}

impl TestAdapter {
    /// Create new [`TestAdapter`] with the given request body.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            chunk_size: None,
            stalled: false,
            failing_sends: 0,
            sent: None,
            informs: Vec::new(),
            pushes: Vec::new(),
            upgrade: None,
            peer: PeerData {
                address: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 11131,
                ssl_cert: None,
            },
            version: Version::HTTP_11,
        }
    }

    /// Return at most `size` bytes per body read.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// Make every body read wait forever.
    pub fn with_stalled_body(mut self) -> Self {
        self.stalled = true;
        self
    }

    /// Fail the next `count` responses with [`AdapterError::Closed`].
    pub fn with_failing_sends(mut self, count: usize) -> Self {
        self.failing_sends = count;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Returns the sent response.
    pub fn sent(&self) -> Option<&SentResponse> {
        self.sent.as_ref()
    }

    /// Returns the sent informational responses.
    pub fn informs(&self) -> &[(StatusCode, Headers)] {
        &self.informs
    }

    /// Returns the pushed resources.
    pub fn pushes(&self) -> &[(String, Headers)] {
        &self.pushes
    }

    /// Returns the protocol the connection was upgraded to.
    pub fn upgraded(&self) -> Option<&str> {
        self.upgrade.as_deref()
    }

    /// Returns the request body not read yet.
    pub fn unread_body(&self) -> &Bytes {
        &self.body
    }

    fn record(&mut self, status: StatusCode, headers: &Headers, body: Bytes) -> Result<(), AdapterError> {
        if self.failing_sends > 0 {
            self.failing_sends -= 1;
            return Err(AdapterError::Closed);
        }
        if self.sent.is_some() {
            return Err(AdapterError::Other("response already sent".into()));
        }
        self.sent = Some(SentResponse { status, headers: headers.clone(), body });
        Ok(())
    }
}

impl Adapter for TestAdapter {
    async fn send_resp(
        &mut self,
        status: StatusCode,
        headers: &Headers,
        body: Bytes,
    ) -> Result<Option<Bytes>, AdapterError> {
        self.record(status, headers, body.clone())?;
        Ok(Some(body))
    }

    async fn send_file(
        &mut self,
        status: StatusCode,
        headers: &Headers,
        path: &Path,
        offset: u64,
        length: Option<u64>,
    ) -> Result<(), AdapterError> {
        let content = Bytes::from(tokio::fs::read(path).await?);
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(content.len());
        let end = match length {
            Some(length) => start.saturating_add(usize::try_from(length).unwrap_or(usize::MAX)),
            None => content.len(),
        };
        self.record(status, headers, content.slice(start..end.min(content.len())))
    }

    async fn send_chunked(&mut self, status: StatusCode, headers: &Headers) -> Result<(), AdapterError> {
        self.record(status, headers, Bytes::new())
    }

    async fn chunk(&mut self, data: Bytes) -> Result<(), AdapterError> {
        let sent = self.sent.as_mut().ok_or(AdapterError::Closed)?;
        sent.body = concat(std::mem::take(&mut sent.body), data);
        Ok(())
    }

    async fn read_req_body(&mut self, options: &ReadOptions) -> Result<Read, AdapterError> {
        if self.stalled {
            std::future::pending::<()>().await;
        }

        let len = options
            .length
            .min(self.chunk_size.unwrap_or(usize::MAX))
            .min(self.body.len());
        let data = self.body.split_to(len);

        Ok(if self.body.is_empty() { Read::Ok(data) } else { Read::More(data) })
    }

    async fn inform(&mut self, status: StatusCode, headers: &Headers) -> Result<(), AdapterError> {
        self.informs.push((status, headers.clone()));
        Ok(())
    }

    fn push(&mut self, path: &str, headers: &Headers) -> Result<(), AdapterError> {
        self.pushes.push((path.to_owned(), headers.clone()));
        Ok(())
    }

    fn upgrade(&mut self, protocol: &str, _: &Headers) -> Result<(), AdapterError> {
        self.upgrade = Some(protocol.to_owned());
        Ok(())
    }

    fn peer_data(&self) -> Option<PeerData> {
        Some(self.peer.clone())
    }

    fn http_protocol(&self) -> Version {
        self.version
    }
}

/// Create a connection over a [`TestAdapter`] serving `body`.
///
/// Requests without an authority get the `www.example.com` host, the remote ip is `127.0.0.1`.
pub fn conn(method: Method, uri: Uri, body: impl Into<Bytes>) -> Conn<TestAdapter> {
    conn_with(TestAdapter::new(body), method, uri, Headers::new())
}

/// Create a connection over the given adapter, with request headers.
pub fn conn_with(adapter: TestAdapter, method: Method, uri: Uri, mut headers: Headers) -> Conn<TestAdapter> {
    if uri.host().is_none() && !headers.contains_key("host") {
        headers.prepend([("host", "www.example.com")]);
    }
    let head = RequestHead {
        method,
        uri,
        remote_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        headers,
    };
    Conn::new(adapter, head)
}
