//! The transport contract a connection drives.
use bytes::Bytes;
use http::{StatusCode, Version};
use std::{future::Future, io, net::IpAddr, path::Path};

use crate::{
    body::{Read, ReadOptions},
    headers::Headers,
};

/// A transport error, passed verbatim to the caller.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A read did not complete within the configured timeout.
    #[error("timed out reading request body")]
    Timeout,
    /// The peer closed the connection.
    #[error("connection closed")]
    Closed,
    /// The adapter does not implement the capability.
    #[error("{0} is not supported by the adapter")]
    Unsupported(&'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(String),
}

/// Information about the connected peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerData {
    pub address: IpAddr,
    pub port: u16,
    /// DER encoded client certificate, if any.
    pub ssl_cert: Option<Bytes>,
}

/// The transport behind a connection.
///
/// An adapter value is owned by exactly one connection and moves with it. Every method is called
/// at most once per response, except [`chunk`][Adapter::chunk] and
/// [`read_req_body`][Adapter::read_req_body].
pub trait Adapter: Send + 'static {
    /// Send a complete response, returns the body that was actually sent if it is retained.
    fn send_resp(
        &mut self,
        status: StatusCode,
        headers: &Headers,
        body: Bytes,
    ) -> impl Future<Output = Result<Option<Bytes>, AdapterError>> + Send;

    /// Send a response with the content of a file.
    ///
    /// `length` of `None` sends until the end of the file.
    fn send_file(
        &mut self,
        status: StatusCode,
        headers: &Headers,
        path: &Path,
        offset: u64,
        length: Option<u64>,
    ) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Send the head of a chunked response.
    fn send_chunked(
        &mut self,
        status: StatusCode,
        headers: &Headers,
    ) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Send a chunk of a chunked response.
    fn chunk(&mut self, data: Bytes) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Read at most `options.length` bytes of the request body.
    ///
    /// Returns [`Read::Ok`] once the body is fully consumed and [`Read::More`] otherwise.
    fn read_req_body(
        &mut self,
        options: &ReadOptions,
    ) -> impl Future<Output = Result<Read, AdapterError>> + Send;

    /// Send an informational response.
    fn inform(
        &mut self,
        status: StatusCode,
        headers: &Headers,
    ) -> impl Future<Output = Result<(), AdapterError>> + Send {
        let _ = (status, headers);
        async { Err(AdapterError::Unsupported("inform")) }
    }

    /// Push a resource to the client.
    fn push(&mut self, path: &str, headers: &Headers) -> Result<(), AdapterError> {
        let _ = (path, headers);
        Err(AdapterError::Unsupported("push"))
    }

    /// Upgrade the connection to another protocol.
    fn upgrade(&mut self, protocol: &str, headers: &Headers) -> Result<(), AdapterError> {
        let _ = (protocol, headers);
        Err(AdapterError::Unsupported("upgrade"))
    }

    /// Returns information about the connected peer.
    fn peer_data(&self) -> Option<PeerData> {
        None
    }

    /// Returns the protocol version of the request.
    fn http_protocol(&self) -> Version {
        Version::HTTP_11
    }
}
