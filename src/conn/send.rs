use bytes::Bytes;
use http::{StatusCode, Version};
use std::{mem, path::Path, time::SystemTime};

use super::{Conn, ConnError, State};
use crate::{
    adapter::{Adapter, PeerData},
    cookie::{self, MAX_COOKIE_SIZE},
    headers::{Headers, validate_value},
    log,
};

impl<A: Adapter> Conn<A> {
    /// Set the response status and body without sending it.
    pub fn resp(&mut self, status: StatusCode, body: impl Into<Bytes>) -> Result<&mut Self, ConnError> {
        match self.state {
            State::Unset | State::Set | State::SetChunked | State::SetFile => {}
            _ => return Err(ConnError::AlreadySent),
        }
        self.status = Some(status);
        self.resp_body = Some(body.into());
        self.state = State::Set;
        Ok(self)
    }

    /// Send the response previously set by [`resp`][Conn::resp].
    pub async fn send(&mut self) -> Result<(), ConnError> {
        match self.state {
            State::Set => {}
            State::Unset => {
                return Err(ConnError::argument("cannot send a response that was not set"));
            }
            _ => return Err(ConnError::AlreadySent),
        }

        let headers = self.run_before_send(State::Set)?;

        let status = self.status.unwrap_or(StatusCode::OK);
        let body = self.resp_body.clone().unwrap_or_default();
        let sent = self.adapter.send_resp(status, &headers, body).await?;

        self.resp_headers = headers;
        self.resp_body = sent;
        self.state = State::Sent;
        log::info!("{} {} {status}", self.method, self.request_path);
        Ok(())
    }

    /// Set and send a response.
    pub async fn send_resp(&mut self, status: StatusCode, body: impl Into<Bytes>) -> Result<(), ConnError> {
        self.resp(status, body)?;
        self.send().await
    }

    /// Send a file as the response.
    ///
    /// `length` of `None` sends until the end of the file.
    pub async fn send_file(
        &mut self,
        status: StatusCode,
        path: impl AsRef<Path>,
        offset: u64,
        length: Option<u64>,
    ) -> Result<(), ConnError> {
        self.ensure_settable()?;

        let path = path.as_ref();
        if path.as_os_str().as_encoded_bytes().contains(&0) {
            return Err(ConnError::argument("file path must not contain null bytes"));
        }

        self.status = Some(status);
        let headers = self.run_before_send(State::SetFile)?;

        let status = self.status.unwrap_or(status);
        self.adapter
            .send_file(status, &headers, path, offset, length)
            .await?;

        self.resp_headers = headers;
        self.resp_body = None;
        self.state = State::File;
        log::info!("{} {} {status} file {}", self.method, self.request_path, path.display());
        Ok(())
    }

    /// Start a chunked response, chunks are then sent with [`chunk`][Conn::chunk].
    pub async fn send_chunked(&mut self, status: StatusCode) -> Result<(), ConnError> {
        self.ensure_settable()?;

        self.status = Some(status);
        let headers = self.run_before_send(State::SetChunked)?;

        let status = self.status.unwrap_or(status);
        self.adapter.send_chunked(status, &headers).await?;

        self.resp_headers = headers;
        self.resp_body = None;
        self.state = State::Chunked;
        log::info!("{} {} {status} chunked", self.method, self.request_path);
        Ok(())
    }

    /// Send a chunk of a chunked response.
    ///
    /// An empty chunk is not sent.
    pub async fn chunk(&mut self, data: impl Into<Bytes>) -> Result<(), ConnError> {
        if self.state != State::Chunked {
            return Err(ConnError::argument("chunk expects a started chunked response"));
        }
        let data = data.into();
        if data.is_empty() {
            return Ok(());
        }
        self.adapter.chunk(data).await?;
        Ok(())
    }

    /// Send an informational response.
    pub async fn inform<I, K, V>(&mut self, status: StatusCode, headers: I) -> Result<(), ConnError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_unsent()?;
        if !status.is_informational() {
            return Err(ConnError::argument("inform expects a 1xx status"));
        }
        let headers = self.validate_all(headers)?;
        self.adapter.inform(status, &headers).await?;
        Ok(())
    }

    /// Push a resource to the client.
    pub fn push<I, K, V>(&mut self, path: &str, headers: I) -> Result<&mut Self, ConnError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_unsent()?;
        let headers = self.validate_all(headers)?;
        self.adapter.push(path, &headers)?;
        Ok(self)
    }

    /// Hand the connection over to another protocol.
    pub fn upgrade_adapter(&mut self, protocol: &str, headers: &Headers) -> Result<&mut Self, ConnError> {
        if self.state != State::Unset {
            return Err(ConnError::AlreadySent);
        }
        self.adapter.upgrade(protocol, headers)?;
        self.state = State::Upgraded;
        log::debug!("upgraded connection to {protocol}");
        Ok(self)
    }

    /// Returns information about the connected peer.
    pub fn peer_data(&self) -> Option<PeerData> {
        self.adapter.peer_data()
    }

    /// Returns the protocol version of the request.
    pub fn http_protocol(&self) -> Version {
        self.adapter.http_protocol()
    }

    fn ensure_settable(&self) -> Result<(), ConnError> {
        match self.state {
            State::Unset | State::Set => Ok(()),
            _ => Err(ConnError::AlreadySent),
        }
    }

    fn validate_all<I, K, V>(&self, headers: I) -> Result<Headers, ConnError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .map(|(k, v)| self.validate(k.into(), v.into()))
            .collect()
    }

    /// Enter `pending`, run the before send callbacks and return the headers to send.
    ///
    /// Response cookies are written into a copy of the response headers, which is only stored
    /// once the adapter accepted the response. A failed `send` can then be retried.
    fn run_before_send(&mut self, pending: State) -> Result<Headers, ConnError> {
        self.state = pending;

        let callbacks = mem::take(&mut self.before_send);
        log::debug!("running {} before send callbacks", callbacks.len());

        for callback in callbacks.into_iter().rev() {
            callback(self)?;
            if self.state != pending {
                return Err(ConnError::argument(
                    "before send callback must not change the connection state",
                ));
            }
        }

        let mut headers = self.resp_headers.clone();
        let now = SystemTime::now();
        for (key, cookie) in &self.resp_cookies {
            let value = cookie::encode_at(key, cookie, now);
            if value.len() > MAX_COOKIE_SIZE {
                log::error!("cookie {key:?} exceeds maximum size, got {} bytes", value.len());
                return Err(ConnError::CookieOverflow { name: key.clone(), size: value.len() });
            }
            validate_value("set-cookie", &value)?;
            headers.append("set-cookie", value);
        }

        Ok(headers)
    }
}
