//! Request body parsing plug.
//!
//! [`Parsers`] reads the request body according to its content type, stores the result as the
//! connection body params and merges it into the connection params.
//!
//! - `application/x-www-form-urlencoded` is decoded with the query codec,
//! - `multipart/form-data` and `multipart/mixed` parts are decoded by name, file parts are
//!   written to an [`UploadStore`],
//! - other media types are rejected unless they are matched by [`ParsersOptions::pass`].
use bytes::Bytes;
use http::Method;
use std::{sync::Arc, time::Duration};
use tokio::io::AsyncWriteExt;

use crate::{
    adapter::Adapter,
    body::{Read, ReadOptions},
    conn::{Conn, ConnError, PartHeaders},
    log,
    pipeline::{BoxFuture, Plug},
    query::{self, DecodeOptions, Decoder, InvalidQuery, Map, Utf8, Value},
    upload::{TempUploads, Upload, UploadStore},
    utils::{self, MediaType},
};

/// Options of [`Parsers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsersOptions {
    /// Maximum size of the whole body, `8_000_000` by default.
    pub length: usize,
    /// Maximum bytes of each underlying read, `1_000_000` by default.
    pub read_length: usize,
    /// Timeout of each underlying read, 15 seconds by default.
    pub read_timeout: Duration,
    /// Media type patterns that are left unparsed instead of rejected.
    pub pass: Vec<String>,
    /// Options of the urlencoded decoder, also used for query params.
    pub query: DecodeOptions,
}

impl Default for ParsersOptions {
    fn default() -> Self {
        let read = ReadOptions::default();
        Self {
            length: read.length,
            read_length: read.read_length,
            read_timeout: read.read_timeout,
            pass: Vec::new(),
            query: DecodeOptions::default(),
        }
    }
}

impl ParsersOptions {
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn with_read_length(mut self, read_length: usize) -> Self {
        self.read_length = read_length;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Add a media type pattern to pass through, such as `*/*`, `text/*` or `application/json`.
    pub fn with_pass(mut self, pattern: impl Into<String>) -> Self {
        self.pass.push(pattern.into());
        self
    }

    pub fn with_query(mut self, query: DecodeOptions) -> Self {
        self.query = query;
        self
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            length: self.length,
            read_length: self.read_length,
            read_timeout: self.read_timeout,
        }
    }
}

/// Plug that parses request bodies.
#[derive(Debug)]
pub struct Parsers<U = TempUploads> {
    options: Arc<ParsersOptions>,
    uploads: Arc<U>,
}

impl<U> Clone for Parsers<U> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            uploads: self.uploads.clone(),
        }
    }
}

impl Parsers {
    /// Create new [`Parsers`] that stores uploads in the system temp directory.
    pub fn new(options: ParsersOptions) -> Self {
        Self::with_uploads(options, TempUploads::default())
    }
}

impl<U: UploadStore> Parsers<U> {
    /// Create new [`Parsers`] with the given upload store.
    pub fn with_uploads(options: ParsersOptions, uploads: U) -> Self {
        Self {
            options: Arc::new(options),
            uploads: Arc::new(uploads),
        }
    }

    /// Parse the body of the connection.
    pub async fn parse<A: Adapter>(&self, mut conn: Conn<A>) -> Result<Conn<A>, ConnError> {
        conn.fetch_query_params(&self.options.query)?;

        let has_body = matches!(
            *conn.method(),
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        );
        let media = conn.get_req_header("content-type").map(|value| {
            utils::content_type(value).ok_or_else(|| value.to_owned())
        });

        let params = match media {
            Some(_) if !has_body => Map::new(),
            None => Map::new(),
            Some(Err(raw)) => self.unsupported(raw)?,
            Some(Ok(media)) => self.dispatch(&mut conn, media).await?,
        };

        conn.put_body_params(params);
        Ok(conn)
    }

    async fn dispatch<A: Adapter>(
        &self,
        conn: &mut Conn<A>,
        media: MediaType,
    ) -> Result<Map, ConnError> {
        if media.matches("application/x-www-form-urlencoded") {
            log::debug!("parsing urlencoded body");
            return self.urlencoded(conn).await;
        }
        if media.matches("multipart/form-data") || media.matches("multipart/mixed") {
            log::debug!("parsing multipart body");
            return self.multipart(conn).await;
        }
        self.unsupported(format!("{}/{}", media.kind, media.subtype))
    }

    fn unsupported(&self, media: String) -> Result<Map, ConnError> {
        let passed = utils::content_type(&media)
            .is_some_and(|media| self.options.pass.iter().any(|pattern| media.matches(pattern)));
        if passed {
            log::debug!("passing unparsed body of {media}");
            return Ok(Map::new());
        }
        Err(ConnError::UnsupportedMediaType(media))
    }

    async fn urlencoded<A: Adapter>(&self, conn: &mut Conn<A>) -> Result<Map, ConnError> {
        let body = match conn.read_body(&self.options.read_options()).await? {
            Read::Ok(body) => body,
            Read::More(_) => return Err(ConnError::RequestTooLarge),
        };
        Ok(query::decode_with(&body, &self.options.query)?)
    }

    async fn multipart<A: Adapter>(&self, conn: &mut Conn<A>) -> Result<Map, ConnError> {
        let headers_options = ReadOptions::part_headers().with_read_timeout(self.options.read_timeout);
        let body_options = self.options.read_options();

        let mut decoder = Decoder::new();
        let mut remaining = self.options.length;

        loop {
            let headers = match conn.read_part_headers(&headers_options).await? {
                PartHeaders::Headers(headers) => headers,
                PartHeaders::Done => break,
            };

            let disposition = headers
                .iter()
                .find(|(name, _)| name == "content-disposition")
                .map(|(_, value)| value.as_str());
            let params = match disposition {
                Some(value) if is_form_data(value) => utils::params(value),
                _ => {
                    log::debug!("skipping multipart part without form-data disposition");
                    self.read_part(conn, &body_options, &mut remaining).await?;
                    continue;
                }
            };

            let Some(name) = params.get("name").cloned() else {
                log::debug!("skipping multipart part without a name");
                self.read_part(conn, &body_options, &mut remaining).await?;
                continue;
            };

            match params.get("filename") {
                // a file input submitted without a file
                Some(filename) if filename.is_empty() => {
                    self.read_part(conn, &body_options, &mut remaining).await?;
                }
                Some(filename) => {
                    let content_type = headers
                        .iter()
                        .find(|(name, _)| name == "content-type")
                        .map(|(_, value)| value.clone());
                    let path = self.store_part(conn, &body_options, &mut remaining).await?;
                    let upload = Upload { path, content_type, filename: filename.clone() };
                    decoder.push(&name, Value::File(upload));
                }
                None => {
                    let body = self.read_part(conn, &body_options, &mut remaining).await?;
                    decoder.push(&name, Value::String(self.text(&body)?));
                }
            }
        }

        Ok(decoder.finish())
    }

    fn text(&self, body: &[u8]) -> Result<String, ConnError> {
        let DecodeOptions { utf8, status } = &self.options.query;
        match utf8 {
            Utf8::Lossy => Ok(String::from_utf8_lossy(body).into_owned()),
            Utf8::Reject => match std::str::from_utf8(body) {
                Ok(text) => Ok(text.to_owned()),
                Err(_) => Err(InvalidQuery::new("invalid UTF-8 on multipart body", *status).into()),
            },
        }
    }

    /// Read a whole part body, counting it against the remaining length.
    async fn read_part<A: Adapter>(
        &self,
        conn: &mut Conn<A>,
        options: &ReadOptions,
        remaining: &mut usize,
    ) -> Result<Bytes, ConnError> {
        let mut body = Vec::new();
        loop {
            let (chunk, done) = match conn.read_part_body(options).await? {
                Read::Ok(chunk) => (chunk, true),
                Read::More(chunk) => (chunk, false),
            };
            consume(remaining, chunk.len())?;
            body.extend_from_slice(&chunk);
            if done {
                return Ok(body.into());
            }
        }
    }

    /// Stream a part body into a new upload file.
    async fn store_part<A: Adapter>(
        &self,
        conn: &mut Conn<A>,
        options: &ReadOptions,
        remaining: &mut usize,
    ) -> Result<std::path::PathBuf, ConnError> {
        let (path, mut file) = self.uploads.create().await.map_err(ConnError::Upload)?;
        loop {
            let (chunk, done) = match conn.read_part_body(options).await? {
                Read::Ok(chunk) => (chunk, true),
                Read::More(chunk) => (chunk, false),
            };
            consume(remaining, chunk.len())?;
            file.write_all(&chunk).await.map_err(ConnError::Upload)?;
            if done {
                file.flush().await.map_err(ConnError::Upload)?;
                return Ok(path);
            }
        }
    }
}

impl<A: Adapter, U: UploadStore> Plug<A> for Parsers<U> {
    type Future = BoxFuture<A>;

    fn call(&self, conn: Conn<A>) -> Self::Future {
        let parsers = self.clone();
        Box::pin(async move { parsers.parse(conn).await })
    }
}

fn is_form_data(disposition: &str) -> bool {
    let kind = disposition.split(';').next().unwrap_or_default();
    kind.trim().eq_ignore_ascii_case("form-data")
}

fn consume(remaining: &mut usize, len: usize) -> Result<(), ConnError> {
    match remaining.checked_sub(len) {
        Some(rest) => {
            *remaining = rest;
            Ok(())
        }
        None => Err(ConnError::RequestTooLarge),
    }
}
