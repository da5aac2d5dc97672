use bytes::{Bytes, BytesMut};

use super::{Conn, ConnError};
use crate::{
    adapter::{Adapter, AdapterError},
    body::{self, Cursor, Read, ReadOptions},
    common::concat,
    log,
    multipart::{self, BodyOutcome, HeadersOutcome, MultipartError},
    utils,
};

/// Result of [`Conn::read_part_headers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartHeaders {
    /// Headers of the next part, names are lowercased.
    Headers(Vec<(String, String)>),
    /// The closing delimiter is reached.
    Done,
}

impl<A: Adapter> Conn<A> {
    /// Read the request body.
    ///
    /// Returns [`Read::Ok`] once the body is fully consumed, or [`Read::More`] when
    /// `options.length` bytes are read and more are available.
    pub async fn read_body(&mut self, options: &ReadOptions) -> Result<Read, AdapterError> {
        body::read(&mut self.adapter, options).await
    }

    /// Read the headers of the next multipart part.
    ///
    /// The boundary is taken from the `content-type` request header on first use. Any unread
    /// body of the previous part must be consumed with [`read_part_body`] first. A header block
    /// longer than `options.length` fails with [`MultipartError::HeadersTooLarge`].
    ///
    /// [`read_part_body`]: Conn::read_part_body
    pub async fn read_part_headers(&mut self, options: &ReadOptions) -> Result<PartHeaders, ConnError> {
        let (boundary, mut buffer) = match self.multipart_cursor()? {
            Cursor::Active { boundary, buffer } => (boundary, buffer),
            Cursor::Done => {
                self.private.insert(Cursor::Done);
                return Ok(PartHeaders::Done);
            }
        };

        loop {
            match multipart::parse_headers(&buffer, &boundary) {
                HeadersOutcome::Headers(headers, rest) => {
                    self.private.insert(Cursor::Active { boundary, buffer: rest });
                    return Ok(PartHeaders::Headers(headers));
                }
                HeadersOutcome::Done(_) => {
                    self.private.insert(Cursor::Done);
                    return Ok(PartHeaders::Done);
                }
                HeadersOutcome::NeedMore if buffer.len() > options.length => {
                    log::warning!("multipart part headers exceed {} bytes", options.length);
                    self.private.insert(Cursor::Done);
                    return Err(MultipartError::HeadersTooLarge(options.length).into());
                }
                HeadersOutcome::NeedMore => {}
                HeadersOutcome::NeedMoreRetain(tail) => buffer = tail,
            }

            match self.read_part_data(options).await {
                Ok(data) => buffer = concat(buffer, data),
                Err(err) => {
                    self.private.insert(Cursor::Active { boundary, buffer });
                    return Err(err);
                }
            }
        }
    }

    /// Read the body of the current multipart part.
    ///
    /// Returns [`Read::Ok`] when the part ends, or [`Read::More`] when more than
    /// `options.length` bytes are collected. In that case calling it again continues the same
    /// part.
    pub async fn read_part_body(&mut self, options: &ReadOptions) -> Result<Read, ConnError> {
        let (boundary, mut buffer) = match self.multipart_cursor()? {
            Cursor::Active { boundary, buffer } => (boundary, buffer),
            Cursor::Done => {
                self.private.insert(Cursor::Done);
                return Ok(Read::Ok(Bytes::new()));
            }
        };

        let mut body = BytesMut::new();

        loop {
            match multipart::parse_body(&buffer, &boundary) {
                BodyOutcome::Done { body: chunk, rest } => {
                    body.extend_from_slice(&chunk);
                    self.private.insert(Cursor::Active { boundary, buffer: rest });
                    return Ok(Read::Ok(body.freeze()));
                }
                BodyOutcome::Chunk { body: chunk, rest } => {
                    body.extend_from_slice(&chunk);
                    buffer = rest;
                }
            }

            if body.len() > options.length {
                self.private.insert(Cursor::Active { boundary, buffer });
                return Ok(Read::More(body.freeze()));
            }

            match self.read_part_data(options).await {
                Ok(data) => buffer = concat(buffer, data),
                Err(err) => {
                    // keep the collected body unconsumed
                    let buffer = concat(body.freeze(), buffer);
                    self.private.insert(Cursor::Active { boundary, buffer });
                    return Err(err);
                }
            }
        }
    }

    /// Take the multipart cursor out of the private storage, creating it on first use.
    fn multipart_cursor(&mut self) -> Result<Cursor, ConnError> {
        if let Some(cursor) = self.private.remove::<Cursor>() {
            return Ok(cursor);
        }

        let media = self
            .req_headers
            .get("content-type")
            .and_then(utils::content_type)
            .ok_or_else(|| ConnError::argument("multipart request requires a content-type header"))?;

        if media.kind != "multipart" {
            return Err(ConnError::argument("content-type is not a multipart media type"));
        }

        let boundary = media
            .param("boundary")
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ConnError::argument("multipart content-type requires a boundary"))?;

        Ok(Cursor::Active {
            boundary: Bytes::copy_from_slice(boundary.as_bytes()),
            buffer: Bytes::new(),
        })
    }

    async fn read_part_data(&mut self, options: &ReadOptions) -> Result<Bytes, ConnError> {
        let data = self.read_body(options).await?.into_bytes();
        if data.is_empty() {
            log::warning!("multipart body terminated before the closing delimiter");
            return Err(MultipartError::TerminatedTooSoon.into());
        }
        Ok(data)
    }
}
