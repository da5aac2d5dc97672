//! Request body reading.
use bytes::Bytes;
use std::time::Duration;

use crate::{
    adapter::{Adapter, AdapterError},
    log,
};

/// Limits of a body read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum bytes returned by one call, `8_000_000` by default.
    pub length: usize,
    /// Maximum bytes requested from the adapter per underlying read, `1_000_000` by default.
    pub read_length: usize,
    /// Timeout of each underlying read, 15 seconds by default.
    pub read_timeout: Duration,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            length: 8_000_000,
            read_length: 1_000_000,
            read_timeout: Duration::from_secs(15),
        }
    }
}

impl ReadOptions {
    /// Defaults used while reading multipart headers.
    pub fn part_headers() -> Self {
        Self {
            length: 64_000,
            read_length: 64_000,
            read_timeout: Duration::from_secs(5),
        }
    }

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
}

/// Result of a body read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Read {
    /// The body is fully consumed.
    Ok(Bytes),
    /// Partial body, more is available by reading again.
    More(Bytes),
}

impl Read {
    /// Returns the read bytes.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Read::Ok(bytes) | Read::More(bytes) => bytes,
        }
    }

    /// Returns `true` if the body is fully consumed.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Read::Ok(_))
    }
}

/// Read from the adapter until `options.length` bytes are collected or the body ends.
///
/// Every underlying read is bounded by `options.read_length` and `options.read_timeout`.
pub(crate) async fn read<A: Adapter>(
    adapter: &mut A,
    options: &ReadOptions,
) -> Result<Read, AdapterError> {
    let mut buffer = Bytes::new();

    loop {
        let step = ReadOptions {
            length: options.read_length.min(options.length.saturating_sub(buffer.len())).max(1),
            ..options.clone()
        };
        let read = match tokio::time::timeout(options.read_timeout, adapter.read_req_body(&step)).await
        {
            Ok(read) => read?,
            Err(_) => {
                log::warning!("request body read timed out after {:?}", options.read_timeout);
                return Err(AdapterError::Timeout);
            }
        };

        let done = read.is_ok();
        let bytes = read.into_bytes();
        let stalled = bytes.is_empty();
        buffer = crate::common::concat(buffer, bytes);

        if done {
            return Ok(Read::Ok(buffer));
        }
        if stalled || buffer.len() >= options.length {
            return Ok(Read::More(buffer));
        }
    }
}

/// Multipart reading state, kept in the connection private storage.
#[derive(Debug, Clone)]
pub(crate) enum Cursor {
    Active { boundary: Bytes, buffer: Bytes },
    Done,
}
