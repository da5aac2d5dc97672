//! Incremental `multipart/*` parser.
//!
//! The parser never performs io. Each function takes the currently buffered bytes and the
//! boundary token, and reports an outcome that tells the caller whether a result is available or
//! more bytes are required. Calling it again with a longer buffer is always safe.
//!
//! ```
//! use bytes::Bytes;
//! use plume::multipart::{HeadersOutcome, parse_headers};
//!
//! let buf = Bytes::from_static(b"--B\r\nContent-Type: text/plain\r\n\r\nhello");
//! let HeadersOutcome::Headers(headers, rest) = parse_headers(&buf, b"B") else {
//!     unreachable!()
//! };
//! assert_eq!(headers, [("content-type".to_owned(), "text/plain".to_owned())]);
//! assert_eq!(rest, "hello");
//! ```
use bytes::Bytes;
use http::StatusCode;

use crate::matches::find;


/// Outcome of [`parse_headers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadersOutcome {
    /// A complete header block, with the bytes following it.
    Headers(Vec<(String, String)>, Bytes),
    /// A delimiter is found but its header block is incomplete, keep the buffer as is.
    NeedMore,
    /// No delimiter is found, only the contained bytes need to be kept.
    NeedMoreRetain(Bytes),
    /// The closing delimiter is found, with the epilogue following it.
    Done(Bytes),
}

/// Outcome of [`parse_body`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyOutcome {
    /// Part of the body, more is following in `rest` or in the next read.
    Chunk {
        body: Bytes,
        rest: Bytes,
    },
    /// The last bytes of the body, `rest` starts at the next delimiter.
    Done {
        body: Bytes,
        rest: Bytes,
    },
}

/// Malformed multipart body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    /// The request body ended before the closing delimiter.
    #[error("invalid multipart, body terminated too soon")]
    TerminatedTooSoon,
    /// A part header block exceeds the read length.
    #[error("multipart part headers exceed {0} bytes")]
    HeadersTooLarge(usize),
}

impl MultipartError {
    /// Returns the status code a response for this error should carry.
    pub const fn status(&self) -> StatusCode {
        match self {
            MultipartError::TerminatedTooSoon => StatusCode::BAD_REQUEST,
            MultipartError::HeadersTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Bytes that may hold an incomplete `\r\n--boundary` and must be kept for the next parse.
#[inline]
const fn margin(boundary: &[u8]) -> usize {
    boundary.len() + 3
}

/// Parse the headers of the next part.
///
/// Any preamble before the first delimiter is skipped.
pub fn parse_headers(buffer: &Bytes, boundary: &[u8]) -> HeadersOutcome {
    let mut buffer = buffer.clone();

    loop {
        if let Some(after) = strip_delimiter(&buffer, boundary) {
            if after.starts_with(b"--") {
                let epilogue = buffer.len() - after.len() + 2;
                return HeadersOutcome::Done(buffer.slice(epilogue..));
            }

            let start = buffer.len() - after.len();
            let Some(end) = find(after, b"\r\n\r\n") else {
                return HeadersOutcome::NeedMore;
            };

            let headers = parse_header_block(&after[..end]);
            return HeadersOutcome::Headers(headers, buffer.slice(start + end + 4..));
        }

        match find_delimiter(&buffer, boundary) {
            Some(pos) => buffer = buffer.slice(pos + 2..),
            None => {
                let keep = buffer.len().min(margin(boundary));
                return HeadersOutcome::NeedMoreRetain(buffer.slice(buffer.len() - keep..));
            }
        }
    }
}

/// Parse the body of the current part.
pub fn parse_body(buffer: &Bytes, boundary: &[u8]) -> BodyOutcome {
    if strip_delimiter(buffer, boundary).is_some() {
        return BodyOutcome::Done { body: Bytes::new(), rest: buffer.clone() };
    }

    if let Some(pos) = find_delimiter(buffer, boundary) {
        return BodyOutcome::Done {
            body: buffer.slice(..pos),
            rest: buffer.slice(pos + 2..),
        };
    }

    let margin = margin(boundary);
    if buffer.len() <= margin {
        return BodyOutcome::Chunk { body: Bytes::new(), rest: buffer.clone() };
    }

    let split = buffer.len() - margin;
    BodyOutcome::Chunk {
        body: buffer.slice(..split),
        rest: buffer.slice(split..),
    }
}

/// Returns the bytes after a leading `--boundary`.
fn strip_delimiter<'a>(buffer: &'a [u8], boundary: &[u8]) -> Option<&'a [u8]> {
    buffer.strip_prefix(b"--")?.strip_prefix(boundary)
}

/// Returns the offset of the first `\r\n--boundary`.
fn find_delimiter(buffer: &[u8], boundary: &[u8]) -> Option<usize> {
    let mut delimiter = Vec::with_capacity(boundary.len() + 4);
    delimiter.extend_from_slice(b"\r\n--");
    delimiter.extend_from_slice(boundary);
    find(buffer, &delimiter)
}

/// Parse the lines following a delimiter line.
///
/// The first line holds the rest of the delimiter line and is ignored. Names are lowercased,
/// names and values are trimmed and continuation lines are folded into the previous value.
fn parse_header_block(block: &[u8]) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in block.split(|&b| b == b'\n').skip(1) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let line = String::from_utf8_lossy(line);

        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                let folded = line.trim();
                if !folded.is_empty() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(folded);
                }
            }
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_owned()));
    }

    headers
}
