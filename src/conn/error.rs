use http::StatusCode;
use std::{borrow::Cow, io};

use crate::{
    adapter::AdapterError,
    headers::InvalidHeader,
    multipart::MultipartError,
    query::InvalidQuery,
};

/// Errors returned by connection operations.
#[derive(thiserror::Error, Debug)]
pub enum ConnError {
    /// The response was already sent, or is being sent.
    #[error("the response was already sent")]
    AlreadySent,
    /// An operation was called in a state it does not support.
    #[error("{0}")]
    Argument(Cow<'static, str>),
    #[error(transparent)]
    InvalidHeader(#[from] InvalidHeader),
    #[error(transparent)]
    InvalidQuery(#[from] InvalidQuery),
    /// A response cookie serialized beyond the cookie size limit.
    #[error("cookie {name:?} exceeds maximum size of 4096 bytes, got {size}")]
    CookieOverflow { name: String, size: usize },
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    /// The request body exceeds the configured length.
    #[error("request body is too large")]
    RequestTooLarge,
    /// The request content type is not handled by any parser.
    #[error("unsupported media type {0:?}")]
    UnsupportedMediaType(String),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// Writing an uploaded file failed.
    #[error("failed to store upload: {0}")]
    Upload(io::Error),
}

impl ConnError {
    pub(crate) fn argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Argument(message.into())
    }

    /// Returns the status code a response for this error should carry.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidHeader(err) => err.status(),
            Self::InvalidQuery(err) => err.status(),
            Self::Multipart(err) => err.status(),
            Self::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Adapter(AdapterError::Timeout) => StatusCode::REQUEST_TIMEOUT,
            Self::AlreadySent
            | Self::Argument(_)
            | Self::CookieOverflow { .. }
            | Self::Adapter(_)
            | Self::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
