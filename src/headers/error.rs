//! Error types that can occur during header related operation.
use http::StatusCode;

/// An invalid header key or value given to a connection.
///
/// Headers are set by application code, so this is a programming error rather than a client
/// fault.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidHeader {
    /// Header key contains uppercase characters.
    #[error("header key is not lowercase: {0:?}")]
    Uppercase(String),
    /// Header value contains a carriage return or line feed.
    #[error("value for header {0:?} contains control feed (\\r) or newline (\\n)")]
    Newline(String),
}

impl InvalidHeader {
    /// Returns the status code a response for this error should carry.
    pub const fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
