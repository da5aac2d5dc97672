use http::StatusCode;

/// Malformed urlencoded input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidQuery {
    message: String,
    status: StatusCode,
}

impl InvalidQuery {
    pub(crate) fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self { message: message.into(), status }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the status code a response for this error should carry.
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

/// A value that cannot be represented with the bracket grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Only maps can be encoded at the top level.
    #[error("expected a map at the top level")]
    NotAMap,
    /// A map inside a list must produce exactly one pair to decode back into one element.
    #[error("cannot encode maps inside lists when the map has 0 or more than 1 element, got one at {0:?}")]
    MapInList(String),
    /// Every `key[][]` pair decodes into a new inner list.
    #[error("cannot encode lists directly inside lists, got one at {0:?}")]
    ListInList(String),
    /// Uploaded files have no urlencoded representation.
    #[error("cannot encode an uploaded file, got one at {0:?}")]
    File(String),
}
