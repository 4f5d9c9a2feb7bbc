//! Network-tier fetch error types.

use thiserror::Error;

/// Message used when a request cannot be built.
pub const BAD_URL_MESSAGE: &str = "Bad URL or nil.";

/// Why an image fetch failed.
///
/// `Display` yields exactly the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The input could not be turned into a valid request.
    #[error("{0}")]
    BadUrl(String),

    /// The connection or transport failed.
    #[error("{0}")]
    Transport(String),

    /// A response arrived with a non-2xx status.
    #[error("{0}")]
    BadResponse(String),
}

impl FetchError {
    /// Creates the default bad URL error.
    #[must_use]
    pub fn bad_url() -> Self {
        Self::BadUrl(BAD_URL_MESSAGE.to_string())
    }

    /// Creates a transport error carrying the transport's description.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a bad response error for the given status code.
    #[must_use]
    pub fn bad_response(status: u16) -> Self {
        Self::BadResponse(format!("Bad response.\nStatus code: {status}"))
    }

    /// Returns the user-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::BadUrl(message) | Self::Transport(message) | Self::BadResponse(message) => {
                message
            }
        }
    }

    /// Returns whether the request itself was invalid.
    #[must_use]
    pub const fn is_bad_url(&self) -> bool {
        matches!(self, Self::BadUrl(_))
    }

    /// Returns whether the server answered with a non-success status.
    #[must_use]
    pub const fn is_bad_response(&self) -> bool {
        matches!(self, Self::BadResponse(_))
    }
}
