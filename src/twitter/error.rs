//! Twitter-specific error types.

use thiserror::Error;

/// Errors raised by the OAuth signer and the Twitter posting client.
#[derive(Error, Debug)]
pub enum TwitterError {
    /// A caller supplied a missing or malformed argument. Never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// OAuth signature generation failed
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Twitter API returned a non-success status code
    #[error("Twitter API error ({status})")]
    Upstream { status: u16, body: String },

    /// A success response did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Request body could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A download was abandoned because its body exceeded the byte limit
    #[error("Response body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// Transport failure reported by a non-reqwest transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// The caller cancelled the operation
    #[error("Request cancelled")]
    Cancelled,
}

impl TwitterError {
    /// Whether the error represents a timeout or cancellation rather than a failure.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TwitterError {
    fn from(e: serde_json::Error) -> Self {
        TwitterError::UnexpectedResponse(e.to_string())
    }
}

/// Result type for Twitter operations.
pub type TwitterResult<T> = Result<T, TwitterError>;
