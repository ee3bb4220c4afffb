//! Twitter/X API integration module.
//!
//! This module contains the client used to post statuses (with an optional
//! image) to the Twitter v1.1 API, authenticated with OAuth 1.0a request
//! signatures from [`crate::oauth`].

mod api;
mod client;
mod error;
mod media;
mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export public API
pub use api::{HttpTransport, Pause, ReqwestTransport, TokioPause, TransportResponse};
pub use client::{TwitterClient, MAX_POST_ATTEMPTS, RETRY_PAUSE};
pub use error::{TwitterError, TwitterResult};
pub use media::{ImagePayload, DEFAULT_MEDIA_TYPE, MAX_IMAGE_LENGTH};
pub use types::{MediaUploadResponse, PostedContent, StatusResponse, MAX_TWEET_LENGTH};

// Crate-internal re-exports (used by other modules)
pub(crate) use api::sanitize_for_logging;
