//! # Costello Site Library
//!
//! Backend of a personal website: a small JSON API, a few developer tools, and
//! a client for posting to Twitter/X using OAuth 1.0a request signatures.
//!
//! ## Features
//!
//! - OAuth 1.0a HMAC-SHA1 `Authorization` header generation
//! - Twitter status posting with an optional image, with retries
//! - JSON time API and GUID, hash, and machine key generators
//! - API token authorization for the posting endpoint
//! - Structured logging
//! - Health check endpoint
//!
//! ## Configuration
//!
//! - `xapi_consumer_key`, `xapi_consumer_secret`, `xapi_access_token`,
//!   `xapi_access_token_secret`: Twitter credentials (posting is disabled without them)
//! - `API_TOKENS`: Comma-separated bearer tokens accepted by `POST /api/tweet`
//! - `PORT`: Server port (defaults to 3000)
//!
//! ## API Endpoints
//!
//! - `GET /health`: Returns service health status
//! - `GET /api/time`: Returns the current time in several formats
//! - `POST /api/tweet`: Posts a status to Twitter/X
//! - `POST /tools/guid`: Generates a GUID
//! - `POST /tools/hash`: Hashes some plaintext
//! - `POST /tools/machinekey`: Generates an ASP.NET machine key

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod routes;
pub mod state;
pub mod tools;
pub mod twitter;

// Re-export commonly used types and functions
pub use config::{get_server_port, ApiTokens, TwitterConfig};
pub use error::ApiError;
pub use oauth::{generate_header_value, OAuthCredentials};
pub use routes::create_app;
pub use state::AppState;
pub use twitter::{TwitterClient, TwitterError, TwitterResult};
