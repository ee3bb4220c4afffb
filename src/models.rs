//! JSON request and response bodies for the HTTP API.
//!
//! All bodies use camelCase property names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned to every request by the response header middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Current time in the formats served by `GET /api/time`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeResponse {
    /// e.g. `Sat, 07 Mar 2015 09:05:01 GMT`
    pub rfc1123: String,
    /// e.g. `Saturday, 07 March 2015 09:05:01`
    pub universal_full: String,
    /// e.g. `2015-03-07 09:05:01Z`
    pub universal_sortable: String,
    /// Seconds since the UNIX epoch
    pub unix: i64,
}

impl TimeResponse {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            rfc1123: now.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            universal_full: now.format("%A, %d %B %Y %H:%M:%S").to_string(),
            universal_sortable: now.format("%Y-%m-%d %H:%M:%SZ").to_string(),
            unix: now.timestamp(),
        }
    }
}

/// Machine-readable error codes returned in [`ErrorDetail`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    Exists,
    Forbidden,
    InternalError,
    InvalidParameter,
    MissingParameter,
    NoRequestBody,
    NotFound,
    NotImplemented,
    ServiceUnavailable,
    Timeout,
    Unauthorized,
    UpstreamError,
}

/// Body returned for every API error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub error_code: ErrorCode,
    pub reason: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateGuidRequest {
    pub format: Option<String>,
    #[serde(default)]
    pub uppercase: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateGuidResponse {
    pub guid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateHashRequest {
    #[serde(alias = "algorithm")]
    pub hash_name: Option<String>,
    pub format: Option<String>,
    pub plaintext: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateHashResponse {
    pub hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMachineKeyRequest {
    #[serde(alias = "decryptionAlgorithm")]
    pub decryption_algorithm_name: Option<String>,
    #[serde(alias = "validationAlgorithm")]
    pub validation_algorithm_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateMachineKeyResponse {
    pub tag: String,
}

/// Body of `POST /api/tweet`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetRequest {
    pub text: String,
    pub image_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetResponse {
    pub id: u64,
}
