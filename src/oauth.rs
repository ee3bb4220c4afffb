//! OAuth 1.0a request signing for the Twitter/X API.
//!
//! Twitter requires OAuth 1.0a signatures for user-context requests against the
//! v1.1 endpoints. This module builds the value of the `Authorization` header
//! following the "authorizing requests" and "creating signatures" documents:
//! every parameter (query, form body, and the `oauth_*` fields themselves) is
//! percent-encoded, sorted, and signed with HMAC-SHA1.
//!
//! Signing is pure computation. Nonce and timestamp can be injected through
//! [`generate_header_value_with`] so signatures are reproducible in tests.

use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use log::debug;
use sha1::Sha1;
use url::Url;

use crate::twitter::{TwitterError, TwitterResult};

/// The only signature method supported by this module.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// The OAuth protocol version sent with every request.
pub const OAUTH_VERSION: &str = "1.0";

/// Number of random bytes used to build a nonce.
const NONCE_LENGTH: usize = 16;

/// Consumer and access token credentials used to sign requests.
///
/// The credentials are supplied by configuration and are never persisted.
/// The `Debug` implementation masks the secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The consumer (API) key
    pub consumer_key: String,
    /// The consumer (API) secret
    pub consumer_secret: String,
    /// The access token of the user the requests are made for
    pub access_token: String,
    /// The access token secret
    pub access_token_secret: String,
}

impl OAuthCredentials {
    /// Creates a new set of credentials.
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }

    /// Fails with [`TwitterError::InvalidArgument`] if any value is empty.
    pub fn validate(&self) -> TwitterResult<()> {
        let fields = [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(TwitterError::InvalidArgument(format!(
                    "OAuth credential '{}' was not specified",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &crate::config::mask_secret(&self.consumer_key))
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &crate::config::mask_secret(&self.access_token))
            .field("access_token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Per-header OAuth values. Created for one signature and then dropped.
struct AuthorizationContext<'a> {
    credentials: &'a OAuthCredentials,
    nonce: String,
    timestamp: String,
}

impl AuthorizationContext<'_> {
    /// The `oauth_*` protocol parameters, excluding the signature.
    fn protocol_parameters(&self) -> [(&'static str, &str); 6] {
        [
            ("oauth_consumer_key", self.credentials.consumer_key.as_str()),
            ("oauth_nonce", self.nonce.as_str()),
            ("oauth_signature_method", SIGNATURE_METHOD),
            ("oauth_timestamp", self.timestamp.as_str()),
            ("oauth_token", self.credentials.access_token.as_str()),
            ("oauth_version", OAUTH_VERSION),
        ]
    }
}

/// Percent-encodes a string according to RFC 3986.
///
/// Only the unreserved characters (`A-Z`, `a-z`, `0-9`, `-`, `.`, `_`, `~`)
/// are left as-is; everything else is encoded from its UTF-8 bytes.
///
/// # Example
///
/// ```rust
/// use costello_site::oauth::percent_encode;
///
/// assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
/// ```
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Generates a random nonce of 32 lowercase hexadecimal characters.
pub fn generate_nonce() -> TwitterResult<String> {
    let mut bytes = [0u8; NONCE_LENGTH];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| TwitterError::OAuth(format!("Failed to generate random nonce: {}", e)))?;
    Ok(hex::encode(bytes))
}

/// Returns the number of whole seconds since the UNIX epoch as a string.
pub fn current_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Removes the query string and fragment from an absolute URI.
///
/// Query parameters are signed separately, so they must not also appear in
/// the URI part of the signature base string.
pub fn normalize_uri(uri: &str) -> TwitterResult<String> {
    let mut url = Url::parse(uri).map_err(|e| {
        TwitterError::InvalidArgument(format!("'{}' is not an absolute URI: {}", uri, e))
    })?;

    if url.cannot_be_a_base() {
        return Err(TwitterError::InvalidArgument(format!(
            "'{}' is not a hierarchical URI",
            uri
        )));
    }

    url.set_query(None);
    url.set_fragment(None);
    Ok(url.into())
}

/// Builds the normalized parameter string: every name and value encoded,
/// sorted by ordinal name, joined as `name=value` pairs separated by `&`.
///
/// The `oauth_*` values overwrite any caller-supplied parameter of the same name.
fn normalized_parameters(parameters: &[(&str, &str)], context: &AuthorizationContext) -> String {
    let mut merged: BTreeMap<&str, &str> = parameters.iter().copied().collect();

    for (name, value) in context.protocol_parameters() {
        merged.insert(name, value);
    }

    merged
        .iter()
        .map(|(name, value)| format!("{}={}", percent_encode(name), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Builds the signature base string `METHOD&enc(uri)&enc(parameters)`.
pub fn signature_base_string(method: &str, normalized_uri: &str, parameter_string: &str) -> String {
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(normalized_uri),
        percent_encode(parameter_string)
    )
}

/// Builds the HMAC key `enc(consumer_secret)&enc(token_secret)`.
pub fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    )
}

/// Computes HMAC-SHA1 over `data` and returns the base64 representation.
fn hmac_sha1(key: &str, data: &str) -> TwitterResult<String> {
    type HmacSha1 = Hmac<Sha1>;

    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| TwitterError::OAuth(e.to_string()))?;

    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Generates an OAuth 1.0a `Authorization` header value with a fresh nonce
/// and the current timestamp.
///
/// # Parameters
///
/// - `method`: The HTTP method of the request (case-insensitive)
/// - `uri`: The absolute URI of the request; any query string is ignored
/// - `parameters`: All query string and form body parameters of the request
/// - `credentials`: The consumer and access token credentials
///
/// # Returns
///
/// - `Ok(String)`: The header value, without the `OAuth ` scheme prefix
/// - `Err(TwitterError::InvalidArgument)`: If the method, URI, or a credential is missing
///
/// # Example
///
/// ```rust
/// use costello_site::oauth::{generate_header_value, OAuthCredentials};
///
/// let credentials = OAuthCredentials::new("key", "secret", "token", "token-secret");
/// let header = generate_header_value(
///     "POST",
///     "https://api.twitter.com/1.1/statuses/update.json",
///     &[("status", "Hello")],
///     &credentials,
/// )
/// .unwrap();
///
/// assert!(header.starts_with("oauth_consumer_key=\"key\", oauth_nonce=\""));
/// assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
/// ```
pub fn generate_header_value(
    method: &str,
    uri: &str,
    parameters: &[(&str, &str)],
    credentials: &OAuthCredentials,
) -> TwitterResult<String> {
    generate_header_value_with(method, uri, parameters, credentials, None, None)
}

/// Generates an OAuth 1.0a `Authorization` header value, optionally using a
/// fixed nonce and timestamp.
///
/// With both `nonce` and `timestamp` supplied the output is fully deterministic.
/// `None` falls back to [`generate_nonce`] and [`current_timestamp`].
pub fn generate_header_value_with(
    method: &str,
    uri: &str,
    parameters: &[(&str, &str)],
    credentials: &OAuthCredentials,
    nonce: Option<&str>,
    timestamp: Option<&str>,
) -> TwitterResult<String> {
    if method.trim().is_empty() {
        return Err(TwitterError::InvalidArgument(
            "No HTTP method was specified".to_string(),
        ));
    }

    if uri.trim().is_empty() {
        return Err(TwitterError::InvalidArgument(
            "No URI was specified".to_string(),
        ));
    }

    credentials.validate()?;

    let context = AuthorizationContext {
        credentials,
        nonce: match nonce {
            Some(nonce) => nonce.to_string(),
            None => generate_nonce()?,
        },
        timestamp: timestamp.map_or_else(current_timestamp, str::to_string),
    };

    let normalized_uri = normalize_uri(uri)?;
    let parameter_string = normalized_parameters(parameters, &context);
    let base_string = signature_base_string(method, &normalized_uri, &parameter_string);
    let key = signing_key(&credentials.consumer_secret, &credentials.access_token_secret);
    let signature = hmac_sha1(&key, &base_string)?;

    debug!(
        "Signed {} request to {} with {} parameter(s)",
        method.to_uppercase(),
        normalized_uri,
        parameters.len()
    );

    let fields = [
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", context.nonce.as_str()),
        ("oauth_signature", signature.as_str()),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", context.timestamp.as_str()),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", OAUTH_VERSION),
    ];

    Ok(fields
        .iter()
        .map(|(name, value)| format!("{}=\"{}\"", name, percent_encode(value)))
        .collect::<Vec<_>>()
        .join(", "))
}

/// Extracts the raw (still percent-encoded) value of one field from a header
/// value produced by [`generate_header_value`].
pub fn header_field<'a>(header_value: &'a str, name: &str) -> Option<&'a str> {
    header_value
        .trim_start_matches("OAuth ")
        .split(", ")
        .filter_map(|pair| pair.split_once('='))
        .find(|(field, _)| *field == name)
        .map(|(_, value)| value.trim_matches('"'))
}
