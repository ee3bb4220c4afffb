//! Configuration module for the site.
//!
//! This module contains configuration structures and environment variable handling
//! for the Twitter/X API integration and the API token allow-list.

use log::{debug, error, info, warn};
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::oauth::OAuthCredentials;

/// Default Twitter API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com/";

/// Default Twitter media upload base URL.
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://upload.twitter.com/";

/// Default timeout for outbound requests, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API tokens shorter than this are ignored.
const MIN_API_TOKEN_LENGTH: usize = 10;

/// Errors raised while loading configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable was not set or was empty
    #[error("Missing {0} environment variable")]
    Missing(&'static str),

    /// A variable was set to a value that could not be used
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Masks a secret for logging, keeping at most the first and last 4 characters.
///
/// # Example
///
/// ```rust
/// use costello_site::config::mask_secret;
///
/// assert_eq!(mask_secret("abcdefghijklmnop"), "abcd...mnop");
/// assert_eq!(mask_secret("short"), "***");
/// ```
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();

    if chars.len() > 12 {
        let prefix: String = chars[..4].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

/// Configuration struct for Twitter/X API credentials.
///
/// Holds the OAuth 1.0a consumer and access token credentials used to sign
/// requests to the v1.1 endpoints, plus the endpoint base URLs and timeout.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// Consumer and access token credentials
    pub credentials: OAuthCredentials,
    /// Base URL for the status endpoints
    pub api_base_url: Url,
    /// Base URL for the media upload endpoint
    pub upload_base_url: Url,
    /// Timeout applied to every outbound request
    pub timeout: Duration,
}

impl TwitterConfig {
    /// Creates a new `TwitterConfig` instance by loading credentials from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `xapi_consumer_key`: Twitter API consumer key
    /// - `xapi_consumer_secret`: Twitter API consumer secret
    /// - `xapi_access_token`: Access token of the posting account
    /// - `xapi_access_token_secret`: Access token secret of the posting account
    ///
    /// # Optional Environment Variables
    ///
    /// - `xapi_api_base_url`: Overrides `https://api.twitter.com/`
    /// - `xapi_upload_base_url`: Overrides `https://upload.twitter.com/`
    /// - `xapi_timeout_secs`: Request timeout in seconds (defaults to 30)
    ///
    /// # Returns
    ///
    /// - `Ok(TwitterConfig)`: If all required variables are present
    /// - `Err(ConfigError)`: If a variable is missing or invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading Twitter configuration from environment variables");
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => {
                    debug!("{} (masked): {}", name, mask_secret(&value));
                    Ok(value)
                }
                _ => {
                    error!("Make sure {} environment variable is set", name);
                    Err(ConfigError::Missing(name))
                }
            }
        };

        let credentials = OAuthCredentials::new(
            required("xapi_consumer_key")?,
            required("xapi_consumer_secret")?,
            required("xapi_access_token")?,
            required("xapi_access_token_secret")?,
        );

        let api_base_url = parse_base_url(
            "xapi_api_base_url",
            lookup("xapi_api_base_url").as_deref(),
            DEFAULT_API_BASE_URL,
        )?;
        let upload_base_url = parse_base_url(
            "xapi_upload_base_url",
            lookup("xapi_upload_base_url").as_deref(),
            DEFAULT_UPLOAD_BASE_URL,
        )?;

        let timeout = match lookup("xapi_timeout_secs") {
            Some(value) => {
                let seconds: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "xapi_timeout_secs",
                    reason: format!("'{}' is not a number of seconds", value),
                })?;
                if seconds == 0 {
                    return Err(ConfigError::Invalid {
                        name: "xapi_timeout_secs",
                        reason: "timeout must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(seconds)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        info!(
            "Twitter configuration loaded successfully (api: {}, upload: {}, timeout: {}s)",
            api_base_url,
            upload_base_url,
            timeout.as_secs()
        );

        Ok(TwitterConfig {
            credentials,
            api_base_url,
            upload_base_url,
            timeout,
        })
    }
}

/// Parses an optional base URL, ensuring it ends with `/` so relative joins keep its path.
fn parse_base_url(
    name: &'static str,
    value: Option<&str>,
    default: &str,
) -> Result<Url, ConfigError> {
    let raw = match value {
        Some(value) if !value.trim().is_empty() => value.trim(),
        _ => default,
    };

    let mut url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Allow-list of bearer tokens accepted by the authenticated API endpoints.
#[derive(Clone, Default)]
pub struct ApiTokens {
    tokens: Vec<String>,
}

impl ApiTokens {
    /// Builds the allow-list, dropping empty or too-short tokens with a warning.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut accepted = Vec::new();

        for token in tokens {
            let token = token.into().trim().to_string();
            if token.is_empty() {
                continue;
            }
            if token.len() < MIN_API_TOKEN_LENGTH {
                warn!(
                    "Ignoring API token {} - tokens must be at least {} characters",
                    mask_secret(&token),
                    MIN_API_TOKEN_LENGTH
                );
                continue;
            }
            accepted.push(token);
        }

        ApiTokens { tokens: accepted }
    }

    /// Loads the comma-separated `API_TOKENS` environment variable.
    pub fn from_env() -> Self {
        match env::var("API_TOKENS") {
            Ok(value) => {
                let tokens = Self::new(value.split(','));
                info!("Loaded {} API token(s)", tokens.len());
                tokens
            }
            Err(_) => {
                info!("No API_TOKENS found in environment variables - authenticated endpoints will reject all requests");
                Self::default()
            }
        }
    }

    /// Whether `token` exactly matches one of the configured tokens.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for ApiTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTokens")
            .field("count", &self.tokens.len())
            .finish()
    }
}

/// Gets the server port from environment variables or returns the default.
///
/// This function reads the `PORT` environment variable and parses it as a u16.
/// If the environment variable is not set or cannot be parsed, it defaults to 3000.
///
/// # Returns
///
/// The port number as a u16.
///
/// # Example
///
/// ```rust
/// use costello_site::get_server_port;
///
/// let port = get_server_port();
/// assert!(port > 0);
/// ```
pub fn get_server_port() -> u16 {
    match env::var("PORT") {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("PORT '{}' is not a valid port number, using 3000", value);
            3000
        }),
        Err(_) => 3000,
    }
}
