//! Core Twitter API utilities.
//!
//! This module contains the HTTP transport seam used by the posting client,
//! the default `reqwest` implementation, the retry pause strategy, and helpers
//! shared by every outbound call.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::error::{TwitterError, TwitterResult};

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// This function:
/// - Truncates long text to prevent log flooding
/// - Replaces control characters that could manipulate log output
/// - Escapes newlines to prevent log injection
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_len`: Maximum number of characters before truncation
///
/// # Returns
///
/// A sanitized string safe for logging
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    // Replace control characters and newlines to prevent log injection
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' => ' ',
            '\r' => ' ',
            '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        format!(
            "{}... [truncated, {} total bytes]",
            sanitized.chars().take(max_len).collect::<String>(),
            text.len()
        )
    } else {
        sanitized
    }
}

/// A buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Value of the `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The HTTP operations the posting client needs.
///
/// Implementations are shared between concurrent callers, so they must be
/// `Send + Sync`. A response with a non-success status is still `Ok`; only
/// failures to complete the exchange are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a GET request, optionally with an `Authorization` header.
    async fn get(&self, url: &str, authorization: Option<&str>) -> TwitterResult<TransportResponse>;

    /// Sends an unauthenticated GET request, reading at most `max_len` body bytes.
    ///
    /// Returns `Err(TwitterError::TooLarge)` as soon as the declared or
    /// received length goes past `max_len`.
    async fn download(&self, url: &str, max_len: usize) -> TwitterResult<TransportResponse>;

    /// Sends a POST request with an `application/x-www-form-urlencoded` body.
    async fn post_form(
        &self,
        url: &str,
        authorization: &str,
        body: String,
    ) -> TwitterResult<TransportResponse>;

    /// Sends a POST request with a single-part `multipart/form-data` body.
    async fn post_multipart(
        &self,
        url: &str,
        authorization: &str,
        field: &str,
        data: Vec<u8>,
        media_type: &str,
    ) -> TwitterResult<TransportResponse>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the site's `User-Agent` and the given timeout.
    pub fn new(timeout: Duration) -> TwitterResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("costello-site/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn authorized(
        builder: reqwest::RequestBuilder,
        authorization: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match authorization {
            Some(value) => builder
                .header(AUTHORIZATION, format!("OAuth {}", value))
                .header(ACCEPT, "application/json"),
            None => builder,
        }
    }

    async fn buffer(
        mut response: reqwest::Response,
        max_len: Option<usize>,
    ) -> TwitterResult<TransportResponse> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match max_len {
            None => response.bytes().await?.to_vec(),
            Some(limit) => {
                if response.content_length().is_some_and(|length| length > limit as u64) {
                    return Err(TwitterError::TooLarge { limit });
                }

                let mut body = Vec::new();
                while let Some(chunk) = response.chunk().await? {
                    if body.len() + chunk.len() > limit {
                        return Err(TwitterError::TooLarge { limit });
                    }
                    body.extend_from_slice(&chunk);
                }
                body
            }
        };

        debug!("Received {} ({} bytes)", status, body.len());

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, authorization: Option<&str>) -> TwitterResult<TransportResponse> {
        debug!("GET {}", url);
        let response = Self::authorized(self.client.get(url), authorization)
            .send()
            .await?;
        Self::buffer(response, None).await
    }

    async fn download(&self, url: &str, max_len: usize) -> TwitterResult<TransportResponse> {
        debug!("GET {} (at most {} bytes)", url, max_len);
        let response = self.client.get(url).send().await?;
        Self::buffer(response, Some(max_len)).await
    }

    async fn post_form(
        &self,
        url: &str,
        authorization: &str,
        body: String,
    ) -> TwitterResult<TransportResponse> {
        debug!("POST {} ({} byte form)", url, body.len());
        let response = Self::authorized(self.client.post(url), Some(authorization))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        Self::buffer(response, None).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        authorization: &str,
        field: &str,
        data: Vec<u8>,
        media_type: &str,
    ) -> TwitterResult<TransportResponse> {
        debug!("POST {} ({} byte {} part)", url, data.len(), media_type);
        let part = reqwest::multipart::Part::bytes(data).mime_str(media_type)?;
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);
        let response = Self::authorized(self.client.post(url), Some(authorization))
            .multipart(form)
            .send()
            .await?;
        Self::buffer(response, None).await
    }
}

/// Suspends the caller between retry attempts.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// [`Pause`] implemented with `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs `future` unless `cancel` fires first, in which case `Cancelled` is returned.
pub(crate) async fn cancellable<F, T>(cancel: &CancellationToken, future: F) -> TwitterResult<T>
where
    F: Future<Output = TwitterResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TwitterError::Cancelled),
        result = future => result,
    }
}
