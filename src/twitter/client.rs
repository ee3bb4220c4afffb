//! Status posting client.
//!
//! Posts statuses (optionally with one image) to the v1.1 `statuses/update`
//! endpoint, retrying failed attempts a fixed number of times.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::api::{
    cancellable, sanitize_for_logging, HttpTransport, Pause, ReqwestTransport, TokioPause,
};
use super::error::{TwitterError, TwitterResult};
use super::types::{PostedContent, StatusResponse};
use crate::config::{TwitterConfig, DEFAULT_API_BASE_URL, DEFAULT_UPLOAD_BASE_URL};
use crate::oauth::{self, OAuthCredentials};

/// Number of times a status update is attempted before giving up.
pub const MAX_POST_ATTEMPTS: u32 = 5;

/// Delay between two status update attempts.
pub const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Client for posting to Twitter on behalf of a single account.
///
/// The client only holds immutable state and can be shared between tasks
/// behind an `Arc`.
pub struct TwitterClient {
    pub(super) credentials: OAuthCredentials,
    pub(super) transport: Arc<dyn HttpTransport>,
    pause: Arc<dyn Pause>,
    api_base: Url,
    pub(super) upload_base: Url,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base.as_str())
            .field("upload_base", &self.upload_base.as_str())
            .finish()
    }
}

fn parse_default(url: &str) -> TwitterResult<Url> {
    Url::parse(url).map_err(|e| TwitterError::InvalidArgument(format!("{}: {}", url, e)))
}

impl TwitterClient {
    /// Creates a client using the given transport and the public Twitter endpoints.
    ///
    /// # Returns
    ///
    /// - `Ok(TwitterClient)`: If every credential is present
    /// - `Err(TwitterError::InvalidArgument)`: If a credential is empty
    pub fn new(
        credentials: OAuthCredentials,
        transport: Arc<dyn HttpTransport>,
    ) -> TwitterResult<Self> {
        credentials.validate()?;

        Ok(Self {
            credentials,
            transport,
            pause: Arc::new(TokioPause),
            api_base: parse_default(DEFAULT_API_BASE_URL)?,
            upload_base: parse_default(DEFAULT_UPLOAD_BASE_URL)?,
        })
    }

    /// Creates a client backed by a [`ReqwestTransport`] built from `config`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use costello_site::{TwitterClient, TwitterConfig};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let config = TwitterConfig::from_env().unwrap();
    ///     let client = TwitterClient::from_config(&config).unwrap();
    ///     let id = client.post("Hello!", &CancellationToken::new()).await.unwrap();
    ///     println!("Posted {}", id);
    /// }
    /// ```
    pub fn from_config(config: &TwitterConfig) -> TwitterResult<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;

        Ok(Self::new(config.credentials.clone(), Arc::new(transport))?
            .with_base_urls(config.api_base_url.clone(), config.upload_base_url.clone()))
    }

    /// Replaces the strategy used to wait between retries.
    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    /// Points the client at different API and upload hosts.
    pub fn with_base_urls(mut self, api_base: Url, upload_base: Url) -> Self {
        self.api_base = api_base;
        self.upload_base = upload_base;
        self
    }

    pub(super) fn endpoint(base: &Url, path: &str) -> TwitterResult<String> {
        base.join(path)
            .map(String::from)
            .map_err(|e| TwitterError::InvalidArgument(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Posts a text-only status and returns its id.
    pub async fn post(&self, text: &str, cancel: &CancellationToken) -> TwitterResult<u64> {
        self.post_status(text, None, cancel).await
    }

    /// Posts a status with an image downloaded from `image_uri` and returns its id.
    ///
    /// If the image cannot be downloaded or uploaded the status is posted
    /// without it.
    pub async fn post_with_image(
        &self,
        text: &str,
        image_uri: &str,
        cancel: &CancellationToken,
    ) -> TwitterResult<u64> {
        self.post_status(text, Some(image_uri), cancel).await
    }

    /// Posts a status, optionally with an image, and returns its id.
    ///
    /// # Parameters
    ///
    /// - `text`: The status text; trimmed and truncated to 140 characters
    /// - `image_uri`: Absolute URI of an image to attach
    /// - `cancel`: Cancels any outstanding request or pause
    ///
    /// # Returns
    ///
    /// - `Ok(u64)`: The id of the created status
    /// - `Err(TwitterError::InvalidArgument)`: If `text` is blank or `image_uri` is not absolute
    /// - `Err(TwitterError::Upstream)`: If every attempt received a non-success status
    /// - `Err(TwitterError::UnexpectedResponse)`: If the success body has no numeric `id`
    /// - `Err(TwitterError::Cancelled)`: If `cancel` fired
    pub async fn post_status(
        &self,
        text: &str,
        image_uri: Option<&str>,
        cancel: &CancellationToken,
    ) -> TwitterResult<u64> {
        let content = PostedContent::new(text)?;

        let media_id = match image_uri {
            Some(uri) => self.upload_image(uri, cancel).await?,
            None => None,
        };

        let mut parameters: Vec<(&str, &str)> = vec![("status", content.as_str())];
        if let Some(id) = media_id.as_deref() {
            parameters.push(("media_ids", id));
        }
        parameters.sort_by(|a, b| a.0.cmp(b.0));

        let url = Self::endpoint(&self.api_base, "1.1/statuses/update.json")?;
        let authorization = self.sign("POST", &url, &parameters)?;
        let body = serde_urlencoded::to_string(&parameters)
            .map_err(|e| TwitterError::Encoding(e.to_string()))?;

        let mut attempt = 1;
        loop {
            debug!(
                "Posting status (attempt {}/{}, {} characters, media: {})",
                attempt,
                MAX_POST_ATTEMPTS,
                content.as_str().chars().count(),
                media_id.is_some()
            );

            let response = cancellable(
                cancel,
                self.transport.post_form(&url, &authorization, body.clone()),
            )
            .await?;

            if response.is_success() {
                let status: StatusResponse = serde_json::from_slice(&response.body)?;
                info!("Posted status {} on attempt {}", status.id, attempt);
                return Ok(status.id);
            }

            let error_text = response.text();
            warn!(
                "Failed to post status (attempt {}/{}) - Status: {}, Body: {}",
                attempt,
                MAX_POST_ATTEMPTS,
                response.status,
                sanitize_for_logging(&error_text, 500)
            );

            if attempt >= MAX_POST_ATTEMPTS {
                error!(
                    "Giving up posting status after {} attempts - Status: {}",
                    attempt, response.status
                );
                return Err(TwitterError::Upstream {
                    status: response.status,
                    body: error_text,
                });
            }

            cancellable(cancel, async {
                self.pause.pause(RETRY_PAUSE).await;
                Ok(())
            })
            .await?;

            attempt += 1;
        }
    }

    /// Fetches a single status as raw JSON. Not retried.
    pub async fn get_post(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> TwitterResult<serde_json::Value> {
        let parameters = [("trim_user", "true"), ("include_entities", "false")];

        let url = Self::endpoint(&self.api_base, &format!("1.1/statuses/show/{}.json", id))?;
        let authorization = self.sign("GET", &url, &parameters)?;
        let query = serde_urlencoded::to_string(parameters)
            .map_err(|e| TwitterError::Encoding(e.to_string()))?;

        let response = cancellable(
            cancel,
            self.transport
                .get(&format!("{}?{}", url, query), Some(&authorization)),
        )
        .await?;

        if !response.is_success() {
            let error_text = response.text();
            error!(
                "Failed to get status {} - Status: {}, Body: {}",
                id,
                response.status,
                sanitize_for_logging(&error_text, 500)
            );
            return Err(TwitterError::Upstream {
                status: response.status,
                body: error_text,
            });
        }

        Ok(serde_json::from_slice(&response.body)?)
    }

    pub(super) fn sign(
        &self,
        method: &str,
        url: &str,
        parameters: &[(&str, &str)],
    ) -> TwitterResult<String> {
        oauth::generate_header_value(method, url, parameters, &self.credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::header_field;
    use crate::twitter::testing::{
        image_response, json_response, test_credentials, FakeTransport, GatedPause,
        RecordingPause,
    };

    fn client(transport: &Arc<FakeTransport>, pause: &Arc<RecordingPause>) -> TwitterClient {
        TwitterClient::new(test_credentials(), transport.clone())
            .unwrap()
            .with_pause(pause.clone())
    }

    #[tokio::test]
    async fn test_post_sends_form_and_returns_id() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_form(Ok(json_response(200, r#"{"id":123456789012345678,"text":"Hello world"}"#)));

        let id = client(&transport, &pause)
            .post("  Hello world  ", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(id, 123456789012345678);
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "https://api.twitter.com/1.1/statuses/update.json");
        assert_eq!(requests[0].body_text(), "status=Hello+world");
        assert!(pause.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_post_truncates_long_text() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_form(Ok(json_response(200, r#"{"id":1}"#)));

        client(&transport, &pause)
            .post(&"a".repeat(141), &CancellationToken::new())
            .await
            .unwrap();

        let expected = format!("status={}...", "a".repeat(137));
        assert_eq!(transport.requests()[0].body_text(), expected);
    }

    #[tokio::test]
    async fn test_blank_text_makes_no_request() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());

        let result = client(&transport, &pause)
            .post("   ", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(TwitterError::InvalidArgument(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_post_retries_with_same_authorization() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        for _ in 0..4 {
            transport.push_form(Ok(json_response(503, r#"{"errors":[{"code":130}]}"#)));
        }
        transport.push_form(Ok(json_response(200, r#"{"id":77}"#)));

        let id = client(&transport, &pause)
            .post("Retry me", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(id, 77);
        assert_eq!(pause.pauses(), vec![RETRY_PAUSE; 4]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 5);
        let first = requests[0].authorization.clone().unwrap();
        assert!(requests.iter().all(|r| r.authorization.as_deref() == Some(first.as_str())));
    }

    #[tokio::test]
    async fn test_post_gives_up_after_five_attempts() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        for _ in 0..5 {
            transport.push_form(Ok(json_response(403, "duplicate status")));
        }

        let result = client(&transport, &pause)
            .post("Doomed", &CancellationToken::new())
            .await;

        match result {
            Err(TwitterError::Upstream { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "duplicate status");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
        assert_eq!(transport.requests().len(), 5);
        assert_eq!(pause.pauses().len(), 4);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_not_retried() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_form(Ok(json_response(200, r#"{"id_str":"1"}"#)));

        let result = client(&transport, &pause)
            .post("Hello", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(TwitterError::UnexpectedResponse(_))));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_returned() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_form(Err(TwitterError::Transport("connection reset".to_string())));

        let result = client(&transport, &pause)
            .post("Hello", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(TwitterError::Transport(_))));
        assert!(pause.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_post_with_image_attaches_media_id() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_get(Ok(image_response(Some("image/png; charset=binary"), vec![1, 2, 3])));
        transport.push_multipart(Ok(json_response(
            200,
            r#"{"media_id":710511363345354753,"media_id_string":"710511363345354753"}"#,
        )));
        transport.push_form(Ok(json_response(200, r#"{"id":5}"#)));

        let id = client(&transport, &pause)
            .post_with_image("Look", "https://example.com/cat.png", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(id, 5);
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);

        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].url, "https://example.com/cat.png");
        assert_eq!(requests[0].authorization, None);

        assert_eq!(requests[1].method, "MULTIPART");
        assert_eq!(requests[1].url, "https://upload.twitter.com/1.1/media/upload.json");
        assert_eq!(requests[1].field.as_deref(), Some("media"));
        assert_eq!(requests[1].media_type.as_deref(), Some("image/png"));
        assert_eq!(requests[1].body, vec![1, 2, 3]);
        assert!(requests[1].authorization.is_some());

        assert_eq!(
            requests[2].body_text(),
            "media_ids=710511363345354753&status=Look"
        );
    }

    #[tokio::test]
    async fn test_image_without_content_type_uses_octet_stream() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_get(Ok(image_response(None, vec![9; 16])));
        transport.push_multipart(Ok(json_response(200, r#"{"media_id":8}"#)));
        transport.push_form(Ok(json_response(200, r#"{"id":6}"#)));

        client(&transport, &pause)
            .post_with_image("Look", "https://example.com/blob", &CancellationToken::new())
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(
            requests[1].media_type.as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(requests[2].body_text(), "media_ids=8&status=Look");
    }

    #[tokio::test]
    async fn test_failed_download_posts_text_only() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_get(Ok(json_response(404, "not found")));
        transport.push_form(Ok(json_response(200, r#"{"id":9}"#)));

        let id = client(&transport, &pause)
            .post_with_image("Text only", "https://example.com/missing.png", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(id, 9);
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, "POST");
        assert_eq!(requests[1].body_text(), "status=Text+only");
    }

    #[tokio::test]
    async fn test_oversized_image_is_not_uploaded() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_get(Ok(image_response(
            Some("image/jpeg"),
            vec![0; crate::twitter::MAX_IMAGE_LENGTH + 1],
        )));
        transport.push_form(Ok(json_response(200, r#"{"id":10}"#)));

        client(&transport, &pause)
            .post_with_image("Too big", "https://example.com/huge.jpg", &CancellationToken::new())
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.method != "MULTIPART"));
        assert_eq!(requests[1].body_text(), "status=Too+big");
    }

    #[tokio::test]
    async fn test_image_at_size_limit_is_uploaded() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_get(Ok(image_response(
            Some("image/jpeg"),
            vec![0; crate::twitter::MAX_IMAGE_LENGTH],
        )));
        transport.push_multipart(Ok(json_response(200, r#"{"media_id_string":"99"}"#)));
        transport.push_form(Ok(json_response(200, r#"{"id":12}"#)));

        let id = client(&transport, &pause)
            .post_with_image("Just fits", "https://example.com/max.jpg", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(id, 12);
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].method, "MULTIPART");
        assert_eq!(requests[1].body.len(), crate::twitter::MAX_IMAGE_LENGTH);
        assert_eq!(requests[2].body_text(), "media_ids=99&status=Just+fits");
    }

    #[tokio::test]
    async fn test_paused_retry_does_not_block_other_posts() {
        let transport = Arc::new(FakeTransport::default());
        let gate = Arc::new(GatedPause::default());
        transport.push_form(Ok(json_response(503, "over capacity")));
        transport.push_form(Ok(json_response(200, r#"{"id":2}"#)));
        transport.push_form(Ok(json_response(200, r#"{"id":1}"#)));

        let client = Arc::new(
            TwitterClient::new(test_credentials(), transport.clone())
                .unwrap()
                .with_pause(gate.clone()),
        );

        let retrying = {
            let client = client.clone();
            tokio::spawn(async move { client.post("First", &CancellationToken::new()).await })
        };
        gate.entered.notified().await;

        let second = client.post("Second", &CancellationToken::new()).await.unwrap();
        assert_eq!(second, 2);
        assert!(!retrying.is_finished());

        gate.release.notify_one();
        let first = retrying.await.unwrap().unwrap();
        assert_eq!(first, 1);

        let bodies: Vec<String> = transport.requests().iter().map(|r| r.body_text()).collect();
        assert_eq!(bodies, vec!["status=First", "status=Second", "status=First"]);
    }

    #[tokio::test]
    async fn test_failed_upload_posts_text_only() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_get(Ok(image_response(Some("image/gif"), vec![1])));
        transport.push_multipart(Ok(json_response(400, r#"{"error":"media type unrecognized"}"#)));
        transport.push_form(Ok(json_response(200, r#"{"id":11}"#)));

        let id = client(&transport, &pause)
            .post_with_image("Upload fails", "https://example.com/a.gif", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(id, 11);
        assert_eq!(transport.requests()[2].body_text(), "status=Upload+fails");
    }

    #[tokio::test]
    async fn test_relative_image_uri_is_rejected() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());

        let result = client(&transport, &pause)
            .post_with_image("Hello", "images/cat.png", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(TwitterError::InvalidArgument(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_request() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_form(Ok(json_response(200, r#"{"id":1}"#)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client(&transport, &pause).post("Hello", &cancel).await;

        assert!(matches!(result, Err(TwitterError::Cancelled)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_authorization_header_is_verifiable() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_form(Ok(json_response(200, r#"{"id":1}"#)));

        client(&transport, &pause)
            .post("Signed", &CancellationToken::new())
            .await
            .unwrap();

        let authorization = transport.requests()[0].authorization.clone().unwrap();
        let nonce = header_field(&authorization, "oauth_nonce").unwrap();
        let timestamp = header_field(&authorization, "oauth_timestamp").unwrap();

        let expected = oauth::generate_header_value_with(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &[("status", "Signed")],
            &test_credentials(),
            Some(nonce),
            Some(timestamp),
        )
        .unwrap();

        assert_eq!(authorization, expected);
    }

    #[tokio::test]
    async fn test_get_post() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_get(Ok(json_response(200, r#"{"id":42,"text":"hi","user":{"id":1}}"#)));
        transport.push_get(Ok(json_response(404, r#"{"errors":[{"code":144}]}"#)));
        let client = client(&transport, &pause);

        let status = client.get_post(42, &CancellationToken::new()).await.unwrap();
        assert_eq!(status["text"], "hi");

        let requests = transport.requests();
        assert_eq!(
            requests[0].url,
            "https://api.twitter.com/1.1/statuses/show/42.json?trim_user=true&include_entities=false"
        );
        let authorization = requests[0].authorization.clone().unwrap();
        let expected = oauth::generate_header_value_with(
            "GET",
            "https://api.twitter.com/1.1/statuses/show/42.json",
            &[("trim_user", "true"), ("include_entities", "false")],
            &test_credentials(),
            header_field(&authorization, "oauth_nonce"),
            header_field(&authorization, "oauth_timestamp"),
        )
        .unwrap();
        assert_eq!(authorization, expected);

        let result = client.get_post(43, &CancellationToken::new()).await;
        assert!(matches!(result, Err(TwitterError::Upstream { status: 404, .. })));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_custom_base_urls() {
        let transport = Arc::new(FakeTransport::default());
        let pause = Arc::new(RecordingPause::default());
        transport.push_form(Ok(json_response(200, r#"{"id":3}"#)));

        client(&transport, &pause)
            .with_base_urls(
                Url::parse("http://localhost:9000/twitter/").unwrap(),
                Url::parse("http://localhost:9001/").unwrap(),
            )
            .post("Local", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            transport.requests()[0].url,
            "http://localhost:9000/twitter/1.1/statuses/update.json"
        );
    }

    #[test]
    fn test_new_rejects_missing_credentials() {
        let transport: Arc<dyn HttpTransport> = Arc::new(FakeTransport::default());
        let mut credentials = test_credentials();
        credentials.consumer_key.clear();

        assert!(matches!(
            TwitterClient::new(credentials, transport),
            Err(TwitterError::InvalidArgument(_))
        ));
    }
}
