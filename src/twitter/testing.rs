//! Scripted test doubles for the transport and pause seams.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::api::{HttpTransport, Pause, TransportResponse};
use super::error::{TwitterError, TwitterResult};
use crate::oauth::OAuthCredentials;

pub(crate) fn test_credentials() -> OAuthCredentials {
    OAuthCredentials::new(
        "test-consumer-key",
        "test-consumer-secret",
        "test-access-token",
        "test-access-token-secret",
    )
}

pub(crate) fn json_response(status: u16, body: &str) -> TransportResponse {
    TransportResponse {
        status,
        content_type: Some("application/json; charset=utf-8".to_string()),
        body: body.as_bytes().to_vec(),
    }
}

pub(crate) fn image_response(content_type: Option<&str>, body: Vec<u8>) -> TransportResponse {
    TransportResponse {
        status: 200,
        content_type: content_type.map(str::to_string),
        body,
    }
}

/// One request seen by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    /// `GET`, `POST` (form), or `MULTIPART`
    pub method: &'static str,
    pub url: String,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
    pub field: Option<String>,
    pub media_type: Option<String>,
}

impl RecordedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

type Script = Mutex<VecDeque<TwitterResult<TransportResponse>>>;

/// Transport that replays queued responses per operation and records every call.
#[derive(Default)]
pub(crate) struct FakeTransport {
    gets: Script,
    forms: Script,
    multiparts: Script,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn push_get(&self, response: TwitterResult<TransportResponse>) {
        self.gets.lock().unwrap().push_back(response);
    }

    pub fn push_form(&self, response: TwitterResult<TransportResponse>) {
        self.forms.lock().unwrap().push_back(response);
    }

    pub fn push_multipart(&self, response: TwitterResult<TransportResponse>) {
        self.multiparts.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, script: &Script, request: RecordedRequest) -> TwitterResult<TransportResponse> {
        let method = request.method;
        self.requests.lock().unwrap().push(request);
        script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(TwitterError::Transport(format!(
                "no scripted response for {}",
                method
            )))
        })
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str, authorization: Option<&str>) -> TwitterResult<TransportResponse> {
        self.next(
            &self.gets,
            RecordedRequest {
                method: "GET",
                url: url.to_string(),
                authorization: authorization.map(str::to_string),
                body: Vec::new(),
                field: None,
                media_type: None,
            },
        )
    }

    async fn download(&self, url: &str, max_len: usize) -> TwitterResult<TransportResponse> {
        let response = self.next(
            &self.gets,
            RecordedRequest {
                method: "GET",
                url: url.to_string(),
                authorization: None,
                body: Vec::new(),
                field: None,
                media_type: None,
            },
        )?;

        if response.body.len() > max_len {
            return Err(TwitterError::TooLarge { limit: max_len });
        }
        Ok(response)
    }

    async fn post_form(
        &self,
        url: &str,
        authorization: &str,
        body: String,
    ) -> TwitterResult<TransportResponse> {
        self.next(
            &self.forms,
            RecordedRequest {
                method: "POST",
                url: url.to_string(),
                authorization: Some(authorization.to_string()),
                body: body.into_bytes(),
                field: None,
                media_type: None,
            },
        )
    }

    async fn post_multipart(
        &self,
        url: &str,
        authorization: &str,
        field: &str,
        data: Vec<u8>,
        media_type: &str,
    ) -> TwitterResult<TransportResponse> {
        self.next(
            &self.multiparts,
            RecordedRequest {
                method: "MULTIPART",
                url: url.to_string(),
                authorization: Some(authorization.to_string()),
                body: data,
                field: Some(field.to_string()),
                media_type: Some(media_type.to_string()),
            },
        )
    }
}

/// Pause that returns immediately and remembers every requested duration.
#[derive(Default)]
pub(crate) struct RecordingPause {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// Pause that holds the caller until the test releases it.
#[derive(Default)]
pub(crate) struct GatedPause {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl Pause for GatedPause {
    async fn pause(&self, _duration: Duration) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}
