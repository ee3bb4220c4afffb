//! Request and response types for the Twitter v1.1 endpoints.

use serde::Deserialize;

use super::error::{TwitterError, TwitterResult};

/// Maximum length of a status, in characters.
pub const MAX_TWEET_LENGTH: usize = 140;

const ELLIPSIS: &str = "...";

/// Status text that has been trimmed and fitted to [`MAX_TWEET_LENGTH`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedContent {
    text: String,
}

impl PostedContent {
    /// Trims `text` and truncates it to 137 characters plus `...` when it is too long.
    ///
    /// Fails with [`TwitterError::InvalidArgument`] when `text` is blank.
    ///
    /// # Example
    ///
    /// ```rust
    /// use costello_site::twitter::PostedContent;
    ///
    /// let content = PostedContent::new("  Hello  ").unwrap();
    /// assert_eq!(content.as_str(), "Hello");
    ///
    /// let long = "x".repeat(141);
    /// let content = PostedContent::new(&long).unwrap();
    /// assert_eq!(content.as_str().chars().count(), 140);
    /// assert!(content.as_str().ends_with("..."));
    /// ```
    pub fn new(text: &str) -> TwitterResult<Self> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Err(TwitterError::InvalidArgument(
                "No text was specified to post".to_string(),
            ));
        }

        let text = if trimmed.chars().count() > MAX_TWEET_LENGTH {
            let mut truncated: String = trimmed
                .chars()
                .take(MAX_TWEET_LENGTH - ELLIPSIS.len())
                .collect();
            truncated.push_str(ELLIPSIS);
            truncated
        } else {
            trimmed.to_string()
        };

        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Body of a successful `statuses/update.json` call.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub id: u64,
}

/// Body of a successful `media/upload.json` call.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MediaUploadResponse {
    #[serde(default)]
    pub media_id: Option<u64>,
    #[serde(default)]
    pub media_id_string: Option<String>,
}

impl MediaUploadResponse {
    /// The media id as a string, preferring `media_id_string`.
    pub fn into_media_id(self) -> Option<String> {
        self.media_id_string
            .filter(|id| !id.is_empty())
            .or_else(|| self.media_id.map(|id| id.to_string()))
    }
}
