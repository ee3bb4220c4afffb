//! Image download and media upload.
//!
//! Failures here never stop a status from being posted: anything other than
//! a bad argument or a cancellation is logged and the status goes out
//! without media.

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::api::{cancellable, sanitize_for_logging};
use super::client::TwitterClient;
use super::error::{TwitterError, TwitterResult};
use super::types::MediaUploadResponse;

/// Largest image accepted for upload, in bytes (3 MiB).
pub const MAX_IMAGE_LENGTH: usize = 3_145_728;

/// Media type used when the image host does not send one.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// A downloaded image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub media_type: String,
}

/// Strips parameters such as `charset` from a `Content-Type` value.
fn media_type_of(content_type: Option<&str>) -> String {
    content_type
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_MEDIA_TYPE)
        .to_string()
}

fn absorb<T>(result: TwitterResult<Option<T>>, what: &str) -> TwitterResult<Option<T>> {
    match result {
        Err(TwitterError::Cancelled) => Err(TwitterError::Cancelled),
        Err(TwitterError::InvalidArgument(message)) => Err(TwitterError::InvalidArgument(message)),
        Err(e) => {
            warn!("Failed to {}: {}", what, e);
            Ok(None)
        }
        ok => ok,
    }
}

impl TwitterClient {
    /// Downloads the image at `image_uri` and uploads it as media.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(String))`: The media id to attach to a status
    /// - `Ok(None)`: If the image could not be downloaded, was too large, or was rejected
    /// - `Err(TwitterError::InvalidArgument)`: If `image_uri` is not an absolute URI
    /// - `Err(TwitterError::Cancelled)`: If `cancel` fired
    pub(crate) async fn upload_image(
        &self,
        image_uri: &str,
        cancel: &CancellationToken,
    ) -> TwitterResult<Option<String>> {
        let uri = Url::parse(image_uri).map_err(|e| {
            TwitterError::InvalidArgument(format!("'{}' is not an absolute URI: {}", image_uri, e))
        })?;

        if uri.cannot_be_a_base() {
            return Err(TwitterError::InvalidArgument(format!(
                "'{}' is not an absolute URI",
                image_uri
            )));
        }

        let image = match absorb(self.download_image(&uri, cancel).await, "download image")? {
            Some(image) => image,
            None => return Ok(None),
        };

        absorb(self.send_media(image, cancel).await, "upload image")
    }

    async fn download_image(
        &self,
        uri: &Url,
        cancel: &CancellationToken,
    ) -> TwitterResult<Option<ImagePayload>> {
        debug!("Downloading image from {}", uri);

        let downloaded = cancellable(
            cancel,
            self.transport.download(uri.as_str(), MAX_IMAGE_LENGTH),
        )
        .await;

        let response = match downloaded {
            Err(TwitterError::TooLarge { limit }) => {
                warn!(
                    "Image from {} is larger than the {} byte limit - posting without it",
                    uri, limit
                );
                return Ok(None);
            }
            other => other?,
        };

        if !response.is_success() {
            warn!(
                "Failed to download image from {} - Status: {}",
                uri, response.status
            );
            return Ok(None);
        }

        let media_type = media_type_of(response.content_type.as_deref());
        debug!(
            "Downloaded {} byte image of type {}",
            response.body.len(),
            media_type
        );

        Ok(Some(ImagePayload {
            data: response.body,
            media_type,
        }))
    }

    async fn send_media(
        &self,
        image: ImagePayload,
        cancel: &CancellationToken,
    ) -> TwitterResult<Option<String>> {
        let url = Self::endpoint(&self.upload_base, "1.1/media/upload.json")?;
        let authorization = self.sign("POST", &url, &[])?;

        let response = cancellable(
            cancel,
            self.transport.post_multipart(
                &url,
                &authorization,
                "media",
                image.data,
                &image.media_type,
            ),
        )
        .await?;

        if !response.is_success() {
            error!(
                "Failed to upload image - Status: {}, Body: {}",
                response.status,
                sanitize_for_logging(&response.text(), 500)
            );
            return Ok(None);
        }

        let uploaded: MediaUploadResponse = serde_json::from_slice(&response.body)?;
        let media_id = uploaded.into_media_id();

        match &media_id {
            Some(id) => info!("Uploaded image as media {}", id),
            None => error!("Media upload response did not contain a media id"),
        }

        Ok(media_id)
    }
}
