//! HTTP route handlers for the site.
//!
//! This module contains all the HTTP route handler functions that process
//! incoming requests and return appropriate responses.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::Json,
    Extension,
};
use log::info;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::middleware::client_ip;
use crate::models::{
    ErrorCode, GenerateGuidRequest, GenerateGuidResponse, GenerateHashRequest,
    GenerateHashResponse, GenerateMachineKeyRequest, GenerateMachineKeyResponse, RequestId,
    TimeResponse, TweetRequest, TweetResponse,
};
use crate::state::AppState;
use crate::tools::{self, GuidFormat, HashAlgorithm, HashFormat};
use crate::twitter::sanitize_for_logging;

type ApiResult<T> = Result<Json<T>, ApiError>;

fn request_body<T>(
    body: Result<Json<T>, JsonRejection>,
    request_id: &Option<Extension<RequestId>>,
) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::from(rejection).with_request_id(request_id.as_deref()))
}

/// Handles GET requests to the `/health` endpoint.
///
/// This endpoint provides a health check for the service, returning the current
/// status and service name. It's commonly used by load balancers and monitoring
/// systems to verify that the service is running and responsive.
///
/// # Returns
///
/// A JSON response containing:
/// - `status`: Always "healthy" when the service is running
/// - `service`: The service name "costello-site"
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "costello-site"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "costello-site"}))
}

/// Handles GET requests to the `/api/time` endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "rfc1123": "Sat, 07 Mar 2015 09:05:01 GMT",
///   "universalFull": "Saturday, 07 March 2015 09:05:01",
///   "universalSortable": "2015-03-07 09:05:01Z",
///   "unix": 1425719101
/// }
/// ```
pub async fn handle_time() -> Json<TimeResponse> {
    Json(TimeResponse::at(chrono::Utc::now()))
}

/// Handles POST requests to the `/tools/guid` endpoint.
///
/// Accepts `{"format": "D", "uppercase": false}`; both fields are optional.
pub async fn handle_generate_guid(
    request_id: Option<Extension<RequestId>>,
    body: Result<Json<GenerateGuidRequest>, JsonRejection>,
) -> ApiResult<GenerateGuidResponse> {
    let request = request_body(body, &request_id)?;
    info!("Generating a new GUID.");

    let guid = GuidFormat::parse(request.format.as_deref())
        .and_then(|format| tools::generate_guid(format, request.uppercase))
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_deref()))?;

    Ok(Json(GenerateGuidResponse { guid }))
}

/// Handles POST requests to the `/tools/hash` endpoint.
pub async fn handle_generate_hash(
    request_id: Option<Extension<RequestId>>,
    body: Result<Json<GenerateHashRequest>, JsonRejection>,
) -> ApiResult<GenerateHashResponse> {
    let request = request_body(body, &request_id)?;
    info!("Generating a new hash.");

    let hash = HashAlgorithm::parse(request.hash_name.as_deref())
        .and_then(|algorithm| Ok((algorithm, HashFormat::parse(request.format.as_deref())?)))
        .and_then(|(algorithm, format)| {
            tools::compute_hash(request.plaintext.as_deref().unwrap_or_default(), algorithm, format)
        })
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_deref()))?;

    Ok(Json(GenerateHashResponse { hash }))
}

/// Handles POST requests to the `/tools/machinekey` endpoint.
pub async fn handle_generate_machine_key(
    request_id: Option<Extension<RequestId>>,
    body: Result<Json<GenerateMachineKeyRequest>, JsonRejection>,
) -> ApiResult<GenerateMachineKeyResponse> {
    let request = request_body(body, &request_id)?;
    info!("Generating a new machine key.");

    let tag = tools::generate_machine_key(
        request.decryption_algorithm_name.as_deref().unwrap_or_default(),
        request.validation_algorithm_name.as_deref().unwrap_or_default(),
    )
    .map_err(|e| ApiError::from(e).with_request_id(request_id.as_deref()))?;

    Ok(Json(GenerateMachineKeyResponse { tag }))
}

/// Handles POST requests to the `/api/tweet` endpoint.
///
/// Posts `text` (and the image at `imageUri`, if given) to Twitter using the
/// configured account. Requires a valid API token, enforced by
/// [`crate::middleware::require_api_token`].
///
/// # Returns
///
/// - `200 OK` with `{"id": <status id>}` on success
/// - `400 Bad Request` if the text is blank or the image URI is not absolute
/// - `408 Request Timeout` if the request to Twitter timed out
/// - `502 Bad Gateway` if Twitter kept rejecting the status
/// - `503 Service Unavailable` if no Twitter credentials are configured
pub async fn handle_tweet(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    headers: HeaderMap,
    body: Result<Json<TweetRequest>, JsonRejection>,
) -> ApiResult<TweetResponse> {
    let request = request_body(body, &request_id)?;

    let client = state.twitter.clone().ok_or_else(|| {
        ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ServiceUnavailable,
            "Posting to Twitter is not configured.",
        )
        .with_request_id(request_id.as_deref())
    })?;

    info!(
        "Posting status for {} (image: {}): {}",
        client_ip(&headers).unwrap_or_else(|| "unknown".to_string()),
        request.image_uri.is_some(),
        sanitize_for_logging(&request.text, 100)
    );

    // Cancels the outbound requests if the client disconnects and this future is dropped.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let id = client
        .post_status(&request.text, request.image_uri.as_deref(), &cancel)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.as_deref()))?;

    Ok(Json(TweetResponse { id }))
}
