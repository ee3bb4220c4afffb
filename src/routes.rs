//! Router construction.

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::handlers::{
    handle_generate_guid, handle_generate_hash, handle_generate_machine_key, handle_health,
    handle_time, handle_tweet,
};
use crate::middleware::{require_api_token, response_headers, X_INSTANCE};
use crate::state::AppState;

/// Name of the machine serving requests, for the `X-Instance` header.
pub fn instance_name() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

/// Builds the application router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health`: Health check
/// - `GET /api/time`: Current time in several formats (CORS enabled)
/// - `POST /api/tweet`: Post a status (requires an API token)
/// - `POST /tools/guid`, `POST /tools/hash`, `POST /tools/machinekey`: Developer tools
pub fn create_app(state: AppState) -> Router {
    let time_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    let api = Router::new()
        .route("/time", get(handle_time).layer(time_cors))
        .route(
            "/tweet",
            post(handle_tweet).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_api_token,
            )),
        );

    let tools = Router::new()
        .route("/guid", post(handle_generate_guid))
        .route("/hash", post(handle_generate_hash))
        .route("/machinekey", post(handle_generate_machine_key));

    let instance = HeaderValue::from_str(&instance_name())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));

    Router::new()
        .route("/health", get(handle_health))
        .nest("/api", api)
        .nest("/tools", tools)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(response_headers))
                .layer(SetResponseHeaderLayer::overriding(X_INSTANCE, instance)),
        )
        .with_state(state)
}
