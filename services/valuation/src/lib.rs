//! Property valuation service
//!
//! Serves the latest trained `PricingPipeline` over HTTP behind an IP
//! blacklist, a sliding-window rate limit and a shared API key, and logs
//! every request to a JSON-array access log.

pub mod config;
pub mod secrets;
pub mod state;
pub mod registry;
pub mod ratelimit;
pub mod admission;
pub mod error;
pub mod access_log;
pub mod monitoring;
pub mod routes_predict;
pub mod routes_models;

pub use access_log::{AccessLog, AccessLogEntry};
pub use config::AppConfig;
pub use error::{ApiError, ErrorDetail};
pub use ratelimit::{RateLimiter, SlidingWindowLimiter};
pub use registry::ModelRegistry;
pub use secrets::ApiKeyStore;
pub use state::{AppState, SharedState};

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Outermost first: CORS, access log, blacklist, then per route the rate
/// limit (prediction only) and the API key.
pub fn build_router(state: SharedState) -> Router {
    let prediction = Router::new()
        .route("/predict", post(routes_predict::predict))
        .route_layer(from_fn_with_state(state.clone(), admission::require_api_key))
        .route_layer(from_fn_with_state(state.clone(), admission::enforce_rate_limit));

    let introspection = Router::new()
        .route("/model_metadata", get(routes_models::model_metadata))
        .route("/model_history", get(routes_models::model_history))
        .route("/monitoring", get(routes_models::get_monitoring))
        .route_layer(from_fn_with_state(state.clone(), admission::require_api_key));

    Router::new()
        .route("/health", get(routes_models::health))
        .merge(prediction)
        .merge(introspection)
        .layer(from_fn_with_state(state.clone(), admission::reject_blacklisted))
        .layer(from_fn_with_state(state.clone(), access_log::log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
