//! HTTP routes for the session service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::{CredentialIssuer, HealthReporter, SessionRegistry};
use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Per-request timeout for the whole HTTP surface.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Session creation and the default session pointer.
    pub registry: Arc<SessionRegistry>,

    /// Access credential issuance.
    pub issuer: Arc<CredentialIssuer>,

    /// Readiness checks.
    pub health: Arc<HealthReporter>,
}

impl AppState {
    /// Wire the issuer and health reporter around a registry.
    pub fn new(config: Config, registry: Arc<SessionRegistry>) -> Self {
        Self {
            issuer: Arc::new(CredentialIssuer::new(registry.clone())),
            health: Arc::new(HealthReporter::new(config.clone(), registry.clone())),
            config,
            registry,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `POST /api/sessions/create` - Create a session
/// - `GET /api/sessions/:id` - Validate a session
/// - `GET /api/tokens/generate` - Issue an access credential
/// - `GET /api/health` - Health summary (never errors)
/// - `GET /metrics` - Prometheus metrics
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - Permissive CORS so browser clients on other origins can call the API
/// - HTTP metrics middleware
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/api/sessions/create", post(handlers::create_session))
        .route("/api/sessions/:id", get(handlers::get_session))
        .route("/api/tokens/generate", get(handlers::generate_token))
        .route("/api/health", get(handlers::health_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflights before tracing
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}
