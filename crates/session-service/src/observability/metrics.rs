//! Metrics definitions for the session service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `session_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: the five routes plus `/other`
//! - `status`: success, error, timeout
//! - `operation`: create_session, generate_token
//! - `role`: publisher, subscriber, moderator

use common::types::{MediaMode, Role};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("session_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Platform calls are bounded by PLATFORM_TIMEOUT_SECONDS (30s default)
        .set_buckets_for_metric(
            Matcher::Prefix("session_platform_call".to_string()),
            &[
                0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000, 30.000,
            ],
        )
        .map_err(|e| format!("Failed to set platform call buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `session_http_requests_total`, `session_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("session_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("session_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to keep label cardinality bounded.
///
/// Session ids in `/api/sessions/{id}` are replaced with a placeholder.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/api/sessions/create" => "/api/sessions/create",
        "/api/tokens/generate" => "/api/tokens/generate",
        "/api/health" => "/api/health",
        "/metrics" => "/metrics",
        _ => match path.strip_prefix("/api/sessions/") {
            Some(rest) if !rest.is_empty() && !rest.contains('/') => "/api/sessions/{id}",
            _ => "/other",
        },
    }
}

// ============================================================================
// Domain Metrics
// ============================================================================

/// Record a session successfully created on the platform.
///
/// Metric: `session_sessions_created_total`
/// Labels: `media_mode`
pub fn record_session_created(media_mode: MediaMode) {
    counter!("session_sessions_created_total", "media_mode" => media_mode.as_str()).increment(1);
}

/// Record an access credential issued.
///
/// Metric: `session_credentials_issued_total`
/// Labels: `role`
pub fn record_credential_issued(role: Role) {
    counter!("session_credentials_issued_total", "role" => role.as_str()).increment(1);
}

/// Record a media platform call.
///
/// Metric: `session_platform_call_duration_seconds`
/// Labels: `operation`, `status`
pub fn record_platform_call(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("session_platform_call_duration_seconds",
        "operation" => operation,
        "status" => status
    )
    .record(duration.as_secs_f64());
}
