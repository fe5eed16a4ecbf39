//! Session handlers.
//!
//! - `POST /api/sessions/create` - Create a session (body optional)
//! - `GET /api/sessions/{id}` - Validate an existing session

use crate::errors::ServiceError;
use crate::models::{CreateSessionRequest, SessionResponse};
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use common::types::{MediaMode, SessionId};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/sessions/create
///
/// # Response
///
/// - 200 OK: `{sessionId, apiKey, applicationId, createdAt}`
/// - 400 Bad Request: malformed body or unknown media mode
/// - 500 Internal Server Error: platform failure
#[instrument(
    skip_all,
    name = "session.create",
    fields(method = "POST", endpoint = "/api/sessions/create")
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Json<SessionResponse>, ServiceError> {
    // Parsed manually so a bad body is a 400 rather than axum's 422
    let request: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            tracing::debug!(target: "session.handlers.sessions", error = %e, "Invalid request body");
            ServiceError::BadRequest("Invalid request body".to_string())
        })?
    };

    let media_mode = match request.media_mode.as_deref() {
        Some(raw) => raw.parse::<MediaMode>()?,
        None => MediaMode::default(),
    };

    let session = state.registry.create_session(media_mode).await?;

    Ok(Json(SessionResponse {
        session_id: session.id.into_inner(),
        api_key: state.config.api_key.clone(),
        application_id: state.config.application_id.clone(),
        created_at: Some(session.created_at.to_rfc3339()),
    }))
}

/// Handler for GET /api/sessions/{id}
///
/// # Response
///
/// - 200 OK: `{sessionId, apiKey, applicationId}`
/// - 404 Not Found: the session is invalid or does not exist
#[instrument(
    skip_all,
    name = "session.get",
    fields(method = "GET", endpoint = "/api/sessions/{id}")
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ServiceError> {
    let session_id = state
        .registry
        .get_session(&SessionId::from(session_id))
        .await?;

    Ok(Json(SessionResponse {
        session_id: session_id.into_inner(),
        api_key: state.config.api_key.clone(),
        application_id: state.config.application_id.clone(),
        created_at: None,
    }))
}
