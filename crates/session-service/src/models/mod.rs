//! Session service models.
//!
//! Domain records issued by the service and the JSON shapes of the REST
//! surface. Wire field names are camelCase.

use chrono::{DateTime, Utc};
use common::secret::SecretString;
use common::types::{MediaMode, Role, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default display identity when the caller does not supply one.
pub const DEFAULT_USERNAME: &str = "User";

/// A meeting session created on the media platform.
///
/// Immutable once created. The registry does not track destruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingSession {
    pub id: SessionId,
    pub media_mode: MediaMode,
    pub created_at: DateTime<Utc>,
}

/// An access credential scoped to one session, one identity and one role.
///
/// The signed payload is never printed by `Debug`.
#[derive(Debug, Clone)]
pub struct AccessCredential {
    pub session_id: SessionId,
    pub identity: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub signed_payload: SecretString,
}

// ============================================================================
// REST API Models
// ============================================================================

/// Request body for `POST /api/sessions/create`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// "routed" (default) or "relayed".
    #[serde(default, alias = "media_mode")]
    pub media_mode: Option<String>,
}

/// Session details returned by the session endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub api_key: String,
    pub application_id: String,

    /// Only present on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Query parameters for `GET /api/tokens/generate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenQuery {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, alias = "session_id")]
    pub session_id: Option<String>,

    #[serde(default)]
    pub role: Option<String>,
}

/// Response for `GET /api/tokens/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub username: String,
    pub session_id: String,
    pub role: String,
}

/// Health check response.
///
/// Returned by the `/api/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy" or "degraded".
    pub status: String,

    /// RFC 3339 timestamp of the check.
    pub timestamp: String,

    /// Individual readiness checks.
    pub environment_info: BTreeMap<String, String>,

    /// Time since process start, e.g. "42s".
    pub uptime: String,

    /// Why the service is degraded (omitted when healthy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
