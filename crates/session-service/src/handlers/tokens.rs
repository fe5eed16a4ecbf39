//! Token handler.
//!
//! - `GET /api/tokens/generate` - Issue an access credential

use crate::errors::ServiceError;
use crate::models::{TokenQuery, TokenResponse, DEFAULT_USERNAME};
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use common::secret::ExposeSecret;
use common::types::{Role, SessionId};
use std::sync::Arc;
use tracing::instrument;

/// Treat absent and blank query values the same way.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Handler for GET /api/tokens/generate
///
/// Query: `username` (default `User`), `sessionId` (default session when
/// omitted), `role` (default `publisher`).
///
/// # Response
///
/// - 200 OK: `{token, username, sessionId, role}`
/// - 400 Bad Request: unknown role
/// - 500 Internal Server Error: no session available, or the mint failed
#[instrument(
    skip_all,
    name = "session.tokens.generate",
    fields(method = "GET", endpoint = "/api/tokens/generate")
)]
pub async fn generate_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, ServiceError> {
    let role = match non_blank(query.role) {
        Some(raw) => raw.parse::<Role>()?,
        None => Role::default(),
    };
    let username = non_blank(query.username).unwrap_or_else(|| DEFAULT_USERNAME.to_string());
    let session_id = non_blank(query.session_id).map(SessionId::from);

    let credential = state.issuer.issue(session_id, &username, role).await?;

    tracing::debug!(
        target: "session.handlers.tokens",
        session_id = %credential.session_id,
        "Token generated"
    );

    Ok(Json(TokenResponse {
        token: credential.signed_payload.expose_secret().to_string(),
        username: credential.identity,
        session_id: credential.session_id.into_inner(),
        role: credential.role.as_str().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(Some(" Alice ".to_string())), Some("Alice".to_string()));
    }
}
