//! Session service API client.
//!
//! Typed wrapper over the session service REST surface, plus the
//! create-new and join-existing flows that produce [`JoinParams`] for
//! [`crate::actors::RoomHandle::join`].

use crate::config::ClientConfig;
use common::secret::SecretString;
use common::types::{Role, SessionId};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Connect timeout for session service requests.
const BACKEND_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Errors from the session service client.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A join was requested without a session id.
    #[error("Session id is required")]
    MissingSessionId,

    #[error("Backend request failed: {0}")]
    Transport(String),

    /// The service answered with an error body.
    #[error("Backend returned {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Session details returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub api_key: String,
    pub application_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// An issued access credential.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: SecretString,
    pub username: String,
    pub session_id: SessionId,
    pub role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBody {
    token: String,
    username: String,
    session_id: SessionId,
    role: String,
}

/// Health report returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub timestamp: String,
    pub environment_info: BTreeMap<String, String>,
    pub uptime: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// How the user wants to enter a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingIntent {
    CreateNew,
    JoinExisting(String),
}

/// Everything the room needs to connect.
#[derive(Debug, Clone)]
pub struct JoinParams {
    pub application_id: String,
    pub session_id: SessionId,
    pub token: SecretString,
    pub identity: String,
}

/// Client for the session service.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the configured service.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, BackendError> {
        Self::with_timeout(&config.backend_url, config.backend_timeout)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(BACKEND_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "room.backend", error = %e, "Failed to build HTTP client");
                BackendError::Transport(e.to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new meeting session.
    #[instrument(skip_all, name = "room.backend.create_session")]
    pub async fn create_session(&self) -> Result<SessionInfo, BackendError> {
        let response = self
            .client
            .post(format!("{}/api/sessions/create", self.base_url))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(transport)?;

        let session: SessionInfo = parse(check(response).await?).await?;
        info!(target: "room.backend", session_id = %session.session_id, "Session created");
        Ok(session)
    }

    /// Look up a session. A 404 becomes `SessionNotFound`.
    #[instrument(skip_all, name = "room.backend.get_session", fields(session_id = %session_id))]
    pub async fn get_session(&self, session_id: &str) -> Result<SessionInfo, BackendError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| BackendError::Transport(format!("invalid backend url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| BackendError::Transport("backend url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["api", "sessions", session_id]);

        let response = self.client.get(url).send().await.map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(target: "room.backend", "Session not found");
            return Err(BackendError::SessionNotFound(session_id.to_string()));
        }

        parse(check(response).await?).await
    }

    /// Issue an access credential for `username`.
    ///
    /// Without a session id the service falls back to its default session.
    #[instrument(skip_all, name = "room.backend.generate_token")]
    pub async fn generate_token(
        &self,
        username: &str,
        session_id: Option<&SessionId>,
        role: Option<Role>,
    ) -> Result<IssuedToken, BackendError> {
        let mut query = vec![("username", username.to_string())];
        if let Some(session_id) = session_id {
            query.push(("sessionId", session_id.to_string()));
        }
        if let Some(role) = role {
            query.push(("role", role.as_str().to_string()));
        }

        let response = self
            .client
            .get(format!("{}/api/tokens/generate", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(transport)?;

        let body: TokenBody = parse(check(response).await?).await?;
        let role = body
            .role
            .parse()
            .map_err(|_| BackendError::InvalidResponse(format!("unknown role '{}'", body.role)))?;

        Ok(IssuedToken {
            token: SecretString::from(body.token),
            username: body.username,
            session_id: body.session_id,
            role,
        })
    }

    #[instrument(skip_all, name = "room.backend.health")]
    pub async fn health(&self) -> Result<HealthReport, BackendError> {
        let response = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(transport)?;

        parse(check(response).await?).await
    }

    /// Resolve a meeting intent into join parameters.
    #[instrument(skip_all, name = "room.backend.prepare_meeting")]
    pub async fn prepare_meeting(
        &self,
        intent: &MeetingIntent,
        username: &str,
    ) -> Result<JoinParams, BackendError> {
        let session = match intent {
            MeetingIntent::CreateNew => self.create_session().await?,
            MeetingIntent::JoinExisting(session_id) => {
                let session_id = session_id.trim();
                if session_id.is_empty() {
                    return Err(BackendError::MissingSessionId);
                }
                self.get_session(session_id).await?
            }
        };

        let issued = self
            .generate_token(username, Some(&session.session_id), Some(Role::Publisher))
            .await?;

        Ok(JoinParams {
            application_id: session.application_id,
            session_id: issued.session_id,
            token: issued.token,
            identity: issued.username,
        })
    }
}

fn transport(error: reqwest::Error) -> BackendError {
    error!(target: "room.backend", error = %error, "Session service request failed");
    BackendError::Transport(error.to_string())
}

/// Turn a non-success response into `BackendError::Api`.
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let (code, message) = match response.json::<ErrorBody>().await {
        Ok(body) => (body.error.code, body.error.message),
        Err(_) => (
            "UNKNOWN".to_string(),
            status.canonical_reason().unwrap_or("error").to_string(),
        ),
    };

    Err(BackendError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    response
        .json()
        .await
        .map_err(|e| BackendError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::with_timeout(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_error_body_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tokens/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": {"code": "NO_SESSION_AVAILABLE", "message": "No video session available"}
            })))
            .mount(&server)
            .await;

        let result = client(&server).generate_token("Alice", None, None).await;

        let Err(BackendError::Api { status, code, .. }) = result else {
            unreachable!("expected api error, got {result:?}");
        };
        assert_eq!(status, 500);
        assert_eq!(code, "NO_SESSION_AVAILABLE");
    }

    #[tokio::test]
    async fn test_token_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tokens/generate"))
            .and(query_param("username", "Alice"))
            .and(query_param("sessionId", "1_abc"))
            .and(query_param("role", "moderator"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "T1==abc",
                "username": "Alice",
                "sessionId": "1_abc",
                "role": "moderator"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let issued = client(&server)
            .generate_token("Alice", Some(&SessionId::from("1_abc")), Some(Role::Moderator))
            .await
            .unwrap();

        assert_eq!(issued.role, Role::Moderator);
        assert!(!format!("{issued:?}").contains("T1==abc"));
    }

    #[tokio::test]
    async fn test_blank_join_id_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = client(&server)
            .prepare_meeting(&MeetingIntent::JoinExisting("   ".to_string()), "Alice")
            .await;

        assert!(matches!(result, Err(BackendError::MissingSessionId)));
    }

    #[tokio::test]
    async fn test_non_json_error_falls_back_to_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let result = client(&server).health().await;

        let Err(BackendError::Api { status, code, message }) = result else {
            unreachable!("expected api error, got {result:?}");
        };
        assert_eq!(status, 502);
        assert_eq!(code, "UNKNOWN");
        assert_eq!(message, "Bad Gateway");
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client =
            BackendClient::with_timeout(&server.uri(), Duration::from_millis(200)).unwrap();

        assert!(matches!(
            client.health().await,
            Err(BackendError::Transport(_))
        ));
    }
}
