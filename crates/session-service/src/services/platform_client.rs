//! Media platform client.
//!
//! The media platform owns sessions, connections and streams. The session
//! service only needs two operations from it: create a session, and mint a
//! client token scoped to a session. Both sit behind [`PlatformClient`] so
//! handlers and the registry can be exercised against
//! [`mock::MockPlatformClient`].
//!
//! # Security
//!
//! - Requests to the platform are authenticated with a short-lived RS256
//!   application JWT signed with the application private key
//! - Client tokens are minted locally and returned wrapped in `SecretString`
//! - Timeouts prevent hanging connections

use crate::config::Config;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::Utc;
use common::secret::{ExposeSecret, SecretString};
use common::types::{MediaMode, Role, SessionId};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// Timeout for a single platform HTTP request.
const PLATFORM_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connect timeout for platform HTTP requests.
const PLATFORM_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Lifetime of the application JWT used to call the REST API.
const APPLICATION_JWT_TTL_SECS: i64 = 300;

/// Lifetime of a client token handed to participants (24 hours).
const CLIENT_TOKEN_TTL_SECS: i64 = 86_400;

/// Session id encoding: URL-safe base64, padding optional.
const SESSION_ID_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors from the media platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Network failure or timeout talking to the platform.
    #[error("transport error: {0}")]
    Transport(String),

    /// The platform answered with a non-success status.
    #[error("platform rejected request with status {0}")]
    Rejected(u16),

    /// The platform answered with a body we could not interpret.
    #[error("invalid platform response: {0}")]
    InvalidResponse(String),

    /// The session id is malformed or belongs to another application.
    #[error("invalid session id: {0}")]
    InvalidSession(String),

    /// Signing a JWT failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Options for minting a client token.
#[derive(Debug, Clone)]
pub struct ClientTokenOptions {
    pub session_id: SessionId,
    pub role: Role,
    /// Opaque connection metadata, e.g. `username=Alice`.
    pub data: Option<String>,
}

/// Trait for media platform operations (enables mocking).
#[async_trait::async_trait]
pub trait PlatformClient: Send + Sync {
    /// Create a new session on the platform.
    async fn create_session(&self, media_mode: MediaMode) -> Result<SessionId, PlatformError>;

    /// Mint a client token for an existing session.
    async fn generate_client_token(
        &self,
        options: &ClientTokenOptions,
    ) -> Result<SecretString, PlatformError>;
}

/// Compose a session id in the platform's format.
///
/// Layout: `1_` followed by URL-safe base64 of
/// `1~{application_id}~{created_ms}~{nonce}~MX4`.
pub fn compose_session_id(application_id: &str, nonce: &str) -> SessionId {
    let raw = format!(
        "1~{}~{}~{}~MX4",
        application_id,
        Utc::now().timestamp_millis(),
        nonce
    );
    SessionId::new(format!("1_{}", SESSION_ID_ENGINE.encode(raw)))
}

/// Extract the application id a session id was issued for.
pub fn session_application_id(session_id: &SessionId) -> Result<String, PlatformError> {
    let raw = session_id.as_str();
    let encoded = raw
        .strip_prefix("1_")
        .or_else(|| raw.strip_prefix("2_"))
        .ok_or_else(|| PlatformError::InvalidSession("missing version prefix".to_string()))?;

    // Some SDKs emit the standard alphabet; normalise before decoding
    let normalised: String = encoded
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let decoded = SESSION_ID_ENGINE
        .decode(normalised.as_bytes())
        .map_err(|e| PlatformError::InvalidSession(format!("not base64: {e}")))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| PlatformError::InvalidSession("not utf-8".to_string()))?;

    decoded
        .split('~')
        .nth(1)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PlatformError::InvalidSession("missing application id".to_string()))
}

#[derive(Serialize)]
struct ApplicationClaims<'a> {
    application_id: &'a str,
    iat: i64,
    exp: i64,
    jti: String,
}

#[derive(Serialize)]
struct ClientTokenClaims<'a> {
    scope: &'static str,
    session_id: &'a str,
    role: &'static str,
    initial_layout_class_list: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
    application_id: &'a str,
    sub: &'static str,
    iat: i64,
    exp: i64,
    jti: String,
}

#[derive(Deserialize)]
struct CreatedSession {
    session_id: String,
}

/// HTTP client for the Vonage Video REST API.
#[derive(Clone)]
pub struct VonageVideoClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Base URL for the platform REST API.
    base_url: String,

    /// Application id, also the JWT issuer.
    application_id: String,

    /// RS256 key parsed from the application private key.
    encoding_key: EncodingKey,
}

impl VonageVideoClient {
    /// Create a new platform client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the platform REST API
    /// * `application_id` - Platform application id
    /// * `private_key_pem` - PEM-encoded RSA private key of the application
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Signing` if the key cannot be parsed and
    /// `PlatformError::Transport` if the HTTP client cannot be built.
    pub fn new(
        base_url: String,
        application_id: String,
        private_key_pem: &SecretString,
    ) -> Result<Self, PlatformError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.expose_secret().as_bytes())
            .map_err(|e| {
                error!(target: "session.platform", error = %e, "Invalid application private key");
                PlatformError::Signing(format!("invalid private key: {e}"))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(PLATFORM_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(PLATFORM_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "session.platform", error = %e, "Failed to build HTTP client");
                PlatformError::Transport(e.to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            application_id,
            encoding_key,
        })
    }

    /// Build a client from service configuration, reading the private key file.
    pub fn from_config(config: &Config) -> Result<Self, PlatformError> {
        let pem = std::fs::read_to_string(&config.private_key_path).map_err(|e| {
            error!(
                target: "session.platform",
                path = %config.private_key_path,
                error = %e,
                "Failed to read application private key"
            );
            PlatformError::Signing(format!("cannot read private key: {e}"))
        })?;

        Self::new(
            config.platform_api_url.clone(),
            config.application_id.clone(),
            &SecretString::from(pem),
        )
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, PlatformError> {
        encode(&Header::new(Algorithm::RS256), claims, &self.encoding_key)
            .map_err(|e| PlatformError::Signing(e.to_string()))
    }

    fn application_jwt(&self) -> Result<String, PlatformError> {
        let now = Utc::now().timestamp();
        self.sign(&ApplicationClaims {
            application_id: &self.application_id,
            iat: now,
            exp: now + APPLICATION_JWT_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl PlatformClient for VonageVideoClient {
    #[instrument(skip(self), fields(media_mode = %media_mode))]
    async fn create_session(&self, media_mode: MediaMode) -> Result<SessionId, PlatformError> {
        let url = format!("{}/session/create", self.base_url);
        let p2p_preference = match media_mode {
            MediaMode::Routed => "disabled",
            MediaMode::Relayed => "enabled",
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.application_jwt()?)
            .header("Accept", "application/json")
            .form(&[("archiveMode", "manual"), ("p2p.preference", p2p_preference)])
            .send()
            .await
            .map_err(|e| {
                warn!(target: "session.platform", error = %e, "Platform request failed");
                PlatformError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "session.platform", status = %status, "Platform rejected session creation");
            return Err(PlatformError::Rejected(status.as_u16()));
        }

        let created: Vec<CreatedSession> = response
            .json()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;

        created
            .into_iter()
            .next()
            .map(|entry| SessionId::new(entry.session_id))
            .ok_or_else(|| PlatformError::InvalidResponse("empty session list".to_string()))
    }

    #[instrument(
        skip(self, options),
        fields(session_id = %options.session_id, role = %options.role)
    )]
    async fn generate_client_token(
        &self,
        options: &ClientTokenOptions,
    ) -> Result<SecretString, PlatformError> {
        let issued_for = session_application_id(&options.session_id)?;
        if issued_for != self.application_id {
            return Err(PlatformError::InvalidSession(
                "session belongs to another application".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        let token = self.sign(&ClientTokenClaims {
            scope: "session.connect",
            session_id: options.session_id.as_str(),
            role: options.role.as_str(),
            initial_layout_class_list: "",
            data: options.data.as_deref(),
            application_id: &self.application_id,
            sub: "video",
            iat: now,
            exp: now + CLIENT_TOKEN_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
        })?;

        Ok(SecretString::from(token))
    }
}

/// Mock platform client module for testing.
///
/// This module provides an in-process platform for use in tests and the
/// test server harness.
pub mod mock {

    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Mock platform client.
    ///
    /// Sessions it created are remembered; tokens for any other session id
    /// are rejected, the same way the real platform rejects fabricated ids.
    pub struct MockPlatformClient {
        application_id: String,
        sessions: Mutex<HashSet<SessionId>>,
        fail_create: AtomicBool,
        fail_tokens: AtomicBool,
        delay: Option<Duration>,
        create_calls: AtomicUsize,
        token_calls: AtomicUsize,
    }

    impl MockPlatformClient {
        /// Create a mock that accepts every request.
        pub fn accepting(application_id: &str) -> Self {
            Self {
                application_id: application_id.to_string(),
                sessions: Mutex::new(HashSet::new()),
                fail_create: AtomicBool::new(false),
                fail_tokens: AtomicBool::new(false),
                delay: None,
                create_calls: AtomicUsize::new(0),
                token_calls: AtomicUsize::new(0),
            }
        }

        /// Create a mock whose every call fails with a transport error.
        pub fn failing(application_id: &str) -> Self {
            let mock = Self::accepting(application_id);
            mock.fail_create.store(true, Ordering::SeqCst);
            mock.fail_tokens.store(true, Ordering::SeqCst);
            mock
        }

        /// Create a mock that sleeps before answering each call.
        pub fn with_delay(application_id: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::accepting(application_id)
            }
        }

        /// Toggle failure of session creation.
        pub fn set_fail_create(&self, fail: bool) {
            self.fail_create.store(fail, Ordering::SeqCst);
        }

        /// Toggle failure of token minting.
        pub fn set_fail_tokens(&self, fail: bool) {
            self.fail_tokens.store(fail, Ordering::SeqCst);
        }

        /// Treat an externally created session as existing.
        pub async fn register_session(&self, session_id: SessionId) {
            self.sessions.lock().await.insert(session_id);
        }

        /// Number of `create_session` calls made.
        pub fn create_calls(&self) -> usize {
            self.create_calls.load(Ordering::SeqCst)
        }

        /// Number of `generate_client_token` calls made.
        pub fn token_calls(&self) -> usize {
            self.token_calls.load(Ordering::SeqCst)
        }

        async fn maybe_delay(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait::async_trait]
    impl PlatformClient for MockPlatformClient {
        async fn create_session(&self, _media_mode: MediaMode) -> Result<SessionId, PlatformError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.maybe_delay().await;

            if self.fail_create.load(Ordering::SeqCst) {
                return Err(PlatformError::Transport(
                    "Mock platform unavailable".to_string(),
                ));
            }

            let session_id =
                compose_session_id(&self.application_id, &Uuid::new_v4().simple().to_string());
            self.sessions.lock().await.insert(session_id.clone());
            Ok(session_id)
        }

        async fn generate_client_token(
            &self,
            options: &ClientTokenOptions,
        ) -> Result<SecretString, PlatformError> {
            self.token_calls.fetch_add(1, Ordering::SeqCst);
            self.maybe_delay().await;

            if self.fail_tokens.load(Ordering::SeqCst) {
                return Err(PlatformError::Transport(
                    "Mock platform unavailable".to_string(),
                ));
            }

            if !self.sessions.lock().await.contains(&options.session_id) {
                return Err(PlatformError::InvalidSession(
                    "unknown session".to_string(),
                ));
            }

            Ok(SecretString::from(format!(
                "T1==mock-{}-{}-{}",
                options.role,
                options.session_id,
                Uuid::new_v4().simple()
            )))
        }
    }

}
