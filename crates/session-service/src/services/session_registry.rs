//! Session Registry.
//!
//! Creates meeting sessions on the media platform and holds the one
//! process-wide default session pointer.
//!
//! # Concurrency
//!
//! The default pointer sits behind a `tokio::sync::Mutex`. The platform call
//! runs outside the lock; only the read-modify-write of the pointer is
//! serialized, so two concurrent creators can never both claim the default.

use crate::errors::ServiceError;
use crate::models::MeetingSession;
use crate::observability::metrics;
use crate::services::platform_client::{ClientTokenOptions, PlatformClient, PlatformError};
use chrono::Utc;
use common::types::{MediaMode, Role, SessionId};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::instrument;

/// Registry of meeting sessions.
pub struct SessionRegistry {
    /// `None` when the platform client failed to initialize at startup.
    platform: Option<Arc<dyn PlatformClient>>,

    default_session: Mutex<Option<SessionId>>,

    /// Upper bound for each platform call.
    call_timeout: Duration,
}

impl SessionRegistry {
    /// Create a registry backed by a platform client.
    pub fn new(platform: Arc<dyn PlatformClient>, call_timeout: Duration) -> Self {
        Self {
            platform: Some(platform),
            default_session: Mutex::new(None),
            call_timeout,
        }
    }

    /// Create a registry whose platform client could not be initialized.
    ///
    /// Every operation fails; health reports the service as degraded.
    pub fn unavailable(call_timeout: Duration) -> Self {
        Self {
            platform: None,
            default_session: Mutex::new(None),
            call_timeout,
        }
    }

    /// Whether the platform client initialized.
    pub fn platform_available(&self) -> bool {
        self.platform.is_some()
    }

    /// Create a new session; the first success also becomes the default.
    ///
    /// # Errors
    ///
    /// - `ServiceError::ExternalService` - platform failure, timeout, or no
    ///   platform client
    #[instrument(skip_all, fields(media_mode = %media_mode))]
    pub async fn create_session(
        &self,
        media_mode: MediaMode,
    ) -> Result<MeetingSession, ServiceError> {
        let platform = self.platform()?;

        let session_id = self
            .call("create_session", platform.create_session(media_mode))
            .await?;

        let session = MeetingSession {
            id: session_id,
            media_mode,
            created_at: Utc::now(),
        };

        let claimed_default = {
            let mut default_session = self.default_session.lock().await;
            if default_session.is_none() {
                *default_session = Some(session.id.clone());
                true
            } else {
                false
            }
        };

        metrics::record_session_created(media_mode);

        tracing::info!(
            target: "session.registry",
            session_id = %session.id,
            media_mode = %media_mode,
            claimed_default,
            "Created session"
        );

        Ok(session)
    }

    /// Check that a session exists.
    ///
    /// The platform has no existence query, so this performs a trial
    /// publisher token mint. Any failure is reported as not found.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` - the session is invalid, unknown, or the
    ///   platform could not confirm it
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn get_session(&self, session_id: &SessionId) -> Result<SessionId, ServiceError> {
        let not_found = || ServiceError::NotFound("Video session not found or invalid".to_string());

        let platform = self.platform().map_err(|_| not_found())?;
        let options = ClientTokenOptions {
            session_id: session_id.clone(),
            role: Role::Publisher,
            data: None,
        };

        match self
            .call("validate_session", platform.generate_client_token(&options))
            .await
        {
            Ok(_) => Ok(session_id.clone()),
            Err(e) => {
                tracing::debug!(
                    target: "session.registry",
                    session_id = %session_id,
                    error = %e,
                    "Session validation failed"
                );
                Err(not_found())
            }
        }
    }

    /// Current default session id, if any.
    pub async fn default_session_id(&self) -> Option<SessionId> {
        self.default_session.lock().await.clone()
    }

    /// Create the startup default session.
    ///
    /// Failure is logged and leaves the default empty; the first successful
    /// `create_session` then claims it.
    pub async fn initialize_default(&self, media_mode: MediaMode) {
        match self.create_session(media_mode).await {
            Ok(session) => tracing::info!(
                target: "session.registry",
                session_id = %session.id,
                "Default session ready"
            ),
            Err(e) => tracing::warn!(
                target: "session.registry",
                error = %e,
                "Could not create default session at startup"
            ),
        }
    }

    /// Clear the default session pointer.
    pub async fn reset(&self) {
        *self.default_session.lock().await = None;
    }

    /// Mint a client token through the platform, with the call timeout.
    pub(crate) async fn mint_token(
        &self,
        options: &ClientTokenOptions,
    ) -> Result<common::secret::SecretString, ServiceError> {
        let platform = self.platform()?;
        self.call("generate_token", platform.generate_client_token(options))
            .await
    }

    fn platform(&self) -> Result<&Arc<dyn PlatformClient>, ServiceError> {
        self.platform.as_ref().ok_or_else(|| {
            ServiceError::ExternalService("media platform client is not initialized".to_string())
        })
    }

    /// Run a platform call under the configured timeout and record its duration.
    async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, PlatformError>>,
    {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.call_timeout, future).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(value)) => {
                metrics::record_platform_call(operation, "success", elapsed);
                Ok(value)
            }
            Ok(Err(e)) => {
                metrics::record_platform_call(operation, "error", elapsed);
                Err(ServiceError::ExternalService(format!("{operation}: {e}")))
            }
            Err(_) => {
                metrics::record_platform_call(operation, "timeout", elapsed);
                tracing::warn!(
                    target: "session.registry",
                    operation,
                    timeout_secs = self.call_timeout.as_secs(),
                    "Platform call timed out"
                );
                Err(ServiceError::ExternalService(format!(
                    "{operation}: timed out after {:?}",
                    self.call_timeout
                )))
            }
        }
    }
}
