//! Credential Issuer.
//!
//! Issues access credentials scoped to one session, one identity and one
//! role. Credentials are never cached; every call mints a fresh one.

use crate::errors::ServiceError;
use crate::models::AccessCredential;
use crate::observability::metrics;
use crate::services::platform_client::ClientTokenOptions;
use crate::services::session_registry::SessionRegistry;
use chrono::Utc;
use common::types::{Role, SessionId};
use std::sync::Arc;
use tracing::instrument;

/// Issues access credentials through the registry's platform client.
pub struct CredentialIssuer {
    registry: Arc<SessionRegistry>,
}

impl CredentialIssuer {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Issue a credential for `identity` in a session.
    ///
    /// Without a session id, the default session is used.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NoSessionAvailable` - no session id and no default
    /// - `ServiceError::ExternalService` - the platform refused or timed out
    #[instrument(skip_all, fields(identity = %identity, role = %role))]
    pub async fn issue(
        &self,
        session_id: Option<SessionId>,
        identity: &str,
        role: Role,
    ) -> Result<AccessCredential, ServiceError> {
        let session_id = match session_id {
            Some(id) => id,
            None => self
                .registry
                .default_session_id()
                .await
                .ok_or(ServiceError::NoSessionAvailable)?,
        };

        let options = ClientTokenOptions {
            session_id: session_id.clone(),
            role,
            data: Some(format!("username={identity}")),
        };

        let signed_payload = self.registry.mint_token(&options).await?;

        metrics::record_credential_issued(role);

        tracing::info!(
            target: "session.credentials",
            session_id = %session_id,
            identity = %identity,
            role = %role,
            "Issued access credential"
        );

        Ok(AccessCredential {
            session_id,
            identity: identity.to_string(),
            role,
            issued_at: Utc::now(),
            signed_payload,
        })
    }
}
