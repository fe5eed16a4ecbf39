//! Health Reporter.
//!
//! Summarizes configuration and platform readiness. Never fails: problems
//! are reported as a degraded status with a reason.

use crate::config::Config;
use crate::services::session_registry::SessionRegistry;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Result of a health evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub checks: BTreeMap<String, String>,
    pub uptime_secs: u64,
    pub reason: Option<String>,
}

/// Reports service health.
pub struct HealthReporter {
    config: Config,
    registry: Arc<SessionRegistry>,
    started_at: Instant,
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

impl HealthReporter {
    /// Create a reporter; uptime is measured from this call.
    pub fn new(config: Config, registry: Arc<SessionRegistry>) -> Self {
        Self {
            config,
            registry,
            started_at: Instant::now(),
        }
    }

    /// Evaluate every check.
    pub async fn status(&self) -> HealthStatus {
        let api_key_configured = !self.config.api_key.trim().is_empty();
        let application_id_configured = !self.config.application_id.trim().is_empty();
        let private_key_exists = Path::new(&self.config.private_key_path).is_file();
        let default_session_available = self.registry.default_session_id().await.is_some();
        let platform_initialized = self.registry.platform_available();

        let mut checks = BTreeMap::new();
        checks.insert("apiKeyConfigured".to_string(), yes_no(api_key_configured));
        checks.insert(
            "applicationIdConfigured".to_string(),
            yes_no(application_id_configured),
        );
        checks.insert(
            "privateKeyExists".to_string(),
            private_key_exists.to_string(),
        );
        checks.insert(
            "defaultSessionAvailable".to_string(),
            yes_no(default_session_available),
        );
        checks.insert(
            "platformClientStatus".to_string(),
            if platform_initialized { "Initialized" } else { "Failed" }.to_string(),
        );

        let reason = if !api_key_configured || !application_id_configured {
            Some("Platform credentials are not configured".to_string())
        } else if !private_key_exists {
            Some("Application private key file not found".to_string())
        } else if !platform_initialized {
            Some("Media platform client failed to initialize".to_string())
        } else {
            None
        };

        if let Some(reason) = &reason {
            tracing::warn!(target: "session.health", reason = %reason, "Service degraded");
        }

        HealthStatus {
            healthy: reason.is_none(),
            checks,
            uptime_secs: self.started_at.elapsed().as_secs(),
            reason,
        }
    }
}
