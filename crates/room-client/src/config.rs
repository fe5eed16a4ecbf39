//! Room client configuration.
//!
//! Loaded from environment variables, with `from_vars` for tests.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default session service base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Default display identity.
pub const DEFAULT_USERNAME: &str = "User";

/// Default timeout for session service requests.
pub const DEFAULT_BACKEND_TIMEOUT_SECONDS: u64 = 10;

/// Room client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Session service base URL, without trailing slash.
    pub backend_url: String,

    /// Display identity used for tokens and chat.
    pub username: String,

    /// Timeout for each session service request.
    pub backend_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid backend timeout configuration: {0}")]
    InvalidBackendTimeout(String),
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECONDS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let backend_url = vars
            .get("BACKEND_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let username = vars
            .get("MEETING_USERNAME")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

        let timeout_secs = match vars.get("BACKEND_TIMEOUT_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidBackendTimeout(format!(
                        "BACKEND_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                if value == 0 {
                    return Err(ConfigError::InvalidBackendTimeout(
                        "BACKEND_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }
                value
            }
            None => DEFAULT_BACKEND_TIMEOUT_SECONDS,
        };

        Ok(Self {
            backend_url,
            username,
            backend_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
