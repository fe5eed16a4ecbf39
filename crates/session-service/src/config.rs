//! Session service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server host.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default media platform REST API base URL.
pub const DEFAULT_PLATFORM_API_URL: &str = "https://video.api.vonage.com";

/// Default timeout applied to every media platform call.
pub const DEFAULT_PLATFORM_TIMEOUT_SECONDS: u64 = 30;

/// Environment variables that must be present for the service to start.
pub const REQUIRED_VARS: [&str; 4] = [
    "VONAGE_API_KEY",
    "VONAGE_API_SECRET",
    "VONAGE_APPLICATION_ID",
    "VONAGE_PRIVATE_KEY_PATH",
];

/// Session service configuration.
///
/// API secret is redacted in Debug output to prevent credential leakage.
#[derive(Clone)]
pub struct Config {
    /// Platform API key (returned to clients alongside session ids).
    pub api_key: String,

    /// Platform API secret.
    pub api_secret: SecretString,

    /// Platform application id (returned to clients, used as JWT issuer).
    pub application_id: String,

    /// Path to the application's PEM private key.
    pub private_key_path: String,

    /// Server host (default: "127.0.0.1").
    pub host: String,

    /// Server port (default: 5000).
    pub port: u16,

    /// Media platform REST API base URL.
    pub platform_api_url: String,

    /// Upper bound for any single media platform call.
    pub platform_timeout: Duration,

    /// Whether to create a default session when the process starts.
    pub create_default_session: bool,

    /// Seconds to keep draining connections after a shutdown signal.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("application_id", &self.application_id)
            .field("private_key_path", &self.private_key_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("platform_api_url", &self.platform_api_url)
            .field("platform_timeout", &self.platform_timeout)
            .field("create_default_session", &self.create_default_session)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {0:?}")]
    MissingEnvVars(Vec<String>),

    #[error("Invalid port configuration: {0}")]
    InvalidPort(String),

    #[error("Invalid platform timeout configuration: {0}")]
    InvalidPlatformTimeout(String),

    #[error("Invalid boolean configuration: {0}")]
    InvalidFlag(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        // Report every missing credential at once, empty values count as missing
        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|name| vars.get(**name).map_or(true, |v| v.trim().is_empty()))
            .map(|name| (*name).to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnvVars(missing));
        }

        let required = |name: &str| vars.get(name).cloned().unwrap_or_default();

        let host = vars
            .get("SERVER_HOST")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string());

        let port = if let Some(value_str) = vars.get("SERVER_PORT") {
            value_str.parse::<u16>().map_err(|e| {
                ConfigError::InvalidPort(format!(
                    "SERVER_PORT must be a valid port number, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_SERVER_PORT
        };

        let platform_api_url = vars
            .get("PLATFORM_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_PLATFORM_API_URL.to_string());

        let platform_timeout_seconds =
            if let Some(value_str) = vars.get("PLATFORM_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidPlatformTimeout(format!(
                        "PLATFORM_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidPlatformTimeout(
                        "PLATFORM_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }

                value
            } else {
                DEFAULT_PLATFORM_TIMEOUT_SECONDS
            };

        let create_default_session = match vars.get("CREATE_DEFAULT_SESSION") {
            Some(value) => parse_flag("CREATE_DEFAULT_SESSION", value)?,
            None => true,
        };

        let drain_seconds = vars
            .get("DRAIN_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Ok(Config {
            api_key: required("VONAGE_API_KEY"),
            api_secret: SecretString::from(required("VONAGE_API_SECRET")),
            application_id: required("VONAGE_APPLICATION_ID"),
            private_key_path: required("VONAGE_PRIVATE_KEY_PATH"),
            host,
            port,
            platform_api_url,
            platform_timeout: Duration::from_secs(platform_timeout_seconds),
            create_default_session,
            drain_seconds,
        })
    }

    /// Address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidFlag(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("VONAGE_API_KEY".to_string(), "test-api-key".to_string()),
            (
                "VONAGE_API_SECRET".to_string(),
                "super-secret-value".to_string(),
            ),
            ("VONAGE_APPLICATION_ID".to_string(), "app-123".to_string()),
            (
                "VONAGE_PRIVATE_KEY_PATH".to_string(),
                "/etc/meetroom/private.key".to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.api_key, "test-api-key");
        assert_eq!(config.api_secret.expose_secret(), "super-secret-value");
        assert_eq!(config.application_id, "app-123");
        assert_eq!(config.private_key_path, "/etc/meetroom/private.key");
        assert_eq!(config.host, DEFAULT_SERVER_HOST);
        assert_eq!(config.port, DEFAULT_SERVER_PORT);
        assert_eq!(config.platform_api_url, DEFAULT_PLATFORM_API_URL);
        assert_eq!(
            config.platform_timeout,
            Duration::from_secs(DEFAULT_PLATFORM_TIMEOUT_SECONDS)
        );
        assert!(config.create_default_session);
        assert_eq!(config.drain_seconds, 0);
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("SERVER_HOST".to_string(), "0.0.0.0".to_string());
        vars.insert("SERVER_PORT".to_string(), "8080".to_string());
        vars.insert(
            "PLATFORM_API_URL".to_string(),
            "http://localhost:9999/".to_string(),
        );
        vars.insert("PLATFORM_TIMEOUT_SECONDS".to_string(), "5".to_string());
        vars.insert("CREATE_DEFAULT_SESSION".to_string(), "false".to_string());
        vars.insert("DRAIN_SECONDS".to_string(), "10".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.platform_api_url, "http://localhost:9999");
        assert_eq!(config.platform_timeout, Duration::from_secs(5));
        assert!(!config.create_default_session);
        assert_eq!(config.drain_seconds, 10);
    }

    #[test]
    fn test_from_vars_reports_all_missing_credentials() {
        let result = Config::from_vars(&HashMap::new());

        let Err(ConfigError::MissingEnvVars(missing)) = result else {
            unreachable!("expected MissingEnvVars");
        };
        assert_eq!(missing.len(), 4);
        assert!(missing.contains(&"VONAGE_API_KEY".to_string()));
        assert!(missing.contains(&"VONAGE_PRIVATE_KEY_PATH".to_string()));
    }

    #[test]
    fn test_from_vars_treats_blank_value_as_missing() {
        let mut vars = base_vars();
        vars.insert("VONAGE_API_SECRET".to_string(), "   ".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVars(m)) if m == vec!["VONAGE_API_SECRET".to_string()])
        );
    }

    #[test]
    fn test_port_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("SERVER_PORT".to_string(), "http".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidPort(msg)) if msg.contains("must be a valid port number"))
        );
    }

    #[test]
    fn test_platform_timeout_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("PLATFORM_TIMEOUT_SECONDS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidPlatformTimeout(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_create_default_session_rejects_garbage() {
        let mut vars = base_vars();
        vars.insert("CREATE_DEFAULT_SESSION".to_string(), "maybe".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidFlag(_))));
    }

    #[test]
    fn test_debug_redacts_api_secret() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-value"));
        assert!(debug_output.contains("test-api-key"));
    }
}
