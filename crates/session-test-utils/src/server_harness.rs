//! Test server harness for end-to-end testing
//!
//! Provides `TestSessionServer` for spawning real session service instances
//! backed by the in-process mock platform.

use common::types::MediaMode;
use metrics_exporter_prometheus::PrometheusBuilder;
use session_service::config::Config;
use session_service::routes::{self, AppState};
use session_service::services::platform_client::mock::MockPlatformClient;
use session_service::services::SessionRegistry;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Application id the harness configures; mock session ids embed it.
pub const TEST_APPLICATION_ID: &str = "test-application";

/// API key the harness configures.
pub const TEST_API_KEY: &str = "test-api-key";

/// Options for [`TestSessionServer::spawn_with`].
pub struct TestServerOptions {
    /// Platform double; keep a clone to flip failure modes mid-test.
    pub platform: Arc<MockPlatformClient>,

    /// Create the startup default session before serving.
    pub create_default_session: bool,

    /// Upper bound for each platform call.
    pub platform_timeout: Duration,

    /// Serve with no platform client at all (degraded mode).
    pub platform_unavailable: bool,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            platform: Arc::new(MockPlatformClient::accepting(TEST_APPLICATION_ID)),
            create_default_session: true,
            platform_timeout: Duration::from_secs(30),
            platform_unavailable: false,
        }
    }
}

/// Test harness for spawning the session service in end-to-end tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_token_flow() -> Result<(), anyhow::Error> {
///     let server = TestSessionServer::spawn().await?;
///
///     let response = reqwest::get(format!(
///         "{}/api/tokens/generate?username=Alice",
///         server.url()
///     ))
///     .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestSessionServer {
    addr: SocketAddr,
    config: Config,
    registry: Arc<SessionRegistry>,
    platform: Arc<MockPlatformClient>,
    _handle: JoinHandle<()>,
}

impl TestSessionServer {
    /// Spawn a server with a default session and an accepting platform.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(TestServerOptions::default()).await
    }

    /// Spawn a server with custom options.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Optionally create the default session, like the real binary
    /// - Start the HTTP server in the background
    pub async fn spawn_with(options: TestServerOptions) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            ("VONAGE_API_KEY".to_string(), TEST_API_KEY.to_string()),
            (
                "VONAGE_API_SECRET".to_string(),
                "test-api-secret".to_string(),
            ),
            (
                "VONAGE_APPLICATION_ID".to_string(),
                TEST_APPLICATION_ID.to_string(),
            ),
            (
                "VONAGE_PRIVATE_KEY_PATH".to_string(),
                test_private_key_path(),
            ),
            ("SERVER_PORT".to_string(), "0".to_string()),
            (
                "PLATFORM_TIMEOUT_SECONDS".to_string(),
                options.platform_timeout.as_secs().max(1).to_string(),
            ),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let registry = if options.platform_unavailable {
            Arc::new(SessionRegistry::unavailable(config.platform_timeout))
        } else {
            Arc::new(SessionRegistry::new(
                options.platform.clone(),
                config.platform_timeout,
            ))
        };

        if options.create_default_session {
            registry.initialize_default(MediaMode::Routed).await;
        }

        let state = Arc::new(AppState::new(config.clone(), registry.clone()));

        // Built but not installed: the global recorder can only be set once per process
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            registry,
            platform: options.platform,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the registry behind the server.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Get the platform double behind the server.
    pub fn platform(&self) -> &Arc<MockPlatformClient> {
        &self.platform
    }
}

impl Drop for TestSessionServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so each test cleans up immediately
        self._handle.abort();
    }
}

/// Path of the RSA key fixture shipped with the session service tests.
pub fn test_private_key_path() -> String {
    concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../session-service/tests/fixtures/test_private_key.pem"
    )
    .to_string()
}
