//! Service layer for the session service.
//!
//! # Components
//!
//! - `platform_client` - Media platform REST client and its mock
//! - `session_registry` - Session creation and the default session pointer
//! - `credential_issuer` - Access credentials scoped to a session
//! - `health_reporter` - Readiness checks for `/api/health`

pub mod credential_issuer;
pub mod health_reporter;
pub mod platform_client;
pub mod session_registry;

pub use credential_issuer::CredentialIssuer;
pub use health_reporter::{HealthReporter, HealthStatus};
pub use platform_client::{PlatformClient, PlatformError, VonageVideoClient};
pub use session_registry::SessionRegistry;
