//! HTTP request handlers for the session service.

pub mod health;
pub mod metrics;
pub mod sessions;
pub mod tokens;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use sessions::{create_session, get_session};
pub use tokens::generate_token;
