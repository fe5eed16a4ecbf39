//! Common error types for Meetroom components.

use thiserror::Error;

/// Errors raised while interpreting values shared by the server and client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeetroomError {
    /// Media mode string is not one the platform understands
    #[error("Invalid media mode: {0}")]
    InvalidMediaMode(String),

    /// Role string is not one the platform understands
    #[error("Invalid role: {0}")]
    InvalidRole(String),
}

/// Result type alias using `MeetroomError`
pub type Result<T> = std::result::Result<T, MeetroomError>;
