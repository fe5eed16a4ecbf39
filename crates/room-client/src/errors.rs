//! Room client error types.
//!
//! Errors from asynchronous room operations are always returned to the
//! caller and mirrored into a status message, never dropped.

use thiserror::Error;

/// Errors reported by the media platform binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The platform refused the operation.
    #[error("{message} (code {code})")]
    Rejected { code: u16, message: String },

    /// The operation needs a live connection.
    #[error("not connected to a session")]
    NotConnected,

    /// The publisher is unknown or already destroyed.
    #[error("unknown publisher: {0}")]
    UnknownPublisher(String),

    #[error("{0}")]
    Other(String),
}

/// Screen sharing failures. Surfaced as a status message, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenShareError {
    #[error("Not supported in this browser.")]
    Unsupported,

    #[error("Browser extension required")]
    ExtensionRequired,

    #[error("Failed to start screen sharing: {0}")]
    InitFailed(String),

    #[error("Failed to publish screen: {0}")]
    PublishFailed(String),
}

/// Video filter failures. The camera publisher stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// No camera publisher, or the platform lacks filter support.
    #[error("{0}")]
    Unavailable(String),

    #[error("Failed to apply {label}: {message}")]
    Application { label: String, message: String },

    #[error("Failed to clear filter: {0}")]
    Clear(String),
}

/// Chat send failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Empty or whitespace-only text; nothing was sent.
    #[error("message is empty")]
    Empty,

    #[error("Failed to send message: {0}")]
    Relay(String),
}

/// An incoming signal did not match the expected shape.
///
/// Logged and dropped by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingParseError {
    #[error("signal has no type")]
    MissingType,

    #[error("signal data must be a string")]
    NonStringData,

    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

/// Errors returned by `RoomHandle` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Join requested while connecting or connected.
    #[error("already joined or joining a room")]
    AlreadyJoined,

    #[error("not connected to a room")]
    NotConnected,

    /// The pending join was abandoned by a leave.
    #[error("join abandoned")]
    JoinAbandoned,

    /// Connecting to the session failed; never retried.
    #[error("connection failed: {0}")]
    Connection(PlatformError),

    /// A screen-share toggle is still in flight.
    #[error("screen share toggle already in progress")]
    ToggleInFlight,

    /// Another filter operation is still in flight.
    #[error("another filter operation is in progress")]
    FilterBusy,

    #[error(transparent)]
    ScreenShare(#[from] ScreenShareError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    /// The room actor is gone.
    #[error("internal error: {0}")]
    Internal(String),
}
