//! Room state snapshot.
//!
//! The coordinator actor owns the live state and publishes a [`RoomState`]
//! snapshot after every message, completion and platform event it handles.

use crate::chat::ChatMessage;
use crate::platform::{PublisherId, VideoFilter};
use common::types::{ConnectionId, SessionId, StreamId};

/// Connection lifecycle of one room visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Which surface is shown as the primary view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    CameraMain,
    ScreenMain,
}

/// Screen sharing sub-state, nested under `Connected`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScreenShareState {
    #[default]
    Idle,
    CapabilityChecking,
    /// Screen publisher being created and published.
    Starting,
    /// Publish confirmed; the screen is the main surface.
    Sharing { publisher: PublisherId },
    /// Screen publisher being torn down; still the main surface.
    Stopping { publisher: PublisherId },
}

impl ScreenShareState {
    /// Display mode implied by this state.
    pub fn display_mode(&self) -> DisplayMode {
        match self {
            ScreenShareState::Sharing { .. } | ScreenShareState::Stopping { .. } => {
                DisplayMode::ScreenMain
            }
            _ => DisplayMode::CameraMain,
        }
    }

    /// Whether a toggle is running and the control must stay disabled.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ScreenShareState::CapabilityChecking
                | ScreenShareState::Starting
                | ScreenShareState::Stopping { .. }
        )
    }

    /// The screen publisher attached to the main surface, if any.
    pub fn publisher(&self) -> Option<&PublisherId> {
        match self {
            ScreenShareState::Sharing { publisher } | ScreenShareState::Stopping { publisher } => {
                Some(publisher)
            }
            _ => None,
        }
    }
}

/// Phase of the filter lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPhase {
    #[default]
    Idle,
    Applying,
    Applied,
    Failed,
    Clearing,
}

/// Filter lifecycle snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterStatus {
    pub phase: FilterPhase,
    /// Filter currently active on the camera publisher.
    pub active: Option<VideoFilter>,
}

/// Colour of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Neutral,
    Pending,
    Success,
    Error,
}

/// A user-facing status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub tone: StatusTone,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, tone: StatusTone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn pending(text: impl Into<String>) -> Self {
        Self::new(text, StatusTone::Pending)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, StatusTone::Success)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, StatusTone::Error)
    }
}

/// A remote participant, keyed by connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
    /// Streams this connection currently publishes, oldest first.
    pub stream_ids: Vec<StreamId>,
}

/// Snapshot of a room visit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomState {
    pub connection: ConnectionState,
    pub session_id: Option<SessionId>,
    pub connection_id: Option<ConnectionId>,
    pub identity: Option<String>,
    pub camera_publisher: Option<PublisherId>,
    pub screen_share: ScreenShareState,
    pub filter: FilterStatus,
    /// Remote participants in arrival order.
    pub roster: Vec<Participant>,
    pub transcript: Vec<ChatMessage>,
    pub connection_status: Option<StatusMessage>,
    /// Set when the camera could not be started or published.
    pub camera_status: Option<StatusMessage>,
    pub screen_status: Option<StatusMessage>,
    pub filter_status: Option<StatusMessage>,
}

impl RoomState {
    pub fn display_mode(&self) -> DisplayMode {
        self.screen_share.display_mode()
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }
}
