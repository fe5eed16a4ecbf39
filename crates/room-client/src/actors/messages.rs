//! Message types for the room actor.
//!
//! Commands come from [`super::RoomHandle`] and carry a `oneshot` reply
//! channel. Completions are posted back by tasks the actor spawns for
//! platform calls; they carry the visit epoch they were started in.

use crate::backend::JoinParams;
use crate::chat::ChatPayload;
use crate::errors::{PlatformError, RoomError, ScreenShareError};
use crate::platform::{PublisherId, ScreenShareCapability, StreamDestroyedReason, VideoFilter};
use crate::state::RoomState;
use common::types::{ConnectionId, StreamId};
use tokio::sync::oneshot;

/// Commands sent to the room actor.
#[derive(Debug)]
pub enum RoomMessage {
    /// Connect to a session and start the camera publisher.
    Join {
        params: JoinParams,
        /// Answered once the connection succeeds, fails or is abandoned.
        respond_to: oneshot::Sender<Result<ConnectionId, RoomError>>,
    },

    /// Tear down all local media and disconnect.
    Leave { respond_to: oneshot::Sender<()> },

    ToggleScreenShare {
        /// Answered when the toggle has run to completion or failed.
        respond_to: oneshot::Sender<Result<ScreenShareOutcome, RoomError>>,
    },

    ApplyFilter {
        filter: VideoFilter,
        respond_to: oneshot::Sender<Result<(), RoomError>>,
    },

    ClearFilter {
        respond_to: oneshot::Sender<Result<(), RoomError>>,
    },

    SendChat {
        text: String,
        respond_to: oneshot::Sender<Result<(), RoomError>>,
    },

    GetState { respond_to: oneshot::Sender<RoomState> },
}

/// Result of a completed screen-share toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenShareOutcome {
    Sharing,
    Stopped,
}

/// Why a screen share is being torn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopTrigger {
    Toggle,
    /// Stopped through a platform-native control; the stream is already gone.
    External { cause: StreamDestroyedReason },
}

/// A finished platform call, posted back to the actor.
#[derive(Debug)]
pub struct Completion {
    pub epoch: u64,
    pub kind: CompletionKind,
}

#[derive(Debug)]
pub enum CompletionKind {
    Connected(Result<ConnectionId, PlatformError>),
    CameraReady(Result<PublisherId, PlatformError>),
    CameraPublished(Result<(), PlatformError>),
    Subscribed {
        stream_id: StreamId,
        result: Result<(), PlatformError>,
    },
    CapabilityChecked(ScreenShareCapability),
    ScreenStarted(Result<PublisherId, ScreenShareError>),
    ScreenStopped {
        trigger: StopTrigger,
        result: Result<(), PlatformError>,
    },
    FilterApplied(Result<(), PlatformError>),
    FilterCleared(Result<(), PlatformError>),
    ChatSent {
        payload: ChatPayload,
        result: Result<(), PlatformError>,
        respond_to: oneshot::Sender<Result<(), RoomError>>,
    },
}
