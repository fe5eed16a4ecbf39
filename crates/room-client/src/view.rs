//! Declarative room view-model.
//!
//! [`RoomView::project`] is a pure function of [`RoomState`]; a renderer
//! only needs to draw what it returns.

use crate::chat::ChatMessage;
use crate::state::{ConnectionState, DisplayMode, RoomState, StatusMessage};
use common::types::ConnectionId;

pub const SHARE_SCREEN_LABEL: &str = "Share Screen";
pub const STOP_SHARING_LABEL: &str = "Stop Sharing Screen";

/// What occupies the main display region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainSurface {
    Camera,
    Screen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantTile {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub stream_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub main_surface: MainSurface,
    /// The small self-view; shown exactly when the camera is not main.
    pub mini_self_view_visible: bool,
    /// "No participants yet" indicator.
    pub roster_placeholder_visible: bool,
    pub tiles: Vec<ParticipantTile>,
    pub connection_status: Option<StatusMessage>,
    pub camera_status: Option<StatusMessage>,
    pub screen_status: Option<StatusMessage>,
    pub filter_status: Option<StatusMessage>,
    pub screen_toggle_enabled: bool,
    pub screen_toggle_label: &'static str,
    pub transcript: Vec<ChatMessage>,
}

impl RoomView {
    pub fn project(state: &RoomState) -> Self {
        let main_surface = match state.display_mode() {
            DisplayMode::CameraMain => MainSurface::Camera,
            DisplayMode::ScreenMain => MainSurface::Screen,
        };

        let tiles = state
            .roster
            .iter()
            .map(|participant| ParticipantTile {
                connection_id: participant.connection_id.clone(),
                display_name: participant.display_name.clone(),
                stream_count: participant.stream_ids.len(),
            })
            .collect();

        Self {
            main_surface,
            mini_self_view_visible: main_surface == MainSurface::Screen,
            roster_placeholder_visible: state.roster.is_empty(),
            tiles,
            connection_status: state.connection_status.clone(),
            camera_status: state.camera_status.clone(),
            screen_status: state.screen_status.clone(),
            filter_status: state.filter_status.clone(),
            screen_toggle_enabled: state.connection == ConnectionState::Connected
                && !state.screen_share.is_in_flight(),
            screen_toggle_label: match main_surface {
                MainSurface::Camera => SHARE_SCREEN_LABEL,
                MainSurface::Screen => STOP_SHARING_LABEL,
            },
            transcript: state.transcript.clone(),
        }
    }
}

impl From<&RoomState> for RoomView {
    fn from(state: &RoomState) -> Self {
        Self::project(state)
    }
}
