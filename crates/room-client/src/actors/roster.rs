//! Remote participant roster.
//!
//! Participants are keyed by connection and kept in arrival order. A
//! connection may publish several streams (camera and screen); it leaves the
//! roster when its last stream is destroyed.

use crate::platform::StreamInfo;
use crate::state::Participant;
use common::types::ConnectionId;

/// Display name for streams published without one.
pub const DEFAULT_PARTICIPANT_NAME: &str = "Participant";

#[derive(Debug, Default)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created stream. Returns true if a new participant joined.
    pub fn add_stream(&mut self, stream: &StreamInfo) -> bool {
        if let Some(existing) = self
            .participants
            .iter_mut()
            .find(|p| p.connection_id == stream.connection_id)
        {
            if !existing.stream_ids.contains(&stream.stream_id) {
                existing.stream_ids.push(stream.stream_id.clone());
            }
            return false;
        }

        let display_name = stream
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_PARTICIPANT_NAME)
            .to_string();

        self.participants.push(Participant {
            connection_id: stream.connection_id.clone(),
            display_name,
            stream_ids: vec![stream.stream_id.clone()],
        });
        true
    }

    /// Record a destroyed stream. Returns true if the participant left.
    ///
    /// Unknown streams are ignored.
    pub fn remove_stream(&mut self, stream: &StreamInfo) -> bool {
        let Some(position) = self
            .participants
            .iter()
            .position(|p| p.connection_id == stream.connection_id)
        else {
            return false;
        };

        let emptied = match self.participants.get_mut(position) {
            Some(participant) => {
                participant.stream_ids.retain(|id| *id != stream.stream_id);
                participant.stream_ids.is_empty()
            }
            None => false,
        };

        if emptied {
            self.participants.remove(position);
        }
        emptied
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| p.connection_id == *connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }
}
