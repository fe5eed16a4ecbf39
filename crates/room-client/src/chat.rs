//! Chat protocol over the signaling relay.
//!
//! Wire shape: `{type: "chat", data: "{\"sender\":..,\"text\":..}"}`. The
//! payload is serialized into the flat `data` string.

use crate::errors::{ChatError, SignalingParseError};
use crate::signaling::{IncomingSignal, SignalEnvelope};
use chrono::{DateTime, Utc};
use common::types::ConnectionId;
use serde::{Deserialize, Serialize};

/// Signal type carrying chat messages.
pub const CHAT_SIGNAL_TYPE: &str = "chat";

/// Sender name for locally generated system notices.
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// Chat payload carried in the signal's data string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub sender: String,
    pub text: String,
}

/// A transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
    pub originated_locally: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// An entry for a message this client sent.
    pub fn local(payload: ChatPayload) -> Self {
        Self {
            sender: payload.sender,
            text: payload.text,
            originated_locally: true,
            timestamp: Utc::now(),
        }
    }

    /// A system notice, such as a failed send.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: SYSTEM_SENDER.to_string(),
            text: text.into(),
            originated_locally: true,
            timestamp: Utc::now(),
        }
    }
}

/// Build the outgoing envelope for `text`.
///
/// Returns the payload for the transcript alongside the envelope. Blank text
/// is rejected before anything is sent.
pub fn prepare_outgoing(
    sender: &str,
    text: &str,
) -> Result<(ChatPayload, SignalEnvelope), ChatError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ChatError::Empty);
    }

    let payload = ChatPayload {
        sender: sender.to_string(),
        text: text.to_string(),
    };
    let data =
        serde_json::to_string(&payload).map_err(|e| ChatError::Relay(e.to_string()))?;

    Ok((
        payload,
        SignalEnvelope {
            kind: CHAT_SIGNAL_TYPE.to_string(),
            data,
        },
    ))
}

/// Turn an incoming signal into a transcript entry.
///
/// Returns `Ok(None)` for non-chat signals and for echoes of our own
/// messages, which are already in the transcript.
pub fn decode_incoming(
    signal: &IncomingSignal,
    local_connection: Option<&ConnectionId>,
) -> Result<Option<ChatMessage>, SignalingParseError> {
    if signal.envelope.kind != CHAT_SIGNAL_TYPE {
        return Ok(None);
    }
    if local_connection.is_some() && signal.from.as_ref() == local_connection {
        return Ok(None);
    }

    let payload: ChatPayload = serde_json::from_str(&signal.envelope.data).map_err(|e| {
        SignalingParseError::InvalidPayload {
            kind: CHAT_SIGNAL_TYPE.to_string(),
            reason: e.to_string(),
        }
    })?;

    Ok(Some(ChatMessage {
        sender: payload.sender,
        text: payload.text,
        originated_locally: false,
        timestamp: Utc::now(),
    }))
}
