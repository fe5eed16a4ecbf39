//! Signaling relay.
//!
//! Application messages travel over the platform's signal channel as
//! `{type, data}` where `data` is always a flat string. Incoming signals
//! arrive with the platform's `signal:` event prefix on the type.

use crate::errors::{PlatformError, SignalingParseError};
use crate::platform::{MediaPlatform, RawSignal};
use common::types::ConnectionId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Prefix the platform adds to application signal types.
const SIGNAL_EVENT_PREFIX: &str = "signal:";

/// A validated application signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: String,
}

/// A decoded incoming signal with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingSignal {
    pub envelope: SignalEnvelope,
    pub from: Option<ConnectionId>,
}

/// Validate a raw platform signal.
pub fn decode(raw: &RawSignal) -> Result<IncomingSignal, SignalingParseError> {
    let kind = raw
        .kind
        .as_deref()
        .map(|kind| kind.strip_prefix(SIGNAL_EVENT_PREFIX).unwrap_or(kind))
        .filter(|kind| !kind.is_empty())
        .ok_or(SignalingParseError::MissingType)?;

    let data = raw
        .data
        .as_str()
        .ok_or(SignalingParseError::NonStringData)?;

    Ok(IncomingSignal {
        envelope: SignalEnvelope {
            kind: kind.to_string(),
            data: data.to_string(),
        },
        from: raw.from.clone(),
    })
}

/// Sends application signals over the current connection.
#[derive(Clone)]
pub struct SignalingRelay {
    platform: Arc<dyn MediaPlatform>,
}

impl SignalingRelay {
    pub fn new(platform: Arc<dyn MediaPlatform>) -> Self {
        Self { platform }
    }

    /// Broadcast `envelope` to every connection in the session, including ours.
    #[instrument(skip_all, name = "room.signaling.send", fields(kind = %envelope.kind))]
    pub async fn send(&self, envelope: &SignalEnvelope) -> Result<(), PlatformError> {
        self.platform.signal(&envelope.kind, &envelope.data).await
    }
}
