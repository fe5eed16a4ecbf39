//! Common data types for Meetroom components.
//!
//! Identifiers issued by the media platform are opaque strings. They are
//! wrapped in newtypes so a session id can never be passed where a
//! connection id is expected.

use crate::error::MeetroomError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a platform-issued identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the raw identifier.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

platform_id!(
    /// Identifier of a meeting session on the media platform.
    SessionId
);

platform_id!(
    /// Identifier of one participant connection to a session.
    ConnectionId
);

platform_id!(
    /// Identifier of a published media stream.
    StreamId
);

/// How media is routed between participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    /// Media flows through the platform's media router.
    #[default]
    Routed,
    /// Media flows peer to peer where possible.
    Relayed,
}

impl MediaMode {
    /// Returns the wire representation of the media mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaMode::Routed => "routed",
            MediaMode::Relayed => "relayed",
        }
    }
}

impl fmt::Display for MediaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaMode {
    type Err = MeetroomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "routed" => Ok(MediaMode::Routed),
            "relayed" => Ok(MediaMode::Relayed),
            _ => Err(MeetroomError::InvalidMediaMode(s.to_string())),
        }
    }
}

/// Role granted to a participant by an access credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May publish and subscribe.
    #[default]
    Publisher,
    /// May only subscribe.
    Subscriber,
    /// Publisher that may also moderate other participants.
    Moderator,
}

impl Role {
    /// Returns the wire representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Publisher => "publisher",
            Role::Subscriber => "subscriber",
            Role::Moderator => "moderator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MeetroomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publisher" => Ok(Role::Publisher),
            "subscriber" => Ok(Role::Subscriber),
            "moderator" => Ok(Role::Moderator),
            _ => Err(MeetroomError::InvalidRole(s.to_string())),
        }
    }
}
