//! Room Client Library
//!
//! Client half of Meetroom. Fetches a session and credential from the
//! session service, then runs a room coordinator actor that connects through
//! a media platform binding, publishes the camera, keeps the roster, shares
//! the screen exclusively with the camera, applies video filters and carries
//! chat over the signaling relay.
//!
//! # Architecture
//!
//! ```text
//! backend.rs -> JoinParams -> actors::RoomHandle -> actors::coordinator -> platform.rs
//!                                                        |-> signaling.rs -> chat.rs
//!                                                        '-> state.rs -> view.rs
//! ```
//!
//! # Modules
//!
//! - `actors` - Room coordinator actor and its state machines
//! - `backend` - Session service API client
//! - `chat` - Chat protocol over application signals
//! - `config` - Client configuration from environment
//! - `errors` - Error types
//! - `platform` - Media platform trait and mock
//! - `signaling` - Application signal envelope and relay
//! - `state` - Room state snapshot
//! - `view` - Declarative view-model

pub mod actors;
pub mod backend;
pub mod chat;
pub mod config;
pub mod errors;
pub mod platform;
pub mod signaling;
pub mod state;
pub mod view;

pub use actors::{RoomActor, RoomHandle, ScreenShareOutcome};
pub use backend::{BackendClient, JoinParams, MeetingIntent};
pub use errors::RoomError;
