//! Room coordinator actor and its state machines.
//!
//! ```text
//! RoomActor (one per client)
//! ├── connection lifecycle   Disconnected -> Connecting -> Connected
//! ├── ScreenShareController  Idle -> CapabilityChecking -> Starting -> Sharing -> Stopping
//! ├── FilterLifecycle        Idle -> Applying -> Applied | Failed -> Clearing
//! └── Roster                 remote participants in arrival order
//! ```
//!
//! # Modules
//!
//! - [`coordinator`] - `RoomActor` and its `RoomHandle`
//! - [`messages`] - Commands and completion messages
//! - [`screen_share`] - Display mode exclusivity
//! - [`filter`] - Video filter lifecycle
//! - [`roster`] - Participant roster

pub mod coordinator;
pub mod filter;
pub mod messages;
pub mod roster;
pub mod screen_share;

pub use coordinator::{RoomActor, RoomHandle};
pub use messages::{RoomMessage, ScreenShareOutcome};
