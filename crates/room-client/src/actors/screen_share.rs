//! Screen-share exclusivity controller.
//!
//! `Idle -> CapabilityChecking -> Starting -> Sharing -> Stopping -> Idle`.
//! Every failure returns to `Idle`. The display mode is derived from this
//! state, so the screen only becomes the main surface once the publish is
//! confirmed and stays there until its publisher is gone.
//!
//! A native stop can land while the publish is still being confirmed. It is
//! held until the publisher id is known and then torn down like any other
//! external stop, so `Sharing` never refers to a dead stream.

use crate::errors::{RoomError, ScreenShareError};
use crate::platform::{PublisherId, ScreenShareCapability, StreamDestroyedReason};
use crate::state::ScreenShareState;

/// What a toggle request must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleAction {
    CheckCapability,
    Stop(PublisherId),
}

/// Result of a confirmed screen publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Sharing,
    /// The stream was stopped natively before the publish was confirmed;
    /// the publisher must be torn down right away.
    StoppedEarly {
        publisher: PublisherId,
        cause: StreamDestroyedReason,
    },
}

/// How an externally ended publisher stream affects the share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalStop {
    /// The shared publisher is gone; start teardown.
    Teardown,
    /// A publish is still being confirmed; the stop is applied afterwards.
    Deferred,
    Ignored,
}

#[derive(Debug, Default)]
pub struct ScreenShareController {
    state: ScreenShareState,
    /// Native stops seen while `Starting`, keyed by publisher.
    early_stops: Vec<(PublisherId, StreamDestroyedReason)>,
}

impl ScreenShareController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ScreenShareState {
        &self.state
    }

    /// Accept or reject a toggle.
    pub fn begin_toggle(&mut self) -> Result<ToggleAction, RoomError> {
        match &self.state {
            ScreenShareState::Idle => {
                self.state = ScreenShareState::CapabilityChecking;
                Ok(ToggleAction::CheckCapability)
            }
            ScreenShareState::Sharing { publisher } => {
                let publisher = publisher.clone();
                self.state = ScreenShareState::Stopping {
                    publisher: publisher.clone(),
                };
                Ok(ToggleAction::Stop(publisher))
            }
            _ => Err(RoomError::ToggleInFlight),
        }
    }

    /// Apply a capability check result. `Ok` means publishing may start.
    pub fn capability_checked(
        &mut self,
        capability: ScreenShareCapability,
    ) -> Result<(), ScreenShareError> {
        if !capability.supported {
            self.state = ScreenShareState::Idle;
            return Err(ScreenShareError::Unsupported);
        }
        if capability.extension_required {
            self.state = ScreenShareState::Idle;
            return Err(ScreenShareError::ExtensionRequired);
        }
        self.state = ScreenShareState::Starting;
        Ok(())
    }

    /// Apply the outcome of creating and publishing the screen publisher.
    pub fn start_completed(
        &mut self,
        result: Result<PublisherId, ScreenShareError>,
    ) -> Result<StartOutcome, ScreenShareError> {
        let early_stops = std::mem::take(&mut self.early_stops);

        match result {
            Ok(publisher) => {
                let cause = early_stops
                    .into_iter()
                    .find(|(stopped, _)| *stopped == publisher)
                    .map(|(_, cause)| cause);

                match cause {
                    Some(cause) => {
                        self.state = ScreenShareState::Stopping {
                            publisher: publisher.clone(),
                        };
                        Ok(StartOutcome::StoppedEarly { publisher, cause })
                    }
                    None => {
                        self.state = ScreenShareState::Sharing { publisher };
                        Ok(StartOutcome::Sharing)
                    }
                }
            }
            Err(e) => {
                self.state = ScreenShareState::Idle;
                Err(e)
            }
        }
    }

    /// A local publisher's stream ended outside the app.
    pub fn external_stop(
        &mut self,
        publisher: &PublisherId,
        cause: &StreamDestroyedReason,
    ) -> ExternalStop {
        match &self.state {
            ScreenShareState::Sharing { publisher: current } if current == publisher => {
                self.state = ScreenShareState::Stopping {
                    publisher: publisher.clone(),
                };
                ExternalStop::Teardown
            }
            ScreenShareState::Starting => {
                self.early_stops.push((publisher.clone(), cause.clone()));
                ExternalStop::Deferred
            }
            _ => ExternalStop::Ignored,
        }
    }

    /// The screen publisher is gone.
    pub fn stop_completed(&mut self) {
        self.state = ScreenShareState::Idle;
    }

    pub fn reset(&mut self) {
        self.state = ScreenShareState::Idle;
        self.early_stops.clear();
    }
}
