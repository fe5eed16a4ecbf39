//! Video filter lifecycle.
//!
//! `Idle -> Applying -> Applied | Failed`, `Applied | Failed -> Clearing -> Idle`.
//! Only one apply or clear runs at a time. A failed apply keeps whatever
//! filter was active before it; a failed clear keeps the filter active.

use crate::errors::{FilterError, PlatformError, RoomError};
use crate::platform::VideoFilter;
use crate::state::{FilterPhase, FilterStatus};

/// Appended to background replacement failures.
pub const REPLACEMENT_FAILURE_HINT: &str =
    "the background image may be blocked by the network or content security policy";

#[derive(Debug, Default)]
pub struct FilterLifecycle {
    phase: FilterPhase,
    active: Option<VideoFilter>,
    requested: Option<VideoFilter>,
}

impl FilterLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> FilterStatus {
        FilterStatus {
            phase: self.phase,
            active: self.active.clone(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, FilterPhase::Applying | FilterPhase::Clearing)
    }

    /// Start applying `filter`.
    pub fn begin_apply(&mut self, filter: VideoFilter) -> Result<(), RoomError> {
        if self.is_busy() {
            return Err(RoomError::FilterBusy);
        }
        self.phase = FilterPhase::Applying;
        self.requested = Some(filter);
        Ok(())
    }

    /// Finish the running apply. Returns the filter now active.
    pub fn complete_apply(
        &mut self,
        result: Result<(), PlatformError>,
    ) -> Result<VideoFilter, FilterError> {
        let Some(filter) = self.requested.take() else {
            return Err(FilterError::Unavailable(
                "no filter application in progress".to_string(),
            ));
        };

        match result {
            Ok(()) => {
                self.phase = FilterPhase::Applied;
                self.active = Some(filter.clone());
                Ok(filter)
            }
            Err(e) => {
                self.phase = FilterPhase::Failed;
                let message = match filter {
                    VideoFilter::BackgroundReplacement { .. } => {
                        format!("{e} ({REPLACEMENT_FAILURE_HINT})")
                    }
                    VideoFilter::BackgroundBlur { .. } => e.to_string(),
                };
                Err(FilterError::Application {
                    label: filter.label().to_string(),
                    message,
                })
            }
        }
    }

    pub fn begin_clear(&mut self) -> Result<(), RoomError> {
        if self.is_busy() {
            return Err(RoomError::FilterBusy);
        }
        self.phase = FilterPhase::Clearing;
        Ok(())
    }

    pub fn complete_clear(&mut self, result: Result<(), PlatformError>) -> Result<(), FilterError> {
        match result {
            Ok(()) => {
                self.phase = FilterPhase::Idle;
                self.active = None;
                Ok(())
            }
            Err(e) => {
                self.phase = if self.active.is_some() {
                    FilterPhase::Applied
                } else {
                    FilterPhase::Idle
                };
                Err(FilterError::Clear(e.to_string()))
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
