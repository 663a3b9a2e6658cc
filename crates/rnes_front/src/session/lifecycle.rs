use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::session::errors::{FetchError, LoadError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramStatus {
    Empty,
    /// A file picker is open.
    Selecting,
    Loading,
    Ready,
    Stopped,
    Error(String),
}

impl Display for ProgramStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramStatus::Empty => write!(f, "not loaded"),
            ProgramStatus::Selecting => write!(f, "selecting"),
            ProgramStatus::Loading => write!(f, "loading"),
            ProgramStatus::Ready => write!(f, "running"),
            ProgramStatus::Stopped => write!(f, "stopped"),
            ProgramStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    SelectionStarted,
    FileSelected,
    SelectionCancelled,
    LoadSucceeded,
    LoadFailed(LoadError),
    OperatorToggle,
    AcquisitionFailed(FetchError),
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::SelectionStarted => "start selection",
            LifecycleEvent::FileSelected => "select file",
            LifecycleEvent::SelectionCancelled => "cancel selection",
            LifecycleEvent::LoadSucceeded => "load succeeded",
            LifecycleEvent::LoadFailed(_) => "load failed",
            LifecycleEvent::OperatorToggle => "toggle running",
            LifecycleEvent::AcquisitionFailed(_) => "acquisition failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{event}` is not valid while {status}")]
pub struct TransitionError {
    pub event: &'static str,
    pub status: ProgramStatus,
}

/// What a transition asks of the acquisition scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arming {
    Arm { reset_counters: bool },
    Disarm,
    Unchanged,
}

/// The program status state machine. Transitions are the only way to change the status.
#[derive(Debug, Clone)]
pub struct LifecycleController {
    status: ProgramStatus,
    /// Status to return to when a selection is cancelled.
    before_selection: Option<ProgramStatus>,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self {
            status: ProgramStatus::Empty,
            before_selection: None,
        }
    }

    pub fn status(&self) -> &ProgramStatus {
        &self.status
    }

    pub fn can_toggle(&self) -> bool {
        matches!(self.status, ProgramStatus::Ready | ProgramStatus::Stopped)
    }

    pub fn handle(&mut self, event: LifecycleEvent) -> Result<Arming, TransitionError> {
        use ProgramStatus::*;

        let (next, arming) = match (&self.status, &event) {
            (Selecting | Loading, LifecycleEvent::SelectionStarted) => return Err(self.reject(&event)),
            (_, LifecycleEvent::SelectionStarted) => {
                self.before_selection = Some(self.status.clone());
                (Selecting, Arming::Unchanged)
            }
            (_, LifecycleEvent::FileSelected) => {
                self.before_selection = None;
                (Loading, Arming::Disarm)
            }
            (Selecting, LifecycleEvent::SelectionCancelled) => {
                let previous = self.before_selection.take().unwrap_or(Empty);
                (previous, Arming::Unchanged)
            }
            // Nothing to cancel.
            (_, LifecycleEvent::SelectionCancelled) => return Ok(Arming::Unchanged),
            (Loading, LifecycleEvent::LoadSucceeded) => (Ready, Arming::Arm { reset_counters: true }),
            (Loading, LifecycleEvent::LoadFailed(e)) => (Error(e.to_string()), Arming::Disarm),
            (Ready, LifecycleEvent::OperatorToggle) => (Stopped, Arming::Disarm),
            (Stopped, LifecycleEvent::OperatorToggle) => (Ready, Arming::Arm { reset_counters: false }),
            (Ready | Stopped | Selecting, LifecycleEvent::AcquisitionFailed(e)) => {
                self.before_selection = None;
                (Error(e.to_string()), Arming::Disarm)
            }
            _ => return Err(self.reject(&event)),
        };

        if next != self.status {
            log::info!("Program status: {} -> {}", self.status, next);
        }
        self.status = next;

        Ok(arming)
    }

    fn reject(&self, event: &LifecycleEvent) -> TransitionError {
        TransitionError {
            event: event.name(),
            status: self.status.clone(),
        }
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}
