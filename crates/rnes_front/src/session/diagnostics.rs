use std::time::{Duration, Instant};

use rnes_core::{EngineError, MachineState};

/// Periodic machine state snapshots, independent of frame acquisition.
///
/// The interval runs from the moment a poll is issued, and a new poll is only issued once the previous one
/// resolved.
pub struct DiagnosticsPoller {
    interval: Duration,
    last_issued: Option<Instant>,
    in_flight: bool,
    cancelled: bool,
    latest: Option<MachineState>,
    failures: u64,
}

impl DiagnosticsPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_issued: None,
            in_flight: false,
            cancelled: false,
            latest: None,
            failures: 0,
        }
    }

    /// # Returns
    ///
    /// `true` if a snapshot should be requested now.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.cancelled || self.in_flight {
            return false;
        }

        let due = self
            .last_issued
            .map_or(true, |issued| now.saturating_duration_since(issued) >= self.interval);

        if due {
            self.last_issued = Some(now);
            self.in_flight = true;
        }

        due
    }

    pub fn request_failed(&mut self) {
        self.in_flight = false;
    }

    /// Failures keep the previous snapshot on display.
    pub fn on_response(&mut self, result: Result<MachineState, EngineError>) {
        self.in_flight = false;

        if self.cancelled {
            return;
        }

        match result {
            Ok(state) => self.latest = Some(state),
            Err(e) => {
                self.failures += 1;
                log::warn!("Failed to poll machine state: {}", e);
            }
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn latest(&self) -> Option<&MachineState> {
        self.latest.as_ref()
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}
