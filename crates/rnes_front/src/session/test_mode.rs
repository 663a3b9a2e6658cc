use std::collections::VecDeque;

use rnes_core::EngineError;

use crate::runner::messages::ToggleOrigin;

/// Local view of the engine's test mode flag.
///
/// Key toggles flip the local flag as soon as they are sent, menu toggles wait for the engine's answer. Answers
/// arrive in request order.
#[derive(Debug, Default)]
pub struct TestModeTracker {
    /// Last value the engine reported.
    confirmed: bool,
    local: bool,
    in_flight: VecDeque<ToggleOrigin>,
}

impl TestModeTracker {
    pub fn enabled(&self) -> bool {
        self.local
    }

    pub fn is_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// A toggle request was sent to the engine.
    pub fn requested(&mut self, origin: ToggleOrigin) {
        self.in_flight.push_back(origin);

        if origin == ToggleOrigin::Key {
            self.local = !self.local;
        }
    }

    pub fn on_response(&mut self, origin: ToggleOrigin, result: Result<bool, EngineError>) {
        match self.in_flight.pop_front() {
            Some(expected) if expected == origin => {}
            other => log::warn!("Unexpected test mode answer for {:?}, expected {:?}", origin, other),
        }

        match result {
            Ok(enabled) => self.confirmed = enabled,
            Err(e) => log::warn!("Engine refused to toggle test mode: {}", e),
        }

        let unanswered_key_toggles = self
            .in_flight
            .iter()
            .filter(|origin| **origin == ToggleOrigin::Key)
            .count();

        self.local = self.confirmed ^ (unanswered_key_toggles % 2 == 1);
    }
}
