use rnes_core::{EngineError, RawFrame};

use crate::session::errors::FetchError;
use crate::session::frame::decode;
use crate::session::surface::PresentationSurface;

#[derive(Debug, Clone, Copy)]
struct InFlight {
    /// The program changed after this request was sent.
    stale: bool,
}

/// Drives the fetch, decode, present cycle, one frame request at a time.
///
/// [AcquisitionScheduler::tick] is called on every display refresh whether or not acquisition is running, so a
/// restart only has to flip the running flag.
pub struct AcquisitionScheduler {
    running: bool,
    cancelled: bool,
    in_flight: Option<InFlight>,
    frame_count: u64,
    decode_failures: u64,
    consecutive_decode_failures: u32,
    max_consecutive_decode_failures: Option<u32>,
}

impl AcquisitionScheduler {
    /// # Arguments
    ///
    /// * `max_consecutive_decode_failures` - Halt after this many malformed frames in a row, `None` tolerates any
    /// amount.
    pub fn new(max_consecutive_decode_failures: Option<u32>) -> Self {
        Self {
            running: false,
            cancelled: false,
            in_flight: None,
            frame_count: 0,
            decode_failures: 0,
            consecutive_decode_failures: 0,
            max_consecutive_decode_failures,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn reset_counters(&mut self) {
        self.frame_count = 0;
        self.decode_failures = 0;
        self.consecutive_decode_failures = 0;
    }

    /// One refresh tick.
    ///
    /// # Returns
    ///
    /// `true` if a frame should be requested now. The request is then considered in flight until
    /// [AcquisitionScheduler::on_frame] sees its response.
    pub fn tick(&mut self) -> bool {
        if !self.running || self.cancelled || self.in_flight.is_some() {
            return false;
        }

        self.in_flight = Some(InFlight { stale: false });
        true
    }

    /// The request could not be sent, nothing is in flight after all.
    pub fn request_failed(&mut self) {
        self.in_flight = None;
    }

    /// Mark the outstanding request, if any, as belonging to the previous program.
    pub fn invalidate_in_flight(&mut self) {
        if let Some(in_flight) = &mut self.in_flight {
            in_flight.stale = true;
        }
    }

    /// Stop issuing requests for good. A response already in flight is discarded when it arrives.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.running = false;
    }

    /// Present a frame response, or a placeholder if it is malformed.
    ///
    /// Frames requested before a reload or teardown, and frames which were never requested, are dropped.
    pub fn on_frame(
        &mut self,
        result: Result<RawFrame, EngineError>,
        surface: &mut PresentationSurface,
    ) -> Result<(), FetchError> {
        profiling::scope!("Acquire Frame");

        let Some(in_flight) = self.in_flight.take() else {
            log::warn!("Received a frame which was never requested");
            return Ok(());
        };

        if in_flight.stale || self.cancelled {
            log::trace!("Discarding stale frame");
            return Ok(());
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("Failed to acquire frame: {}", e);
                self.running = false;
                return Err(FetchError::Engine(e.to_string()));
            }
        };

        match decode(raw) {
            Ok(frame) => {
                surface.present(frame);
                self.frame_count += 1;
                self.consecutive_decode_failures = 0;

                Ok(())
            }
            Err(e) => {
                log::warn!("Malformed frame: {}", e);
                surface.present_placeholder(e);
                self.decode_failures += 1;
                self.consecutive_decode_failures += 1;

                match self.max_consecutive_decode_failures {
                    Some(max) if self.consecutive_decode_failures >= max => {
                        self.running = false;
                        Err(FetchError::MalformedFrames(self.consecutive_decode_failures))
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    /// The engine went away.
    ///
    /// # Returns
    ///
    /// The error to surface if acquisition was live, `None` if nothing was lost.
    pub fn on_disconnect(&mut self) -> Option<FetchError> {
        let pending = self.in_flight.take().map_or(false, |in_flight| !in_flight.stale);

        if self.cancelled || !(pending || self.running) {
            return None;
        }

        self.running = false;
        Some(FetchError::Disconnected)
    }
}
