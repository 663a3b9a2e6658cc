//! The presentation session: everything between the window and the engine channel.
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use winit::event::VirtualKeyCode;

use rnes_core::{ControllerState, MachineState, ProgramInfo};

use crate::runner::messages::{EngineRequest, EngineResponse, ToggleOrigin};
use crate::runner::EngineChannel;
use crate::session::diagnostics::DiagnosticsPoller;
use crate::session::errors::LoadError;
use crate::session::input::{InputTranslator, KeyBindings, KeyDisposition};
use crate::session::lifecycle::{Arming, LifecycleController, LifecycleEvent, ProgramStatus, TransitionError};
use crate::session::scheduler::AcquisitionScheduler;
use crate::session::surface::PresentationSurface;
use crate::session::test_mode::TestModeTracker;

pub mod diagnostics;
pub mod errors;
pub mod frame;
pub mod input;
pub mod lifecycle;
pub mod scheduler;
pub mod surface;
pub mod test_mode;

pub const ROM_EXTENSION: &str = "nes";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub diagnostics_interval: Duration,
    pub max_consecutive_decode_failures: Option<u32>,
    /// Stop right after the first program has loaded.
    pub start_paused: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            diagnostics_interval: Duration::from_millis(1000),
            max_consecutive_decode_failures: None,
            start_paused: false,
        }
    }
}

/// Owns all state shared between the presentation components, which is only ever touched from the UI thread.
pub struct Session {
    channel: EngineChannel,
    input: InputTranslator,
    lifecycle: LifecycleController,
    scheduler: AcquisitionScheduler,
    surface: PresentationSurface,
    diagnostics: DiagnosticsPoller,
    test_mode: TestModeTracker,
    program: Option<ProgramInfo>,
    /// Load requests sent but not yet answered. Only the answer to the last one counts.
    outstanding_loads: usize,
    pause_after_load: bool,
    disconnected: bool,
    torn_down: bool,
}

impl Session {
    pub fn new(channel: EngineChannel, bindings: KeyBindings, options: SessionOptions) -> Self {
        Self {
            channel,
            input: InputTranslator::new(bindings),
            lifecycle: LifecycleController::new(),
            scheduler: AcquisitionScheduler::new(options.max_consecutive_decode_failures),
            surface: PresentationSurface::default(),
            diagnostics: DiagnosticsPoller::new(options.diagnostics_interval),
            test_mode: TestModeTracker::default(),
            program: None,
            outstanding_loads: 0,
            pause_after_load: options.start_paused,
            disconnected: false,
            torn_down: false,
        }
    }

    /// Called once per display refresh.
    ///
    /// Handles every response which arrived since the last tick, then issues whatever requests are due.
    pub fn tick(&mut self, now: Instant) {
        profiling::scope!("Session Tick");

        if self.torn_down {
            return;
        }

        self.drain_responses();

        if self.disconnected {
            return;
        }

        if self.scheduler.tick() && !self.send(EngineRequest::ProduceFrame) {
            self.scheduler.request_failed();
            self.on_disconnect();
        }

        if self.diagnostics.tick(now) && !self.send(EngineRequest::ProduceMachineState) {
            self.diagnostics.request_failed();
            self.on_disconnect();
        }
    }

    /// A file picker is about to open.
    pub fn begin_selection(&mut self) -> Result<(), TransitionError> {
        self.lifecycle.handle(LifecycleEvent::SelectionStarted).map(|_| ())
    }

    /// The outcome of a file selection, `None` if it was cancelled.
    pub fn select_file(&mut self, path: Option<PathBuf>) {
        if self.torn_down {
            return;
        }

        let Some(path) = path else {
            self.transition(LifecycleEvent::SelectionCancelled);
            return;
        };

        log::info!("Selected {}", path.display());
        self.transition(LifecycleEvent::FileSelected);
        self.scheduler.invalidate_in_flight();
        self.program = None;

        if !is_rom_path(&path) {
            self.transition(LifecycleEvent::LoadFailed(LoadError::UnsupportedFile(path)));
            return;
        }

        if self.disconnected || !self.send(EngineRequest::LoadProgram(path)) {
            self.transition(LifecycleEvent::LoadFailed(LoadError::Disconnected));
            return;
        }

        self.outstanding_loads += 1;
    }

    /// Flip between running and stopped. Does not reload anything.
    pub fn toggle_running(&mut self) -> Result<(), TransitionError> {
        let arming = self.lifecycle.handle(LifecycleEvent::OperatorToggle)?;
        self.apply(arming);

        Ok(())
    }

    /// Ask the engine to toggle test mode, the local flag follows its answer.
    pub fn request_test_mode_toggle(&mut self) {
        self.send_test_mode_toggle(ToggleOrigin::Menu);
    }

    pub fn on_key_event(&mut self, key: VirtualKeyCode, pressed: bool) -> KeyDisposition {
        if self.torn_down {
            return KeyDisposition::Passthrough;
        }

        let outcome = self.input.on_key_event(key, pressed, &mut self.channel);

        if outcome.toggle_test_mode {
            self.send_test_mode_toggle(ToggleOrigin::Key);
        }

        outcome.disposition
    }

    /// Keys still held when the window loses focus will never report their release.
    pub fn on_focus_lost(&mut self) {
        if !self.torn_down {
            self.input.release_all(&mut self.channel);
        }
    }

    /// Stop both loops and ignore everything the engine still sends.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }

        log::info!("Tearing down session");
        self.torn_down = true;
        self.scheduler.cancel();
        self.diagnostics.cancel();
    }

    pub fn status(&self) -> &ProgramStatus {
        self.lifecycle.status()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn can_toggle_running(&self) -> bool {
        self.lifecycle.can_toggle()
    }

    pub fn frame_count(&self) -> u64 {
        self.scheduler.frame_count()
    }

    pub fn decode_failures(&self) -> u64 {
        self.scheduler.decode_failures()
    }

    pub fn test_mode_enabled(&self) -> bool {
        self.test_mode.enabled()
    }

    /// A test mode toggle is still waiting for the engine's answer.
    pub fn test_mode_pending(&self) -> bool {
        self.test_mode.is_pending()
    }

    pub fn machine_state(&self) -> Option<&MachineState> {
        self.diagnostics.latest()
    }

    pub fn diagnostics_failures(&self) -> u64 {
        self.diagnostics.failures()
    }

    pub fn program(&self) -> Option<&ProgramInfo> {
        self.program.as_ref()
    }

    pub fn controller_state(&self) -> ControllerState {
        self.input.state()
    }

    pub fn surface(&self) -> &PresentationSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut PresentationSurface {
        &mut self.surface
    }

    fn drain_responses(&mut self) {
        loop {
            match self.channel.try_recv() {
                Ok(Some(response)) => self.route(response),
                Ok(None) => break,
                Err(e) => {
                    if !self.disconnected {
                        log::error!("{}", e);
                    }
                    self.on_disconnect();
                    break;
                }
            }
        }
    }

    fn route(&mut self, response: EngineResponse) {
        if self.torn_down {
            return;
        }

        match response {
            EngineResponse::ProgramLoaded(result) => self.on_program_loaded(result),
            EngineResponse::Frame(result) => {
                if let Err(e) = self.scheduler.on_frame(result, &mut self.surface) {
                    self.transition(LifecycleEvent::AcquisitionFailed(e));
                }
            }
            EngineResponse::MachineState(result) => self.diagnostics.on_response(result),
            EngineResponse::InputRejected(e) => log::warn!("Engine rejected input: {}", e),
            EngineResponse::TestMode { origin, result } => self.test_mode.on_response(origin, result),
        }
    }

    fn on_program_loaded(&mut self, result: Result<ProgramInfo, rnes_core::EngineError>) {
        self.outstanding_loads = self.outstanding_loads.saturating_sub(1);

        if self.outstanding_loads > 0 {
            log::debug!("Ignoring superseded load result");
            return;
        }

        match result {
            Ok(info) => {
                log::info!("Loaded {}", info);

                if self.transition(LifecycleEvent::LoadSucceeded) {
                    self.program = Some(info);

                    if std::mem::take(&mut self.pause_after_load) {
                        self.transition(LifecycleEvent::OperatorToggle);
                    }
                }
            }
            Err(e) => {
                log::error!("Failed to load program: {}", e);
                self.transition(LifecycleEvent::LoadFailed(LoadError::Rejected(e.to_string())));
            }
        }
    }

    fn on_disconnect(&mut self) {
        if self.disconnected {
            return;
        }
        self.disconnected = true;
        self.diagnostics.cancel();

        if let Some(e) = self.scheduler.on_disconnect() {
            self.transition(LifecycleEvent::AcquisitionFailed(e));
        }

        if self.outstanding_loads > 0 {
            self.outstanding_loads = 0;
            self.transition(LifecycleEvent::LoadFailed(LoadError::Disconnected));
        }
    }

    fn send_test_mode_toggle(&mut self, origin: ToggleOrigin) {
        if self.torn_down || self.disconnected {
            log::warn!("Can't toggle test mode, the engine is not running");
            return;
        }

        if self.send(EngineRequest::ToggleTestMode(origin)) {
            self.test_mode.requested(origin);
        } else {
            self.on_disconnect();
        }
    }

    /// # Returns
    ///
    /// `false` if the engine thread is gone.
    fn send(&self, request: EngineRequest) -> bool {
        self.channel.send(request).is_ok()
    }

    /// Apply a lifecycle event, rejected events are logged and leave everything unchanged.
    fn transition(&mut self, event: LifecycleEvent) -> bool {
        match self.lifecycle.handle(event) {
            Ok(arming) => {
                self.apply(arming);
                true
            }
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    fn apply(&mut self, arming: Arming) {
        match arming {
            Arming::Arm { reset_counters } => {
                if reset_counters {
                    self.scheduler.reset_counters();
                }
                self.scheduler.set_running(true);
            }
            Arming::Disarm => self.scheduler.set_running(false),
            Arming::Unchanged => {}
        }
    }
}

pub fn is_rom_path(path: &Path) -> bool {
    path.extension()
        .map_or(false, |extension| extension.eq_ignore_ascii_case(ROM_EXTENSION))
}

#[cfg(test)]
mod tests {
    use rnes_core::cartridge::Mirroring;
    use rnes_core::{EngineError, RawFrame};

    use super::*;
    use crate::runner::{engine_channel, EngineEndpoint};

    /// A session whose engine is played by the test.
    struct Harness {
        session: Session,
        endpoint: EngineEndpoint,
        now: Instant,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_options(SessionOptions {
                diagnostics_interval: Duration::from_secs(3600),
                ..Default::default()
            })
        }

        fn with_options(options: SessionOptions) -> Self {
            let (channel, endpoint) = engine_channel();

            Self {
                session: Session::new(channel, KeyBindings::default(), options),
                endpoint,
                now: Instant::now(),
            }
        }

        fn tick(&mut self) {
            self.now += Duration::from_millis(16);
            self.session.tick(self.now);
        }

        /// Every request sent since the last call, machine state polls left out.
        fn requests(&self) -> Vec<EngineRequest> {
            self.endpoint
                .requests
                .try_iter()
                .filter(|request| *request != EngineRequest::ProduceMachineState)
                .collect()
        }

        fn respond(&self, response: EngineResponse) {
            self.endpoint.responses.send(response).unwrap();
        }

        /// Select and successfully load `game.nes`, ending with the first frame requested.
        fn load(&mut self) {
            self.session.select_file(Some("game.nes".into()));
            assert_eq!(self.requests(), vec![EngineRequest::LoadProgram("game.nes".into())]);

            self.respond(EngineResponse::ProgramLoaded(Ok(info())));
            self.tick();
            assert_eq!(self.session.status(), &ProgramStatus::Ready);
            assert_eq!(self.requests(), vec![EngineRequest::ProduceFrame]);
        }
    }

    fn info() -> ProgramInfo {
        ProgramInfo {
            name: "game.nes".to_string(),
            mapper_id: 0,
            mirroring: Mirroring::Vertical,
            prg_rom_size: 32 * 1024,
            chr_rom_size: 8 * 1024,
            has_battery: false,
        }
    }

    fn checkerboard() -> Vec<u8> {
        (0..256 * 240)
            .flat_map(|i| {
                let (x, y) = (i % 256, i / 256);
                if (x + y) % 2 == 0 {
                    [0, 0, 0, 255]
                } else {
                    [255, 255, 255, 255]
                }
            })
            .collect()
    }

    #[test]
    fn test_frames_presented_in_order() {
        let mut harness = Harness::new();
        harness.load();

        let payloads = [vec![0u8; 256 * 240 * 4], vec![255u8; 256 * 240 * 4], checkerboard()];

        for (i, payload) in payloads.iter().enumerate() {
            harness.respond(EngineResponse::Frame(Ok(RawFrame::rgba(256, 240, payload.clone()))));
            harness.tick();

            assert_eq!(harness.session.surface().backbuffer().pixels(), &payload[..]);
            assert_eq!(harness.session.frame_count(), i as u64 + 1);
            assert_eq!(harness.requests(), vec![EngineRequest::ProduceFrame]);
        }
    }

    #[test]
    fn test_one_frame_request_outstanding() {
        let mut harness = Harness::new();
        harness.load();

        for _ in 0..10 {
            harness.tick();
        }

        assert!(harness.requests().is_empty());
    }

    #[test]
    fn test_key_edges_dispatch_full_state() {
        let mut harness = Harness::new();

        harness.session.on_key_event(VirtualKeyCode::Z, true);
        harness.session.on_key_event(VirtualKeyCode::Right, true);
        harness.session.on_key_event(VirtualKeyCode::Z, false);

        assert_eq!(
            harness.requests(),
            vec![
                EngineRequest::SetInputState(ControllerState {
                    a: true,
                    ..Default::default()
                }),
                EngineRequest::SetInputState(ControllerState {
                    a: true,
                    right: true,
                    ..Default::default()
                }),
                EngineRequest::SetInputState(ControllerState {
                    right: true,
                    ..Default::default()
                }),
            ]
        );
    }

    #[test]
    fn test_toggle_keeps_program_and_counter() {
        let mut harness = Harness::new();
        harness.load();
        harness.respond(EngineResponse::Frame(Ok(RawFrame::rgba(256, 240, vec![0; 256 * 240 * 4]))));
        harness.tick();
        harness.requests();

        harness.session.toggle_running().unwrap();
        assert_eq!(harness.session.status(), &ProgramStatus::Stopped);

        harness.respond(EngineResponse::Frame(Ok(RawFrame::rgba(256, 240, vec![0; 256 * 240 * 4]))));
        harness.tick();
        harness.tick();
        assert!(harness.requests().is_empty(), "No fetches while stopped");

        harness.session.toggle_running().unwrap();
        harness.tick();

        assert_eq!(harness.requests(), vec![EngineRequest::ProduceFrame]);
        assert_eq!(harness.session.frame_count(), 2);
    }

    #[test]
    fn test_fetch_failure_then_reload() {
        let mut harness = Harness::new();
        harness.load();

        harness.respond(EngineResponse::Frame(Err(EngineError::Fault("ppu".to_string()))));
        harness.tick();

        assert_eq!(harness.session.status().to_string(), "error: engine fault: ppu");
        assert!(!harness.session.is_running());
        assert!(harness.requests().is_empty());
        assert!(harness.session.toggle_running().is_err());

        harness.load();
        assert!(harness.session.is_running());
    }

    #[test]
    fn test_decode_failure_is_not_fatal() {
        let mut harness = Harness::new();
        harness.load();

        harness.respond(EngineResponse::Frame(Ok(RawFrame::rgba(256, 240, vec![0; 100]))));
        harness.tick();

        assert_eq!(harness.session.status(), &ProgramStatus::Ready);
        assert_eq!(harness.session.decode_failures(), 1);
        assert!(harness.session.surface().placeholder().is_some());
        assert_eq!(harness.requests(), vec![EngineRequest::ProduceFrame]);
    }

    #[test]
    fn test_reload_discards_stale_frame() {
        let mut harness = Harness::new();
        harness.load();

        harness.session.select_file(Some("other.nes".into()));
        assert_eq!(harness.requests(), vec![EngineRequest::LoadProgram("other.nes".into())]);

        // Answers to the old frame request and the new load arrive together.
        harness.respond(EngineResponse::Frame(Ok(RawFrame::rgba(256, 240, vec![7; 256 * 240 * 4]))));
        harness.respond(EngineResponse::ProgramLoaded(Ok(info())));
        harness.tick();

        assert_eq!(harness.session.status(), &ProgramStatus::Ready);
        assert_eq!(harness.session.frame_count(), 0);
        assert_ne!(harness.session.surface().backbuffer().pixels()[0], 7);
        assert_eq!(harness.requests(), vec![EngineRequest::ProduceFrame]);
    }

    #[test]
    fn test_only_latest_load_counts() {
        let mut harness = Harness::new();

        harness.session.select_file(Some("first.nes".into()));
        harness.session.select_file(Some("second.nes".into()));
        harness.requests();

        harness.respond(EngineResponse::ProgramLoaded(Ok(info())));
        harness.tick();
        assert_eq!(harness.session.status(), &ProgramStatus::Loading);

        harness.respond(EngineResponse::ProgramLoaded(Err(EngineError::NoProgram)));
        harness.tick();
        assert_eq!(harness.session.status().to_string(), "error: no program is loaded");
        assert!(harness.session.program().is_none());
    }

    #[test]
    fn test_unsupported_file() {
        let mut harness = Harness::new();

        harness.session.select_file(Some("notes.txt".into()));

        assert!(matches!(harness.session.status(), ProgramStatus::Error(_)));
        assert!(harness.requests().is_empty());
    }

    #[test]
    fn test_cancelled_selection() {
        let mut harness = Harness::new();
        harness.load();

        harness.session.begin_selection().unwrap();
        assert!(harness.session.begin_selection().is_err());
        harness.session.select_file(None);

        assert_eq!(harness.session.status(), &ProgramStatus::Ready);
        assert!(harness.requests().is_empty());
    }

    #[test]
    fn test_start_paused() {
        let mut harness = Harness::with_options(SessionOptions {
            start_paused: true,
            ..Default::default()
        });

        harness.session.select_file(Some("game.nes".into()));
        harness.respond(EngineResponse::ProgramLoaded(Ok(info())));
        harness.tick();

        assert_eq!(harness.session.status(), &ProgramStatus::Stopped);
        assert_eq!(harness.requests(), vec![EngineRequest::LoadProgram("game.nes".into())]);
    }

    #[test]
    fn test_test_mode_round_trip() {
        let mut harness = Harness::new();

        harness.session.request_test_mode_toggle();
        assert!(!harness.session.test_mode_enabled());
        assert!(harness.session.test_mode_pending());
        assert_eq!(harness.requests(), vec![EngineRequest::ToggleTestMode(ToggleOrigin::Menu)]);

        harness.respond(EngineResponse::TestMode {
            origin: ToggleOrigin::Menu,
            result: Ok(true),
        });
        harness.tick();
        assert!(harness.session.test_mode_enabled());
        assert!(!harness.session.test_mode_pending());

        let disposition = harness.session.on_key_event(VirtualKeyCode::Space, true);
        assert_eq!(disposition, KeyDisposition::Consumed);
        assert!(!harness.session.test_mode_enabled());
        assert_eq!(harness.requests(), vec![EngineRequest::ToggleTestMode(ToggleOrigin::Key)]);
    }

    #[test]
    fn test_diagnostics_run_while_stopped() {
        let (channel, endpoint) = engine_channel();
        let mut session = Session::new(channel, KeyBindings::default(), SessionOptions::default());
        let start = Instant::now();

        session.tick(start);
        assert_eq!(endpoint.requests.try_recv(), Ok(EngineRequest::ProduceMachineState));

        endpoint
            .responses
            .send(EngineResponse::MachineState(Ok(MachineState::POWER_ON)))
            .unwrap();
        session.tick(start + Duration::from_millis(500));
        assert!(endpoint.requests.try_recv().is_err());
        assert_eq!(session.machine_state(), Some(&MachineState::POWER_ON));

        session.tick(start + Duration::from_millis(1000));
        assert_eq!(endpoint.requests.try_recv(), Ok(EngineRequest::ProduceMachineState));

        endpoint
            .responses
            .send(EngineResponse::MachineState(Err(EngineError::Fault("bus".to_string()))))
            .unwrap();
        session.tick(start + Duration::from_millis(1016));
        assert_eq!(session.machine_state(), Some(&MachineState::POWER_ON));
        assert_eq!(session.diagnostics_failures(), 1);
    }

    #[test]
    fn test_disconnect_while_waiting() {
        let mut harness = Harness::new();
        harness.load();

        let Harness { mut session, endpoint, now } = harness;
        drop(endpoint);
        session.tick(now);

        assert_eq!(session.status().to_string(), "error: the engine stopped responding");

        session.select_file(Some("game.nes".into()));
        assert_eq!(session.status().to_string(), "error: the engine stopped responding");
    }

    #[test]
    fn test_teardown_stops_everything() {
        let mut harness = Harness::new();
        harness.load();

        harness.session.teardown();
        harness.respond(EngineResponse::Frame(Ok(RawFrame::rgba(256, 240, vec![7; 256 * 240 * 4]))));
        harness.tick();
        harness.session.on_key_event(VirtualKeyCode::Z, true);
        harness.session.select_file(Some("game.nes".into()));
        harness.session.request_test_mode_toggle();

        assert!(harness.endpoint.requests.try_recv().is_err());
        assert_eq!(harness.session.frame_count(), 0);
    }
}
