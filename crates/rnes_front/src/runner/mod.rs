use std::thread::JoinHandle;

use anyhow::Context;
use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use thiserror::Error;

use rnes_core::Engine;

use crate::runner::messages::{EngineRequest, EngineResponse};

pub mod messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the engine thread is no longer running")]
pub struct Disconnected;

/// Create a connected pair of channel ends.
///
/// The [EngineChannel] lives on the UI thread, the [EngineEndpoint] is served by the engine thread. Tests drive the
/// endpoint by hand.
pub fn engine_channel() -> (EngineChannel, EngineEndpoint) {
    let (request_sender, request_receiver) = unbounded::<EngineRequest>();
    let (response_sender, response_receiver) = unbounded::<EngineResponse>();

    (
        EngineChannel {
            request_sender,
            response_receiver,
        },
        EngineEndpoint {
            requests: request_receiver,
            responses: response_sender,
        },
    )
}

/// The UI thread's end of the engine connection. Never blocks.
pub struct EngineChannel {
    request_sender: Sender<EngineRequest>,
    response_receiver: Receiver<EngineResponse>,
}

impl EngineChannel {
    pub fn send(&self, request: EngineRequest) -> Result<(), Disconnected> {
        log::trace!("Sending engine request: {:?}", request);

        self.request_sender.send(request).map_err(|_| Disconnected)
    }

    /// Take the next response if one is available.
    ///
    /// Responses which were already queued are still handed out after the engine thread has exited.
    pub fn try_recv(&self) -> Result<Option<EngineResponse>, Disconnected> {
        match self.response_receiver.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Disconnected),
        }
    }
}

/// The engine thread's end of the engine connection.
pub struct EngineEndpoint {
    pub requests: Receiver<EngineRequest>,
    pub responses: Sender<EngineResponse>,
}

pub struct EngineRunner {
    engine: Box<dyn Engine>,
}

impl EngineRunner {
    pub fn new(engine: Box<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Move the engine onto its own thread.
    pub fn run(self) -> anyhow::Result<(RunnerHandle, EngineChannel)> {
        let (channel, endpoint) = engine_channel();
        let exit_sender = channel.request_sender.clone();
        let mut engine = self.engine;

        let engine_thread = std::thread::Builder::new()
            .name("Engine Thread".to_string())
            .spawn(move || {
                profiling::register_thread!("Engine Thread");

                serve_requests(engine.as_mut(), endpoint);
            })
            .context("Failed to spawn the engine thread")?;

        Ok((
            RunnerHandle {
                current_thread: engine_thread,
                exit_sender,
            },
            channel,
        ))
    }
}

pub struct RunnerHandle {
    current_thread: JoinHandle<()>,
    exit_sender: Sender<EngineRequest>,
}

impl RunnerHandle {
    /// Stops the engine thread and blocks until it has completed.
    ///
    /// Requests queued before this call are still served first.
    pub fn stop(self) {
        let _ = self.exit_sender.send(EngineRequest::Exit);

        if self.current_thread.join().is_err() {
            log::error!("Engine thread panicked");
        }
    }
}

/// Serve requests strictly in arrival order until told to exit or the UI side hangs up.
pub fn serve_requests(engine: &mut dyn Engine, endpoint: EngineEndpoint) {
    while let Ok(request) = endpoint.requests.recv() {
        profiling::scope!("Engine Request");

        let response = match request {
            EngineRequest::Exit => break,
            EngineRequest::LoadProgram(path) => Some(EngineResponse::ProgramLoaded(engine.load_program(&path))),
            EngineRequest::ProduceFrame => Some(EngineResponse::Frame(engine.produce_frame())),
            EngineRequest::ProduceMachineState => Some(EngineResponse::MachineState(engine.produce_machine_state())),
            EngineRequest::SetInputState(state) => engine.set_input_state(state).err().map(EngineResponse::InputRejected),
            EngineRequest::ToggleTestMode(origin) => Some(EngineResponse::TestMode {
                origin,
                result: engine.toggle_test_mode(),
            }),
        };

        if let Some(response) = response {
            if endpoint.responses.send(response).is_err() {
                log::debug!("Frontend hung up, stopping engine thread");
                break;
            }
        }
    }

    log::debug!("Engine thread finished");
}
