use std::path::PathBuf;

use rnes_core::{ControllerState, EngineError, MachineState, ProgramInfo, RawFrame};

/// Which control asked for a test mode toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOrigin {
    /// The reserved keyboard key, local state flips as soon as the request is sent.
    Key,
    /// The menu checkbox, local state only follows the engine's answer.
    Menu,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineRequest {
    /// Informs the engine thread that it should exit.
    Exit,
    LoadProgram(PathBuf),
    ProduceFrame,
    ProduceMachineState,
    SetInputState(ControllerState),
    ToggleTestMode(ToggleOrigin),
}

#[derive(Debug)]
pub enum EngineResponse {
    ProgramLoaded(Result<ProgramInfo, EngineError>),
    Frame(Result<RawFrame, EngineError>),
    MachineState(Result<MachineState, EngineError>),
    /// `SetInputState` only answers when it failed.
    InputRejected(EngineError),
    TestMode {
        origin: ToggleOrigin,
        result: Result<bool, EngineError>,
    },
}
