use std::fmt::{Display, Formatter};
use std::path::Path;

use thiserror::Error;

use crate::cartridge::{CartridgeError, CartridgeHeader, Mirroring};
use crate::{ControllerState, MachineState, RawFrame};

pub mod preview;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no program is loaded")]
    NoProgram,
    #[error("could not read program: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid program: {0}")]
    InvalidProgram(#[from] CartridgeError),
    #[error("engine fault: {0}")]
    Fault(String),
}

/// Summary of a loaded program, shown in the status readout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub name: String,
    pub mapper_id: u8,
    pub mirroring: Mirroring,
    pub prg_rom_size: usize,
    pub chr_rom_size: usize,
    pub has_battery: bool,
}

impl ProgramInfo {
    pub fn new(name: impl Into<String>, header: &CartridgeHeader) -> Self {
        Self {
            name: name.into(),
            mapper_id: header.mapper_id,
            mirroring: header.mirroring,
            prg_rom_size: header.prg_rom_size,
            chr_rom_size: header.chr_rom_size,
            has_battery: header.has_battery,
        }
    }
}

impl Display for ProgramInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (mapper {}, {} KiB PRG, {} KiB CHR)",
            self.name,
            self.mapper_id,
            self.prg_rom_size / 1024,
            self.chr_rom_size / 1024
        )
    }
}

/// The capabilities the presentation layer consumes from an emulation engine.
///
/// Every call is made from a single engine thread, one at a time, in the order the requests were issued.
pub trait Engine: Send {
    /// Load the program at `path`, discarding whatever was loaded before.
    fn load_program(&mut self, path: &Path) -> Result<ProgramInfo, EngineError>;

    /// Advance emulation by one display refresh and return the rendered frame.
    fn produce_frame(&mut self) -> Result<RawFrame, EngineError>;

    fn produce_machine_state(&mut self) -> Result<MachineState, EngineError>;

    /// Replace the complete controller vector.
    fn set_input_state(&mut self, state: ControllerState) -> Result<(), EngineError>;

    /// Flip the engine's test mode.
    ///
    /// # Returns
    ///
    /// Whether test mode is enabled *after* the toggle.
    fn toggle_test_mode(&mut self) -> Result<bool, EngineError>;
}
