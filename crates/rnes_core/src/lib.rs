pub mod cartridge;
pub mod engine;
pub mod frame;
pub mod input;
pub mod machine;

pub use engine::preview::PreviewEngine;
pub use engine::{Engine, EngineError, ProgramInfo};
pub use frame::{RawFrame, RawPixels};
pub use input::{Button, ControllerState};
pub use machine::{MachineState, StatusFlags};

/// Width of the frames produced by the [PreviewEngine].
pub const DISPLAY_WIDTH: u32 = 256;
/// Height of the frames produced by the [PreviewEngine].
pub const DISPLAY_HEIGHT: u32 = 240;
/// The total framebuffer size of one native frame.
/// Format is `RGBA_u8`.
pub const FRAMEBUFFER_SIZE: usize = (DISPLAY_WIDTH * DISPLAY_HEIGHT * 4) as usize;
