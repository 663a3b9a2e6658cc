//! A reference engine that shows a cartridge's graphics without executing its program.
//!
//! Good enough to drive the frontend end to end: it parses real iNES images, produces a frame per request, reacts
//! to controller input and reports a register snapshot.
use std::path::Path;

use crate::cartridge::Cartridge;
use crate::engine::{Engine, EngineError, ProgramInfo};
use crate::{ControllerState, MachineState, RawFrame, DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAMEBUFFER_SIZE};

const WIDTH: usize = DISPLAY_WIDTH as usize;
const HEIGHT: usize = DISPLAY_HEIGHT as usize;

const TILE_SIZE: usize = 8;
const TILE_BYTES: usize = 16;
const TILES_PER_TABLE: usize = 256;
/// Pattern tables are laid out as 16x16 tile sheets in test mode.
const SHEET_TILES: usize = 16;
const SHEET_SIZE: usize = SHEET_TILES * TILE_SIZE;

type Rgba = [u8; 4];

const GREYSCALE: [Rgba; 4] = [
    [0x00, 0x00, 0x00, 0xFF],
    [0x55, 0x55, 0x55, 0xFF],
    [0xAA, 0xAA, 0xAA, 0xFF],
    [0xFF, 0xFF, 0xFF, 0xFF],
];

/// Background palettes built from 2C02 master palette entries.
const PALETTES: [[Rgba; 4]; 4] = [
    [
        [0x5C, 0x94, 0xFC, 0xFF],
        [0x80, 0xD0, 0x10, 0xFF],
        [0x00, 0xA8, 0x00, 0xFF],
        [0x00, 0x00, 0x00, 0xFF],
    ],
    [
        [0x00, 0x00, 0x00, 0xFF],
        [0xB5, 0x31, 0x20, 0xFF],
        [0xEA, 0x9E, 0x22, 0xFF],
        [0x88, 0x70, 0x00, 0xFF],
    ],
    [
        [0x00, 0x00, 0x00, 0xFF],
        [0xFF, 0xFF, 0xFF, 0xFF],
        [0x3F, 0xBF, 0xFF, 0xFF],
        [0x00, 0x58, 0xF8, 0xFF],
    ],
    GREYSCALE,
];

struct LoadedProgram {
    cartridge: Cartridge,
    info: ProgramInfo,
}

pub struct PreviewEngine {
    program: Option<LoadedProgram>,
    controller: ControllerState,
    /// Controller state as of the previous frame, used to detect press edges.
    previous_controller: ControllerState,
    machine: MachineState,
    test_mode: bool,
    frame_count: u64,
    scroll_x: usize,
    scroll_y: usize,
    palette: usize,
}

impl PreviewEngine {
    pub fn new() -> Self {
        Self {
            program: None,
            controller: ControllerState::default(),
            previous_controller: ControllerState::default(),
            machine: MachineState::POWER_ON,
            test_mode: false,
            frame_count: 0,
            scroll_x: 0,
            scroll_y: 0,
            palette: 0,
        }
    }

    /// Load an iNES image from memory.
    ///
    /// Test mode and the controller vector survive the reload, everything else is reset.
    pub fn load_bytes(&mut self, name: &str, rom: &[u8]) -> Result<ProgramInfo, EngineError> {
        let cartridge = Cartridge::from_bytes(rom)?;
        let info = ProgramInfo::new(name, cartridge.header());

        *self = Self {
            machine: MachineState {
                program_counter: cartridge.reset_vector(),
                ..MachineState::POWER_ON
            },
            program: Some(LoadedProgram {
                cartridge,
                info: info.clone(),
            }),
            controller: self.controller,
            previous_controller: self.controller,
            test_mode: self.test_mode,
            ..Self::new()
        };

        log::info!("Loaded {}", info);

        Ok(info)
    }

    pub fn program(&self) -> Option<&ProgramInfo> {
        self.program.as_ref().map(|program| &program.info)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    /// Scroll with the d-pad, cycle palettes on `A`/`B` press edges.
    fn apply_input(&mut self) {
        let held = self.controller;
        let a_edge = held.a && !self.previous_controller.a;
        let b_edge = held.b && !self.previous_controller.b;

        if held.right {
            self.scroll_x = (self.scroll_x + 1) % WIDTH;
        }
        if held.left {
            self.scroll_x = (self.scroll_x + WIDTH - 1) % WIDTH;
        }
        if held.down {
            self.scroll_y = (self.scroll_y + 1) % HEIGHT;
        }
        if held.up {
            self.scroll_y = (self.scroll_y + HEIGHT - 1) % HEIGHT;
        }

        if a_edge {
            self.palette = (self.palette + 1) % PALETTES.len();
        }
        if b_edge {
            self.palette = (self.palette + PALETTES.len() - 1) % PALETTES.len();
        }

        self.previous_controller = held;
    }

    /// Tile the whole CHR ROM across a plane the size of the screen.
    fn render_tiles(&self, chr: &[u8], out: &mut [u8]) {
        let tile_count = chr.len() / TILE_BYTES;
        let palette = &PALETTES[self.palette];

        for (y, row) in out.chunks_exact_mut(WIDTH * 4).enumerate() {
            let plane_y = (y + self.scroll_y) % HEIGHT;

            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let plane_x = (x + self.scroll_x) % WIDTH;
                let tile = ((plane_y / TILE_SIZE) * (WIDTH / TILE_SIZE) + plane_x / TILE_SIZE) % tile_count;
                let colour = tile_pixel(chr, tile, plane_x % TILE_SIZE, plane_y % TILE_SIZE);

                pixel.copy_from_slice(&palette[colour as usize]);
            }
        }
    }

    /// Boards with CHR RAM have nothing to show before their program runs, so animate a gradient instead.
    fn render_gradient(&self, out: &mut [u8]) {
        let t = self.frame_count as usize;

        for (y, row) in out.chunks_exact_mut(WIDTH * 4).enumerate() {
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                pixel.copy_from_slice(&[
                    (x + self.scroll_x + t) as u8,
                    (y + self.scroll_y) as u8,
                    (t / 2) as u8,
                    0xFF,
                ]);
            }
        }
    }
}

impl Default for PreviewEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for PreviewEngine {
    fn load_program(&mut self, path: &Path) -> Result<ProgramInfo, EngineError> {
        let rom = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.load_bytes(&name, &rom)
    }

    fn produce_frame(&mut self) -> Result<RawFrame, EngineError> {
        profiling::scope!("Preview Frame");

        if self.program.is_none() {
            return Err(EngineError::NoProgram);
        }

        self.apply_input();

        let mut pixels = vec![0; FRAMEBUFFER_SIZE];

        if let Some(program) = &self.program {
            let chr = program.cartridge.chr_rom();

            if self.test_mode {
                render_pattern_tables(chr, &mut pixels);
            } else if chr.is_empty() {
                self.render_gradient(&mut pixels);
            } else {
                self.render_tiles(chr, &mut pixels);
            }
        }

        self.frame_count += 1;

        Ok(RawFrame::rgba(DISPLAY_WIDTH, DISPLAY_HEIGHT, pixels))
    }

    fn produce_machine_state(&mut self) -> Result<MachineState, EngineError> {
        Ok(self.machine)
    }

    fn set_input_state(&mut self, state: ControllerState) -> Result<(), EngineError> {
        self.controller = state;
        Ok(())
    }

    fn toggle_test_mode(&mut self) -> Result<bool, EngineError> {
        self.test_mode = !self.test_mode;
        log::debug!("Test mode: {}", self.test_mode);

        Ok(self.test_mode)
    }
}

/// Draw both pattern tables side by side as greyscale sheets, vertically centred.
fn render_pattern_tables(chr: &[u8], out: &mut [u8]) {
    for pixel in out.chunks_exact_mut(4) {
        pixel.copy_from_slice(&GREYSCALE[0]);
    }

    let top = (HEIGHT - SHEET_SIZE) / 2;
    let tile_count = (chr.len() / TILE_BYTES).min(2 * TILES_PER_TABLE);

    for tile in 0..tile_count {
        let table = tile / TILES_PER_TABLE;
        let index = tile % TILES_PER_TABLE;
        let origin_x = table * SHEET_SIZE + (index % SHEET_TILES) * TILE_SIZE;
        let origin_y = top + (index / SHEET_TILES) * TILE_SIZE;

        for y in 0..TILE_SIZE {
            for x in 0..TILE_SIZE {
                let colour = tile_pixel(chr, tile, x, y);
                let offset = ((origin_y + y) * WIDTH + origin_x + x) * 4;

                out[offset..offset + 4].copy_from_slice(&GREYSCALE[colour as usize]);
            }
        }
    }
}

/// The 2-bit colour index of pixel (`x`, `y`) in `tile`.
fn tile_pixel(chr: &[u8], tile: usize, x: usize, y: usize) -> u8 {
    let base = tile * TILE_BYTES;
    let low = chr[base + y];
    let high = chr[base + y + 8];
    let shift = 7 - x;

    (((high >> shift) & 1) << 1) | ((low >> shift) & 1)
}
