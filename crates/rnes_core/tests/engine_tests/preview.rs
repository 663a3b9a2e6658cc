use crate::setup;
use rnes_core::cartridge::Mirroring;
use rnes_core::{ControllerState, Engine, EngineError, MachineState, PreviewEngine, RawPixels, FRAMEBUFFER_SIZE};

#[test]
pub fn test_load_from_disk() {
    let path = setup::write_rom("reset.nes", &setup::build_rom(2, 1, 0xC004));
    let mut engine = PreviewEngine::new();

    let info = engine.load_program(&path).unwrap();

    assert_eq!(info.name, "reset.nes");
    assert_eq!(info.mirroring, Mirroring::Vertical);
    assert_eq!(info.prg_rom_size, 32 * 1024);
    assert_eq!(info.to_string(), "reset.nes (mapper 0, 32 KiB PRG, 8 KiB CHR)");

    let state = engine.produce_machine_state().unwrap();
    assert_eq!(state.program_counter, 0xC004);
    assert_eq!(state.status_flags, 0x24);
    assert_eq!(state.stack_pointer, 0xFD);
}

#[test]
pub fn test_missing_file() {
    let mut engine = PreviewEngine::new();
    let result = engine.load_program(std::path::Path::new("/definitely/not/here.nes"));

    assert!(matches!(result, Err(EngineError::Io(_))));
}

#[test]
pub fn test_invalid_image_keeps_previous_program() {
    let mut engine = PreviewEngine::new();
    engine.load_bytes("good.nes", &setup::build_rom(1, 1, 0x8000)).unwrap();

    let result = engine.load_bytes("bad.nes", b"not a rom at all");

    assert!(matches!(result, Err(EngineError::InvalidProgram(_))));
    assert_eq!(engine.program().unwrap().name, "good.nes");
    assert!(engine.produce_frame().is_ok());
}

#[test]
pub fn test_frames_require_program() {
    let mut engine = PreviewEngine::new();

    assert!(matches!(engine.produce_frame(), Err(EngineError::NoProgram)));
    assert_eq!(engine.produce_machine_state().unwrap(), MachineState::POWER_ON);
}

#[test]
pub fn test_frames_are_full_rgba() {
    let mut engine = PreviewEngine::new();
    engine.load_bytes("chr_ram.nes", &setup::build_rom(1, 0, 0x8000)).unwrap();

    for _ in 0..3 {
        let frame = engine.produce_frame().unwrap();
        assert_eq!((frame.width, frame.height), (256, 240));

        let RawPixels::Bytes(bytes) = frame.pixels else {
            panic!("Expected a byte payload")
        };
        assert_eq!(bytes.len(), FRAMEBUFFER_SIZE);
        assert!(bytes.chunks_exact(4).all(|pixel| pixel[3] == 0xFF));
    }

    assert_eq!(engine.frame_count(), 3);
}

#[test]
pub fn test_test_mode_toggle_reports_new_value() {
    let mut engine = PreviewEngine::new();

    assert!(engine.toggle_test_mode().unwrap());
    assert!(!engine.toggle_test_mode().unwrap());
    assert!(engine.toggle_test_mode().unwrap());
    assert!(engine.is_test_mode());
}

#[test]
pub fn test_input_changes_output() {
    let mut engine = PreviewEngine::new();
    engine.load_bytes("tiles.nes", &setup::build_rom(1, 1, 0x8000)).unwrap();
    let still = engine.produce_frame().unwrap();

    engine
        .set_input_state(ControllerState {
            down: true,
            ..Default::default()
        })
        .unwrap();
    let scrolled = engine.produce_frame().unwrap();

    assert_ne!(still.pixels, scrolled.pixels);
}
