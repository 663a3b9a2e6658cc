use rnes_core::cartridge::{CHR_ROM_PAGE_SIZE, HEADER_SIZE, PRG_ROM_PAGE_SIZE};
use std::path::PathBuf;

/// Build an iNES image with `prg_pages` PRG banks whose reset vector points at `reset`.
///
/// Every CHR tile is filled with its own index in the low plane, so tiles are distinguishable.
pub fn build_rom(prg_pages: u8, chr_pages: u8, reset: u16) -> Vec<u8> {
    let mut rom = vec![b'N', b'E', b'S', 0x1A, prg_pages, chr_pages, 0x01, 0x00];
    rom.resize(HEADER_SIZE, 0);

    let mut prg = vec![0xEA; prg_pages as usize * PRG_ROM_PAGE_SIZE];
    let len = prg.len();
    prg[len - 4..len - 2].copy_from_slice(&reset.to_le_bytes());
    rom.extend(prg);

    let chr = (0..chr_pages as usize * CHR_ROM_PAGE_SIZE).map(|i| if i % 16 < 8 { (i / 16) as u8 } else { 0 });
    rom.extend(chr);
    rom
}

/// Write `rom` to a fresh file in the system temp directory.
pub fn write_rom(name: &str, rom: &[u8]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rnes_core_tests_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("Could not create test directory");

    let path = dir.join(name);
    std::fs::write(&path, rom).expect("Could not write test ROM");
    path
}
