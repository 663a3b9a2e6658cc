use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const PRG_ROM_PAGE_SIZE: usize = 16 * 1024;
pub const CHR_ROM_PAGE_SIZE: usize = 8 * 1024;

const MAGIC: &[u8; 4] = b"NES\x1A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("file is {0} bytes, too short for an iNES header")]
    TooShort(usize),
    #[error("missing iNES signature")]
    BadMagic,
    #[error("header declares {expected} bytes but the file holds {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("header declares no PRG ROM")]
    NoPrgRom,
}

/// Represents the 16 byte iNES header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub prg_rom_size: usize,
    /// `0` means the board uses CHR RAM instead.
    pub chr_rom_size: usize,
    pub mapper_id: u8,
    pub mirroring: Mirroring,
    /// Battery backed PRG RAM at `$6000-$7FFF`
    pub has_battery: bool,
    /// A 512 byte trainer sits between the header and PRG ROM.
    pub has_trainer: bool,
}

impl CartridgeHeader {
    /// Parse the header at the start of `rom`.
    ///
    /// # Arguments
    ///
    /// * `rom` - The full file's binary contents.
    pub fn parse(rom: &[u8]) -> Result<Self, CartridgeError> {
        if rom.len() < HEADER_SIZE {
            return Err(CartridgeError::TooShort(rom.len()));
        }

        if &rom[0..4] != MAGIC {
            return Err(CartridgeError::BadMagic);
        }

        let flags6 = rom[6];
        let flags7 = rom[7];

        let mirroring = match (flags6 & 0x08 != 0, flags6 & 0x01 != 0) {
            (true, _) => Mirroring::FourScreen,
            (false, true) => Mirroring::Vertical,
            (false, false) => Mirroring::Horizontal,
        };

        let header = Self {
            prg_rom_size: rom[4] as usize * PRG_ROM_PAGE_SIZE,
            chr_rom_size: rom[5] as usize * CHR_ROM_PAGE_SIZE,
            mapper_id: (flags7 & 0xF0) | (flags6 >> 4),
            mirroring,
            has_battery: flags6 & 0x02 != 0,
            has_trainer: flags6 & 0x04 != 0,
        };

        if header.prg_rom_size == 0 {
            return Err(CartridgeError::NoPrgRom);
        }

        Ok(header)
    }

    pub fn prg_rom_offset(&self) -> usize {
        HEADER_SIZE + if self.has_trainer { TRAINER_SIZE } else { 0 }
    }

    pub fn chr_rom_offset(&self) -> usize {
        self.prg_rom_offset() + self.prg_rom_size
    }

    /// The minimum file size this header describes.
    pub fn expected_len(&self) -> usize {
        self.chr_rom_offset() + self.chr_rom_size
    }
}

pub struct Cartridge {
    header: CartridgeHeader,
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
}

impl Cartridge {
    pub fn from_bytes(rom: &[u8]) -> Result<Self, CartridgeError> {
        let header = CartridgeHeader::parse(rom)?;

        if rom.len() < header.expected_len() {
            return Err(CartridgeError::SizeMismatch {
                expected: header.expected_len(),
                actual: rom.len(),
            });
        }

        let prg_start = header.prg_rom_offset();
        let chr_start = header.chr_rom_offset();

        Ok(Self {
            prg_rom: rom[prg_start..chr_start].to_vec(),
            chr_rom: rom[chr_start..header.expected_len()].to_vec(),
            header,
        })
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    /// The little endian word at `$FFFC`.
    ///
    /// PRG ROM is mapped so that its last bytes end up at the top of the address space, which holds for both 16 KiB
    /// (mirrored) and 32 KiB boards.
    pub fn reset_vector(&self) -> u16 {
        let len = self.prg_rom.len();
        u16::from_le_bytes([self.prg_rom[len - 4], self.prg_rom[len - 3]])
    }
}
