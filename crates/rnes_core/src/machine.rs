use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// The processor status register (`P`).
    #[derive(Default)]
    pub struct StatusFlags: u8 {
        const CARRY = 0b0000_0001;
        const ZERO = 0b0000_0010;
        const IRQ_DISABLE = 0b0000_0100;
        const DECIMAL = 0b0000_1000;
        const BREAK = 0b0001_0000;
        const UNUSED = 0b0010_0000;
        const OVERFLOW = 0b0100_0000;
        const NEGATIVE = 0b1000_0000;
    }
}

impl StatusFlags {
    /// Flag mnemonics from bit 7 down to bit 0.
    pub const NAMES: [(char, StatusFlags); 8] = [
        ('N', StatusFlags::NEGATIVE),
        ('V', StatusFlags::OVERFLOW),
        ('-', StatusFlags::UNUSED),
        ('B', StatusFlags::BREAK),
        ('D', StatusFlags::DECIMAL),
        ('I', StatusFlags::IRQ_DISABLE),
        ('Z', StatusFlags::ZERO),
        ('C', StatusFlags::CARRY),
    ];
}

/// Register snapshot of the emulated CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    pub accumulator: u8,
    pub x_register: u8,
    pub y_register: u8,
    pub status_flags: u8,
    pub stack_pointer: u8,
    pub program_counter: u16,
}

impl MachineState {
    /// Register contents right after power-on or reset, before the reset vector is known.
    pub const POWER_ON: MachineState = MachineState {
        accumulator: 0,
        x_register: 0,
        y_register: 0,
        status_flags: 0x24,
        stack_pointer: 0xFD,
        program_counter: 0,
    };

    pub fn flags(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.status_flags)
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::POWER_ON
    }
}
