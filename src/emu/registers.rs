use crate::plat::{Register, STACK_TOP};

bitflags::bitflags! {
    /// The CPU status flags register, written by `CMP`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fl: u8 {
        /// Set if `regA < regB` at the last comparison.
        const LT = 0b100;
        /// Set if `regA > regB` at the last comparison.
        const GT = 0b010;
        /// Set if `regA == regB` at the last comparison.
        const EQ = 0b001;
    }
}

/// The full set of registers in the emulator.
///
/// The eight byte-wide general purpose registers are only reachable through
/// [`Register`]. `PC`, `FL` and `IE` can be modified directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmuRegisters {
    gp: [u8; 8],
    pub pc: u8,
    pub fl: Fl,
    /// Interrupts enabled.
    pub ie: bool,
}

impl EmuRegisters {
    pub fn read(&self, reg: Register) -> u8 {
        self.gp[reg.index()]
    }

    pub fn write(&mut self, reg: Register, value: u8) {
        self.gp[reg.index()] = value;
    }

    pub fn sp(&self) -> u8 {
        self.read(Register::SP)
    }

    pub fn set_sp(&mut self, value: u8) {
        self.write(Register::SP, value);
    }

    pub fn im(&self) -> u8 {
        self.read(Register::IM)
    }

    pub fn is(&self) -> u8 {
        self.read(Register::IS)
    }

    pub fn set_is(&mut self, value: u8) {
        self.write(Register::IS, value);
    }

    pub fn gp(&self) -> &[u8; 8] {
        &self.gp
    }
}

impl Default for EmuRegisters {
    fn default() -> Self {
        let mut gp = [0u8; 8];
        gp[Register::SP.index()] = STACK_TOP;
        Self {
            gp,
            pc: 0,
            fl: Fl::empty(),
            ie: true,
        }
    }
}
