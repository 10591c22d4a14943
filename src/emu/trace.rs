use std::fmt;

use super::{ram::Ram, registers::EmuRegisters};

/// A one-line dump of the machine state at the start of a cycle.
/// Registers are shown in hex and decimal.
///
/// ```text
/// PC=03 IR=82 FL=00 IE=1 | 00 09 | R0=08/008 R1=00/000 R2=00/000 R3=00/000 R4=00/000 R5=00/000 R6=00/000 R7=F4/244
/// ```
pub struct Trace<'a> {
    pub registers: &'a EmuRegisters,
    pub ram: &'a Ram,
}

impl<'a> Trace<'a> {
    pub fn new(registers: &'a EmuRegisters, ram: &'a Ram) -> Self {
        Self { registers, ram }
    }
}

impl fmt::Display for Trace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pc = self.registers.pc;
        write!(
            f,
            "PC={:02X} IR={:02X} FL={:02X} IE={} | {:02X} {:02X} |",
            pc,
            self.ram.read(pc),
            self.registers.fl.bits(),
            self.registers.ie as u8,
            self.ram.read(pc.wrapping_add(1)),
            self.ram.read(pc.wrapping_add(2)),
        )?;
        for (i, value) in self.registers.gp().iter().enumerate() {
            write!(f, " R{}={:02X}/{:03}", i, value, value)?;
        }
        Ok(())
    }
}
