//! The emulator/debugger module for LS-8.

use thiserror::Error;

use crate::plat::{PlatformError, MEM_SIZE};

pub mod alu;
pub mod debugger;
pub mod emulator;
pub mod interrupts;
pub mod ram;
pub mod registers;
pub mod stack;
pub mod trace;

/// A fault raised while executing a program. Every variant halts the machine.
#[derive(Debug, Error)]
pub enum EmuError {
    #[error("invalid instruction {opcode:#010b} ({opcode:#04x}) at address {addr:#04x}")]
    InvalidOpcode { opcode: u8, addr: u8 },
    #[error("instruction at {addr:#04x} reads past the end of memory")]
    FetchOverflow { addr: u8 },
    #[error("division by zero at address {addr:#04x}")]
    DivisionByZero { addr: u8 },
    #[error("{0} requires a second operand")]
    MissingOperand(alu::AluMode),
    #[error("stack overflow (SP={sp:#04x})")]
    StackOverflow { sp: u8 },
    #[error("stack underflow (SP={sp:#04x})")]
    StackUnderflow { sp: u8 },
    #[error("program image of {0} bytes does not fit in {} bytes of memory", MEM_SIZE)]
    ImageTooLarge(usize),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("console output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result<T, [EmuError]>.
pub type EmuResult<T> = Result<T, EmuError>;
