//! Common platform code between LS-8's other modules.

use std::fmt;

use thiserror::Error;

/// Size of the addressable memory, in bytes.
pub const MEM_SIZE: usize = 256;
/// Initial value of [SP][Register::SP]. The stack grows downward from here.
pub const STACK_TOP: u8 = 0xF4;
/// Base address of the interrupt vector table (`0xF8`-`0xFF`).
pub const INTERRUPT_VECTORS: u8 = 0xF8;

/// [IS][Register::IS] bit raised by the timer.
pub const IS_TIMER: u8 = 1 << 0;
/// [IS][Register::IS] bit reserved for a keyboard source.
pub const IS_KEYBOARD: u8 = 1 << 1;

/// An error for the core platform of LS-8.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    #[error("invalid opcode {0:#010b}")]
    InvalidOpcode(u8),
    #[error("invalid register index {0}")]
    InvalidRegister(u8),
    #[error("{0} is not an ALU operation")]
    NotAluOp(Opcode),
}

/// Type alias for Result<T, [PlatformError]>.
pub type PResult<T> = Result<T, PlatformError>;

/// The eight registers in LS-8.
///
/// `R0` - `R4` are general purpose. `R5` - `R7` have reserved roles, see
/// [IM][Register::IM], [IS][Register::IS] and [SP][Register::SP].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Register {
    /// Interrupt mask
    pub const IM: Register = Register::R5;
    /// Interrupt status
    pub const IS: Register = Register::R6;
    /// Stack pointer
    pub const SP: Register = Register::R7;

    /// The registers saved on interrupt entry, in push order.
    pub const SAVED: [Register; 7] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Register {
    type Error = PlatformError;

    fn try_from(value: u8) -> Result<Self, PlatformError> {
        match value {
            0 => Ok(Self::R0),
            1 => Ok(Self::R1),
            2 => Ok(Self::R2),
            3 => Ok(Self::R3),
            4 => Ok(Self::R4),
            5 => Ok(Self::R5),
            6 => Ok(Self::R6),
            7 => Ok(Self::R7),
            _ => Err(PlatformError::InvalidRegister(value)),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", *self as u8)
    }
}

/// The opcodes understood by the CPU.
///
/// Every opcode byte is laid out as `AABCDDDD`:
///
/// - `AA` is the number of operands (0-2) following the opcode.
/// - `B` is set on ALU operations.
/// - `C` is set if the instruction sets [PC][Register] itself.
/// - `DDDD` identifies the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /* Control */
    /// Stops the clock
    Hlt = 0b0000_0001,
    /// `PC <- pop()`
    Ret = 0b0001_0001,
    /// Return from an interrupt handler, restoring the saved context.
    Iret = 0b0001_0011,

    /* Stack */
    /// `push(regA)`
    Push = 0b0100_0101,
    /// `regA <- pop()`
    Pop = 0b0100_0110,

    /* Console */
    /// Prints `regA` as a decimal integer followed by a newline.
    Prn = 0b0100_0111,
    /// Prints the character whose code point is `regA`.
    Pra = 0b0100_1000,

    /* Branching */
    /// `push(PC + 2); PC <- regA`
    Call = 0b0101_0000,
    /// `PC <- regA`
    Jmp = 0b0101_0100,
    /// "Jump if Equal"
    Jeq = 0b0101_0101,
    /// "Jump if Not Equal"
    Jne = 0b0101_0110,
    /// "Jump if Less Than"
    Jlt = 0b0101_1000,
    /// "Jump if Less than or Equal"
    Jle = 0b0101_1001,

    /* ALU, unary */
    /// `regA <- regA + 1`
    Inc = 0b0110_0101,
    /// `regA <- regA - 1`
    Dec = 0b0110_0110,

    /* Memory */
    /// `regA <- (immediate value)`
    Ldi = 0b1000_0010,
    /// `regA <- mem[regB]`
    Ld = 0b1000_0011,
    /// `mem[regA] <- regB`
    St = 0b1000_0100,

    /* ALU, binary */
    /// `regA <- regA + regB`
    Add = 0b1010_0000,
    /// `regA <- regA - regB`
    Sub = 0b1010_0001,
    /// `regA <- regA * regB`
    Mul = 0b1010_0010,
    /// `regA <- regA / regB`
    Div = 0b1010_0011,
    /// Compares `regA` with `regB`, setting exactly one of the `FL` bits.
    Cmp = 0b1010_0111,
    /// `regA <- regA & regB`
    And = 0b1010_1000,
    /// `regA <- regA | regB`
    Or = 0b1010_1010,
    /// `regA <- regA ^ regB`
    Xor = 0b1010_1011,
    /// `regA <- regA << regB`
    Shl = 0b1010_1100,
}

impl Opcode {
    /// Every opcode in the instruction set.
    pub const ALL: [Opcode; 27] = [
        Opcode::Hlt,
        Opcode::Ret,
        Opcode::Iret,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Prn,
        Opcode::Pra,
        Opcode::Call,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
        Opcode::Jlt,
        Opcode::Jle,
        Opcode::Inc,
        Opcode::Dec,
        Opcode::Ldi,
        Opcode::Ld,
        Opcode::St,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Cmp,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Shl,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Ret => "RET",
            Opcode::Iret => "IRET",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Prn => "PRN",
            Opcode::Pra => "PRA",
            Opcode::Call => "CALL",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
            Opcode::Jlt => "JLT",
            Opcode::Jle => "JLE",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Ldi => "LDI",
            Opcode::Ld => "LD",
            Opcode::St => "ST",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Cmp => "CMP",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Shl => "SHL",
        }
    }

    pub fn operand_count(self) -> u8 {
        operand_count(self as u8)
    }

    pub fn width(self) -> u8 {
        instruction_width(self as u8)
    }

    pub fn sets_pc(self) -> bool {
        sets_pc(self as u8)
    }

    pub fn is_alu(self) -> bool {
        is_alu(self as u8)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = PlatformError;

    fn try_from(value: u8) -> Result<Self, PlatformError> {
        Opcode::ALL
            .into_iter()
            .find(|op| *op as u8 == value)
            .ok_or(PlatformError::InvalidOpcode(value))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Number of operand bytes following the opcode byte (bits 7-6).
pub fn operand_count(byte: u8) -> u8 {
    (byte >> 6) & 0b11
}

/// Total instruction width in bytes, opcode included.
pub fn instruction_width(byte: u8) -> u8 {
    operand_count(byte) + 1
}

/// Whether the instruction sets PC itself (bit 4).
pub fn sets_pc(byte: u8) -> bool {
    (byte >> 4) & 0b1 == 1
}

/// Whether the instruction is handled by the ALU (bit 5).
pub fn is_alu(byte: u8) -> bool {
    (byte >> 5) & 0b1 == 1
}

/// A decoded instruction word: one opcode and up to two operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub op: Opcode,
    pub operands: [u8; 2],
}

impl Instruction {
    pub fn new(op: Opcode, operands: [u8; 2]) -> Self {
        Self { op, operands }
    }

    pub fn width(self) -> u8 {
        self.op.width()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.operands;
        match (self.op, self.op.operand_count()) {
            (op, 0) => write!(f, "{}", op),
            (op, 1) => write!(f, "{} R{}", op, a),
            (Opcode::Ldi, _) => write!(f, "LDI R{}, {}", a, b),
            (op, _) => write!(f, "{} R{}, R{}", op, a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_decode() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op as u8), Ok(op));
        }
        assert_eq!(
            Opcode::try_from(0b1111_1111),
            Err(PlatformError::InvalidOpcode(0xFF))
        );
        assert_eq!(
            Opcode::try_from(0),
            Err(PlatformError::InvalidOpcode(0))
        );
    }

    #[test]
    fn test_opcode_fields() {
        assert_eq!(Opcode::Hlt.width(), 1);
        assert_eq!(Opcode::Prn.width(), 2);
        assert_eq!(Opcode::Ldi.width(), 3);
        assert!(Opcode::Jmp.sets_pc());
        assert!(Opcode::Iret.sets_pc());
        assert!(!Opcode::Push.sets_pc());
        assert!(Opcode::Cmp.is_alu());
        assert!(Opcode::Inc.is_alu());
        assert!(!Opcode::Ldi.is_alu());
    }

    #[test]
    fn test_register_decode() {
        assert_eq!(Register::try_from(7), Ok(Register::SP));
        assert_eq!(Register::try_from(5), Ok(Register::IM));
        assert_eq!(
            Register::try_from(8),
            Err(PlatformError::InvalidRegister(8))
        );
    }

    #[test]
    fn test_instruction_disassemble() {
        assert_eq!(Instruction::new(Opcode::Ldi, [0, 8]).to_string(), "LDI R0, 8");
        assert_eq!(Instruction::new(Opcode::Add, [0, 1]).to_string(), "ADD R0, R1");
        assert_eq!(Instruction::new(Opcode::Prn, [0, 0]).to_string(), "PRN R0");
        assert_eq!(Instruction::new(Opcode::Hlt, [0, 0]).to_string(), "HLT");
    }
}
