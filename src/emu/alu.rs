use std::fmt;

use crate::plat::{Opcode, PlatformError, Register};

use super::{
    registers::{EmuRegisters, Fl},
    EmuError, EmuResult,
};

/// The ALU's mode of operation, one per ALU opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AluMode {
    Add = 0,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Shl,
    Inc,
    Dec,
    Cmp,
}

impl AluMode {
    /// Whether this mode only uses its left operand.
    pub fn is_unary(self) -> bool {
        matches!(self, AluMode::Inc | AluMode::Dec)
    }

    /// Performs the operation on `regA` (and `regB` for binary modes), storing results in `regA` or `FL`.
    ///
    /// All arithmetic wraps at 8 bits. `SHL` by 8 or more clears the register.
    ///
    /// # Errors
    ///
    /// Returns [`EmuError::DivisionByZero`] if `DIV` is given a zero divisor, and
    /// [`EmuError::MissingOperand`] if a binary mode is given no `regB`.
    pub fn apply(self, regs: &mut EmuRegisters, a: Register, b: Option<Register>) -> EmuResult<()> {
        let left = regs.read(a);
        let right = b
            .map(|b| regs.read(b))
            .ok_or(EmuError::MissingOperand(self));
        let result = match self {
            AluMode::Inc => left.wrapping_add(1),
            AluMode::Dec => left.wrapping_sub(1),
            AluMode::Add => left.wrapping_add(right?),
            AluMode::Sub => left.wrapping_sub(right?),
            AluMode::Mul => left.wrapping_mul(right?),
            AluMode::Div => left
                .checked_div(right?)
                .ok_or(EmuError::DivisionByZero { addr: regs.pc })?,
            AluMode::And => left & right?,
            AluMode::Or => left | right?,
            AluMode::Xor => left ^ right?,
            AluMode::Shl => left.checked_shl(right? as u32).unwrap_or(0),
            AluMode::Cmp => {
                let ord = left.cmp(&right?);
                regs.fl.remove(Fl::LT | Fl::GT | Fl::EQ);
                regs.fl.insert(match ord {
                    std::cmp::Ordering::Less => Fl::LT,
                    std::cmp::Ordering::Greater => Fl::GT,
                    std::cmp::Ordering::Equal => Fl::EQ,
                });
                return Ok(());
            }
        };
        regs.write(a, result);
        Ok(())
    }
}

impl TryFrom<Opcode> for AluMode {
    type Error = PlatformError;

    fn try_from(op: Opcode) -> Result<Self, PlatformError> {
        match op {
            Opcode::Add => Ok(Self::Add),
            Opcode::Sub => Ok(Self::Sub),
            Opcode::Mul => Ok(Self::Mul),
            Opcode::Div => Ok(Self::Div),
            Opcode::And => Ok(Self::And),
            Opcode::Or => Ok(Self::Or),
            Opcode::Xor => Ok(Self::Xor),
            Opcode::Shl => Ok(Self::Shl),
            Opcode::Inc => Ok(Self::Inc),
            Opcode::Dec => Ok(Self::Dec),
            Opcode::Cmp => Ok(Self::Cmp),
            _ => Err(PlatformError::NotAluOp(op)),
        }
    }
}

impl fmt::Display for AluMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AluMode::Add => "ADD",
            AluMode::Sub => "SUB",
            AluMode::Mul => "MUL",
            AluMode::Div => "DIV",
            AluMode::And => "AND",
            AluMode::Or => "OR",
            AluMode::Xor => "XOR",
            AluMode::Shl => "SHL",
            AluMode::Inc => "INC",
            AluMode::Dec => "DEC",
            AluMode::Cmp => "CMP",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regs_with(a: u8, b: u8) -> EmuRegisters {
        let mut regs = EmuRegisters::default();
        regs.write(Register::R0, a);
        regs.write(Register::R1, b);
        regs
    }

    fn run(mode: AluMode, a: u8, b: u8) -> u8 {
        let mut regs = regs_with(a, b);
        mode.apply(&mut regs, Register::R0, Some(Register::R1)).unwrap();
        regs.read(Register::R0)
    }

    fn compare(a: u8, b: u8) -> Fl {
        let mut regs = regs_with(a, b);
        AluMode::Cmp
            .apply(&mut regs, Register::R0, Some(Register::R1))
            .unwrap();
        regs.fl
    }

    #[test]
    fn test_arithmetic_wraps() {
        assert_eq!(run(AluMode::Add, 8, 9), 17);
        assert_eq!(run(AluMode::Add, 200, 100), 44);
        assert_eq!(run(AluMode::Sub, 3, 5), 254);
        assert_eq!(run(AluMode::Mul, 16, 17), 16);
        assert_eq!(run(AluMode::Div, 17, 5), 3);
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(run(AluMode::And, 0b1100, 0b1010), 0b1000);
        assert_eq!(run(AluMode::Or, 0b1100, 0b1010), 0b1110);
        assert_eq!(run(AluMode::Xor, 0b1100, 0b1010), 0b0110);
    }

    #[test]
    fn test_shl_truncates() {
        assert_eq!(run(AluMode::Shl, 0b0000_0011, 2), 0b0000_1100);
        assert_eq!(run(AluMode::Shl, 0b1100_0001, 1), 0b1000_0010);
        assert_eq!(run(AluMode::Shl, 0xFF, 8), 0);
        assert_eq!(run(AluMode::Shl, 0xFF, 200), 0);
    }

    #[test]
    fn test_unary() {
        let mut regs = regs_with(255, 0);
        AluMode::Inc.apply(&mut regs, Register::R0, None).unwrap();
        assert_eq!(regs.read(Register::R0), 0);
        AluMode::Dec.apply(&mut regs, Register::R0, None).unwrap();
        assert_eq!(regs.read(Register::R0), 255);
    }

    #[test]
    fn test_div_by_zero() {
        let mut regs = regs_with(1, 0);
        regs.pc = 0x12;
        let err = AluMode::Div
            .apply(&mut regs, Register::R0, Some(Register::R1))
            .unwrap_err();
        assert!(matches!(err, EmuError::DivisionByZero { addr: 0x12 }));
        assert_eq!(regs.read(Register::R0), 1);
    }

    #[test]
    fn test_missing_operand() {
        let mut regs = regs_with(1, 2);
        let err = AluMode::Add.apply(&mut regs, Register::R0, None).unwrap_err();
        assert!(matches!(err, EmuError::MissingOperand(AluMode::Add)));
        assert_eq!(regs.read(Register::R0), 1);

        let err = AluMode::Cmp.apply(&mut regs, Register::R0, None).unwrap_err();
        assert!(matches!(err, EmuError::MissingOperand(AluMode::Cmp)));
        assert_eq!(regs.fl, Fl::empty());
    }

    #[test]
    fn test_unary_ignores_second_operand() {
        let mut regs = regs_with(41, 0);
        AluMode::Inc
            .apply(&mut regs, Register::R0, Some(Register::R1))
            .unwrap();
        assert_eq!(regs.read(Register::R0), 42);
        assert_eq!(regs.read(Register::R1), 0);
    }

    #[test]
    fn test_cmp_sets_exactly_one() {
        assert_eq!(compare(0, 255), Fl::LT);
        assert_eq!(compare(255, 0), Fl::GT);
        assert_eq!(compare(0, 0), Fl::EQ);
        assert_eq!(compare(255, 255), Fl::EQ);
        for a in (0..=255u8).step_by(15) {
            for b in (0..=255u8).step_by(17) {
                assert_eq!(compare(a, b).bits().count_ones(), 1, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_cmp_clears_previous() {
        let mut regs = regs_with(1, 2);
        regs.fl = Fl::GT | Fl::EQ;
        AluMode::Cmp
            .apply(&mut regs, Register::R0, Some(Register::R1))
            .unwrap();
        assert_eq!(regs.fl, Fl::LT);
    }

    #[test]
    fn test_non_alu_opcode() {
        assert_eq!(AluMode::try_from(Opcode::Cmp), Ok(AluMode::Cmp));
        assert_eq!(
            AluMode::try_from(Opcode::Ldi),
            Err(PlatformError::NotAluOp(Opcode::Ldi))
        );
    }
}
