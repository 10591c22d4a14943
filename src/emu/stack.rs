//! Push/pop on top of [`Ram`] and [SP][crate::plat::Register::SP].
//!
//! SP always addresses the most recently pushed value. The stack lives in
//! `0x00..=STACK_TOP`, so an empty stack has `SP == STACK_TOP`.

use crate::plat::STACK_TOP;

use super::{ram::Ram, registers::EmuRegisters, EmuError, EmuResult};

/// Decrements SP, then writes `value` at the new SP.
///
/// # Errors
///
/// Returns [`EmuError::StackOverflow`] if SP is already at address 0.
pub fn push(regs: &mut EmuRegisters, ram: &mut Ram, value: u8) -> EmuResult<()> {
    let sp = regs.sp();
    let sp = sp.checked_sub(1).ok_or(EmuError::StackOverflow { sp })?;
    regs.set_sp(sp);
    ram.write(sp, value);
    Ok(())
}

/// Reads the value at SP, then increments SP.
///
/// # Errors
///
/// Returns [`EmuError::StackUnderflow`] if the stack is empty.
pub fn pop(regs: &mut EmuRegisters, ram: &Ram) -> EmuResult<u8> {
    let sp = regs.sp();
    if sp >= STACK_TOP {
        return Err(EmuError::StackUnderflow { sp });
    }
    let value = ram.read(sp);
    regs.set_sp(sp + 1);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_decrements_first() {
        let mut regs = EmuRegisters::default();
        let mut ram = Ram::new();
        push(&mut regs, &mut ram, 42).unwrap();
        assert_eq!(regs.sp(), STACK_TOP - 1);
        assert_eq!(ram.read(STACK_TOP - 1), 42);
        assert_eq!(ram.read(STACK_TOP), 0);
    }

    #[test]
    fn test_lifo_round_trip() {
        let mut regs = EmuRegisters::default();
        let mut ram = Ram::new();
        let values = [1u8, 255, 0, 17, 42, 128];
        for v in values {
            push(&mut regs, &mut ram, v).unwrap();
        }
        let popped: Vec<u8> = (0..values.len())
            .map(|_| pop(&mut regs, &ram).unwrap())
            .collect();
        assert_eq!(popped, values.iter().rev().copied().collect::<Vec<_>>());
        assert_eq!(regs.sp(), STACK_TOP);
    }

    #[test]
    fn test_underflow() {
        let mut regs = EmuRegisters::default();
        let ram = Ram::new();
        assert!(matches!(
            pop(&mut regs, &ram),
            Err(EmuError::StackUnderflow { sp: STACK_TOP })
        ));
        assert_eq!(regs.sp(), STACK_TOP);
    }

    #[test]
    fn test_overflow() {
        let mut regs = EmuRegisters::default();
        let mut ram = Ram::new();
        regs.set_sp(1);
        push(&mut regs, &mut ram, 7).unwrap();
        assert_eq!(ram.read(0), 7);
        assert!(matches!(
            push(&mut regs, &mut ram, 8),
            Err(EmuError::StackOverflow { sp: 0 })
        ));
        assert_eq!(regs.sp(), 0);
    }
}
