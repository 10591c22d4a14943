use std::{cell::RefCell, io::Write};

use anyhow::{Context, Result};
use easy_repl::{command, repl::LoopStatus, CommandStatus, Repl};

use super::{
    emulator::{EmuState, Emulator},
    EmuError,
};

/// Parses a memory address given as decimal or as `0x`-prefixed hex.
fn parse_addr(addr: &str) -> Result<u8> {
    match addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => addr.parse::<u8>(),
    }
    .with_context(|| format!("invalid address: {}", addr))
}

pub struct Debugger<'b, W: Write> {
    pub emu: RefCell<&'b mut Emulator<W>>,
    /// The fault that ended a step, handed back once the REPL closes.
    fault: RefCell<Option<EmuError>>,
}

impl<'b, W: Write> Debugger<'b, W> {
    pub fn new(emu: &'b mut Emulator<W>) -> Self {
        Self {
            emu: RefCell::new(emu),
            fault: RefCell::new(None),
        }
    }

    pub fn cont(&self) -> CommandStatus {
        self.emu.borrow_mut().state = EmuState::Continue;
        CommandStatus::Quit
    }

    /// Steps one instruction. A fault closes the REPL.
    pub fn step(&self) -> CommandStatus {
        match self.emu.borrow_mut().step() {
            Ok(()) => CommandStatus::Done,
            Err(e) => {
                eprintln!("fault: {}", e);
                *self.fault.borrow_mut() = Some(e);
                CommandStatus::Quit
            }
        }
    }

    pub fn halt(&self) -> CommandStatus {
        self.emu.borrow_mut().state = EmuState::Halt;
        CommandStatus::Quit
    }

    /// Settles the emulator state once the REPL has closed.
    ///
    /// # Errors
    ///
    /// Returns the fault raised by the last step, if there was one.
    pub fn finish(&self) -> Result<()> {
        if let Some(e) = self.fault.borrow_mut().take() {
            return Err(e.into());
        }
        // leaving the REPL any other way (e.g. EOF) ends the run
        let mut emu = self.emu.borrow_mut();
        if emu.state == EmuState::Pause {
            emu.state = EmuState::Halt;
        }
        Ok(())
    }

    pub fn repl(&self) -> Result<()> {
        let mut repl = Repl::builder()
            .description("LS-8 Debug REPL")
            .add(
                "c",
                command! {
                    "Continue execution",
                    () => || Ok(self.cont())
                },
            )
            .add(
                "s",
                command! {
                    "Step one instruction",
                    () => || Ok(self.step())
                },
            )
            .add(
                "bt",
                command! {
                    "Print last X instructions executed",
                    (x:usize) => |x| {
                        let emu = self.emu.borrow();
                        let skip = emu.instr_history.len().saturating_sub(x);
                        for (pc, instr) in emu.instr_history.iter().skip(skip) {
                            eprintln!("[{:02X}] {}", pc, instr);
                        }
                        Ok(CommandStatus::Done)
                    }
                },
            )
            .add(
                "pr",
                command! {
                    "Print the value of all registers",
                    () => || {
                        let emu = self.emu.borrow();
                        for (i, val) in emu.registers.gp().iter().enumerate() {
                            eprintln!("r{}={:02X} ({})", i, val, val);
                        }
                        eprintln!("pc={:02X}", emu.registers.pc);
                        eprintln!("fl={:02X} ({:?})", emu.registers.fl.bits(), emu.registers.fl);
                        eprintln!("ie={}", emu.registers.ie);
                        Ok(CommandStatus::Done)
                    }
                },
            )
            .add(
                "peek",
                command! {
                    "Peek a value from memory",
                    (addr:String) => |addr: String| {
                        let emu = self.emu.borrow();
                        let addr = parse_addr(&addr)?;
                        let val = emu.ram.read(addr);
                        eprintln!("{:02X}={:02X}", addr, val);
                        Ok(CommandStatus::Done)
                    }
                },
            )
            .add(
                "halt",
                command! {
                    "Halt execution",
                    () => || Ok(self.halt())
                },
            )
            .build()?;
        eprintln!("LS-8 Debug REPL");
        'repl: loop {
            eprintln!();
            {
                let emu = self.emu.borrow();
                eprintln!("{}", emu.trace());
                if let Some((pc, instr)) = emu.instr_history.back() {
                    eprintln!("Last instruction:\n[pc={:02X}] --> {}", pc, instr);
                }
            }

            let status = repl.next()?;
            if let LoopStatus::Break = status {
                break 'repl;
            }
            if self.emu.borrow().state == EmuState::Halt {
                break 'repl;
            }
        }
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emu::{emulator::EmuConfig, interrupts::ManualClock},
        plat::Register,
    };

    fn paused(program: &[u8]) -> Emulator<Vec<u8>> {
        let config = EmuConfig {
            start_paused: true,
            ..EmuConfig::default()
        };
        Emulator::with_io(program, config, Vec::new(), Box::new(ManualClock::new())).unwrap()
    }

    const DIV_BY_ZERO: [u8; 6] = [
        0b1000_0010, 0, 4, // LDI R0,4
        0b1010_0011, 0, 1, // DIV R0,R1
    ];

    #[test]
    fn test_parse_addr() {
        assert_eq!(parse_addr("248").unwrap(), 0xF8);
        assert_eq!(parse_addr("0xf8").unwrap(), 0xF8);
        assert_eq!(parse_addr("0XFF").unwrap(), 0xFF);
        assert!(parse_addr("256").is_err());
        assert!(parse_addr("zz").is_err());
    }

    #[test]
    fn test_start_paused() {
        let emu = paused(&[0b0000_0001]);
        assert_eq!(emu.state, EmuState::Pause);
    }

    #[test]
    fn test_step_stays_paused() {
        let mut emu = paused(&[0b1000_0010, 0, 8, 0b0000_0001]);
        {
            let dbg = Debugger::new(&mut emu);
            assert!(matches!(dbg.step(), CommandStatus::Done));
            assert!(dbg.finish().is_ok());
        }
        assert_eq!(emu.registers.read(Register::R0), 8);
        assert_eq!(emu.registers.pc, 3);
        // closing the REPL without `c` ends the run
        assert_eq!(emu.state, EmuState::Halt);
    }

    #[test]
    fn test_continue_runs_to_halt() {
        let mut emu = paused(&[0b1000_0010, 0, 8, 0b0100_0111, 0, 0b0000_0001]);
        {
            let dbg = Debugger::new(&mut emu);
            assert!(matches!(dbg.cont(), CommandStatus::Quit));
            dbg.finish().unwrap();
        }
        assert_eq!(emu.state, EmuState::Continue);
        emu.run_until_halt().unwrap();
        assert_eq!(emu.output, b"8\n");
    }

    #[test]
    fn test_halt_command() {
        let mut emu = paused(&[0b0000_0001]);
        {
            let dbg = Debugger::new(&mut emu);
            assert!(matches!(dbg.halt(), CommandStatus::Quit));
            dbg.finish().unwrap();
        }
        assert_eq!(emu.state, EmuState::Halt);
        assert_eq!(emu.registers.pc, 0);
    }

    #[test]
    fn test_step_fault_is_returned() {
        let mut emu = paused(&DIV_BY_ZERO);
        let dbg = Debugger::new(&mut emu);
        assert!(matches!(dbg.step(), CommandStatus::Done));
        assert!(matches!(dbg.step(), CommandStatus::Quit));

        let err = dbg.finish().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EmuError>(),
            Some(EmuError::DivisionByZero { addr: 3 })
        ));
        assert_eq!(dbg.emu.borrow().state, EmuState::Halt);
        // the fault is only reported once
        assert!(dbg.finish().is_ok());
    }
}
