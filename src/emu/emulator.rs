use std::{
    collections::VecDeque,
    io::{self, Stdout, Write},
    time::Duration,
};

use anyhow::Result;

use crate::plat::{self, Instruction, Opcode, Register};

use super::{
    alu::AluMode,
    debugger::Debugger,
    interrupts::{self, Clock, SystemClock, Timer},
    ram::Ram,
    registers::{EmuRegisters, Fl},
    stack,
    trace::Trace,
    EmuError, EmuResult,
};

/// The emulator's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmuState {
    /// The emulator is allowed to run.
    Continue,
    /// Stops execution and hands control to the [`Debugger`], without putting the emulator in a hard [`Halt`][EmuState::Halt] state.
    Pause,
    /// Halt execution.
    Halt,
}

/// How the program counter moves once an instruction has executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcUpdate {
    /// Advance PC past the instruction.
    Advance,
    /// The instruction already set PC. Used for taken jumps, calls and returns.
    Set,
}

/// Runtime settings for an [`Emulator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmuConfig {
    /// How often the timer raises its interrupt line.
    pub timer_period: Duration,
    /// How many executed instructions to remember for the debugger.
    pub history_len: usize,
    /// Start in the debugger instead of running straight away.
    pub start_paused: bool,
}

impl Default for EmuConfig {
    fn default() -> Self {
        Self {
            timer_period: Duration::from_secs(1),
            history_len: 64,
            start_paused: false,
        }
    }
}

/// The main emulation context for LS-8.
pub struct Emulator<W: Write = Stdout> {
    pub registers: EmuRegisters,
    pub ram: Ram,
    pub state: EmuState,
    /// Recently executed instructions, with the address each was fetched from.
    pub instr_history: VecDeque<(u8, Instruction)>,
    /// Where `PRN` and `PRA` write to.
    pub output: W,
    timer: Timer,
    history_len: usize,
}

impl Emulator<Stdout> {
    /// Loads a program image into a new [Emulator] instance writing to stdout.
    ///
    /// # Errors
    ///
    /// This function will return an error if the image does not fit in memory.
    pub fn new(program: &[u8], config: EmuConfig) -> EmuResult<Self> {
        Self::with_io(program, config, io::stdout(), Box::new(SystemClock::new()))
    }
}

impl<W: Write> Emulator<W> {
    /// Loads a program image into a new [Emulator] with the given console and time source.
    ///
    /// # Errors
    ///
    /// This function will return an error if the image does not fit in memory.
    pub fn with_io(
        program: &[u8],
        config: EmuConfig,
        output: W,
        clock: Box<dyn Clock>,
    ) -> EmuResult<Self> {
        let mut ram = Ram::new();
        ram.load(program)?;
        Ok(Self {
            registers: EmuRegisters::default(),
            ram,
            state: if config.start_paused {
                EmuState::Pause
            } else {
                EmuState::Continue
            },
            instr_history: VecDeque::with_capacity(config.history_len),
            output,
            timer: Timer::new(clock, config.timer_period),
            history_len: config.history_len,
        })
    }

    /// Runs the emulator, stepping through instructions until it reaches a halt state.
    pub fn run_until_halt(&mut self) -> Result<()> {
        loop {
            match self.state {
                EmuState::Continue => {}
                EmuState::Halt => break,
                EmuState::Pause => {
                    self.debug()?;
                    continue;
                }
            }
            self.step()?;
        }
        Ok(())
    }

    pub fn cont(&mut self) -> Result<()> {
        self.state = EmuState::Continue;
        self.run_until_halt()
    }

    /// Posts an interrupt from an external source.
    pub fn raise_interrupt(&mut self, lines: u8) {
        interrupts::raise(&mut self.registers, lines);
    }

    pub fn trace(&self) -> Trace<'_> {
        Trace::new(&self.registers, &self.ram)
    }

    /// Runs a single machine cycle: timer, interrupts, then one instruction.
    ///
    /// Any error halts the emulator.
    pub fn step(&mut self) -> EmuResult<()> {
        if self.state == EmuState::Halt {
            return Ok(());
        }
        let res = self.cycle();
        if res.is_err() {
            self.state = EmuState::Halt;
        }
        res
    }

    fn cycle(&mut self) -> EmuResult<()> {
        self.timer.poll(&mut self.registers);
        interrupts::service(&mut self.registers, &mut self.ram)?;

        log::trace!("{}", self.trace());
        let pc = self.registers.pc;
        let instr = self.fetch(pc)?;
        log::debug!(">>> {}", instr);
        self.instr_history.push_back((pc, instr));
        while self.instr_history.len() > self.history_len {
            self.instr_history.pop_front();
        }

        let update = self.execute(instr)?;
        debug_assert!(update == PcUpdate::Advance || instr.op.sets_pc());
        if update == PcUpdate::Advance {
            self.registers.pc = self.registers.pc.wrapping_add(instr.width());
        }
        Ok(())
    }

    /// Reads and decodes the instruction at `pc`.
    ///
    /// Operand bytes the instruction doesn't use read as zero, even past the end of memory.
    fn fetch(&self, pc: u8) -> EmuResult<Instruction> {
        let ir = self.ram.read(pc);
        let op = Opcode::try_from(ir).map_err(|_| EmuError::InvalidOpcode {
            opcode: ir,
            addr: pc,
        })?;

        let mut operands = [0u8; 2];
        for (i, operand) in operands
            .iter_mut()
            .enumerate()
            .take(plat::operand_count(ir) as usize)
        {
            *operand = self
                .ram
                .peek(pc as usize + 1 + i)
                .ok_or(EmuError::FetchOverflow { addr: pc })?;
        }
        Ok(Instruction::new(op, operands))
    }

    fn execute(&mut self, instr: Instruction) -> EmuResult<PcUpdate> {
        let [a, b] = instr.operands;
        let regs = &mut self.registers;
        match instr.op {
            Opcode::Hlt => {
                log::info!("halted at {:#04x}", regs.pc);
                self.state = EmuState::Halt;
            }
            Opcode::Ldi => regs.write(reg(a)?, b),
            Opcode::Ld => {
                let addr = regs.read(reg(b)?);
                regs.write(reg(a)?, self.ram.read(addr));
            }
            Opcode::St => {
                let value = regs.read(reg(b)?);
                self.ram.write(regs.read(reg(a)?), value);
            }
            Opcode::Prn => writeln!(self.output, "{}", regs.read(reg(a)?))?,
            Opcode::Pra => {
                write!(self.output, "{}", char::from(regs.read(reg(a)?)))?;
                self.output.flush()?;
            }
            Opcode::Push => {
                let value = regs.read(reg(a)?);
                stack::push(regs, &mut self.ram, value)?;
            }
            Opcode::Pop => {
                let dest = reg(a)?;
                let value = stack::pop(regs, &self.ram)?;
                regs.write(dest, value);
            }
            Opcode::Call => {
                let target = regs.read(reg(a)?);
                let ret = regs.pc.wrapping_add(instr.width());
                stack::push(regs, &mut self.ram, ret)?;
                regs.pc = target;
                return Ok(PcUpdate::Set);
            }
            Opcode::Ret => {
                regs.pc = stack::pop(regs, &self.ram)?;
                return Ok(PcUpdate::Set);
            }
            Opcode::Iret => {
                interrupts::return_from_interrupt(regs, &self.ram)?;
                return Ok(PcUpdate::Set);
            }
            Opcode::Jmp | Opcode::Jeq | Opcode::Jne | Opcode::Jlt | Opcode::Jle => {
                let fl = regs.fl;
                let cond = match instr.op {
                    Opcode::Jeq => fl.contains(Fl::EQ),
                    Opcode::Jne => !fl.contains(Fl::EQ),
                    Opcode::Jlt => fl.contains(Fl::LT),
                    Opcode::Jle => fl.intersects(Fl::LT | Fl::EQ),
                    _ => true,
                };
                return jump_if(regs, cond, a);
            }
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Inc
            | Opcode::Dec
            | Opcode::Cmp => {
                let mode = AluMode::try_from(instr.op)?;
                let right = if mode.is_unary() { None } else { Some(reg(b)?) };
                mode.apply(regs, reg(a)?, right)?;
            }
        }
        Ok(PcUpdate::Advance)
    }

    pub fn debug(&mut self) -> Result<()> {
        Debugger::new(self).repl()
    }
}

fn reg(operand: u8) -> EmuResult<Register> {
    Ok(Register::try_from(operand)?)
}

/// Sets PC to `regA` if `cond` holds, otherwise falls through to the next instruction.
fn jump_if(regs: &mut EmuRegisters, cond: bool, a: u8) -> EmuResult<PcUpdate> {
    let target = regs.read(reg(a)?);
    if cond {
        regs.pc = target;
        Ok(PcUpdate::Set)
    } else {
        Ok(PcUpdate::Advance)
    }
}
