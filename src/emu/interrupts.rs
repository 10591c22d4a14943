//! Interrupt handling for LS-8.
//!
//! Interrupt sources raise bits in [IS][Register::IS]. Once per cycle,
//! [`service`] checks the bits enabled by [IM][Register::IM] and, if
//! interrupts are enabled, enters the handler of the lowest pending line
//! through the vector table at `0xF8`-`0xFF`.

use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};

use crate::plat::{Register, INTERRUPT_VECTORS, IS_TIMER};

use super::{
    ram::Ram,
    registers::{EmuRegisters, Fl},
    stack, EmuResult,
};

/// A monotonic time source for the timer interrupt.
pub trait Clock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
}

/// A [`Clock`] backed by the system's monotonic clock.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A [`Clock`] that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// The polled timer source. Raises [`IS_TIMER`] once every `period`.
pub struct Timer {
    clock: Box<dyn Clock>,
    pub period: Duration,
    last_fired: Option<Duration>,
}

impl Timer {
    pub fn new(clock: Box<dyn Clock>, period: Duration) -> Self {
        Self {
            clock,
            period,
            last_fired: None,
        }
    }

    /// Checks the clock, raising the timer line if a full period has elapsed
    /// since it last fired. The first poll only starts the period.
    pub fn poll(&mut self, regs: &mut EmuRegisters) -> bool {
        let now = self.clock.now();
        match self.last_fired {
            Some(last) if now.saturating_sub(last) >= self.period => {
                self.last_fired = Some(now);
                raise(regs, IS_TIMER);
                true
            }
            Some(_) => false,
            None => {
                self.last_fired = Some(now);
                false
            }
        }
    }
}

/// Marks the given [IS][Register::IS] bits as pending.
pub fn raise(regs: &mut EmuRegisters, lines: u8) {
    regs.set_is(regs.is() | lines);
}

/// Enters the handler for the lowest pending, unmasked interrupt line.
///
/// Pushes PC, FL, then R0 through R6 before jumping to the line's vector,
/// and disables interrupts until the handler returns.
/// Returns the line that was serviced, if any.
///
/// # Errors
///
/// This function will return an error if saving the context overflows the stack.
pub fn service(regs: &mut EmuRegisters, ram: &mut Ram) -> EmuResult<Option<u8>> {
    if !regs.ie {
        return Ok(None);
    }
    let masked = regs.im() & regs.is();
    let Some(line) = (0..8u8).find(|i| masked & (1 << i) != 0) else {
        return Ok(None);
    };

    regs.ie = false;
    regs.set_is(regs.is() & !(1 << line));

    let (pc, fl) = (regs.pc, regs.fl.bits());
    stack::push(regs, ram, pc)?;
    stack::push(regs, ram, fl)?;
    for reg in Register::SAVED {
        let value = regs.read(reg);
        stack::push(regs, ram, value)?;
    }

    regs.pc = ram.read(INTERRUPT_VECTORS + line);
    log::info!("interrupt {} -> handler at {:#04x}", line, regs.pc);
    Ok(Some(line))
}

/// Restores the context saved by [`service`] and re-enables interrupts.
///
/// # Errors
///
/// This function will return an error if the stack underflows.
pub fn return_from_interrupt(regs: &mut EmuRegisters, ram: &Ram) -> EmuResult<()> {
    for reg in Register::SAVED.into_iter().rev() {
        let value = stack::pop(regs, ram)?;
        regs.write(reg, value);
    }
    regs.fl = Fl::from_bits_retain(stack::pop(regs, ram)?);
    regs.pc = stack::pop(regs, ram)?;
    regs.ie = true;
    Ok(())
}
