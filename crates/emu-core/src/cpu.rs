//! CPU core trait and the shared run loop.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{Bus, BusCapture, CoreError, Ticks, TrapOutcome, TrapPredicate, TrapTable};

/// Signal lines a host drives into a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Line {
    /// Held: core frozen. Released: reset sequence starts.
    Reset,
    /// Non-maskable interrupt, latched on the asserting edge.
    Nmi,
    /// Maskable interrupt, level-sensitive.
    Irq,
    /// Wait/ready: while held no bus cycles happen.
    Wait,
}

/// Why a batched run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The requested number of cycles elapsed.
    Completed,
    /// A trap fired at this opcode-fetch address.
    Trapped { address: u32 },
    /// A trap asked for the core to stop at this address.
    Halted { address: u32 },
    /// The core is stopped (jam, STP, or an earlier halting trap).
    Stopped,
}

/// Result of [`Cpu::run_for`] and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Cycles actually consumed by this call.
    pub cycles: u64,
    pub outcome: RunOutcome,
}

impl RunSummary {
    const fn new(cycles: u64, outcome: RunOutcome) -> Self {
        Self { cycles, outcome }
    }
}

/// A CPU core.
///
/// CPUs execute instructions and access memory through a bus. The bus is
/// passed to each `tick`, not owned, so the host can share it with other
/// components between cycles.
pub trait Cpu {
    /// Snapshot type returned by [`registers`](Self::registers).
    type Registers;

    /// Register identifiers accepted by the get/set accessors.
    type Register: Copy;

    /// Advance the core by exactly one cycle (one T-state on the Z80).
    fn tick<B: Bus>(&mut self, bus: &mut B);

    /// Address of the next opcode fetch (24-bit on the 65816).
    fn pc(&self) -> u32;

    /// Snapshot of all registers.
    fn registers(&self) -> Self::Registers;

    /// Read one register. Does not consume cycles.
    fn register(&self, id: Self::Register) -> Result<u32, CoreError>;

    /// Write one register. Does not consume cycles.
    fn set_register(&mut self, id: Self::Register, value: u32) -> Result<(), CoreError>;

    /// Drive an input line.
    fn set_line(&mut self, line: Line, asserted: bool);

    /// True in a low-power wait (Z80 HALT, 65816 WAI).
    fn is_halted(&self) -> bool;

    /// True once the core has stopped for good (jam, STP, halting trap).
    fn is_stopped(&self) -> bool;

    /// True while the wait or reset line holds the core.
    fn is_frozen(&self) -> bool;

    /// Stop the core until the next reset.
    fn stop(&mut self);

    /// Begin the reset sequence.
    fn reset(&mut self);

    /// True when the next tick starts a new instruction (or interrupt entry).
    ///
    /// A core in a low-power wait sits on a boundary the whole time. The
    /// run loops skip trap checks while [`is_halted`](Self::is_halted) holds,
    /// so a trap at the address after WAI or HALT fires only once the core
    /// is about to fetch there.
    fn at_instruction_boundary(&self) -> bool;

    /// Cycles elapsed since construction.
    fn total_cycles(&self) -> Ticks;

    /// Trap table from the core's configuration.
    fn traps(&self) -> &TrapTable;

    /// Bus-activity recorder.
    fn capture(&mut self) -> &mut BusCapture;

    /// Run for up to `cycles` cycles, honouring the configured trap table.
    fn run_for<B: Bus>(&mut self, bus: &mut B, cycles: u64) -> RunSummary {
        self.run_for_with(bus, cycles, &mut |_: u32| TrapOutcome::Continue)
    }

    /// Run for up to `cycles` cycles with an extra host predicate.
    ///
    /// The configured trap table is consulted first; the predicate only
    /// sees addresses the table lets through.
    fn run_for_with<B: Bus, P: TrapPredicate + ?Sized>(
        &mut self,
        bus: &mut B,
        cycles: u64,
        predicate: &mut P,
    ) -> RunSummary {
        let mut elapsed = 0;
        while elapsed < cycles {
            if self.is_stopped() {
                return RunSummary::new(elapsed, RunOutcome::Stopped);
            }
            if self.trap_point() {
                if let Some(outcome) = self.check_traps(predicate) {
                    return RunSummary::new(elapsed, outcome);
                }
            }
            self.tick(bus);
            elapsed += 1;
        }
        RunSummary::new(elapsed, RunOutcome::Completed)
    }

    /// Run until the next instruction boundary.
    ///
    /// Traps are checked before the first cycle. A frozen core consumes one
    /// cycle and returns.
    fn step_instruction<B: Bus>(&mut self, bus: &mut B) -> RunSummary {
        if self.is_stopped() {
            return RunSummary::new(0, RunOutcome::Stopped);
        }
        if self.trap_point() {
            let mut predicate = |_: u32| TrapOutcome::Continue;
            if let Some(outcome) = self.check_traps(&mut predicate) {
                return RunSummary::new(0, outcome);
            }
        }
        let mut elapsed = 0;
        loop {
            self.tick(bus);
            elapsed += 1;
            if self.is_frozen() || self.is_stopped() || self.at_instruction_boundary() {
                return RunSummary::new(elapsed, RunOutcome::Completed);
            }
        }
    }

    #[doc(hidden)]
    fn trap_point(&self) -> bool {
        self.at_instruction_boundary() && !self.is_frozen() && !self.is_halted()
    }

    #[doc(hidden)]
    fn check_traps<P: TrapPredicate + ?Sized>(&mut self, predicate: &mut P) -> Option<RunOutcome> {
        let address = self.pc();
        let outcome = match self.traps().lookup(address) {
            TrapOutcome::Continue => predicate.check(address),
            configured => configured,
        };
        match outcome {
            TrapOutcome::Continue => None,
            TrapOutcome::Trap => {
                trace!("trap at {address:#06X}");
                Some(RunOutcome::Trapped { address })
            }
            TrapOutcome::Halt => {
                debug!("halting trap at {address:#06X}");
                self.stop();
                Some(RunOutcome::Halted { address })
            }
        }
    }
}
