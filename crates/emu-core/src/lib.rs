//! Core traits and types for cycle-stepped CPU and peripheral emulation.
//!
//! Every component advances one clock at a time. A CPU core issues at most
//! one bus operation per cycle, in strict order, through a [`Bus`] owned by
//! the host. Peripherals implement [`Tickable`] and are stepped by the same
//! host loop.

mod bus;
mod capture;
mod cpu;
mod error;
mod observable;
mod tickable;
mod ticks;
mod trap;

pub use bus::{Bus, SimpleBus};
pub use capture::{BusCapture, BusOpKind, BusOperation};
pub use cpu::{Cpu, Line, RunOutcome, RunSummary};
pub use error::CoreError;
pub use observable::{Observable, Value};
pub use tickable::Tickable;
pub use ticks::Ticks;
pub use trap::{TrapOutcome, TrapPredicate, TrapTable};
