//! Cycle-accurate 6502 CPU emulator.
//!
//! The 6502 executes one bus access per cycle. Each `tick()` advances
//! exactly one cycle. Instructions take multiple cycles, and the CPU
//! tracks its internal state between cycles.
//!
//! Decode is table-driven: [`OPCODES`] maps every opcode, documented or
//! not, to an operation and an addressing mode, and the addressing mode
//! alone decides which bus cycles happen. [`CYCLES`] holds the base cost
//! of each opcode.
//!
//! Two variants are modelled. The NMOS 6502 honours the decimal flag in
//! ADC and SBC; the Ricoh 2A03 used in the NES stores it but always adds
//! in binary.

mod cpu;
pub mod flags;
mod registers;
mod table;

pub use cpu::{Config, Mos6502, Variant};
pub use flags::Status;
pub use registers::{Register, Registers};
pub use table::{Access, CYCLES, Mode, OPCODES, Op};
