//! Cycle-accurate Z80 CPU emulator.
//!
//! The Z80 has variable-length instructions and variable-length machine
//! cycles. Each `tick()` advances exactly one T-state. An instruction is
//! queued as micro-ops: the opcode fetch (M1, 4 T-states), memory reads
//! and writes (3 T-states), I/O (4 T-states), internal delays, and
//! zero-length execute steps that run the instruction's logic between bus
//! cycles.
//!
//! Undocumented behaviour is modelled: the IXH/IXL/IYH/IYL halves, SLL,
//! the DDCB register copies, the X and Y flag bits, and MEMPTR (WZ).

mod alu;
mod cpu;
pub mod flags;
mod microcode;
mod registers;

pub use cpu::{Config, Z80};
pub use microcode::MicroOp;
pub use registers::{Register, Registers};
