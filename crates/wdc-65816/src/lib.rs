//! Cycle-accurate WDC 65C816 CPU emulator.
//!
//! The 65816 is a 6502 with 16-bit registers, a 24-bit address space and a
//! second operating mode. After reset it runs in emulation mode (E=1), where
//! it behaves like a 65C02 with an 8-bit stack in page one. `XCE` switches
//! to native mode, where the M and X status bits select 8- or 16-bit
//! accumulator and index registers.
//!
//! Each opcode decodes into a short queue of micro-steps (see
//! `microcode`). A step is one bus or internal cycle, a zero-cycle
//! bookkeeping action, or a penalty cycle that is dropped at run time when
//! its condition does not hold: the direct-page cycle when the low byte of
//! D is zero, the indexing cycle when a read stays in the page, and the
//! emulation-mode branch cycle when the target is in the same page.

mod cpu;
pub mod flags;
mod microcode;
mod registers;
mod table;

pub use cpu::{Config, Wdc65816};
pub use mos_6502::Register;
pub use registers::Registers;
pub use table::{Access, Mode, OPCODES, Op};
