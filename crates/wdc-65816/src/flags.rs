//! Status register bits.
//!
//! The arithmetic flags are the 6502's. Bits 4 and 5 are the index and
//! memory width selects in native mode; in emulation mode both read as 1.

pub use mos_6502::flags::{C, D, I, N, V, Z};

/// Index registers are 8 bits wide when set.
pub const X: u8 = 0x10;

/// Accumulator and memory operands are 8 bits wide when set.
pub const M: u8 = 0x20;

/// Break, in the byte emulation mode pushes for BRK and PHP.
pub const B: u8 = 0x10;
