//! Register file and register identifiers.

use serde::{Deserialize, Serialize};

use crate::Status;
use crate::flags::{I, U};

/// NMOS 6502 register set.
///
/// - A: 8-bit accumulator
/// - X, Y: 8-bit index registers
/// - S: 8-bit stack pointer (stack is at $0100-$01FF)
/// - PC: 16-bit program counter
/// - P: 8-bit processor status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    /// Points to the next free stack slot.
    pub s: u8,
    pub pc: u16,
    pub p: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Power-on values. A, X and Y are really undefined; S is where a
    /// reset sequence starting from $00 leaves it.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            pc: 0,
            p: Status(U | I),
        }
    }

    /// Push: return the address to write and decrement S.
    pub fn push(&mut self) -> u16 {
        let addr = 0x0100 | u16::from(self.s);
        self.s = self.s.wrapping_sub(1);
        addr
    }

    /// Pop: increment S and return the address to read.
    pub fn pop(&mut self) -> u16 {
        self.s = self.s.wrapping_add(1);
        0x0100 | u16::from(self.s)
    }

    #[must_use]
    pub const fn stack_addr(&self) -> u16 {
        0x0100 | (self.s as u16)
    }
}

/// Register identifiers for the 6502 family.
///
/// The 65816-only ids (`D`, `Dbr`, `Pbr`, `E`) are rejected by the NMOS
/// cores with [`emu_core::CoreError::InvalidRegister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    /// Accumulator (the full 16-bit C on the 65816).
    A,
    X,
    Y,
    S,
    P,
    Pc,
    /// Direct page register.
    D,
    /// Data bank register.
    Dbr,
    /// Program bank register.
    Pbr,
    /// Emulation-mode flag.
    E,
}

impl Register {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::X => "X",
            Register::Y => "Y",
            Register::S => "S",
            Register::P => "P",
            Register::Pc => "PC",
            Register::D => "D",
            Register::Dbr => "DBR",
            Register::Pbr => "PBR",
            Register::E => "E",
        }
    }
}
