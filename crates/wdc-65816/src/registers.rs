//! Register file.

use mos_6502::Status;

use crate::flags::{I, M, X};

/// 65C816 register set.
///
/// - C: 16-bit accumulator; A is its low byte and B its high byte
/// - X, Y: index registers, high bytes forced to zero while the X flag is set
/// - S: 16-bit stack pointer, high byte forced to $01 in emulation mode
/// - D: direct page base
/// - DBR/PBR: data and program bank
/// - P: processor status, E: emulation-mode flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub c: u16,
    pub x: u16,
    pub y: u16,
    pub s: u16,
    pub d: u16,
    pub dbr: u8,
    pub pbr: u8,
    pub pc: u16,
    pub p: Status,
    pub e: bool,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Power-on values: emulation mode, 8-bit registers, IRQs masked.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            c: 0,
            x: 0,
            y: 0,
            s: 0x01FF,
            d: 0,
            dbr: 0,
            pbr: 0,
            pc: 0,
            p: Status(M | X | I),
            e: true,
        }
    }

    /// Low byte of C.
    #[must_use]
    pub const fn a(&self) -> u8 {
        self.c as u8
    }

    /// Replace the low byte of C, keeping B.
    pub fn set_a(&mut self, value: u8) {
        self.c = (self.c & 0xFF00) | u16::from(value);
    }

    /// Replace P, applying the width side effects.
    ///
    /// Emulation mode forces M and X on. Setting X clears the index high
    /// bytes.
    pub fn set_p(&mut self, value: u8) {
        let value = if self.e { value | M | X } else { value };
        self.p = Status(value);
        if value & X != 0 {
            self.x &= 0x00FF;
            self.y &= 0x00FF;
        }
    }

    /// Switch modes. Entering emulation forces 8-bit registers and moves
    /// the stack into page one.
    pub fn set_e(&mut self, e: bool) {
        self.e = e;
        if e {
            self.set_p(self.p.0);
            self.s = 0x0100 | (self.s & 0x00FF);
        }
    }

    /// Address to push to, decrementing S.
    pub fn push(&mut self) -> u32 {
        let addr = self.s;
        self.s = if self.e {
            0x0100 | u16::from((self.s as u8).wrapping_sub(1))
        } else {
            self.s.wrapping_sub(1)
        };
        u32::from(addr)
    }

    /// Increment S and return the address to pull from.
    pub fn pop(&mut self) -> u32 {
        self.s = if self.e {
            0x0100 | u16::from((self.s as u8).wrapping_add(1))
        } else {
            self.s.wrapping_add(1)
        };
        u32::from(self.s)
    }

    /// As [`push`](Self::push), but S moves through all 16 bits even in
    /// emulation mode. The 65816-only stack instructions address the stack
    /// this way.
    pub fn push_unbounded(&mut self) -> u32 {
        let addr = self.s;
        self.s = self.s.wrapping_sub(1);
        u32::from(addr)
    }

    pub fn pop_unbounded(&mut self) -> u32 {
        self.s = self.s.wrapping_add(1);
        u32::from(self.s)
    }

    /// Put S back in page one after an unbounded stack access.
    pub fn confine_stack(&mut self) {
        if self.e {
            self.s = 0x0100 | (self.s & 0x00FF);
        }
    }

    /// Full 24-bit program address.
    #[must_use]
    pub const fn program_address(&self) -> u32 {
        ((self.pbr as u32) << 16) | self.pc as u32
    }
}
