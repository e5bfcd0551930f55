//! Z80 register set.

#![allow(clippy::cast_possible_truncation)] // Pair halves are split by truncation.

/// Z80 registers snapshot for observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    // Main registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    // Alternate set, held as pairs
    pub af_alt: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,

    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,

    /// MEMPTR. Never visible directly, but leaks into X and Y on BIT n,(HL)
    /// and the block instructions.
    pub wz: u16,
    /// F as written by the most recent instruction, or 0 if it left F
    /// alone. SCF and CCF take X and Y from it.
    pub q: u8,

    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,

    /// HALT executed and no interrupt has been taken since.
    pub halted: bool,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Power-on state: AF and SP at $FFFF, everything else clear.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0xFF,
            f: 0xFF,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            af_alt: 0xFFFF,
            bc_alt: 0,
            de_alt: 0,
            hl_alt: 0,
            ix: 0,
            iy: 0,
            sp: 0xFFFF,
            pc: 0,
            i: 0,
            r: 0,
            wz: 0,
            q: 0,
            iff1: false,
            iff2: false,
            im: 0,
            halted: false,
        }
    }

    #[must_use]
    pub const fn af(&self) -> u16 {
        (self.a as u16) << 8 | self.f as u16
    }

    #[must_use]
    pub const fn bc(&self) -> u16 {
        (self.b as u16) << 8 | self.c as u16
    }

    #[must_use]
    pub const fn de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    #[must_use]
    pub const fn hl(&self) -> u16 {
        (self.h as u16) << 8 | self.l as u16
    }

    pub fn set_af(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.f = value as u8;
    }

    pub fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    pub fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    /// EX AF,AF'.
    pub fn exchange_af(&mut self) {
        let af = self.af();
        self.set_af(self.af_alt);
        self.af_alt = af;
    }

    /// EXX: swap BC, DE and HL with their alternates.
    pub fn exchange_main(&mut self) {
        let (bc, de, hl) = (self.bc(), self.de(), self.hl());
        self.set_bc(self.bc_alt);
        self.set_de(self.de_alt);
        self.set_hl(self.hl_alt);
        self.bc_alt = bc;
        self.de_alt = de;
        self.hl_alt = hl;
    }

    /// Bump the refresh counter. Bit 7 is left alone.
    pub fn increment_r(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }
}

/// Register identifiers for [`emu_core::Cpu::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
    Af,
    Bc,
    De,
    Hl,
    /// AF'.
    AfAlt,
    /// BC'.
    BcAlt,
    /// DE'.
    DeAlt,
    /// HL'.
    HlAlt,
    Ix,
    Iy,
    Sp,
    Pc,
    I,
    R,
    /// MEMPTR.
    Wz,
    Iff1,
    Iff2,
    /// Interrupt mode, 0 to 2.
    Im,
}

impl Register {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::F => "F",
            Register::B => "B",
            Register::C => "C",
            Register::D => "D",
            Register::E => "E",
            Register::H => "H",
            Register::L => "L",
            Register::Af => "AF",
            Register::Bc => "BC",
            Register::De => "DE",
            Register::Hl => "HL",
            Register::AfAlt => "AF'",
            Register::BcAlt => "BC'",
            Register::DeAlt => "DE'",
            Register::HlAlt => "HL'",
            Register::Ix => "IX",
            Register::Iy => "IY",
            Register::Sp => "SP",
            Register::Pc => "PC",
            Register::I => "I",
            Register::R => "R",
            Register::Wz => "WZ",
            Register::Iff1 => "IFF1",
            Register::Iff2 => "IFF2",
            Register::Im => "IM",
        }
    }
}
