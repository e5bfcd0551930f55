//! ALU operations for the Z80.
//!
//! Every function is pure: it takes operands (and the incoming F where some
//! bits survive) and returns the result with the new flags.

#![allow(clippy::cast_possible_truncation)] // Results are truncated to the register width.

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p, xy};

/// Result byte and the flags it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

const fn flag(condition: bool, bit: u8) -> u8 {
    if condition { bit } else { 0 }
}

#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let wide = u16::from(a) + u16::from(b) + u16::from(c);
    let value = wide as u8;
    let flags = sz53(value)
        | flag((a & 0x0F) + (b & 0x0F) + c > 0x0F, HF)
        | flag((a ^ b) & 0x80 == 0 && (a ^ value) & 0x80 != 0, PF)
        | flag(wide > 0xFF, CF);
    AluResult { value, flags }
}

#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let value = a.wrapping_sub(b).wrapping_sub(c);
    let flags = sz53(value)
        | NF
        | flag((a & 0x0F) < (b & 0x0F) + c, HF)
        | flag((a ^ b) & 0x80 != 0 && (a ^ value) & 0x80 != 0, PF)
        | flag(u16::from(a) < u16::from(b) + u16::from(c), CF);
    AluResult { value, flags }
}

/// The eight accumulator operations, selected by bits 5-3 of the opcode:
/// ADD, ADC, SUB, SBC, AND, XOR, OR, CP.
#[must_use]
pub fn accumulate(op: u8, a: u8, b: u8, carry: bool) -> AluResult {
    let logic = |value: u8, half: u8| AluResult {
        value,
        flags: sz53p(value) | half,
    };
    match op & 7 {
        0 => add8(a, b, false),
        1 => add8(a, b, carry),
        2 => sub8(a, b, false),
        3 => sub8(a, b, carry),
        4 => logic(a & b, HF),
        5 => logic(a ^ b, 0),
        6 => logic(a | b, 0),
        _ => {
            // CP leaves A alone and takes X and Y from the operand.
            let compared = sub8(a, b, false);
            AluResult {
                value: a,
                flags: (compared.flags & !(YF | XF)) | xy(b),
            }
        }
    }
}

/// INC r. Carry is not touched; the caller keeps it.
#[must_use]
pub fn inc8(value: u8) -> AluResult {
    let result = value.wrapping_add(1);
    AluResult {
        value: result,
        flags: sz53(result) | flag(value & 0x0F == 0x0F, HF) | flag(value == 0x7F, PF),
    }
}

/// DEC r. Carry is not touched; the caller keeps it.
#[must_use]
pub fn dec8(value: u8) -> AluResult {
    let result = value.wrapping_sub(1);
    AluResult {
        value: result,
        flags: sz53(result) | NF | flag(value & 0x0F == 0, HF) | flag(value == 0x80, PF),
    }
}

/// CB-page rotates and shifts, selected by bits 5-3 of the opcode:
/// RLC, RRC, RL, RR, SLA, SRA, SLL, SRL.
#[must_use]
pub fn shift(op: u8, value: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let (result, out) = match op & 7 {
        0 => (value.rotate_left(1), value >> 7),
        1 => (value.rotate_right(1), value & 1),
        2 => ((value << 1) | c, value >> 7),
        3 => ((value >> 1) | (c << 7), value & 1),
        4 => (value << 1, value >> 7),
        5 => ((value >> 1) | (value & 0x80), value & 1),
        // SLL shifts a 1 into bit 0.
        6 => ((value << 1) | 1, value >> 7),
        _ => (value >> 1, value & 1),
    };
    AluResult {
        value: result,
        flags: sz53p(result) | out,
    }
}

/// RLCA, RRCA, RLA and RRA. S, Z and P/V survive from `f`.
#[must_use]
pub fn rotate_accumulator(op: u8, a: u8, f: u8) -> AluResult {
    let shifted = shift(op & 3, a, f & CF != 0);
    AluResult {
        value: shifted.value,
        flags: (f & (SF | ZF | PF)) | xy(shifted.value) | (shifted.flags & CF),
    }
}

/// BIT n. `hidden` supplies X and Y: the register itself, or the high
/// byte of MEMPTR for memory operands.
#[must_use]
pub const fn bit(n: u8, value: u8, hidden: u8) -> u8 {
    let set = value & (1 << (n & 7));
    HF | xy(hidden) | flag(set == 0, ZF | PF) | flag(n == 7 && set != 0, SF)
}

/// DAA on `a` given the flags left by the previous add or subtract.
#[must_use]
pub fn daa(a: u8, f: u8) -> AluResult {
    let mut correction = 0;
    let mut carry = f & CF;
    if f & HF != 0 || a & 0x0F > 9 {
        correction |= 0x06;
    }
    if f & CF != 0 || a > 0x99 {
        correction |= 0x60;
        carry = CF;
    }
    let subtract = f & NF != 0;
    let (value, half) = if subtract {
        (a.wrapping_sub(correction), f & HF != 0 && a & 0x0F < 6)
    } else {
        (a.wrapping_add(correction), a & 0x0F > 9)
    };
    AluResult {
        value,
        flags: sz53p(value) | (f & NF) | flag(half, HF) | carry,
    }
}

/// ADD HL,rr. S, Z and P/V survive from `f`; X and Y come from the high
/// byte of the result.
#[must_use]
pub fn add16(a: u16, b: u16, f: u8) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b);
    let value = wide as u16;
    let flags = (f & (SF | ZF | PF))
        | xy((value >> 8) as u8)
        | flag((a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF, HF)
        | flag(wide > 0xFFFF, CF);
    (value, flags)
}

/// ADC HL,rr.
#[must_use]
pub fn adc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = u16::from(carry);
    let wide = u32::from(a) + u32::from(b) + u32::from(c);
    let value = wide as u16;
    let flags = wide_sz(value)
        | flag((a & 0x0FFF) + (b & 0x0FFF) + c > 0x0FFF, HF)
        | flag((a ^ b) & 0x8000 == 0 && (a ^ value) & 0x8000 != 0, PF)
        | flag(wide > 0xFFFF, CF);
    (value, flags)
}

/// SBC HL,rr.
#[must_use]
pub fn sbc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = u16::from(carry);
    let value = a.wrapping_sub(b).wrapping_sub(c);
    let flags = wide_sz(value)
        | NF
        | flag((a & 0x0FFF) < (b & 0x0FFF) + c, HF)
        | flag((a ^ b) & 0x8000 != 0 && (a ^ value) & 0x8000 != 0, PF)
        | flag(u32::from(a) < u32::from(b) + u32::from(c), CF);
    (value, flags)
}

fn wide_sz(value: u16) -> u8 {
    let high = (value >> 8) as u8;
    (high & SF) | xy(high) | flag(value == 0, ZF)
}
