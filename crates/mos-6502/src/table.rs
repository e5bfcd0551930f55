//! Opcode decode table.
//!
//! Every one of the 256 opcodes maps to an operation and an addressing
//! mode. The addressing mode drives the per-cycle bus pattern; the
//! operation supplies the ALU step.

/// Addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Implied (includes stack operations).
    Imp,
    /// Accumulator.
    Acc,
    /// Immediate.
    Imm,
    /// Zero page.
    Zp,
    /// Zero page,X.
    Zpx,
    /// Zero page,Y.
    Zpy,
    /// Absolute.
    Abs,
    /// Absolute,X.
    Abx,
    /// Absolute,Y.
    Aby,
    /// (Zero page,X).
    Izx,
    /// (Zero page),Y.
    Izy,
    /// (Absolute), JMP only.
    Ind,
    /// Relative, branches only.
    Rel,
}

impl Mode {
    /// Operand bytes following the opcode.
    #[must_use]
    pub const fn operand_len(self) -> u16 {
        match self {
            Mode::Imp | Mode::Acc => 0,
            Mode::Imm | Mode::Zp | Mode::Zpx | Mode::Zpy | Mode::Izx | Mode::Izy | Mode::Rel => 1,
            Mode::Abs | Mode::Abx | Mode::Aby | Mode::Ind => 2,
        }
    }
}

/// Operation, documented and undocumented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,

    /// ASL then ORA.
    Slo,
    /// ROL then AND.
    Rla,
    /// LSR then EOR.
    Sre,
    /// ROR then ADC.
    Rra,
    /// Store A & X.
    Sax,
    /// Load A and X.
    Lax,
    /// DEC then CMP.
    Dcp,
    /// INC then SBC.
    Isc,
    /// AND, then C = N.
    Anc,
    /// AND then LSR A.
    Alr,
    /// AND then ROR A with odd flags.
    Arr,
    /// A = (A | magic) & X & imm. Unstable.
    Ane,
    /// A = X = (A | magic) & imm. Unstable.
    Lxa,
    /// X = (A & X) - imm, flags like CMP.
    Sbx,
    /// SBC immediate at $EB.
    Usbc,
    /// A = X = S = mem & S.
    Las,
    /// Store A & X & (H+1). Unstable.
    Sha,
    /// Store X & (H+1). Unstable.
    Shx,
    /// Store Y & (H+1). Unstable.
    Shy,
    /// S = A & X, store S & (H+1). Unstable.
    Tas,
    /// Lock the CPU until reset.
    Jam,
}

/// How an operation uses its effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Modify,
    /// Control flow, stack and register operations with their own sequences.
    Other,
}

impl Op {
    #[must_use]
    pub const fn access(self) -> Access {
        match self {
            Op::Adc | Op::And | Op::Bit | Op::Cmp | Op::Cpx | Op::Cpy | Op::Eor | Op::Lda
            | Op::Ldx | Op::Ldy | Op::Nop | Op::Ora | Op::Sbc | Op::Lax | Op::Anc | Op::Alr
            | Op::Arr | Op::Ane | Op::Lxa | Op::Sbx | Op::Usbc | Op::Las => Access::Read,
            Op::Sta | Op::Stx | Op::Sty | Op::Sax | Op::Sha | Op::Shx | Op::Shy | Op::Tas => {
                Access::Write
            }
            Op::Asl | Op::Lsr | Op::Rol | Op::Ror | Op::Inc | Op::Dec | Op::Slo | Op::Rla
            | Op::Sre | Op::Rra | Op::Dcp | Op::Isc => Access::Modify,
            _ => Access::Other,
        }
    }
}

use Mode::{Abs, Abx, Aby, Acc, Imm, Imp, Ind, Izx, Izy, Rel, Zp, Zpx, Zpy};
use Op::{
    Adc, Alr, Anc, And, Ane, Arr, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld,
    Cli, Clv, Cmp, Cpx, Cpy, Dcp, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Isc, Jam, Jmp, Jsr, Las, Lax,
    Lda, Ldx, Ldy, Lsr, Lxa, Nop, Ora, Pha, Php, Pla, Plp, Rla, Rol, Ror, Rra, Rti, Rts, Sax, Sbc,
    Sbx, Sec, Sed, Sei, Sha, Shx, Shy, Slo, Sre, Sta, Stx, Sty, Tas, Tax, Tay, Tsx, Txa, Txs, Tya,
    Usbc,
};

/// Opcode to (operation, addressing mode).
#[rustfmt::skip]
pub const OPCODES: [(Op, Mode); 256] = [
    // $0x
    (Brk, Imp), (Ora, Izx), (Jam, Imp), (Slo, Izx),
    (Nop, Zp), (Ora, Zp), (Asl, Zp), (Slo, Zp),
    (Php, Imp), (Ora, Imm), (Asl, Acc), (Anc, Imm),
    (Nop, Abs), (Ora, Abs), (Asl, Abs), (Slo, Abs),
    // $1x
    (Bpl, Rel), (Ora, Izy), (Jam, Imp), (Slo, Izy),
    (Nop, Zpx), (Ora, Zpx), (Asl, Zpx), (Slo, Zpx),
    (Clc, Imp), (Ora, Aby), (Nop, Imp), (Slo, Aby),
    (Nop, Abx), (Ora, Abx), (Asl, Abx), (Slo, Abx),
    // $2x
    (Jsr, Abs), (And, Izx), (Jam, Imp), (Rla, Izx),
    (Bit, Zp), (And, Zp), (Rol, Zp), (Rla, Zp),
    (Plp, Imp), (And, Imm), (Rol, Acc), (Anc, Imm),
    (Bit, Abs), (And, Abs), (Rol, Abs), (Rla, Abs),
    // $3x
    (Bmi, Rel), (And, Izy), (Jam, Imp), (Rla, Izy),
    (Nop, Zpx), (And, Zpx), (Rol, Zpx), (Rla, Zpx),
    (Sec, Imp), (And, Aby), (Nop, Imp), (Rla, Aby),
    (Nop, Abx), (And, Abx), (Rol, Abx), (Rla, Abx),
    // $4x
    (Rti, Imp), (Eor, Izx), (Jam, Imp), (Sre, Izx),
    (Nop, Zp), (Eor, Zp), (Lsr, Zp), (Sre, Zp),
    (Pha, Imp), (Eor, Imm), (Lsr, Acc), (Alr, Imm),
    (Jmp, Abs), (Eor, Abs), (Lsr, Abs), (Sre, Abs),
    // $5x
    (Bvc, Rel), (Eor, Izy), (Jam, Imp), (Sre, Izy),
    (Nop, Zpx), (Eor, Zpx), (Lsr, Zpx), (Sre, Zpx),
    (Cli, Imp), (Eor, Aby), (Nop, Imp), (Sre, Aby),
    (Nop, Abx), (Eor, Abx), (Lsr, Abx), (Sre, Abx),
    // $6x
    (Rts, Imp), (Adc, Izx), (Jam, Imp), (Rra, Izx),
    (Nop, Zp), (Adc, Zp), (Ror, Zp), (Rra, Zp),
    (Pla, Imp), (Adc, Imm), (Ror, Acc), (Arr, Imm),
    (Jmp, Ind), (Adc, Abs), (Ror, Abs), (Rra, Abs),
    // $7x
    (Bvs, Rel), (Adc, Izy), (Jam, Imp), (Rra, Izy),
    (Nop, Zpx), (Adc, Zpx), (Ror, Zpx), (Rra, Zpx),
    (Sei, Imp), (Adc, Aby), (Nop, Imp), (Rra, Aby),
    (Nop, Abx), (Adc, Abx), (Ror, Abx), (Rra, Abx),
    // $8x
    (Nop, Imm), (Sta, Izx), (Nop, Imm), (Sax, Izx),
    (Sty, Zp), (Sta, Zp), (Stx, Zp), (Sax, Zp),
    (Dey, Imp), (Nop, Imm), (Txa, Imp), (Ane, Imm),
    (Sty, Abs), (Sta, Abs), (Stx, Abs), (Sax, Abs),
    // $9x
    (Bcc, Rel), (Sta, Izy), (Jam, Imp), (Sha, Izy),
    (Sty, Zpx), (Sta, Zpx), (Stx, Zpy), (Sax, Zpy),
    (Tya, Imp), (Sta, Aby), (Txs, Imp), (Tas, Aby),
    (Shy, Abx), (Sta, Abx), (Shx, Aby), (Sha, Aby),
    // $Ax
    (Ldy, Imm), (Lda, Izx), (Ldx, Imm), (Lax, Izx),
    (Ldy, Zp), (Lda, Zp), (Ldx, Zp), (Lax, Zp),
    (Tay, Imp), (Lda, Imm), (Tax, Imp), (Lxa, Imm),
    (Ldy, Abs), (Lda, Abs), (Ldx, Abs), (Lax, Abs),
    // $Bx
    (Bcs, Rel), (Lda, Izy), (Jam, Imp), (Lax, Izy),
    (Ldy, Zpx), (Lda, Zpx), (Ldx, Zpy), (Lax, Zpy),
    (Clv, Imp), (Lda, Aby), (Tsx, Imp), (Las, Aby),
    (Ldy, Abx), (Lda, Abx), (Ldx, Aby), (Lax, Aby),
    // $Cx
    (Cpy, Imm), (Cmp, Izx), (Nop, Imm), (Dcp, Izx),
    (Cpy, Zp), (Cmp, Zp), (Dec, Zp), (Dcp, Zp),
    (Iny, Imp), (Cmp, Imm), (Dex, Imp), (Sbx, Imm),
    (Cpy, Abs), (Cmp, Abs), (Dec, Abs), (Dcp, Abs),
    // $Dx
    (Bne, Rel), (Cmp, Izy), (Jam, Imp), (Dcp, Izy),
    (Nop, Zpx), (Cmp, Zpx), (Dec, Zpx), (Dcp, Zpx),
    (Cld, Imp), (Cmp, Aby), (Nop, Imp), (Dcp, Aby),
    (Nop, Abx), (Cmp, Abx), (Dec, Abx), (Dcp, Abx),
    // $Ex
    (Cpx, Imm), (Sbc, Izx), (Nop, Imm), (Isc, Izx),
    (Cpx, Zp), (Sbc, Zp), (Inc, Zp), (Isc, Zp),
    (Inx, Imp), (Sbc, Imm), (Nop, Imp), (Usbc, Imm),
    (Cpx, Abs), (Sbc, Abs), (Inc, Abs), (Isc, Abs),
    // $Fx
    (Beq, Rel), (Sbc, Izy), (Jam, Imp), (Isc, Izy),
    (Nop, Zpx), (Sbc, Zpx), (Inc, Zpx), (Isc, Zpx),
    (Sed, Imp), (Sbc, Aby), (Nop, Imp), (Isc, Aby),
    (Nop, Abx), (Sbc, Abx), (Inc, Abx), (Isc, Abx),
];

/// Base cycle count per opcode, including the opcode fetch.
///
/// Add one for a page cross on indexed reads (abs,X / abs,Y / (zp),Y),
/// one for a taken branch and one more if the branch crosses a page.
/// JAM opcodes list the cycles until the core locks up.
#[rustfmt::skip]
pub const CYCLES: [u8; 256] = [
    7, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6, // $0x
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // $1x
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6, // $2x
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // $3x
    6, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6, // $4x
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // $5x
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6, // $6x
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // $7x
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // $8x
    2, 6, 2, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5, // $9x
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // $Ax
    2, 5, 2, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4, // $Bx
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // $Cx
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // $Dx
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // $Ex
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // $Fx
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_jam_is_implied() {
        let jams = OPCODES.iter().filter(|(op, _)| *op == Op::Jam).count();
        assert_eq!(jams, 12);
        assert!(OPCODES.iter().all(|&(op, mode)| op != Op::Jam || mode == Mode::Imp));
    }

    #[test]
    fn branches_are_relative() {
        for opcode in [0x10, 0x30, 0x50, 0x70, 0x90, 0xB0, 0xD0, 0xF0] {
            assert_eq!(OPCODES[opcode].1, Mode::Rel);
            assert_eq!(CYCLES[opcode], 2);
        }
    }

    #[test]
    fn stores_never_read() {
        assert_eq!(OPCODES[0x9D], (Op::Sta, Mode::Abx));
        assert_eq!(Op::Sta.access(), Access::Write);
        assert_eq!(CYCLES[0x9D], 5);
    }
}
