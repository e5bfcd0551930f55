//! Opcode decode table.
//!
//! Every one of the 256 opcodes is defined on the 65816. The addressing
//! mode decides which micro-steps an instruction queues; the operation
//! decides what happens to the data.

/// Addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Implied, including stack and transfer instructions.
    Imp,
    /// Accumulator.
    Acc,
    /// Immediate. Width follows M or X for data operations.
    Imm,
    /// d
    Dp,
    /// d,X
    Dpx,
    /// d,Y
    Dpy,
    /// (d)
    Dpi,
    /// (d,X)
    Dpix,
    /// (d),Y
    Dpiy,
    /// [d]
    Dpil,
    /// [d],Y
    Dpily,
    /// a
    Abs,
    /// a,X
    Abx,
    /// a,Y
    Aby,
    /// al
    Abl,
    /// al,X
    Ablx,
    /// d,S
    Sr,
    /// (d,S),Y
    Sriy,
    /// 8-bit branch displacement.
    Rel,
    /// 16-bit displacement (BRL, PER).
    Rell,
    /// (a), used by JMP.
    Ind,
    /// (a,X), used by JMP and JSR.
    Indx,
    /// [a], used by JML.
    Indl,
    /// Block move: destination bank, then source bank.
    Blk,
}

/// Operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Bra, Brk, Brl, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cop, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny,
    Jml, Jmp, Jsl, Jsr, Lda, Ldx, Ldy, Lsr, Mvn, Mvp, Nop, Ora, Pea, Pei, Per,
    Pha, Phb, Phd, Phk, Php, Phx, Phy, Pla, Plb, Pld, Plp, Plx, Ply, Rep, Rol,
    Ror, Rti, Rtl, Rts, Sbc, Sec, Sed, Sei, Sep, Sta, Stp, Stx, Sty, Stz, Tax,
    Tay, Tcd, Tcs, Tdc, Trb, Tsb, Tsc, Tsx, Txa, Txs, Txy, Tya, Tyx, Wai, Wdm,
    Xba, Xce,
}

/// How an operation uses its effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Modify,
    /// Control flow, stack and implied operations.
    Other,
}

impl Op {
    #[must_use]
    pub const fn access(self) -> Access {
        match self {
            Op::Adc | Op::And | Op::Bit | Op::Cmp | Op::Cpx | Op::Cpy | Op::Eor | Op::Lda
            | Op::Ldx | Op::Ldy | Op::Ora | Op::Sbc => Access::Read,
            Op::Sta | Op::Stx | Op::Sty | Op::Stz => Access::Write,
            Op::Asl | Op::Lsr | Op::Rol | Op::Ror | Op::Inc | Op::Dec | Op::Tsb | Op::Trb => {
                Access::Modify
            }
            _ => Access::Other,
        }
    }

    /// True when the operand width follows the X flag rather than M.
    #[must_use]
    pub const fn uses_index_width(self) -> bool {
        matches!(
            self,
            Op::Cpx | Op::Cpy | Op::Ldx | Op::Ldy | Op::Stx | Op::Sty | Op::Phx | Op::Phy
                | Op::Plx | Op::Ply
        )
    }
}

use Mode::*;
use Op::*;

/// Operation and addressing mode for every opcode.
#[rustfmt::skip]
pub const OPCODES: [(Op, Mode); 256] = [
    // 0x00
    (Brk, Imp),  (Ora, Dpix), (Cop, Imp),  (Ora, Sr),   (Tsb, Dp),   (Ora, Dp),   (Asl, Dp),   (Ora, Dpil),
    (Php, Imp),  (Ora, Imm),  (Asl, Acc),  (Phd, Imp),  (Tsb, Abs),  (Ora, Abs),  (Asl, Abs),  (Ora, Abl),
    // 0x10
    (Bpl, Rel),  (Ora, Dpiy), (Ora, Dpi),  (Ora, Sriy), (Trb, Dp),   (Ora, Dpx),  (Asl, Dpx),  (Ora, Dpily),
    (Clc, Imp),  (Ora, Aby),  (Inc, Acc),  (Tcs, Imp),  (Trb, Abs),  (Ora, Abx),  (Asl, Abx),  (Ora, Ablx),
    // 0x20
    (Jsr, Abs),  (And, Dpix), (Jsl, Abl),  (And, Sr),   (Bit, Dp),   (And, Dp),   (Rol, Dp),   (And, Dpil),
    (Plp, Imp),  (And, Imm),  (Rol, Acc),  (Pld, Imp),  (Bit, Abs),  (And, Abs),  (Rol, Abs),  (And, Abl),
    // 0x30
    (Bmi, Rel),  (And, Dpiy), (And, Dpi),  (And, Sriy), (Bit, Dpx),  (And, Dpx),  (Rol, Dpx),  (And, Dpily),
    (Sec, Imp),  (And, Aby),  (Dec, Acc),  (Tsc, Imp),  (Bit, Abx),  (And, Abx),  (Rol, Abx),  (And, Ablx),
    // 0x40
    (Rti, Imp),  (Eor, Dpix), (Wdm, Imm),  (Eor, Sr),   (Mvp, Blk),  (Eor, Dp),   (Lsr, Dp),   (Eor, Dpil),
    (Pha, Imp),  (Eor, Imm),  (Lsr, Acc),  (Phk, Imp),  (Jmp, Abs),  (Eor, Abs),  (Lsr, Abs),  (Eor, Abl),
    // 0x50
    (Bvc, Rel),  (Eor, Dpiy), (Eor, Dpi),  (Eor, Sriy), (Mvn, Blk),  (Eor, Dpx),  (Lsr, Dpx),  (Eor, Dpily),
    (Cli, Imp),  (Eor, Aby),  (Phy, Imp),  (Tcd, Imp),  (Jml, Abl),  (Eor, Abx),  (Lsr, Abx),  (Eor, Ablx),
    // 0x60
    (Rts, Imp),  (Adc, Dpix), (Per, Rell), (Adc, Sr),   (Stz, Dp),   (Adc, Dp),   (Ror, Dp),   (Adc, Dpil),
    (Pla, Imp),  (Adc, Imm),  (Ror, Acc),  (Rtl, Imp),  (Jmp, Ind),  (Adc, Abs),  (Ror, Abs),  (Adc, Abl),
    // 0x70
    (Bvs, Rel),  (Adc, Dpiy), (Adc, Dpi),  (Adc, Sriy), (Stz, Dpx),  (Adc, Dpx),  (Ror, Dpx),  (Adc, Dpily),
    (Sei, Imp),  (Adc, Aby),  (Ply, Imp),  (Tdc, Imp),  (Jmp, Indx), (Adc, Abx),  (Ror, Abx),  (Adc, Ablx),
    // 0x80
    (Bra, Rel),  (Sta, Dpix), (Brl, Rell), (Sta, Sr),   (Sty, Dp),   (Sta, Dp),   (Stx, Dp),   (Sta, Dpil),
    (Dey, Imp),  (Bit, Imm),  (Txa, Imp),  (Phb, Imp),  (Sty, Abs),  (Sta, Abs),  (Stx, Abs),  (Sta, Abl),
    // 0x90
    (Bcc, Rel),  (Sta, Dpiy), (Sta, Dpi),  (Sta, Sriy), (Sty, Dpx),  (Sta, Dpx),  (Stx, Dpy),  (Sta, Dpily),
    (Tya, Imp),  (Sta, Aby),  (Txs, Imp),  (Txy, Imp),  (Stz, Abs),  (Sta, Abx),  (Stz, Abx),  (Sta, Ablx),
    // 0xA0
    (Ldy, Imm),  (Lda, Dpix), (Ldx, Imm),  (Lda, Sr),   (Ldy, Dp),   (Lda, Dp),   (Ldx, Dp),   (Lda, Dpil),
    (Tay, Imp),  (Lda, Imm),  (Tax, Imp),  (Plb, Imp),  (Ldy, Abs),  (Lda, Abs),  (Ldx, Abs),  (Lda, Abl),
    // 0xB0
    (Bcs, Rel),  (Lda, Dpiy), (Lda, Dpi),  (Lda, Sriy), (Ldy, Dpx),  (Lda, Dpx),  (Ldx, Dpy),  (Lda, Dpily),
    (Clv, Imp),  (Lda, Aby),  (Tsx, Imp),  (Tyx, Imp),  (Ldy, Abx),  (Lda, Abx),  (Ldx, Aby),  (Lda, Ablx),
    // 0xC0
    (Cpy, Imm),  (Cmp, Dpix), (Rep, Imm),  (Cmp, Sr),   (Cpy, Dp),   (Cmp, Dp),   (Dec, Dp),   (Cmp, Dpil),
    (Iny, Imp),  (Cmp, Imm),  (Dex, Imp),  (Wai, Imp),  (Cpy, Abs),  (Cmp, Abs),  (Dec, Abs),  (Cmp, Abl),
    // 0xD0
    (Bne, Rel),  (Cmp, Dpiy), (Cmp, Dpi),  (Cmp, Sriy), (Pei, Dp),   (Cmp, Dpx),  (Dec, Dpx),  (Cmp, Dpily),
    (Cld, Imp),  (Cmp, Aby),  (Phx, Imp),  (Stp, Imp),  (Jml, Indl), (Cmp, Abx),  (Dec, Abx),  (Cmp, Ablx),
    // 0xE0
    (Cpx, Imm),  (Sbc, Dpix), (Sep, Imm),  (Sbc, Sr),   (Cpx, Dp),   (Sbc, Dp),   (Inc, Dp),   (Sbc, Dpil),
    (Inx, Imp),  (Sbc, Imm),  (Nop, Imp),  (Xba, Imp),  (Cpx, Abs),  (Sbc, Abs),  (Inc, Abs),  (Sbc, Abl),
    // 0xF0
    (Beq, Rel),  (Sbc, Dpiy), (Sbc, Dpi),  (Sbc, Sriy), (Pea, Abs),  (Sbc, Dpx),  (Inc, Dpx),  (Sbc, Dpily),
    (Sed, Imp),  (Sbc, Aby),  (Plx, Imp),  (Xce, Imp),  (Jsr, Indx), (Sbc, Abx),  (Inc, Abx),  (Sbc, Ablx),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_one_columns_line_up() {
        // ORA/AND/EOR/ADC/STA/LDA/CMP/SBC share one mode per column.
        for row in (0..8).map(|n| n * 0x20) {
            assert_eq!(OPCODES[row + 0x01].1, Dpix);
            assert_eq!(OPCODES[row + 0x03].1, Sr);
            assert_eq!(OPCODES[row + 0x07].1, Dpil);
            assert_eq!(OPCODES[row + 0x0F].1, Abl);
            assert_eq!(OPCODES[row + 0x11].1, Dpiy);
            assert_eq!(OPCODES[row + 0x12].1, Dpi);
            assert_eq!(OPCODES[row + 0x13].1, Sriy);
            assert_eq!(OPCODES[row + 0x17].1, Dpily);
            assert_eq!(OPCODES[row + 0x1F].1, Ablx);
        }
    }

    #[test]
    fn branches_are_relative() {
        for opcode in [0x10, 0x30, 0x50, 0x70, 0x80, 0x90, 0xB0, 0xD0, 0xF0] {
            assert_eq!(OPCODES[opcode].1, Rel, "opcode {opcode:#04X}");
        }
    }

    #[test]
    fn stores_never_read() {
        for (op, _) in OPCODES {
            if matches!(op, Sta | Stx | Sty | Stz) {
                assert_eq!(op.access(), Access::Write);
            }
        }
    }
}
