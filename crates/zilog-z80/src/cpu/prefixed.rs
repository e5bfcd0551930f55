//! CB, DD CB / FD CB and ED pages.

use super::Z80;
use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, parity, sz53, sz53p, xy};
use crate::microcode::MicroOp;

/// IM 0/0/1/2/0/0/1/2: the ED 46-7E mode table, bits 5-3.
const INTERRUPT_MODES: [u8; 8] = [0, 0, 1, 2, 0, 0, 1, 2];

impl Z80 {
    pub(super) fn execute_cb(&mut self) {
        let op = self.opcode;
        let (x, y, z) = (op >> 6, (op >> 3) & 7, op & 7);
        if z == 6 {
            self.addr = self.regs.hl();
            self.micro_ops.push(MicroOp::ReadMem);
            self.micro_ops.push(MicroOp::Internal(1));
            self.queue_execute_followup();
            return;
        }
        let value = self.reg8(z);
        if let Some(result) = self.bit_operation(x, y, value, value) {
            self.set_reg8(z, result);
        }
    }

    /// (HL) operand in. BIT takes X and Y from MEMPTR.
    pub(super) fn cb_followup(&mut self) {
        let op = self.opcode;
        let hidden = (self.regs.wz >> 8) as u8;
        if let Some(result) = self.bit_operation(op >> 6, (op >> 3) & 7, self.data_lo, hidden) {
            self.data_lo = result;
            self.micro_ops.push(MicroOp::WriteMem);
        }
    }

    /// Stage 1 has the opcode byte, stage 2 the (IX+d) operand. Results
    /// also land in the register named by bits 2-0 unless that is 6.
    pub(super) fn ddcb_followup(&mut self) {
        if self.followup_stage == 1 {
            self.opcode = self.data_lo;
            self.micro_ops.push(MicroOp::ReadMem);
            self.micro_ops.push(MicroOp::Internal(1));
            self.queue_execute_followup();
            return;
        }
        let op = self.opcode;
        let (x, y, z) = (op >> 6, (op >> 3) & 7, op & 7);
        let hidden = (self.addr >> 8) as u8;
        if let Some(result) = self.bit_operation(x, y, self.data_lo, hidden) {
            self.data_lo = result;
            self.micro_ops.push(MicroOp::WriteMem);
            if z != 6 {
                self.set_reg8(z, result);
            }
        }
    }

    /// Rotate/shift, BIT, RES or SET. Returns the value to store back;
    /// BIT stores nothing.
    fn bit_operation(&mut self, x: u8, y: u8, value: u8, hidden: u8) -> Option<u8> {
        let f = self.regs.f;
        match x {
            0 => {
                let result = alu::shift(y, value, f & CF != 0);
                self.set_f(result.flags);
                Some(result.value)
            }
            1 => {
                self.set_f(alu::bit(y, value, hidden) | (f & CF));
                None
            }
            2 => Some(value & !(1 << y)),
            _ => Some(value | (1 << y)),
        }
    }

    pub(super) fn execute_ed(&mut self) {
        let op = self.opcode;
        let (x, y, z) = (op >> 6, (op >> 3) & 7, op & 7);
        let (p, q) = (y >> 1, y & 1 == 1);
        match (x, z) {
            (1, 0) => {
                self.addr = self.regs.bc();
                self.micro_ops.push(MicroOp::IoRead);
                self.queue_execute_followup();
            }
            (1, 1) => {
                // OUT (C),0 on an NMOS part.
                self.data_lo = if y == 6 { 0 } else { self.reg8(y) };
                self.addr = self.regs.bc();
                self.regs.wz = self.addr.wrapping_add(1);
                self.micro_ops.push(MicroOp::IoWrite);
            }
            (1, 2) => {
                self.micro_ops.push(MicroOp::Internal(7));
                let hl = self.regs.hl();
                let carry = self.regs.f & CF != 0;
                let (value, flags) = if q {
                    alu::adc16(hl, self.rp(p), carry)
                } else {
                    alu::sbc16(hl, self.rp(p), carry)
                };
                self.regs.wz = hl.wrapping_add(1);
                self.regs.set_hl(value);
                self.set_f(flags);
            }
            (1, 3) => {
                self.micro_ops.push(MicroOp::ReadImm16Lo);
                self.micro_ops.push(MicroOp::ReadImm16Hi);
                self.queue_execute_followup();
            }
            (1, 4) => {
                let result = alu::sub8(0, self.regs.a, false);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }
            (1, 5) => {
                self.micro_ops.push(MicroOp::PopLo);
                self.micro_ops.push(MicroOp::PopHi);
                self.queue_execute_followup();
            }
            (1, 6) => self.regs.im = INTERRUPT_MODES[usize::from(y)],
            (1, 7) => self.execute_ed_misc(y),
            (2, 0..=3) if y >= 4 => self.begin_block(y, z),
            // Everything else on this page is an 8 T-state no-op.
            _ => {}
        }
    }

    /// LD I,A; LD R,A; LD A,I; LD A,R; RRD; RLD.
    fn execute_ed_misc(&mut self, y: u8) {
        match y {
            0 | 1 => {
                self.micro_ops.push(MicroOp::Internal(1));
                if y == 0 {
                    self.regs.i = self.regs.a;
                } else {
                    self.regs.r = self.regs.a;
                }
            }
            2 | 3 => {
                self.micro_ops.push(MicroOp::Internal(1));
                let value = if y == 2 { self.regs.i } else { self.regs.r };
                self.regs.a = value;
                let iff2 = if self.regs.iff2 { PF } else { 0 };
                self.set_f(sz53(value) | iff2 | (self.regs.f & CF));
            }
            4 | 5 => {
                self.addr = self.regs.hl();
                self.micro_ops.push(MicroOp::ReadMem);
                self.micro_ops.push(MicroOp::Internal(4));
                self.queue_execute_followup();
            }
            _ => {}
        }
    }

    pub(super) fn ed_followup(&mut self) {
        let op = self.opcode;
        let (x, y, z) = (op >> 6, (op >> 3) & 7, op & 7);
        let (p, q) = (y >> 1, y & 1 == 1);
        match (x, z) {
            (1, 0) => {
                let value = self.data_lo;
                // IN (C) sets flags only.
                if y != 6 {
                    self.set_reg8(y, value);
                }
                self.regs.wz = self.regs.bc().wrapping_add(1);
                self.set_f(sz53p(value) | (self.regs.f & CF));
            }
            (1, 3) if self.followup_stage == 1 => {
                let address = self.word();
                self.addr = address;
                self.regs.wz = address.wrapping_add(1);
                if q {
                    self.micro_ops.push(MicroOp::ReadMem16Lo);
                    self.micro_ops.push(MicroOp::ReadMem16Hi);
                    self.queue_execute_followup();
                } else {
                    [self.data_lo, self.data_hi] = self.rp(p).to_le_bytes();
                    self.micro_ops.push(MicroOp::WriteMem16Lo);
                    self.micro_ops.push(MicroOp::WriteMem16Hi);
                }
            }
            (1, 3) => self.set_rp(p, self.word()),
            (1, 5) => {
                // RETN and RETI alike.
                self.regs.pc = self.word();
                self.regs.wz = self.regs.pc;
                self.regs.iff1 = self.regs.iff2;
            }
            (1, 7) => self.rotate_digit(y == 5),
            (2, _) => self.finish_block(y, z),
            _ => {}
        }
    }

    /// RRD, or RLD with `left`: rotate a BCD digit between A and (HL).
    fn rotate_digit(&mut self, left: bool) {
        let (a, memory) = (self.regs.a, self.data_lo);
        let (a, memory) = if left {
            ((a & 0xF0) | (memory >> 4), (memory << 4) | (a & 0x0F))
        } else {
            ((a & 0xF0) | (memory & 0x0F), (a << 4) | (memory >> 4))
        };
        self.regs.a = a;
        self.regs.wz = self.regs.hl().wrapping_add(1);
        self.set_f(sz53p(a) | (self.regs.f & CF));
        self.data_lo = memory;
        self.micro_ops.push(MicroOp::WriteMem);
    }

    /// First half of LDI/CPI/INI/OUTI and their D and R forms: `y` bit 0
    /// picks decrement, `y` bit 1 repeat; `z` picks the operation.
    fn begin_block(&mut self, y: u8, z: u8) {
        match z {
            0 | 1 => {
                self.addr = self.regs.hl();
                self.micro_ops.push(MicroOp::ReadMem);
            }
            2 => {
                self.micro_ops.push(MicroOp::Internal(1));
                let bc = self.regs.bc();
                self.addr = bc;
                self.regs.wz = if y & 1 == 1 {
                    bc.wrapping_sub(1)
                } else {
                    bc.wrapping_add(1)
                };
                self.micro_ops.push(MicroOp::IoRead);
            }
            _ => {
                self.micro_ops.push(MicroOp::Internal(1));
                self.addr = self.regs.hl();
                self.micro_ops.push(MicroOp::ReadMem);
            }
        }
        self.queue_execute_followup();
    }

    fn finish_block(&mut self, y: u8, z: u8) {
        let decrement = y & 1 == 1;
        let repeat = y & 2 == 2;
        let step = |value: u16| {
            if decrement {
                value.wrapping_sub(1)
            } else {
                value.wrapping_add(1)
            }
        };
        let value = self.data_lo;
        let f = self.regs.f;
        match z {
            0 => {
                self.addr = self.regs.de();
                self.micro_ops.push(MicroOp::WriteMem);
                self.micro_ops.push(MicroOp::Internal(2));
                self.regs.set_hl(step(self.regs.hl()));
                self.regs.set_de(step(self.regs.de()));
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);

                let n = value.wrapping_add(self.regs.a);
                let mut flags = (f & (SF | ZF | CF)) | (n & XF) | ((n << 4) & YF);
                if bc != 0 {
                    flags |= PF;
                    if repeat {
                        flags = self.repeat_block(flags);
                        self.regs.wz = self.regs.pc.wrapping_add(1);
                    }
                }
                self.set_f(flags);
            }
            1 => {
                self.micro_ops.push(MicroOp::Internal(5));
                self.regs.set_hl(step(self.regs.hl()));
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);

                let compared = alu::sub8(self.regs.a, value, false);
                let n = compared.value.wrapping_sub(u8::from(compared.flags & HF != 0));
                let mut flags = (compared.flags & (SF | ZF | HF))
                    | NF
                    | (f & CF)
                    | (n & XF)
                    | ((n << 4) & YF);
                if bc != 0 {
                    flags |= PF;
                }
                if repeat && bc != 0 && compared.value != 0 {
                    flags = self.repeat_block(flags);
                    self.regs.wz = self.regs.pc.wrapping_add(1);
                } else {
                    self.regs.wz = step(self.regs.wz);
                }
                self.set_f(flags);
            }
            2 => {
                self.addr = self.regs.hl();
                self.micro_ops.push(MicroOp::WriteMem);
                self.regs.b = self.regs.b.wrapping_sub(1);
                self.regs.set_hl(step(self.regs.hl()));
                let c = if decrement {
                    self.regs.c.wrapping_sub(1)
                } else {
                    self.regs.c.wrapping_add(1)
                };
                let k = u16::from(value) + u16::from(c);
                let flags = self.io_block_flags(value, k, repeat);
                self.set_f(flags);
            }
            _ => {
                self.regs.b = self.regs.b.wrapping_sub(1);
                let bc = self.regs.bc();
                self.addr = bc;
                self.regs.wz = step(bc);
                self.micro_ops.push(MicroOp::IoWrite);
                self.regs.set_hl(step(self.regs.hl()));
                let k = u16::from(value) + u16::from(self.regs.l);
                let flags = self.io_block_flags(value, k, repeat);
                self.set_f(flags);
            }
        }
    }

    /// Rewind PC over the instruction and spend five more T-states. X and
    /// Y come from the high byte of PC.
    fn repeat_block(&mut self, flags: u8) -> u8 {
        self.micro_ops.push(MicroOp::Internal(5));
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        (flags & !(XF | YF)) | xy((self.regs.pc >> 8) as u8)
    }

    /// INI/OUTI family. `k` is the byte moved plus C±1 (INI) or L (OUTI).
    fn io_block_flags(&mut self, value: u8, k: u16, repeat: bool) -> u8 {
        let b = self.regs.b;
        let carry = k > 0xFF;
        let mut flags = sz53(b);
        if value & 0x80 != 0 {
            flags |= NF;
        }
        if carry {
            flags |= HF | CF;
        }
        let mut p = parity((k as u8 & 7) ^ b);
        if repeat && b != 0 {
            flags = self.repeat_block(flags);
            if carry {
                flags &= !HF;
                if value & 0x80 != 0 {
                    p ^= parity(b.wrapping_sub(1) & 7) ^ PF;
                    if b & 0x0F == 0 {
                        flags |= HF;
                    }
                } else {
                    p ^= parity(b.wrapping_add(1) & 7) ^ PF;
                    if b & 0x0F == 0x0F {
                        flags |= HF;
                    }
                }
            } else {
                p ^= parity(b & 7) ^ PF;
            }
        }
        flags | p
    }
}
