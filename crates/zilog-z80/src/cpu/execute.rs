//! Unprefixed opcodes and their DD/FD forms.
//!
//! Opcodes are split into fields the way the silicon decodes them:
//! `x` (bits 7-6), `y` (bits 5-3), `z` (bits 2-0), and `p`/`q` (`y` split
//! into bits 5-4 and bit 3). Under a DD or FD prefix, HL becomes IX or
//! IY, H and L become its halves, and (HL) becomes (IX+d).

use super::Z80;
use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, ZF, xy};
use crate::microcode::MicroOp;

impl Z80 {
    pub(super) fn execute_main(&mut self) {
        let op = self.opcode;
        let (x, y, z) = (op >> 6, (op >> 3) & 7, op & 7);
        match x {
            0 => self.execute_block0(y, z),
            1 if op == 0x76 => self.regs.halted = true,
            1 => self.load_register(y, z),
            2 => {
                if z == 6 {
                    self.queue_memory_operand();
                    self.micro_ops.push(MicroOp::ReadMem);
                    self.queue_execute_followup();
                } else {
                    self.accumulate(y, self.indexed_reg8(z));
                }
            }
            _ => self.execute_block3(y, z),
        }
    }

    pub(super) fn main_followup(&mut self) {
        let op = self.opcode;
        let (x, y, z) = (op >> 6, (op >> 3) & 7, op & 7);
        let (p, q) = (y >> 1, y & 1 == 1);
        match (x, z) {
            (0, 0) => self.relative_jump(y),
            (0, 1) => self.set_rp(p, self.word()),
            (0, 2) => self.indirect_load_followup(p, q),
            (0, 4 | 5) => {
                let result = if z == 4 {
                    alu::inc8(self.data_lo)
                } else {
                    alu::dec8(self.data_lo)
                };
                self.set_f(result.flags | (self.regs.f & CF));
                self.data_lo = result.value;
                self.micro_ops.push(MicroOp::WriteMem);
            }
            (0, 6) => self.set_indexed_reg8(y, self.data_lo),
            // LD r,(HL) names the plain register even under a prefix.
            (1, _) => self.set_reg8(y, self.data_lo),
            (2, _) | (3, 6) => self.accumulate(y, self.data_lo),
            (3, 0) => self.return_to_word(),
            (3, 1) if q => self.return_to_word(),
            (3, 1) => self.set_rp2(p, self.word()),
            (3, 2) => self.jump(self.condition(y), false),
            (3, 3) => match y {
                0 => self.jump(true, false),
                2 => {
                    let port = self.data_lo;
                    self.addr = u16::from(self.regs.a) << 8 | u16::from(port);
                    self.regs.wz = u16::from(self.regs.a) << 8 | u16::from(port.wrapping_add(1));
                    self.data_lo = self.regs.a;
                    self.micro_ops.push(MicroOp::IoWrite);
                }
                3 => self.in_a_immediate(),
                4 => self.exchange_stack_top(),
                _ => {}
            },
            (3, 4) => self.jump(self.condition(y), true),
            (3, 5) => self.jump(true, true),
            _ => {}
        }
    }

    fn execute_block0(&mut self, y: u8, z: u8) {
        let (p, q) = (y >> 1, y & 1 == 1);
        match z {
            0 => match y {
                0 => {}
                1 => self.regs.exchange_af(),
                2 => {
                    self.micro_ops.push(MicroOp::Internal(1));
                    self.micro_ops.push(MicroOp::ReadImm8);
                    self.queue_execute_followup();
                }
                _ => {
                    self.micro_ops.push(MicroOp::ReadImm8);
                    self.queue_execute_followup();
                }
            },
            1 if q => {
                self.micro_ops.push(MicroOp::Internal(7));
                let target = self.index();
                let (value, flags) = alu::add16(target, self.rp(p), self.regs.f);
                self.regs.wz = target.wrapping_add(1);
                self.set_index(value);
                self.set_f(flags);
            }
            1 => self.queue_immediate_word(),
            2 => self.indirect_load(p, q),
            3 => {
                self.micro_ops.push(MicroOp::Internal(2));
                let value = self.rp(p);
                let value = if q {
                    value.wrapping_sub(1)
                } else {
                    value.wrapping_add(1)
                };
                self.set_rp(p, value);
            }
            4 | 5 if y == 6 => {
                self.queue_memory_operand();
                self.micro_ops.push(MicroOp::ReadMem);
                self.micro_ops.push(MicroOp::Internal(1));
                self.queue_execute_followup();
            }
            4 | 5 => {
                let value = self.indexed_reg8(y);
                let result = if z == 4 {
                    alu::inc8(value)
                } else {
                    alu::dec8(value)
                };
                self.set_indexed_reg8(y, result.value);
                self.set_f(result.flags | (self.regs.f & CF));
            }
            6 if y == 6 => {
                if self.is_indexed() {
                    // DD 36 d n: the immediate follows the displacement.
                    self.micro_ops.push(MicroOp::FetchDisplacement);
                    self.micro_ops.push(MicroOp::ReadImm8);
                    self.micro_ops.push(MicroOp::Internal(2));
                } else {
                    self.addr = self.regs.hl();
                    self.micro_ops.push(MicroOp::ReadImm8);
                }
                self.micro_ops.push(MicroOp::WriteMem);
            }
            6 => {
                self.micro_ops.push(MicroOp::ReadImm8);
                self.queue_execute_followup();
            }
            _ => self.accumulator_misc(y),
        }
    }

    fn execute_block3(&mut self, y: u8, z: u8) {
        let (p, q) = (y >> 1, y & 1 == 1);
        match z {
            0 => {
                self.micro_ops.push(MicroOp::Internal(1));
                if self.condition(y) {
                    self.queue_pop();
                }
            }
            1 => match (q, p) {
                (false, _) | (true, 0) => self.queue_pop(),
                (true, 1) => self.regs.exchange_main(),
                (true, 2) => self.regs.pc = self.index(),
                _ => {
                    self.micro_ops.push(MicroOp::Internal(2));
                    self.regs.sp = self.index();
                }
            },
            2 | 4 => self.queue_immediate_word(),
            3 => match y {
                0 => self.queue_immediate_word(),
                2 | 3 => {
                    self.micro_ops.push(MicroOp::ReadImm8);
                    self.queue_execute_followup();
                }
                4 => {
                    self.addr = self.regs.sp;
                    self.micro_ops.push(MicroOp::ReadMem16Lo);
                    self.micro_ops.push(MicroOp::ReadMem16Hi);
                    self.micro_ops.push(MicroOp::Internal(1));
                    self.queue_execute_followup();
                }
                // EX DE,HL ignores DD and FD.
                5 => {
                    let de = self.regs.de();
                    self.regs.set_de(self.regs.hl());
                    self.regs.set_hl(de);
                }
                6 => {
                    self.regs.iff1 = false;
                    self.regs.iff2 = false;
                }
                7 => {
                    self.regs.iff1 = true;
                    self.regs.iff2 = true;
                    self.ei_delay = true;
                }
                _ => {}
            },
            5 if q => {
                if p == 0 {
                    self.queue_immediate_word();
                }
            }
            5 => {
                self.micro_ops.push(MicroOp::Internal(1));
                self.queue_push(self.rp2(p));
            }
            6 => {
                self.micro_ops.push(MicroOp::ReadImm8);
                self.queue_execute_followup();
            }
            _ => {
                self.micro_ops.push(MicroOp::Internal(1));
                self.queue_call(u16::from(y) * 8);
            }
        }
    }

    fn queue_immediate_word(&mut self) {
        self.micro_ops.push(MicroOp::ReadImm16Lo);
        self.micro_ops.push(MicroOp::ReadImm16Hi);
        self.queue_execute_followup();
    }

    fn queue_pop(&mut self) {
        self.micro_ops.push(MicroOp::PopLo);
        self.micro_ops.push(MicroOp::PopHi);
        self.queue_execute_followup();
    }

    fn return_to_word(&mut self) {
        self.regs.pc = self.word();
        self.regs.wz = self.regs.pc;
    }

    /// JP and CALL, conditional or not. MEMPTR takes the target either way.
    fn jump(&mut self, taken: bool, call: bool) {
        let target = self.word();
        self.regs.wz = target;
        if !taken {
            return;
        }
        if call {
            self.micro_ops.push(MicroOp::Internal(1));
            self.queue_call(target);
        } else {
            self.regs.pc = target;
        }
    }

    /// DJNZ, JR and JR cc once the displacement is in.
    fn relative_jump(&mut self, y: u8) {
        let taken = match y {
            2 => {
                self.regs.b = self.regs.b.wrapping_sub(1);
                self.regs.b != 0
            }
            3 => true,
            _ => self.condition(y - 4),
        };
        if taken {
            self.micro_ops.push(MicroOp::Internal(5));
            self.regs.pc = self.regs.pc.wrapping_add(self.data_lo as i8 as u16);
            self.regs.wz = self.regs.pc;
        }
    }

    fn load_register(&mut self, y: u8, z: u8) {
        if z == 6 {
            self.queue_memory_operand();
            self.micro_ops.push(MicroOp::ReadMem);
            self.queue_execute_followup();
        } else if y == 6 {
            self.queue_memory_operand();
            self.data_lo = self.reg8(z);
            self.micro_ops.push(MicroOp::WriteMem);
        } else {
            let value = self.indexed_reg8(z);
            self.set_indexed_reg8(y, value);
        }
    }

    fn accumulate(&mut self, op: u8, value: u8) {
        let result = alu::accumulate(op, self.regs.a, value, self.regs.f & CF != 0);
        self.regs.a = result.value;
        self.set_f(result.flags);
    }

    /// LD (BC)/(DE)/(nn) with A or HL, both directions.
    fn indirect_load(&mut self, p: u8, load: bool) {
        if p >= 2 {
            self.queue_immediate_word();
            return;
        }
        let pointer = self.rp(p);
        self.addr = pointer;
        if load {
            self.regs.wz = pointer.wrapping_add(1);
            self.micro_ops.push(MicroOp::ReadMem);
            self.queue_execute_followup();
        } else {
            self.regs.wz = u16::from(self.regs.a) << 8 | (pointer.wrapping_add(1) & 0xFF);
            self.data_lo = self.regs.a;
            self.micro_ops.push(MicroOp::WriteMem);
        }
    }

    fn indirect_load_followup(&mut self, p: u8, load: bool) {
        if p < 2 {
            self.regs.a = self.data_lo;
            return;
        }
        if self.followup_stage > 1 {
            if p == 2 {
                self.set_index(self.word());
            } else {
                self.regs.a = self.data_lo;
            }
            return;
        }
        let address = self.word();
        self.addr = address;
        match (p, load) {
            (2, false) => {
                self.regs.wz = address.wrapping_add(1);
                [self.data_lo, self.data_hi] = self.index().to_le_bytes();
                self.micro_ops.push(MicroOp::WriteMem16Lo);
                self.micro_ops.push(MicroOp::WriteMem16Hi);
            }
            (_, false) => {
                self.regs.wz = u16::from(self.regs.a) << 8 | (address.wrapping_add(1) & 0xFF);
                self.data_lo = self.regs.a;
                self.micro_ops.push(MicroOp::WriteMem);
            }
            (2, true) => {
                self.regs.wz = address.wrapping_add(1);
                self.micro_ops.push(MicroOp::ReadMem16Lo);
                self.micro_ops.push(MicroOp::ReadMem16Hi);
                self.queue_execute_followup();
            }
            (_, true) => {
                self.regs.wz = address.wrapping_add(1);
                self.micro_ops.push(MicroOp::ReadMem);
                self.queue_execute_followup();
            }
        }
    }

    fn in_a_immediate(&mut self) {
        if self.followup_stage == 1 {
            self.addr = u16::from(self.regs.a) << 8 | u16::from(self.data_lo);
            self.regs.wz = self.addr.wrapping_add(1);
            self.micro_ops.push(MicroOp::IoRead);
            self.queue_execute_followup();
        } else {
            self.regs.a = self.data_lo;
        }
    }

    /// EX (SP),HL: high byte written back first, to SP+1.
    fn exchange_stack_top(&mut self) {
        if self.followup_stage == 1 {
            let old = self.index();
            let new = self.word();
            self.set_index(new);
            self.regs.wz = new;
            [self.data_lo, self.data_hi] = old.to_le_bytes();
            self.addr = self.regs.sp.wrapping_add(1);
            self.micro_ops.push(MicroOp::WriteMem16Hi);
            self.queue_execute_followup();
        } else {
            self.addr = self.regs.sp;
            self.micro_ops.push(MicroOp::WriteMem);
            self.micro_ops.push(MicroOp::Internal(2));
        }
    }

    /// RLCA, RRCA, RLA, RRA, DAA, CPL, SCF, CCF.
    fn accumulator_misc(&mut self, y: u8) {
        let (a, f) = (self.regs.a, self.regs.f);
        let kept = f & (SF | ZF | PF);
        match y {
            0..=3 => {
                let result = alu::rotate_accumulator(y, a, f);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }
            4 => {
                let result = alu::daa(a, f);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }
            5 => {
                self.regs.a = !a;
                self.set_f(kept | (f & CF) | HF | NF | xy(!a));
            }
            // X and Y: A, or'd with F when the previous instruction left F alone.
            6 => self.set_f(kept | xy((self.last_q ^ f) | a) | CF),
            _ => {
                let half = if f & CF != 0 { HF } else { 0 };
                self.set_f(kept | half | xy((self.last_q ^ f) | a) | ((f & CF) ^ CF));
            }
        }
    }
}
