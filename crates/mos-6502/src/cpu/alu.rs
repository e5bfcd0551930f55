//! ALU operations.
//!
//! Decimal-mode results follow the NMOS silicon, including the flag
//! values for invalid BCD inputs: N, V and Z come from intermediate
//! results rather than from the corrected accumulator.

use super::Mos6502;
use crate::flags::{C, D, I, N, V, Z};
use crate::table::Op;

/// Bus noise ORed into A by ANE and LXA. Varies between chips; this is
/// the value most test vectors assume.
const MAGIC: u8 = 0xEE;

impl Mos6502 {
    /// Final step of a read instruction.
    pub(super) fn execute_read(&mut self, val: u8) {
        match self.op {
            Op::Lda => self.do_lda(val),
            Op::Ldx => self.do_ldx(val),
            Op::Ldy => self.do_ldy(val),
            Op::Ora => self.do_ora(val),
            Op::And => self.do_and(val),
            Op::Eor => self.do_eor(val),
            Op::Adc => self.do_adc(val),
            Op::Sbc | Op::Usbc => self.do_sbc(val),
            Op::Cmp => self.compare(self.regs.a, val),
            Op::Cpx => self.compare(self.regs.x, val),
            Op::Cpy => self.compare(self.regs.y, val),
            Op::Bit => self.do_bit(val),
            Op::Nop => {}
            Op::Lax => {
                self.regs.x = val;
                self.do_lda(val);
            }
            Op::Anc => {
                self.do_and(val);
                self.regs.p.set_if(C, self.regs.a & 0x80 != 0);
            }
            Op::Alr => {
                self.do_and(val);
                self.regs.a = self.do_lsr(self.regs.a);
            }
            Op::Arr => self.do_arr(val),
            Op::Ane => self.do_lda((self.regs.a | MAGIC) & self.regs.x & val),
            Op::Lxa => {
                let result = (self.regs.a | MAGIC) & val;
                self.regs.x = result;
                self.do_lda(result);
            }
            Op::Sbx => {
                let ax = self.regs.a & self.regs.x;
                self.regs.p.set_if(C, ax >= val);
                self.regs.x = ax.wrapping_sub(val);
                self.regs.p.update_nz(self.regs.x);
            }
            Op::Las => {
                let result = val & self.regs.s;
                self.regs.s = result;
                self.regs.x = result;
                self.do_lda(result);
            }
            op => unreachable!("{op:?} is not a read operation"),
        }
    }

    /// Value for a store. The unstable stores AND in the base high byte
    /// plus one and, when indexing crossed a page, drive that value onto
    /// the high address lines as well.
    pub(super) fn store_value(&mut self) -> u8 {
        match self.op {
            Op::Sta => self.regs.a,
            Op::Stx => self.regs.x,
            Op::Sty => self.regs.y,
            Op::Sax => self.regs.a & self.regs.x,
            Op::Sha => self.unstable_store(self.regs.a & self.regs.x),
            Op::Shx => self.unstable_store(self.regs.x),
            Op::Shy => self.unstable_store(self.regs.y),
            Op::Tas => {
                self.regs.s = self.regs.a & self.regs.x;
                self.unstable_store(self.regs.s)
            }
            op => unreachable!("{op:?} is not a store"),
        }
    }

    fn unstable_store(&mut self, reg: u8) -> u8 {
        let value = reg & self.base_hi.wrapping_add(1);
        if self.page_crossed {
            self.addr = (self.addr & 0x00FF) | (u16::from(value) << 8);
        }
        value
    }

    /// Modify step of a read-modify-write (memory or accumulator).
    pub(super) fn modify(&mut self, val: u8) -> u8 {
        match self.op {
            Op::Asl => self.do_asl(val),
            Op::Lsr => self.do_lsr(val),
            Op::Rol => self.do_rol(val),
            Op::Ror => self.do_ror(val),
            Op::Inc => self.do_inc(val),
            Op::Dec => self.do_dec(val),
            Op::Slo => {
                let result = self.do_asl(val);
                self.do_ora(result);
                result
            }
            Op::Rla => {
                let result = self.do_rol(val);
                self.do_and(result);
                result
            }
            Op::Sre => {
                let result = self.do_lsr(val);
                self.do_eor(result);
                result
            }
            Op::Rra => {
                let result = self.do_ror(val);
                self.do_adc(result);
                result
            }
            Op::Dcp => {
                let result = val.wrapping_sub(1);
                self.compare(self.regs.a, result);
                result
            }
            Op::Isc => {
                let result = val.wrapping_add(1);
                self.do_sbc(result);
                result
            }
            op => unreachable!("{op:?} is not a read-modify-write"),
        }
    }

    /// Register and flag operations of two-cycle implied instructions.
    pub(super) fn execute_implied(&mut self) {
        let regs = &mut self.regs;
        match self.op {
            Op::Clc => regs.p.clear(C),
            Op::Sec => regs.p.set(C),
            Op::Cli => regs.p.clear(I),
            Op::Sei => regs.p.set(I),
            Op::Clv => regs.p.clear(V),
            Op::Cld => regs.p.clear(D),
            Op::Sed => regs.p.set(D),
            Op::Tax => {
                regs.x = regs.a;
                regs.p.update_nz(regs.x);
            }
            Op::Tay => {
                regs.y = regs.a;
                regs.p.update_nz(regs.y);
            }
            Op::Txa => {
                regs.a = regs.x;
                regs.p.update_nz(regs.a);
            }
            Op::Tya => {
                regs.a = regs.y;
                regs.p.update_nz(regs.a);
            }
            Op::Tsx => {
                regs.x = regs.s;
                regs.p.update_nz(regs.x);
            }
            Op::Txs => regs.s = regs.x,
            Op::Inx => {
                regs.x = regs.x.wrapping_add(1);
                regs.p.update_nz(regs.x);
            }
            Op::Iny => {
                regs.y = regs.y.wrapping_add(1);
                regs.p.update_nz(regs.y);
            }
            Op::Dex => {
                regs.x = regs.x.wrapping_sub(1);
                regs.p.update_nz(regs.x);
            }
            Op::Dey => {
                regs.y = regs.y.wrapping_sub(1);
                regs.p.update_nz(regs.y);
            }
            Op::Nop => {}
            op => unreachable!("{op:?} is not a two-cycle implied instruction"),
        }
    }

    fn do_lda(&mut self, val: u8) {
        self.regs.a = val;
        self.regs.p.update_nz(val);
    }

    fn do_ldx(&mut self, val: u8) {
        self.regs.x = val;
        self.regs.p.update_nz(val);
    }

    fn do_ldy(&mut self, val: u8) {
        self.regs.y = val;
        self.regs.p.update_nz(val);
    }

    fn do_ora(&mut self, val: u8) {
        self.regs.a |= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_and(&mut self, val: u8) {
        self.regs.a &= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_eor(&mut self, val: u8) {
        self.regs.a ^= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_adc(&mut self, val: u8) {
        if self.decimal_enabled() {
            self.do_adc_decimal(val);
        } else {
            self.do_adc_binary(val);
        }
    }

    fn do_adc_binary(&mut self, val: u8) {
        let a = self.regs.a;
        let sum = u16::from(a) + u16::from(val) + u16::from(self.regs.p.carry());
        let result = sum as u8;

        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ result) & (val ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    fn do_adc_decimal(&mut self, val: u8) {
        let a = u16::from(self.regs.a);
        let val = u16::from(val);
        let carry = u16::from(self.regs.p.carry());

        let mut tmp = (a & 0x0F) + (val & 0x0F) + carry;
        if tmp > 0x09 {
            tmp += 0x06;
        }
        tmp = if tmp <= 0x0F {
            (tmp & 0x0F) + (a & 0xF0) + (val & 0xF0)
        } else {
            (tmp & 0x0F) + (a & 0xF0) + (val & 0xF0) + 0x10
        };

        // Z sees the binary sum; N and V see the half-corrected one.
        self.regs.p.set_if(Z, (a + val + carry) & 0xFF == 0);
        self.regs.p.set_if(N, tmp & 0x80 != 0);
        self.regs
            .p
            .set_if(V, (a ^ tmp) & 0x80 != 0 && (a ^ val) & 0x80 == 0);

        if tmp & 0x1F0 > 0x90 {
            tmp += 0x60;
        }
        self.regs.p.set_if(C, tmp & 0xFF0 > 0xF0);
        self.regs.a = tmp as u8;
    }

    fn do_sbc(&mut self, val: u8) {
        if self.decimal_enabled() {
            self.do_sbc_decimal(val);
        } else {
            // SBC is ADC with inverted operand
            self.do_adc_binary(!val);
        }
    }

    fn do_sbc_decimal(&mut self, val: u8) {
        let a = u16::from(self.regs.a);
        let val = u16::from(val);
        let borrow = u16::from(self.regs.p.carry() ^ 1);

        // Flags are those of the binary subtraction.
        let tmp = a.wrapping_sub(val).wrapping_sub(borrow);
        self.regs.p.set_if(C, tmp < 0x100);
        self.regs.p.update_nz(tmp as u8);
        self.regs
            .p
            .set_if(V, (a ^ tmp) & 0x80 != 0 && (a ^ val) & 0x80 != 0);

        let mut tmp_a = (a & 0x0F).wrapping_sub(val & 0x0F).wrapping_sub(borrow);
        tmp_a = if tmp_a & 0x10 != 0 {
            (tmp_a.wrapping_sub(6) & 0x0F) | (a & 0xF0).wrapping_sub(val & 0xF0).wrapping_sub(0x10)
        } else {
            (tmp_a & 0x0F) | (a & 0xF0).wrapping_sub(val & 0xF0)
        };
        if tmp_a & 0x100 != 0 {
            tmp_a = tmp_a.wrapping_sub(0x60);
        }
        self.regs.a = tmp_a as u8;
    }

    /// AND then rotate right, with C and V taken from bits 6 and 5 of the
    /// result. In decimal mode the halves get a BCD-style fix-up.
    fn do_arr(&mut self, val: u8) {
        let t = self.regs.a & val;
        let carry_in = self.regs.p.carry();
        let mut result = (t >> 1) | (carry_in << 7);

        if !self.decimal_enabled() {
            self.regs.p.update_nz(result);
            self.regs.p.set_if(C, result & 0x40 != 0);
            self.regs
                .p
                .set_if(V, ((result >> 6) ^ (result >> 5)) & 0x01 != 0);
            self.regs.a = result;
            return;
        }

        self.regs.p.set_if(N, carry_in != 0);
        self.regs.p.set_if(Z, result == 0);
        self.regs.p.set_if(V, (t ^ result) & 0x40 != 0);

        if (t & 0x0F) + (t & 0x01) > 0x05 {
            result = (result & 0xF0) | (result.wrapping_add(0x06) & 0x0F);
        }
        if u16::from(t & 0xF0) + u16::from(t & 0x10) > 0x50 {
            result = (result & 0x0F) | (result.wrapping_add(0x60) & 0xF0);
            self.regs.p.set(C);
        } else {
            self.regs.p.clear(C);
        }
        self.regs.a = result;
    }

    fn compare(&mut self, reg: u8, val: u8) {
        self.regs.p.set_if(C, reg >= val);
        self.regs.p.update_nz(reg.wrapping_sub(val));
    }

    fn do_bit(&mut self, val: u8) {
        self.regs.p.set_if(Z, self.regs.a & val == 0);
        self.regs.p.set_if(N, val & 0x80 != 0);
        self.regs.p.set_if(V, val & 0x40 != 0);
    }

    fn do_asl(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = val << 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_lsr(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = val >> 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_rol(&mut self, val: u8) -> u8 {
        let carry = self.regs.p.carry();
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = (val << 1) | carry;
        self.regs.p.update_nz(result);
        result
    }

    fn do_ror(&mut self, val: u8) -> u8 {
        let carry = self.regs.p.carry() << 7;
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = (val >> 1) | carry;
        self.regs.p.update_nz(result);
        result
    }

    fn do_inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.regs.p.update_nz(result);
        result
    }

    fn do_dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.regs.p.update_nz(result);
        result
    }
}
