//! Width-aware ALU.
//!
//! Every operation works on 8 or 16 bits, chosen at decode from M or X.
//! Eight-bit results leave the accumulator's high byte (B) alone.

use super::Wdc65816;
use crate::flags::{C, D, I, M, N, V, X, Z};
use crate::table::{Mode, Op};

const fn mask(wide: bool) -> u16 {
    if wide { 0xFFFF } else { 0x00FF }
}

const fn sign(wide: bool) -> u16 {
    if wide { 0x8000 } else { 0x0080 }
}

impl Wdc65816 {
    /// A or C, per M.
    pub(super) fn accumulator(&self) -> u16 {
        if self.regs.p.is_set(M) {
            self.regs.c & 0x00FF
        } else {
            self.regs.c
        }
    }

    pub(super) fn set_accumulator(&mut self, value: u16) {
        if self.regs.p.is_set(M) {
            self.regs.set_a(value as u8);
        } else {
            self.regs.c = value;
        }
    }

    /// Store an index value, dropping the high byte while X is set.
    fn index_value(&self, value: u16) -> u16 {
        value & mask(!self.regs.p.is_set(X))
    }

    pub(super) fn set_nz(&mut self, value: u16, wide: bool) {
        self.regs.p.set_if(N, value & sign(wide) != 0);
        self.regs.p.set_if(Z, value & mask(wide) == 0);
    }

    pub(super) fn execute_read(&mut self, value: u16) {
        let wide = self.wide;
        let value = value & mask(wide);
        match self.op {
            Op::Lda => {
                self.set_accumulator(value);
                self.set_nz(value, wide);
            }
            Op::Ldx => {
                self.regs.x = value;
                self.set_nz(value, wide);
            }
            Op::Ldy => {
                self.regs.y = value;
                self.set_nz(value, wide);
            }
            Op::Ora | Op::And | Op::Eor => {
                let a = self.accumulator();
                let result = match self.op {
                    Op::Ora => a | value,
                    Op::And => a & value,
                    _ => a ^ value,
                };
                self.set_accumulator(result);
                self.set_nz(result, wide);
            }
            Op::Adc => self.adc(value),
            Op::Sbc => self.sbc(value),
            Op::Cmp => self.compare(self.accumulator(), value),
            Op::Cpx => self.compare(self.regs.x, value),
            Op::Cpy => self.compare(self.regs.y, value),
            Op::Bit => {
                let a = self.accumulator();
                self.regs.p.set_if(Z, a & value & mask(wide) == 0);
                // Immediate BIT only affects Z.
                if self.mode != Mode::Imm {
                    self.regs.p.set_if(N, value & sign(wide) != 0);
                    self.regs.p.set_if(V, value & (sign(wide) >> 1) != 0);
                }
            }
            op => unreachable!("{op:?} is not a read operation"),
        }
    }

    /// Read-modify-write operations, shared by memory and accumulator forms.
    pub(super) fn modify(&mut self, value: u16) -> u16 {
        let wide = self.wide;
        let value = value & mask(wide);
        let top = sign(wide);
        let carry_in = self.regs.p.is_set(C);
        let result = match self.op {
            Op::Asl => {
                self.regs.p.set_if(C, value & top != 0);
                value << 1
            }
            Op::Lsr => {
                self.regs.p.set_if(C, value & 1 != 0);
                value >> 1
            }
            Op::Rol => {
                self.regs.p.set_if(C, value & top != 0);
                (value << 1) | u16::from(carry_in)
            }
            Op::Ror => {
                self.regs.p.set_if(C, value & 1 != 0);
                let fill = if carry_in { top } else { 0 };
                (value >> 1) | fill
            }
            Op::Inc => value.wrapping_add(1),
            Op::Dec => value.wrapping_sub(1),
            Op::Tsb | Op::Trb => {
                let a = self.accumulator();
                self.regs.p.set_if(Z, a & value & mask(wide) == 0);
                let result = if self.op == Op::Tsb { value | a } else { value & !a };
                // TSB/TRB leave N alone.
                return result & mask(wide);
            }
            op => unreachable!("{op:?} is not a read-modify-write operation"),
        } & mask(wide);
        self.set_nz(result, wide);
        result
    }

    fn compare(&mut self, register: u16, value: u16) {
        let wide = self.wide;
        let register = register & mask(wide);
        let result = register.wrapping_sub(value) & mask(wide);
        self.regs.p.set_if(C, register >= value);
        self.set_nz(result, wide);
    }

    /// Binary or BCD add, digit by digit in decimal mode.
    fn adc(&mut self, value: u16) {
        let wide = self.wide;
        let digits = if wide { 4 } else { 2 };
        let a = i32::from(self.accumulator());
        let data = i32::from(value & mask(wide));
        let mut carry = i32::from(self.regs.p.carry());
        let decimal = self.regs.p.is_set(D);

        let mut result;
        if decimal {
            result = 0;
            for digit in 0..digits {
                let shift = digit * 4;
                let nibble = 0xF << shift;
                result = (a & nibble) + (data & nibble) + (carry << shift) + (result & ((1 << shift) - 1));
                if digit + 1 < digits {
                    if result > (0xA << shift) - 1 {
                        result += 6 << shift;
                    }
                    carry = i32::from(result > (0x10 << shift) - 1);
                }
            }
        } else {
            result = a + data + carry;
        }
        self.finish_add(a, data, result, decimal, false);
    }

    /// Subtract by adding the complement, with BCD correction downwards.
    fn sbc(&mut self, value: u16) {
        let wide = self.wide;
        let digits = if wide { 4 } else { 2 };
        let a = i32::from(self.accumulator());
        let data = i32::from(!value & mask(wide));
        let mut carry = i32::from(self.regs.p.carry());
        let decimal = self.regs.p.is_set(D);

        let mut result;
        if decimal {
            result = 0;
            for digit in 0..digits {
                let shift = digit * 4;
                let nibble = 0xF << shift;
                result = (a & nibble) + (data & nibble) + (carry << shift) + (result & ((1 << shift) - 1));
                if digit + 1 < digits {
                    if result <= (0x10 << shift) - 1 {
                        result -= 6 << shift;
                    }
                    carry = i32::from(result > (0x10 << shift) - 1);
                }
            }
        } else {
            result = a + data + carry;
        }
        self.finish_add(a, data, result, decimal, true);
    }

    /// Overflow from the uncorrected top digit, then the final decimal
    /// correction, carry, N and Z.
    fn finish_add(&mut self, a: i32, data: i32, mut result: i32, decimal: bool, subtract: bool) {
        let wide = self.wide;
        let top_shift = if wide { 12 } else { 4 };
        let limit = i32::from(mask(wide));
        let overflow = !(a ^ data) & (a ^ result) & i32::from(sign(wide));
        self.regs.p.set_if(V, overflow != 0);
        if decimal {
            if subtract {
                if result <= limit {
                    result -= 6 << top_shift;
                }
            } else if result > (0xA << top_shift) - 1 {
                result += 6 << top_shift;
            }
        }
        self.regs.p.set_if(C, result > limit);
        let result = (result as u16) & mask(wide);
        self.set_accumulator(result);
        self.set_nz(result, wide);
    }

    /// Flag operations, transfers and index increments.
    pub(super) fn execute_implied(&mut self) {
        let x_wide = !self.regs.p.is_set(X);
        let m_wide = !self.regs.p.is_set(M);
        match self.op {
            Op::Clc => self.regs.p.clear(C),
            Op::Sec => self.regs.p.set(C),
            Op::Cli => self.regs.p.clear(I),
            Op::Sei => self.regs.p.set(I),
            Op::Cld => self.regs.p.clear(D),
            Op::Sed => self.regs.p.set(D),
            Op::Clv => self.regs.p.clear(V),
            Op::Tax | Op::Tay => {
                let value = self.index_value(self.regs.c);
                if self.op == Op::Tax {
                    self.regs.x = value;
                } else {
                    self.regs.y = value;
                }
                self.set_nz(value, x_wide);
            }
            Op::Txa | Op::Tya => {
                let value = if self.op == Op::Txa { self.regs.x } else { self.regs.y };
                self.set_accumulator(value);
                self.set_nz(value, m_wide);
            }
            Op::Txy => {
                self.regs.y = self.regs.x;
                self.set_nz(self.regs.y, x_wide);
            }
            Op::Tyx => {
                self.regs.x = self.regs.y;
                self.set_nz(self.regs.x, x_wide);
            }
            Op::Tsx => {
                self.regs.x = self.index_value(self.regs.s);
                self.set_nz(self.regs.x, x_wide);
            }
            Op::Txs => self.set_stack(self.regs.x),
            Op::Tcs => self.set_stack(self.regs.c),
            Op::Tsc => {
                self.regs.c = self.regs.s;
                self.set_nz(self.regs.c, true);
            }
            Op::Tcd => {
                self.regs.d = self.regs.c;
                self.set_nz(self.regs.d, true);
            }
            Op::Tdc => {
                self.regs.c = self.regs.d;
                self.set_nz(self.regs.c, true);
            }
            Op::Inx | Op::Dex => {
                let value = if self.op == Op::Inx {
                    self.regs.x.wrapping_add(1)
                } else {
                    self.regs.x.wrapping_sub(1)
                };
                self.regs.x = self.index_value(value);
                self.set_nz(self.regs.x, x_wide);
            }
            Op::Iny | Op::Dey => {
                let value = if self.op == Op::Iny {
                    self.regs.y.wrapping_add(1)
                } else {
                    self.regs.y.wrapping_sub(1)
                };
                self.regs.y = self.index_value(value);
                self.set_nz(self.regs.y, x_wide);
            }
            op => unreachable!("{op:?} is not an implied operation"),
        }
    }

    /// S keeps its page-one high byte in emulation mode.
    fn set_stack(&mut self, value: u16) {
        self.regs.s = if self.regs.e {
            0x0100 | (value & 0x00FF)
        } else {
            value
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::OPCODES;

    /// Core in native mode set up to run `opcode` at the given widths.
    fn core(opcode: u8, wide: bool, p: u8) -> Wdc65816 {
        let mut cpu = Wdc65816::new();
        cpu.regs.set_e(false);
        cpu.regs.set_p(p);
        (cpu.op, cpu.mode) = OPCODES[usize::from(opcode)];
        cpu.wide = wide;
        cpu
    }

    #[test]
    fn decimal_add_eight_bit() {
        let mut cpu = core(0x69, false, M | X | D);
        cpu.regs.c = 0xAB38;
        cpu.execute_read(0x45);
        assert_eq!(cpu.regs.c, 0xAB83);
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn decimal_add_sixteen_bit() {
        let mut cpu = core(0x69, true, D);
        cpu.regs.c = 0x1234;
        cpu.execute_read(0x5678);
        assert_eq!(cpu.regs.c, 0x6912);
        assert!(!cpu.regs.p.is_set(C));

        cpu.regs.c = 0x9999;
        cpu.execute_read(0x0001);
        assert_eq!(cpu.regs.c, 0x0000);
        assert!(cpu.regs.p.is_set(C));
        assert!(cpu.regs.p.is_set(Z));
    }

    #[test]
    fn decimal_subtract_sixteen_bit() {
        let mut cpu = core(0xE9, true, D | C);
        cpu.regs.c = 0x1000;
        cpu.execute_read(0x0001);
        assert_eq!(cpu.regs.c, 0x0999);
        assert!(cpu.regs.p.is_set(C));

        cpu.regs.p.set(C);
        cpu.regs.c = 0x0000;
        cpu.execute_read(0x0001);
        assert_eq!(cpu.regs.c, 0x9999);
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn binary_add_sixteen_bit_overflow() {
        let mut cpu = core(0x69, true, 0);
        cpu.regs.c = 0x7FFF;
        cpu.execute_read(0x0001);
        assert_eq!(cpu.regs.c, 0x8000);
        assert!(cpu.regs.p.is_set(V));
        assert!(cpu.regs.p.is_set(N));
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn compare_sets_carry_at_width() {
        let mut cpu = core(0xC9, true, 0);
        cpu.regs.c = 0x1234;
        cpu.execute_read(0x1234);
        assert!(cpu.regs.p.is_set(C) && cpu.regs.p.is_set(Z));
        cpu.execute_read(0x1235);
        assert!(!cpu.regs.p.is_set(C));
        assert!(cpu.regs.p.is_set(N));
    }

    #[test]
    fn eight_bit_shift_keeps_b() {
        let mut cpu = core(0x0A, false, M | X);
        cpu.regs.c = 0x1281;
        let value = cpu.modify(cpu.accumulator());
        cpu.set_accumulator(value);
        assert_eq!(cpu.regs.c, 0x1202);
        assert!(cpu.regs.p.is_set(C));
    }

    #[test]
    fn tsb_sets_z_from_and() {
        let mut cpu = core(0x04, false, M | X);
        cpu.regs.c = 0x0F;
        assert_eq!(cpu.modify(0xF0), 0xFF);
        assert!(cpu.regs.p.is_set(Z));
        cpu.op = Op::Trb;
        assert_eq!(cpu.modify(0xFF), 0xF0);
        assert!(!cpu.regs.p.is_set(Z));
    }

    #[test]
    fn transfers_respect_widths() {
        let mut cpu = core(0xAA, false, M | X);
        cpu.regs.c = 0xBEEF;
        cpu.execute_implied();
        assert_eq!(cpu.regs.x, 0x00EF);

        // TXA with a 16-bit accumulator and 8-bit index clears B.
        cpu.regs.set_p(X);
        cpu.op = Op::Txa;
        cpu.execute_implied();
        assert_eq!(cpu.regs.c, 0x00EF);

        cpu.op = Op::Tcd;
        cpu.regs.c = 0x8000;
        cpu.execute_implied();
        assert_eq!(cpu.regs.d, 0x8000);
        assert!(cpu.regs.p.is_set(N));
    }
}
