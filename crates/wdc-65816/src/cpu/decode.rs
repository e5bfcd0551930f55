//! Opcode decode: build the micro-step queue for one instruction.
//!
//! Register widths and E are fixed for the life of an instruction, so the
//! 16-bit data steps and the native-only stack steps are decided here.
//! Page crossings and the value of D are left to the penalty steps.

use super::Wdc65816;
use crate::flags::{M, X};
use crate::microcode::Byte::{Bank, Hi, Lo};
use crate::microcode::Step::{
    self, Address, BlockRead, BlockWrite, DirectPenalty, Execute, Immediate, IndexPenalty,
    Indirect, Io, Modify, Operand, Pointer, Prepare, Pull, PullStatus, Push, PushBank,
    PushStatus, Read, Vector, Write,
};
use crate::table::{Access, Mode, OPCODES, Op};

impl Wdc65816 {
    pub(super) fn decode(&mut self) {
        let (op, mode) = OPCODES[usize::from(self.opcode)];
        self.op = op;
        self.mode = mode;
        let flag = if op.uses_index_width() { X } else { M };
        self.wide = !self.regs.p.is_set(flag);
        self.page_crossed = false;
        // Instructions new to the 65816 run S through all 16 bits, even in
        // emulation mode; page one is restored when they finish.
        self.unbounded_stack = matches!(
            (op, mode),
            (
                Op::Pea | Op::Pei | Op::Per | Op::Phd | Op::Pld | Op::Plb | Op::Jsl | Op::Rtl,
                _
            ) | (Op::Jsr, Mode::Indx)
        );
        self.queue.clear();

        match op.access() {
            Access::Other => self.queue_other(),
            Access::Modify if mode == Mode::Acc => self.queue.extend(&[Io, Execute]),
            access => {
                self.queue_address();
                self.queue_data(access);
            }
        }
    }

    /// Steps up to the point where `addr` holds the effective address.
    fn queue_address(&mut self) {
        let steps: &[Step] = match self.mode {
            Mode::Imm => &[],
            Mode::Dp => &[Operand(Lo), DirectPenalty, Address],
            Mode::Dpx | Mode::Dpy => &[Operand(Lo), DirectPenalty, Io, Address],
            Mode::Dpi => &[Operand(Lo), DirectPenalty, Pointer, Indirect(Lo), Indirect(Hi), Address],
            Mode::Dpix => &[
                Operand(Lo),
                DirectPenalty,
                Io,
                Pointer,
                Indirect(Lo),
                Indirect(Hi),
                Address,
            ],
            Mode::Dpiy => &[
                Operand(Lo),
                DirectPenalty,
                Pointer,
                Indirect(Lo),
                Indirect(Hi),
                Address,
                IndexPenalty,
            ],
            Mode::Dpil | Mode::Dpily => &[
                Operand(Lo),
                DirectPenalty,
                Pointer,
                Indirect(Lo),
                Indirect(Hi),
                Indirect(Bank),
                Address,
            ],
            Mode::Abs => &[Operand(Lo), Operand(Hi), Address],
            Mode::Abx | Mode::Aby => &[Operand(Lo), Operand(Hi), Address, IndexPenalty],
            Mode::Abl | Mode::Ablx => &[Operand(Lo), Operand(Hi), Operand(Bank), Address],
            Mode::Sr => &[Operand(Lo), Io, Address],
            Mode::Sriy => &[
                Operand(Lo),
                Io,
                Pointer,
                Indirect(Lo),
                Indirect(Hi),
                Io,
                Address,
            ],
            mode => unreachable!("{mode:?} is not a data addressing mode"),
        };
        self.queue.extend(steps);
    }

    /// Data cycles. 16-bit operands add the high-byte cycle; read-modify-write
    /// writes the high byte first.
    fn queue_data(&mut self, access: Access) {
        let wide = self.wide;
        let q = &mut self.queue;
        match access {
            Access::Read if self.mode == Mode::Imm => {
                q.push(Immediate(Lo));
                if wide {
                    q.push(Immediate(Hi));
                }
                q.push(Execute);
            }
            Access::Read => {
                q.push(Read(Lo));
                if wide {
                    q.push(Read(Hi));
                }
                q.push(Execute);
            }
            Access::Write => {
                q.extend(&[Prepare, Write(Lo)]);
                if wide {
                    q.push(Write(Hi));
                }
            }
            Access::Modify => {
                q.push(Read(Lo));
                if wide {
                    q.extend(&[Read(Hi), Modify, Write(Hi)]);
                } else {
                    q.push(Modify);
                }
                q.push(Write(Lo));
            }
            Access::Other => unreachable!("{:?} has no data cycles", self.op),
        }
    }

    /// Control flow, stack and implied instructions.
    fn queue_other(&mut self) {
        let native = !self.regs.e;
        let wide = self.wide;
        let q = &mut self.queue;
        match (self.op, self.mode) {
            (Op::Brk | Op::Cop, _) => {
                q.push(Operand(Lo));
                if native {
                    q.push(PushBank);
                }
                q.extend(&[
                    Prepare,
                    Push(Hi),
                    Push(Lo),
                    PushStatus,
                    Vector(Lo),
                    Vector(Hi),
                    Execute,
                ]);
            }
            (Op::Jsr, Mode::Indx) => q.extend(&[
                Operand(Lo),
                Prepare,
                Push(Hi),
                Push(Lo),
                Operand(Hi),
                Io,
                Pointer,
                Indirect(Lo),
                Indirect(Hi),
                Execute,
            ]),
            (Op::Jsr, _) => q.extend(&[Operand(Lo), Operand(Hi), Io, Prepare, Push(Hi), Push(Lo), Execute]),
            (Op::Jsl, _) => q.extend(&[
                Operand(Lo),
                Operand(Hi),
                PushBank,
                Io,
                Operand(Bank),
                Prepare,
                Push(Hi),
                Push(Lo),
                Execute,
            ]),
            (Op::Jmp, Mode::Ind) => q.extend(&[Operand(Lo), Operand(Hi), Pointer, Indirect(Lo), Indirect(Hi), Execute]),
            (Op::Jmp, Mode::Indx) => q.extend(&[
                Operand(Lo),
                Operand(Hi),
                Io,
                Pointer,
                Indirect(Lo),
                Indirect(Hi),
                Execute,
            ]),
            (Op::Jmp, _) => q.extend(&[Operand(Lo), Operand(Hi), Execute]),
            (Op::Jml, Mode::Indl) => q.extend(&[
                Operand(Lo),
                Operand(Hi),
                Pointer,
                Indirect(Lo),
                Indirect(Hi),
                Indirect(Bank),
                Execute,
            ]),
            (Op::Jml, _) => q.extend(&[Operand(Lo), Operand(Hi), Operand(Bank), Execute]),
            (Op::Rts, _) => q.extend(&[Io, Io, Pull(Lo), Pull(Hi), Io, Execute]),
            (Op::Rtl, _) => q.extend(&[Io, Io, Pull(Lo), Pull(Hi), Pull(Bank), Execute]),
            (Op::Rti, _) => {
                q.extend(&[Io, Io, PullStatus, Pull(Lo), Pull(Hi)]);
                if native {
                    q.push(Pull(Bank));
                }
                q.push(Execute);
            }
            // Taken branches queue their extra cycles when they execute.
            (_, Mode::Rel) => q.extend(&[Operand(Lo), Execute]),
            (Op::Brl, _) => q.extend(&[Operand(Lo), Operand(Hi), Io, Execute]),
            (Op::Per, _) => q.extend(&[Operand(Lo), Operand(Hi), Io, Prepare, Push(Hi), Push(Lo)]),
            (Op::Pea, _) => q.extend(&[Operand(Lo), Operand(Hi), Prepare, Push(Hi), Push(Lo)]),
            (Op::Pei, _) => q.extend(&[
                Operand(Lo),
                DirectPenalty,
                Pointer,
                Indirect(Lo),
                Indirect(Hi),
                Prepare,
                Push(Hi),
                Push(Lo),
            ]),
            (Op::Pha | Op::Phx | Op::Phy, _) => {
                q.extend(&[Io, Prepare]);
                if wide {
                    q.push(Push(Hi));
                }
                q.push(Push(Lo));
            }
            (Op::Phd, _) => q.extend(&[Io, Prepare, Push(Hi), Push(Lo)]),
            (Op::Php | Op::Phb | Op::Phk, _) => q.extend(&[Io, Prepare, Push(Lo)]),
            (Op::Pla | Op::Plx | Op::Ply, _) => {
                q.extend(&[Io, Io, Pull(Lo)]);
                if wide {
                    q.push(Pull(Hi));
                }
                q.push(Execute);
            }
            (Op::Pld, _) => q.extend(&[Io, Io, Pull(Lo), Pull(Hi), Execute]),
            (Op::Plp | Op::Plb, _) => q.extend(&[Io, Io, Pull(Lo), Execute]),
            (Op::Mvn | Op::Mvp, _) => q.extend(&[
                Operand(Lo),
                Operand(Hi),
                BlockRead,
                BlockWrite,
                Io,
                Io,
                Execute,
            ]),
            (Op::Rep | Op::Sep, _) => q.extend(&[Immediate(Lo), Io, Execute]),
            (Op::Wdm, _) => q.extend(&[Operand(Lo), Execute]),
            (Op::Xba | Op::Wai | Op::Stp, _) => q.extend(&[Io, Io, Execute]),
            _ => q.extend(&[Io, Execute]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::{Cpu, SimpleBus};

    /// Cycles for one instruction at $8000 with the given register setup.
    fn cycles(program: &[u8], setup: impl FnOnce(&mut Wdc65816)) -> u64 {
        let mut cpu = Wdc65816::new();
        let mut bus = SimpleBus::new();
        bus.load(0x8000, program);
        cpu.regs.pc = 0x8000;
        setup(&mut cpu);
        cpu.step_instruction(&mut bus).cycles
    }

    fn native(cpu: &mut Wdc65816) {
        cpu.regs.set_e(false);
        cpu.regs.set_p(0);
    }

    #[test]
    fn data_mode_timings_eight_bit() {
        let emulation = |_: &mut Wdc65816| {};
        assert_eq!(cycles(&[0xA5, 0x10], emulation), 3); // LDA d
        assert_eq!(cycles(&[0xB5, 0x10], emulation), 4); // LDA d,X
        assert_eq!(cycles(&[0xB2, 0x10], emulation), 5); // LDA (d)
        assert_eq!(cycles(&[0xA1, 0x10], emulation), 6); // LDA (d,X)
        assert_eq!(cycles(&[0xB1, 0x10], emulation), 5); // LDA (d),Y
        assert_eq!(cycles(&[0xA7, 0x10], emulation), 6); // LDA [d]
        assert_eq!(cycles(&[0xB7, 0x10], emulation), 6); // LDA [d],Y
        assert_eq!(cycles(&[0xAD, 0x00, 0x20], emulation), 4); // LDA a
        assert_eq!(cycles(&[0xBD, 0x00, 0x20], emulation), 4); // LDA a,X
        assert_eq!(cycles(&[0xAF, 0x00, 0x20, 0x00], emulation), 5); // LDA al
        assert_eq!(cycles(&[0xBF, 0x00, 0x20, 0x00], emulation), 5); // LDA al,X
        assert_eq!(cycles(&[0xA3, 0x01], emulation), 4); // LDA d,S
        assert_eq!(cycles(&[0xB3, 0x01], emulation), 7); // LDA (d,S),Y
        assert_eq!(cycles(&[0x9D, 0x00, 0x20], emulation), 5); // STA a,X
        assert_eq!(cycles(&[0x06, 0x10], emulation), 5); // ASL d
        assert_eq!(cycles(&[0x1E, 0x00, 0x20], emulation), 7); // ASL a,X
    }

    #[test]
    fn sixteen_bit_operands_add_cycles() {
        assert_eq!(cycles(&[0xA5, 0x10], native), 4); // LDA d
        assert_eq!(cycles(&[0xAD, 0x00, 0x20], native), 5); // LDA a
        assert_eq!(cycles(&[0x06, 0x10], native), 7); // ASL d
        assert_eq!(cycles(&[0xEE, 0x00, 0x20], native), 8); // INC a
        // 16-bit index: a,X always pays the indexing cycle.
        assert_eq!(cycles(&[0xBD, 0x00, 0x20], native), 6);
    }

    #[test]
    fn page_cross_penalty_only_with_eight_bit_index() {
        let crossing = |cpu: &mut Wdc65816| cpu.regs.x = 0x01;
        assert_eq!(cycles(&[0xBD, 0xFF, 0x20], crossing), 5);
        assert_eq!(cycles(&[0xBD, 0xFE, 0x20], crossing), 4);
    }

    #[test]
    fn control_flow_timings() {
        let emulation = |_: &mut Wdc65816| {};
        assert_eq!(cycles(&[0x20, 0x00, 0x90], emulation), 6); // JSR a
        assert_eq!(cycles(&[0xFC, 0x00, 0x90], emulation), 8); // JSR (a,X)
        assert_eq!(cycles(&[0x22, 0x00, 0x90, 0x00], emulation), 8); // JSL
        assert_eq!(cycles(&[0x4C, 0x00, 0x90], emulation), 3); // JMP a
        assert_eq!(cycles(&[0x6C, 0x00, 0x90], emulation), 5); // JMP (a)
        assert_eq!(cycles(&[0x7C, 0x00, 0x90], emulation), 6); // JMP (a,X)
        assert_eq!(cycles(&[0x5C, 0x00, 0x90, 0x00], emulation), 4); // JML al
        assert_eq!(cycles(&[0xDC, 0x00, 0x90], emulation), 6); // JML [a]
        assert_eq!(cycles(&[0x82, 0x00, 0x00], emulation), 4); // BRL
        assert_eq!(cycles(&[0x60], emulation), 6); // RTS
        assert_eq!(cycles(&[0x6B], emulation), 6); // RTL
        assert_eq!(cycles(&[0x40], emulation), 6); // RTI
        assert_eq!(cycles(&[0x40], native), 7);
        assert_eq!(cycles(&[0x00, 0x00], emulation), 7); // BRK
        assert_eq!(cycles(&[0x00, 0x00], native), 8);
        assert_eq!(cycles(&[0x02, 0x00], native), 8); // COP
    }

    #[test]
    fn stack_timings() {
        let emulation = |_: &mut Wdc65816| {};
        assert_eq!(cycles(&[0x48], emulation), 3); // PHA
        assert_eq!(cycles(&[0x48], native), 4);
        assert_eq!(cycles(&[0x68], emulation), 4); // PLA
        assert_eq!(cycles(&[0x68], native), 5);
        assert_eq!(cycles(&[0x0B], emulation), 4); // PHD
        assert_eq!(cycles(&[0x2B], emulation), 5); // PLD
        assert_eq!(cycles(&[0x8B], emulation), 3); // PHB
        assert_eq!(cycles(&[0xAB], emulation), 4); // PLB
        assert_eq!(cycles(&[0xF4, 0x34, 0x12], emulation), 5); // PEA
        assert_eq!(cycles(&[0xD4, 0x10], emulation), 6); // PEI
        assert_eq!(cycles(&[0x62, 0x00, 0x00], emulation), 6); // PER
    }

    #[test]
    fn implied_timings() {
        let emulation = |_: &mut Wdc65816| {};
        assert_eq!(cycles(&[0x18], emulation), 2); // CLC
        assert_eq!(cycles(&[0xEB], emulation), 3); // XBA
        assert_eq!(cycles(&[0xC2, 0x30], emulation), 3); // REP
        assert_eq!(cycles(&[0xFB], emulation), 2); // XCE
        assert_eq!(cycles(&[0x42, 0x00], emulation), 2); // WDM
        assert_eq!(cycles(&[0x1A], native), 2); // INC A
    }
}
