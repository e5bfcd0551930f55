//! Z80 CPU implementation.
//!
//! Each `tick()` spends one T-state in the micro-op at the head of the
//! queue. When a machine cycle's last T-state passes, its bus access
//! happens and any execute steps queued behind it run at once. The
//! instruction is complete once the queue is empty; interrupts are only
//! taken there.

mod execute;
mod prefixed;

use emu_core::{
    Bus, BusCapture, BusOpKind, CoreError, Cpu, Line, Observable, Ticks, TrapTable, Value,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::flags::{CF, HF, NF, PF, SF, ZF};
use crate::microcode::{MicroOp, MicroOpQueue};
use crate::{Register, Registers};

const NMI_ADDRESS: u16 = 0x0066;
const IM1_ADDRESS: u16 = 0x0038;

/// Construction-time configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Opcode-fetch addresses the run loop stops at.
    pub traps: TrapTable,
}

/// The Zilog Z80 CPU.
#[derive(Debug)]
pub struct Z80 {
    /// CPU registers.
    pub regs: Registers,

    config: Config,
    micro_ops: MicroOpQueue,
    /// T-states already spent in the micro-op at the head of the queue.
    t_state: u8,

    opcode: u8,
    /// 0, or the CB/DD/ED/FD prefix in force.
    prefix: u8,
    /// CB after a DD or FD prefix.
    prefix2: u8,
    followup_stage: u8,

    addr: u16,
    data_lo: u8,
    data_hi: u8,
    /// Byte supplied by the bus during an IM2 acknowledge.
    vector: u8,
    im2_pending: bool,

    /// Q as the previous instruction left it.
    last_q: u8,
    /// EI just ran: no maskable interrupt before the next instruction.
    ei_delay: bool,

    nmi_pending: bool,
    nmi_line: bool,
    int_line: bool,
    wait_line: bool,
    reset_line: bool,
    stopped: bool,

    total_ticks: Ticks,
    capture: BusCapture,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    /// Core in its power-on state with no traps.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            regs: Registers::new(),
            config,
            micro_ops: MicroOpQueue::new(),
            t_state: 0,
            opcode: 0,
            prefix: 0,
            prefix2: 0,
            followup_stage: 0,
            addr: 0,
            data_lo: 0,
            data_hi: 0,
            vector: 0,
            im2_pending: false,
            last_q: 0,
            ei_delay: false,
            nmi_pending: false,
            nmi_line: false,
            int_line: false,
            wait_line: false,
            reset_line: false,
            stopped: false,
            total_ticks: Ticks::ZERO,
            capture: BusCapture::new(),
        }
    }

    /// True between instructions.
    #[must_use]
    pub fn is_instruction_complete(&self) -> bool {
        self.micro_ops.is_empty()
    }

    /// Machine cycle in progress, if any.
    #[must_use]
    pub fn current_micro_op(&self) -> Option<MicroOp> {
        self.micro_ops.current()
    }

    /// EI ran last, so a maskable interrupt cannot be taken yet.
    #[must_use]
    pub fn ei_pending(&self) -> bool {
        self.ei_delay
    }

    fn execute_t_state<B: Bus>(&mut self, bus: &mut B) {
        if self.micro_ops.is_empty() {
            self.begin_instruction();
        }
        let Some(op) = self.micro_ops.current() else {
            return;
        };
        self.t_state += 1;
        if self.t_state < op.t_states() {
            return;
        }
        self.t_state = 0;
        self.micro_ops.advance();
        self.complete(bus, op);
        while self.micro_ops.current() == Some(MicroOp::Execute) {
            self.micro_ops.advance();
            self.continue_instruction();
        }
    }

    /// Instruction boundary: take a pending interrupt or fetch.
    fn begin_instruction(&mut self) {
        self.micro_ops.clear();
        self.prefix = 0;
        self.prefix2 = 0;
        self.followup_stage = 0;
        self.im2_pending = false;
        self.last_q = self.regs.q;
        self.regs.q = 0;
        let ei_delay = std::mem::take(&mut self.ei_delay);

        if self.nmi_pending {
            self.begin_nmi();
        } else if self.int_line && self.regs.iff1 && !ei_delay {
            self.begin_int();
        } else {
            self.micro_ops.push(MicroOp::FetchOpcode);
        }
    }

    /// Five T-states of discarded M1, then PC is pushed.
    fn begin_nmi(&mut self) {
        debug!("Z80 NMI at {:#06X}", self.regs.pc);
        self.nmi_pending = false;
        self.regs.halted = false;
        self.regs.iff2 = self.regs.iff1;
        self.regs.iff1 = false;
        self.regs.increment_r();
        self.micro_ops.push(MicroOp::Internal(5));
        self.queue_call(NMI_ADDRESS);
    }

    fn begin_int(&mut self) {
        debug!("Z80 IM{} interrupt at {:#06X}", self.regs.im, self.regs.pc);
        self.regs.halted = false;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.micro_ops.push(MicroOp::Acknowledge);
        match self.regs.im {
            // The acknowledged byte is decoded as an opcode.
            0 => {}
            1 => {
                self.micro_ops.push(MicroOp::Internal(1));
                self.queue_call(IM1_ADDRESS);
            }
            _ => {
                self.micro_ops.push(MicroOp::Internal(1));
                self.queue_push(self.regs.pc);
                self.im2_pending = true;
                self.queue_execute_followup();
            }
        }
    }

    /// IM2: read the handler address from the table at I:vector.
    fn finish_im2(&mut self) {
        if self.followup_stage == 1 {
            self.addr = u16::from(self.regs.i) << 8 | u16::from(self.vector);
            self.micro_ops.push(MicroOp::ReadMem16Lo);
            self.micro_ops.push(MicroOp::ReadMem16Hi);
            self.queue_execute_followup();
        } else {
            self.regs.pc = self.word();
            self.regs.wz = self.regs.pc;
        }
    }

    fn complete<B: Bus>(&mut self, bus: &mut B, op: MicroOp) {
        match op {
            MicroOp::FetchOpcode => {
                let pc = self.regs.pc;
                let opcode = self.read(bus, pc, BusOpKind::OpcodeFetch);
                self.regs.increment_r();
                // HALT keeps fetching at the same address and ignores the byte.
                if self.regs.halted {
                    return;
                }
                self.regs.pc = pc.wrapping_add(1);
                self.opcode = opcode;
                self.dispatch_opcode();
            }
            MicroOp::Acknowledge => {
                let byte = bus.interrupt_acknowledge();
                self.record(BusOpKind::InterruptAcknowledge, self.regs.pc, byte);
                self.regs.increment_r();
                if self.regs.im == 0 {
                    self.opcode = byte;
                    self.dispatch_opcode();
                } else {
                    self.vector = byte;
                }
            }
            MicroOp::FetchDisplacement => {
                let displacement = self.read_pc(bus) as i8;
                self.addr = self.index().wrapping_add(displacement as u16);
                self.regs.wz = self.addr;
            }
            MicroOp::ReadImm8 | MicroOp::ReadImm16Lo => self.data_lo = self.read_pc(bus),
            MicroOp::ReadImm16Hi => self.data_hi = self.read_pc(bus),
            MicroOp::ReadMem => self.data_lo = self.read(bus, self.addr, BusOpKind::Read),
            MicroOp::ReadMem16Lo => {
                self.data_lo = self.read(bus, self.addr, BusOpKind::Read);
                self.addr = self.addr.wrapping_add(1);
            }
            MicroOp::ReadMem16Hi => self.data_hi = self.read(bus, self.addr, BusOpKind::Read),
            MicroOp::WriteMem => self.write(bus, self.addr, self.data_lo),
            MicroOp::WriteMem16Lo => {
                self.write(bus, self.addr, self.data_lo);
                self.addr = self.addr.wrapping_add(1);
            }
            MicroOp::WriteMem16Hi => self.write(bus, self.addr, self.data_hi),
            MicroOp::PushHi => {
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                self.write(bus, self.regs.sp, self.data_hi);
            }
            MicroOp::PushLo => {
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                self.write(bus, self.regs.sp, self.data_lo);
            }
            MicroOp::PopLo => {
                self.data_lo = self.read(bus, self.regs.sp, BusOpKind::Read);
                self.regs.sp = self.regs.sp.wrapping_add(1);
            }
            MicroOp::PopHi => {
                self.data_hi = self.read(bus, self.regs.sp, BusOpKind::Read);
                self.regs.sp = self.regs.sp.wrapping_add(1);
            }
            MicroOp::IoRead => {
                self.data_lo = bus.io_read(self.addr);
                self.record(BusOpKind::IoRead, self.addr, self.data_lo);
            }
            MicroOp::IoWrite => {
                bus.io_write(self.addr, self.data_lo);
                self.record(BusOpKind::IoWrite, self.addr, self.data_lo);
            }
            MicroOp::Internal(_) => self.record(BusOpKind::Internal, self.regs.pc, 0),
            MicroOp::Execute => self.continue_instruction(),
        }
    }

    /// Route a freshly fetched opcode: prefixes queue another fetch,
    /// anything else is decoded.
    fn dispatch_opcode(&mut self) {
        match (self.prefix, self.opcode) {
            (0 | 0xDD | 0xFD, 0xDD | 0xFD | 0xED) | (0, 0xCB) => {
                self.prefix = self.opcode;
                self.micro_ops.clear();
                self.micro_ops.push(MicroOp::FetchOpcode);
            }
            (0xDD | 0xFD, 0xCB) => {
                // DD CB d op: the final opcode is a plain read, not an M1.
                self.prefix2 = 0xCB;
                self.micro_ops.push(MicroOp::FetchDisplacement);
                self.micro_ops.push(MicroOp::ReadImm8);
                self.micro_ops.push(MicroOp::Internal(2));
                self.queue_execute_followup();
            }
            (0xCB, _) => self.execute_cb(),
            (0xED, _) => self.execute_ed(),
            _ => self.execute_main(),
        }
    }

    fn continue_instruction(&mut self) {
        if self.im2_pending {
            self.finish_im2();
            return;
        }
        match (self.prefix, self.prefix2) {
            (_, 0xCB) => self.ddcb_followup(),
            (0xCB, _) => self.cb_followup(),
            (0xED, _) => self.ed_followup(),
            _ => self.main_followup(),
        }
    }

    // Bus access

    fn record(&mut self, kind: BusOpKind, address: u16, value: u8) {
        self.capture
            .record(self.total_ticks.get(), kind, u32::from(address), value);
    }

    fn read<B: Bus>(&mut self, bus: &mut B, address: u16, kind: BusOpKind) -> u8 {
        let value = bus.read(u32::from(address));
        self.record(kind, address, value);
        value
    }

    fn read_pc<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read(bus, self.regs.pc, BusOpKind::Read);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn write<B: Bus>(&mut self, bus: &mut B, address: u16, value: u8) {
        bus.write(u32::from(address), value);
        self.record(BusOpKind::Write, address, value);
    }

    // Queue helpers

    fn queue_execute_followup(&mut self) {
        self.followup_stage += 1;
        self.micro_ops.push(MicroOp::Execute);
    }

    /// Two stack writes, high byte first.
    fn queue_push(&mut self, value: u16) {
        [self.data_lo, self.data_hi] = value.to_le_bytes();
        self.micro_ops.push(MicroOp::PushHi);
        self.micro_ops.push(MicroOp::PushLo);
    }

    /// Push PC and continue at `target`.
    fn queue_call(&mut self, target: u16) {
        self.queue_push(self.regs.pc);
        self.regs.pc = target;
        self.regs.wz = target;
    }

    /// Address a (HL) operand: HL itself, or IX/IY plus a displacement
    /// byte and five internal T-states.
    fn queue_memory_operand(&mut self) {
        if self.is_indexed() {
            self.micro_ops.push(MicroOp::FetchDisplacement);
            self.micro_ops.push(MicroOp::Internal(5));
        } else {
            self.addr = self.regs.hl();
        }
    }

    fn word(&self) -> u16 {
        u16::from_le_bytes([self.data_lo, self.data_hi])
    }

    // Register helpers

    fn is_indexed(&self) -> bool {
        matches!(self.prefix, 0xDD | 0xFD)
    }

    /// HL, or IX/IY under a DD/FD prefix.
    fn index(&self) -> u16 {
        match self.prefix {
            0xDD => self.regs.ix,
            0xFD => self.regs.iy,
            _ => self.regs.hl(),
        }
    }

    fn set_index(&mut self, value: u16) {
        match self.prefix {
            0xDD => self.regs.ix = value,
            0xFD => self.regs.iy = value,
            _ => self.regs.set_hl(value),
        }
    }

    /// Register by its 3-bit code. Code 6 is (HL) and never reaches here.
    fn reg8(&self, code: u8) -> u8 {
        match code {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            _ => self.regs.a,
        }
    }

    fn set_reg8(&mut self, code: u8, value: u8) {
        match code {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            _ => self.regs.a = value,
        }
    }

    /// As [`reg8`](Self::reg8), with H and L replaced by the IX/IY halves
    /// under a prefix.
    fn indexed_reg8(&self, code: u8) -> u8 {
        let [low, high] = self.index().to_le_bytes();
        match code {
            4 => high,
            5 => low,
            _ => self.reg8(code),
        }
    }

    fn set_indexed_reg8(&mut self, code: u8, value: u8) {
        let [low, high] = self.index().to_le_bytes();
        match code {
            4 => self.set_index(u16::from_le_bytes([low, value])),
            5 => self.set_index(u16::from_le_bytes([value, high])),
            _ => self.set_reg8(code, value),
        }
    }

    /// BC, DE, HL/IX/IY, SP.
    fn rp(&self, p: u8) -> u16 {
        match p {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index(),
            _ => self.regs.sp,
        }
    }

    fn set_rp(&mut self, p: u8, value: u16) {
        match p {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index(value),
            _ => self.regs.sp = value,
        }
    }

    /// BC, DE, HL/IX/IY, AF: the PUSH/POP table.
    fn rp2(&self, p: u8) -> u16 {
        if p == 3 { self.regs.af() } else { self.rp(p) }
    }

    fn set_rp2(&mut self, p: u8, value: u16) {
        if p == 3 {
            self.regs.set_af(value);
        } else {
            self.set_rp(p, value);
        }
    }

    /// NZ, Z, NC, C, PO, PE, P, M.
    fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f;
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }

    /// Write F from an operation. Q remembers it for SCF and CCF.
    fn set_f(&mut self, value: u8) {
        self.regs.f = value;
        self.regs.q = value;
    }
}

impl Cpu for Z80 {
    type Registers = Registers;
    type Register = Register;

    fn tick<B: Bus>(&mut self, bus: &mut B) {
        if !self.is_frozen() && !self.stopped {
            self.execute_t_state(bus);
        }
        self.total_ticks += Ticks::new(1);
    }

    fn pc(&self) -> u32 {
        self.regs.pc.into()
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn register(&self, id: Register) -> Result<u32, CoreError> {
        let regs = &self.regs;
        let value: u16 = match id {
            Register::A => regs.a.into(),
            Register::F => regs.f.into(),
            Register::B => regs.b.into(),
            Register::C => regs.c.into(),
            Register::D => regs.d.into(),
            Register::E => regs.e.into(),
            Register::H => regs.h.into(),
            Register::L => regs.l.into(),
            Register::Af => regs.af(),
            Register::Bc => regs.bc(),
            Register::De => regs.de(),
            Register::Hl => regs.hl(),
            Register::AfAlt => regs.af_alt,
            Register::BcAlt => regs.bc_alt,
            Register::DeAlt => regs.de_alt,
            Register::HlAlt => regs.hl_alt,
            Register::Ix => regs.ix,
            Register::Iy => regs.iy,
            Register::Sp => regs.sp,
            Register::Pc => regs.pc,
            Register::I => regs.i.into(),
            Register::R => regs.r.into(),
            Register::Wz => regs.wz,
            Register::Iff1 => regs.iff1.into(),
            Register::Iff2 => regs.iff2.into(),
            Register::Im => regs.im.into(),
        };
        Ok(value.into())
    }

    fn set_register(&mut self, id: Register, value: u32) -> Result<(), CoreError> {
        let out_of_range = || CoreError::ValueOutOfRange {
            register: id.name(),
            value,
        };
        let byte = || u8::try_from(value).map_err(|_| out_of_range());
        let word = || u16::try_from(value).map_err(|_| out_of_range());
        let flag = || match value {
            0 | 1 => Ok(value == 1),
            _ => Err(out_of_range()),
        };
        let regs = &mut self.regs;
        match id {
            Register::A => regs.a = byte()?,
            Register::F => regs.f = byte()?,
            Register::B => regs.b = byte()?,
            Register::C => regs.c = byte()?,
            Register::D => regs.d = byte()?,
            Register::E => regs.e = byte()?,
            Register::H => regs.h = byte()?,
            Register::L => regs.l = byte()?,
            Register::Af => regs.set_af(word()?),
            Register::Bc => regs.set_bc(word()?),
            Register::De => regs.set_de(word()?),
            Register::Hl => regs.set_hl(word()?),
            Register::AfAlt => regs.af_alt = word()?,
            Register::BcAlt => regs.bc_alt = word()?,
            Register::DeAlt => regs.de_alt = word()?,
            Register::HlAlt => regs.hl_alt = word()?,
            Register::Ix => regs.ix = word()?,
            Register::Iy => regs.iy = word()?,
            Register::Sp => regs.sp = word()?,
            Register::Pc => regs.pc = word()?,
            Register::I => regs.i = byte()?,
            Register::R => regs.r = byte()?,
            Register::Wz => regs.wz = word()?,
            Register::Iff1 => regs.iff1 = flag()?,
            Register::Iff2 => regs.iff2 = flag()?,
            Register::Im => match value {
                0..=2 => regs.im = byte()?,
                _ => return Err(out_of_range()),
            },
        }
        Ok(())
    }

    fn set_line(&mut self, line: Line, asserted: bool) {
        match line {
            Line::Nmi => {
                if asserted && !self.nmi_line {
                    self.nmi_pending = true;
                }
                self.nmi_line = asserted;
            }
            Line::Irq => self.int_line = asserted,
            Line::Wait => self.wait_line = asserted,
            Line::Reset => {
                let released = self.reset_line && !asserted;
                self.reset_line = asserted;
                if released {
                    self.reset();
                }
            }
        }
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn is_frozen(&self) -> bool {
        self.wait_line || self.reset_line
    }

    fn stop(&mut self) {
        self.stopped = true;
    }

    /// PC, I, R, the interrupt flip-flops and the mode clear; AF and SP
    /// go to $FFFF.
    fn reset(&mut self) {
        debug!("Z80 reset");
        let regs = &mut self.regs;
        regs.pc = 0;
        regs.i = 0;
        regs.r = 0;
        regs.iff1 = false;
        regs.iff2 = false;
        regs.im = 0;
        regs.halted = false;
        regs.set_af(0xFFFF);
        regs.sp = 0xFFFF;
        self.micro_ops.clear();
        self.t_state = 0;
        self.ei_delay = false;
        self.nmi_pending = false;
        self.im2_pending = false;
        self.stopped = false;
    }

    fn at_instruction_boundary(&self) -> bool {
        self.micro_ops.is_empty()
    }

    fn total_cycles(&self) -> Ticks {
        self.total_ticks
    }

    fn traps(&self) -> &TrapTable {
        &self.config.traps
    }

    fn capture(&mut self) -> &mut BusCapture {
        &mut self.capture
    }
}

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let regs = &self.regs;
        let f = regs.f;
        match path {
            "pc" => Some(regs.pc.into()),
            "sp" => Some(regs.sp.into()),
            "a" => Some(regs.a.into()),
            "f" => Some(f.into()),
            "b" => Some(regs.b.into()),
            "c" => Some(regs.c.into()),
            "d" => Some(regs.d.into()),
            "e" => Some(regs.e.into()),
            "h" => Some(regs.h.into()),
            "l" => Some(regs.l.into()),
            "af" => Some(regs.af().into()),
            "bc" => Some(regs.bc().into()),
            "de" => Some(regs.de().into()),
            "hl" => Some(regs.hl().into()),
            "af'" => Some(regs.af_alt.into()),
            "bc'" => Some(regs.bc_alt.into()),
            "de'" => Some(regs.de_alt.into()),
            "hl'" => Some(regs.hl_alt.into()),
            "ix" => Some(regs.ix.into()),
            "iy" => Some(regs.iy.into()),
            "i" => Some(regs.i.into()),
            "r" => Some(regs.r.into()),
            "wz" | "memptr" => Some(regs.wz.into()),
            "iff1" => Some(regs.iff1.into()),
            "iff2" => Some(regs.iff2.into()),
            "im" => Some(regs.im.into()),
            "halted" => Some(regs.halted.into()),
            "flags.s" => Some((f & SF != 0).into()),
            "flags.z" => Some((f & ZF != 0).into()),
            "flags.h" => Some((f & HF != 0).into()),
            "flags.pv" => Some((f & PF != 0).into()),
            "flags.n" => Some((f & NF != 0).into()),
            "flags.c" => Some((f & CF != 0).into()),
            "opcode" => Some(self.opcode.into()),
            "cycle" => Some(Value::U64(self.total_ticks.get())),
            "stopped" => Some(self.stopped.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "sp", "a", "f", "b", "c", "d", "e", "h", "l", "af", "bc", "de", "hl", "af'",
            "bc'", "de'", "hl'", "ix", "iy", "i", "r", "wz", "iff1", "iff2", "im", "halted",
            "flags.s", "flags.z", "flags.h", "flags.pv", "flags.n", "flags.c", "opcode", "cycle",
            "stopped",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    #[test]
    fn nop_takes_four_t_states() {
        let mut cpu = Z80::new();
        let mut bus = SimpleBus::new();

        for _ in 0..3 {
            cpu.tick(&mut bus);
            assert!(!cpu.is_instruction_complete());
        }
        cpu.tick(&mut bus);
        assert!(cpu.is_instruction_complete());
        assert_eq!(cpu.regs.pc, 1);
        assert_eq!(cpu.regs.r, 1);
    }

    #[test]
    fn index_halves_follow_prefix() {
        let mut cpu = Z80::new();
        cpu.regs.ix = 0x1234;
        cpu.regs.set_hl(0xABCD);
        cpu.prefix = 0xDD;
        assert_eq!(cpu.indexed_reg8(4), 0x12);
        cpu.set_indexed_reg8(5, 0x99);
        assert_eq!(cpu.regs.ix, 0x1299);
        assert_eq!(cpu.regs.hl(), 0xABCD);
        cpu.prefix = 0;
        assert_eq!(cpu.indexed_reg8(4), 0xAB);
    }

    #[test]
    fn conditions() {
        let mut cpu = Z80::new();
        cpu.regs.f = ZF | CF;
        assert!(!cpu.condition(0));
        assert!(cpu.condition(1));
        assert!(cpu.condition(3));
        assert!(cpu.condition(4), "PO with P/V clear");
        assert!(cpu.condition(6), "P with S clear");
    }

    #[test]
    fn frozen_core_counts_t_states_only() {
        let mut cpu = Z80::new();
        let mut bus = SimpleBus::new();
        cpu.set_line(Line::Wait, true);
        for _ in 0..8 {
            cpu.tick(&mut bus);
        }
        assert_eq!(cpu.regs.pc, 0);
        assert_eq!(cpu.total_cycles(), Ticks::new(8));
    }

    #[test]
    fn im_above_two_is_rejected() {
        let mut cpu = Z80::new();
        assert!(cpu.set_register(Register::Im, 2).is_ok());
        assert_eq!(
            cpu.set_register(Register::Im, 3),
            Err(CoreError::ValueOutOfRange {
                register: "IM",
                value: 3
            })
        );
        assert!(cpu.set_register(Register::A, 0x100).is_err());
        assert!(cpu.set_register(Register::Iff1, 2).is_err());
    }
}
