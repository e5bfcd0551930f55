//! 65816 CPU implementation.
//!
//! Each `tick()` runs one micro-step that takes a cycle, then drains any
//! zero-cycle steps and dropped penalty steps behind it, so the queue head
//! is always the next real cycle. The instruction is complete once the
//! queue is empty.

mod alu;
mod decode;

use emu_core::{
    Bus, BusCapture, BusOpKind, CoreError, Cpu, Line, Observable, Ticks, TrapTable, Value,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::flags::{self, C, D, I, M, N, V, X, Z};
use crate::microcode::{Byte, Step, StepQueue};
use crate::table::{Access, Mode, Op};
use crate::{Register, Registers};

const NATIVE_COP: u16 = 0xFFE4;
const NATIVE_BRK: u16 = 0xFFE6;
const NATIVE_NMI: u16 = 0xFFEA;
const NATIVE_IRQ: u16 = 0xFFEE;
const EMULATION_COP: u16 = 0xFFF4;
const EMULATION_NMI: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const EMULATION_IRQ: u16 = 0xFFFE;

/// Construction-time configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// 24-bit opcode-fetch addresses the run loop stops at.
    pub traps: TrapTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FetchOpcode,
    Execute,
    /// WAI: no bus activity until an interrupt line is asserted.
    Waiting,
    /// STP or a halting trap. Only reset restarts the core.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Reset,
    Nmi,
    Irq,
}

/// The WDC 65C816 CPU.
#[derive(Debug)]
pub struct Wdc65816 {
    /// CPU registers.
    pub regs: Registers,

    config: Config,
    state: State,
    queue: StepQueue,

    opcode: u8,
    op: Op,
    mode: Mode,

    /// Operand is 16 bits wide (M or X clear, per operation).
    wide: bool,

    /// Operand bytes from the instruction stream.
    operand: u32,
    /// Address the indirect pointer is read from.
    pointer: u32,
    /// Pointer bytes wrap within the direct page.
    pointer_in_page: bool,
    /// Address fetched through the pointer (or the vector).
    indirect: u32,
    /// Effective data address.
    addr: u32,
    /// Data bytes wrap within bank 0 rather than carrying into the next bank.
    addr_in_bank: bool,
    data: u32,
    page_crossed: bool,
    /// Stack accesses ignore the emulation-mode page-one wrap until the
    /// instruction ends.
    unbounded_stack: bool,

    vector: u16,
    servicing: Option<Interrupt>,
    poll: Option<Interrupt>,
    pending: Option<Interrupt>,

    nmi_latched: bool,
    nmi_line: bool,
    irq_line: bool,
    wait_line: bool,
    reset_line: bool,

    total_cycles: Ticks,
    capture: BusCapture,
}

impl Default for Wdc65816 {
    fn default() -> Self {
        Self::new()
    }
}

impl Wdc65816 {
    /// Core in emulation mode with no traps, ready to fetch at $00:0000.
    ///
    /// Call [`Cpu::reset`] to run the reset sequence through $FFFC instead.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            regs: Registers::new(),
            config,
            state: State::FetchOpcode,
            queue: StepQueue::new(),
            opcode: 0,
            op: Op::Brk,
            mode: Mode::Imp,
            wide: false,
            operand: 0,
            pointer: 0,
            pointer_in_page: false,
            indirect: 0,
            addr: 0,
            addr_in_bank: false,
            data: 0,
            page_crossed: false,
            unbounded_stack: false,
            vector: EMULATION_IRQ,
            servicing: None,
            poll: None,
            pending: None,
            nmi_latched: false,
            nmi_line: false,
            irq_line: false,
            wait_line: false,
            reset_line: false,
            total_cycles: Ticks::ZERO,
            capture: BusCapture::new(),
        }
    }

    /// True between instructions.
    #[must_use]
    pub fn is_instruction_complete(&self) -> bool {
        self.state != State::Execute
    }

    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    fn execute_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.state {
            State::FetchOpcode => {
                if let Some(source) = self.pending.take() {
                    self.begin_interrupt(bus, source);
                } else {
                    self.opcode = self.fetch(bus);
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                    self.decode();
                }
                self.state = State::Execute;
                self.settle();
            }
            State::Execute => {
                self.poll = self.sample_interrupts();
                if let Some(step) = self.queue.current() {
                    self.queue.advance();
                    self.run_step(bus, step);
                }
                self.settle();
                if self.queue.is_empty() && self.state == State::Execute {
                    if self.unbounded_stack {
                        self.regs.confine_stack();
                    }
                    self.state = State::FetchOpcode;
                    self.pending = self.poll;
                }
            }
            State::Waiting => {
                if self.nmi_latched || self.irq_line {
                    debug!("65816 leaving WAI at {:06X}", self.regs.program_address());
                    // A masked IRQ just resumes at the next instruction.
                    self.pending = self.sample_interrupts();
                    self.state = State::FetchOpcode;
                }
            }
            State::Stopped => {}
        }
    }

    /// Run zero-cycle steps and drop penalty steps whose condition fails.
    fn settle(&mut self) {
        while let Some(step) = self.queue.current() {
            if step.is_free() {
                self.queue.advance();
                self.run_free(step);
            } else if self.skips(step) {
                self.queue.advance();
            } else {
                break;
            }
        }
    }

    fn skips(&self, step: Step) -> bool {
        match step {
            Step::DirectPenalty => self.regs.d & 0x00FF == 0,
            Step::IndexPenalty => {
                self.op.access() == Access::Read && self.regs.p.is_set(X) && !self.page_crossed
            }
            Step::BranchPenalty => !(self.regs.e && self.page_crossed),
            _ => false,
        }
    }

    fn sample_interrupts(&self) -> Option<Interrupt> {
        if self.nmi_latched {
            Some(Interrupt::Nmi)
        } else if self.irq_line && !self.regs.p.is_set(I) {
            Some(Interrupt::Irq)
        } else {
            None
        }
    }

    /// Replace the opcode fetch with the interrupt sequence.
    fn begin_interrupt<B: Bus>(&mut self, bus: &mut B, source: Interrupt) {
        debug!(
            "65816 {source:?} entry at {:06X}",
            self.regs.program_address()
        );
        let _ = self.read(bus, self.regs.program_address());
        self.opcode = 0x00;
        self.op = Op::Brk;
        self.mode = Mode::Imp;
        self.servicing = Some(source);
        self.unbounded_stack = false;
        self.queue.clear();
        self.queue.push(Step::Io);
        if !self.regs.e {
            self.queue.push(Step::PushBank);
        }
        self.queue.extend(&[
            Step::Prepare,
            Step::Push(Byte::Hi),
            Step::Push(Byte::Lo),
            Step::PushStatus,
            Step::Vector(Byte::Lo),
            Step::Vector(Byte::Hi),
            Step::Execute,
        ]);
    }

    fn run_step<B: Bus>(&mut self, bus: &mut B, step: Step) {
        match step {
            Step::Operand(byte) => {
                let value = self.read_program(bus);
                self.operand = with_byte(self.operand, byte, value);
            }
            Step::Immediate(byte) => {
                let value = self.read_program(bus);
                self.data = with_byte(self.data, byte, value);
            }
            Step::Io | Step::DirectPenalty | Step::IndexPenalty | Step::BranchPenalty => {
                self.idle();
            }
            Step::Indirect(byte) => {
                let value = self.read(bus, self.pointer_at(byte.offset()));
                self.indirect = with_byte(self.indirect, byte, value);
            }
            Step::Read(byte) => {
                let value = self.read(bus, self.data_at(byte.offset()));
                self.data = with_byte(self.data, byte, value);
            }
            Step::Write(byte) => {
                let addr = self.data_at(byte.offset());
                self.write(bus, addr, (self.data >> byte.shift()) as u8);
            }
            Step::Modify => {
                if self.regs.e {
                    // Emulation mode writes the unmodified value back.
                    self.write(bus, self.addr, self.data as u8);
                } else {
                    self.idle();
                }
                self.data = u32::from(self.modify(self.data as u16));
            }
            Step::Push(byte) => self.push(bus, (self.data >> byte.shift()) as u8),
            Step::Pull(byte) => {
                let addr = self.pop_address();
                let value = self.read(bus, addr);
                self.data = with_byte(self.data, byte, value);
            }
            Step::PushBank => self.push(bus, self.regs.pbr),
            Step::PushStatus => {
                let p = self.regs.p.0;
                let value = match self.servicing {
                    Some(_) if self.regs.e => p & !flags::B,
                    None if self.regs.e => p | flags::B,
                    _ => p,
                };
                self.push(bus, value);
                self.vector = self.select_vector();
            }
            Step::PullStatus => {
                let addr = self.pop_address();
                let value = self.read(bus, addr);
                self.regs.set_p(value);
            }
            Step::Vector(byte) => {
                let addr = u32::from(self.vector.wrapping_add(byte.offset() as u16));
                let value = self.read(bus, addr);
                self.indirect = with_byte(self.indirect, byte, value);
            }
            Step::BlockRead => {
                let bank = (self.operand >> 8) & 0xFF;
                let value = self.read(bus, (bank << 16) | u32::from(self.regs.x));
                self.data = u32::from(value);
            }
            Step::BlockWrite => self.block_write(bus),
            Step::Pointer | Step::Address | Step::Prepare | Step::Execute => self.run_free(step),
        }
    }

    fn run_free(&mut self, step: Step) {
        match step {
            Step::Pointer => self.form_pointer(),
            Step::Address => self.form_address(),
            Step::Prepare => self.prepare(),
            Step::Execute => self.execute(),
            step => unreachable!("{step:?} takes a cycle"),
        }
    }

    /// Pushes become reads during the reset sequence.
    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        let addr = if self.unbounded_stack {
            self.regs.push_unbounded()
        } else {
            self.regs.push()
        };
        if self.servicing == Some(Interrupt::Reset) {
            let _ = self.read(bus, addr);
        } else {
            self.write(bus, addr, value);
        }
    }

    fn pop_address(&mut self) -> u32 {
        if self.unbounded_stack {
            self.regs.pop_unbounded()
        } else {
            self.regs.pop()
        }
    }

    /// Vector for the sequence in progress. A latched NMI takes over a
    /// BRK, COP or IRQ that has not yet fetched its vector.
    fn select_vector(&mut self) -> u16 {
        let e = self.regs.e;
        if self.servicing == Some(Interrupt::Reset) {
            self.nmi_latched = false;
            return RESET_VECTOR;
        }
        if self.nmi_latched {
            self.nmi_latched = false;
            return if e { EMULATION_NMI } else { NATIVE_NMI };
        }
        match (self.servicing, self.op, e) {
            (None, Op::Cop, true) => EMULATION_COP,
            (None, Op::Cop, false) => NATIVE_COP,
            (None, _, false) => NATIVE_BRK,
            (_, _, false) => NATIVE_IRQ,
            (_, _, true) => EMULATION_IRQ,
        }
    }

    fn block_write<B: Bus>(&mut self, bus: &mut B) {
        let bank = (self.operand & 0xFF) as u8;
        self.regs.dbr = bank;
        let addr = (u32::from(bank) << 16) | u32::from(self.regs.y);
        self.write(bus, addr, self.data as u8);

        // MVN walks upwards, MVP downwards.
        let delta = if self.op == Op::Mvn { 1 } else { 0xFFFF };
        let mask = if self.regs.p.is_set(X) { 0x00FF } else { 0xFFFF };
        self.regs.x = self.regs.x.wrapping_add(delta) & mask;
        self.regs.y = self.regs.y.wrapping_add(delta) & mask;
        self.regs.c = self.regs.c.wrapping_sub(1);
    }

    // ========================================================================
    // Address formation
    // ========================================================================

    /// Emulation mode with D page-aligned keeps direct-page indexing in page.
    fn direct_wraps_in_page(&self) -> bool {
        self.regs.e && self.regs.d & 0x00FF == 0
    }

    fn direct(&self, offset: u16) -> u32 {
        let addr = if self.direct_wraps_in_page() {
            (self.regs.d & 0xFF00) | (offset & 0x00FF)
        } else {
            self.regs.d.wrapping_add(offset)
        };
        u32::from(addr)
    }

    fn pointer_at(&self, offset: u32) -> u32 {
        if self.pointer_in_page {
            (self.pointer & 0xFF_FF00) | (self.pointer.wrapping_add(offset) & 0xFF)
        } else {
            (self.pointer & 0xFF_0000) | (self.pointer.wrapping_add(offset) & 0xFFFF)
        }
    }

    fn data_at(&self, offset: u32) -> u32 {
        if self.addr_in_bank {
            (self.addr & 0xFF_0000) | (self.addr.wrapping_add(offset) & 0xFFFF)
        } else {
            self.addr.wrapping_add(offset) & 0xFF_FFFF
        }
    }

    fn form_pointer(&mut self) {
        let offset = u16::from(self.operand as u8);
        let absolute = self.operand & 0xFFFF;
        self.pointer_in_page = false;
        self.pointer = match self.mode {
            Mode::Dpi | Mode::Dpiy => {
                self.pointer_in_page = self.direct_wraps_in_page();
                self.direct(offset)
            }
            Mode::Dpix => {
                self.pointer_in_page = self.direct_wraps_in_page();
                self.direct(offset.wrapping_add(self.regs.x))
            }
            // PEI and the long pointers ignore the emulation-mode page wrap.
            Mode::Dp | Mode::Dpil | Mode::Dpily => u32::from(self.regs.d.wrapping_add(offset)),
            Mode::Sriy => u32::from(self.regs.s.wrapping_add(offset)),
            Mode::Ind | Mode::Indl => absolute,
            Mode::Indx => {
                let bank = u32::from(self.regs.pbr) << 16;
                bank | u32::from((absolute as u16).wrapping_add(self.regs.x))
            }
            mode => unreachable!("{mode:?} has no pointer"),
        };
    }

    fn form_address(&mut self) {
        let offset = u16::from(self.operand as u8);
        let data_bank = u32::from(self.regs.dbr) << 16;
        let absolute = data_bank | (self.operand & 0xFFFF);
        let indirect = data_bank | (self.indirect & 0xFFFF);
        self.addr_in_bank = false;
        self.page_crossed = false;
        self.addr = match self.mode {
            Mode::Dp => {
                self.addr_in_bank = true;
                self.direct(offset)
            }
            Mode::Dpx => {
                self.addr_in_bank = true;
                self.direct(offset.wrapping_add(self.regs.x))
            }
            Mode::Dpy => {
                self.addr_in_bank = true;
                self.direct(offset.wrapping_add(self.regs.y))
            }
            Mode::Sr => {
                self.addr_in_bank = true;
                u32::from(self.regs.s.wrapping_add(offset))
            }
            Mode::Dpi | Mode::Dpix => indirect,
            Mode::Dpiy => self.indexed(indirect, self.regs.y),
            Mode::Sriy => indirect.wrapping_add(u32::from(self.regs.y)) & 0xFF_FFFF,
            Mode::Dpil => self.indirect & 0xFF_FFFF,
            Mode::Dpily => self.indirect.wrapping_add(u32::from(self.regs.y)) & 0xFF_FFFF,
            Mode::Abs => absolute,
            Mode::Abx => self.indexed(absolute, self.regs.x),
            Mode::Aby => self.indexed(absolute, self.regs.y),
            Mode::Abl => self.operand & 0xFF_FFFF,
            Mode::Ablx => self.operand.wrapping_add(u32::from(self.regs.x)) & 0xFF_FFFF,
            mode => unreachable!("{mode:?} has no data address"),
        };
    }

    /// Add an index, noting whether it carried into the next page.
    fn indexed(&mut self, base: u32, index: u16) -> u32 {
        let low = base as u16;
        self.page_crossed = (low ^ low.wrapping_add(index)) & 0xFF00 != 0;
        base.wrapping_add(u32::from(index)) & 0xFF_FFFF
    }

    // ========================================================================
    // Instruction effects
    // ========================================================================

    /// Value the instruction pushes or stores.
    fn prepare(&mut self) {
        let pc = self.regs.pc;
        let value = match self.op {
            Op::Sta | Op::Pha => self.accumulator(),
            Op::Stx | Op::Phx => self.regs.x,
            Op::Sty | Op::Phy => self.regs.y,
            Op::Stz => 0,
            Op::Php => u16::from(self.regs.p.0),
            Op::Phb => u16::from(self.regs.dbr),
            Op::Phk => u16::from(self.regs.pbr),
            Op::Phd => self.regs.d,
            Op::Pea => self.operand as u16,
            Op::Pei => self.indirect as u16,
            Op::Per => pc.wrapping_add(self.operand as u16),
            // JSR (a,x) pushes before fetching its last byte.
            Op::Jsr if self.mode == Mode::Indx => pc,
            Op::Jsr | Op::Jsl => pc.wrapping_sub(1),
            Op::Brk | Op::Cop => pc,
            op => unreachable!("{op:?} pushes nothing"),
        };
        self.data = u32::from(value);
    }

    fn execute(&mut self) {
        match self.op.access() {
            Access::Read => self.execute_read(self.data as u16),
            Access::Modify if self.mode == Mode::Acc => {
                let value = self.modify(self.accumulator());
                self.set_accumulator(value);
            }
            Access::Write | Access::Modify => {}
            Access::Other => self.execute_other(),
        }
    }

    fn execute_other(&mut self) {
        let operand = self.operand as u16;
        match self.op {
            Op::Bpl | Op::Bmi | Op::Bvc | Op::Bvs | Op::Bcc | Op::Bcs | Op::Bne | Op::Beq
            | Op::Bra => {
                if self.branch_taken() {
                    let target = self.regs.pc.wrapping_add(self.operand as u8 as i8 as u16);
                    self.page_crossed = (target ^ self.regs.pc) & 0xFF00 != 0;
                    self.regs.pc = target;
                    self.queue.extend(&[Step::Io, Step::BranchPenalty]);
                }
            }
            Op::Brl => self.regs.pc = self.regs.pc.wrapping_add(operand),
            Op::Jmp | Op::Jsr => {
                self.regs.pc = if self.mode == Mode::Abs {
                    operand
                } else {
                    self.indirect as u16
                };
            }
            Op::Jml | Op::Jsl => {
                let target = if self.mode == Mode::Indl {
                    self.indirect
                } else {
                    self.operand
                };
                self.regs.pc = target as u16;
                self.regs.pbr = (target >> 16) as u8;
            }
            Op::Rts => self.regs.pc = (self.data as u16).wrapping_add(1),
            Op::Rtl => {
                self.regs.pc = (self.data as u16).wrapping_add(1);
                self.regs.pbr = (self.data >> 16) as u8;
            }
            Op::Rti => {
                self.regs.pc = self.data as u16;
                if !self.regs.e {
                    self.regs.pbr = (self.data >> 16) as u8;
                }
            }
            Op::Brk | Op::Cop => {
                self.regs.pc = self.indirect as u16;
                self.regs.pbr = 0;
                self.regs.p.set(I);
                self.regs.p.clear(D);
                self.servicing = None;
                // The first handler instruction always runs.
                self.poll = None;
            }
            Op::Pla => {
                let value = self.pulled();
                self.set_accumulator(value);
                self.set_nz(value, self.wide);
            }
            Op::Plx | Op::Ply => {
                let value = self.pulled();
                if self.op == Op::Plx {
                    self.regs.x = value;
                } else {
                    self.regs.y = value;
                }
                self.set_nz(value, self.wide);
            }
            Op::Plp => self.regs.set_p(self.data as u8),
            Op::Plb => {
                self.regs.dbr = self.data as u8;
                self.set_nz(self.data as u16, false);
            }
            Op::Pld => {
                self.regs.d = self.data as u16;
                self.set_nz(self.regs.d, true);
            }
            Op::Mvn | Op::Mvp => {
                if self.regs.c != 0xFFFF {
                    // Run the instruction again for the next byte.
                    self.regs.pc = self.regs.pc.wrapping_sub(3);
                }
            }
            Op::Rep => self.regs.set_p(self.regs.p.0 & !(self.data as u8)),
            Op::Sep => self.regs.set_p(self.regs.p.0 | self.data as u8),
            Op::Xba => {
                self.regs.c = self.regs.c.rotate_left(8);
                self.set_nz(self.regs.c & 0x00FF, false);
            }
            Op::Xce => {
                let carry = self.regs.p.is_set(C);
                self.regs.p.set_if(C, self.regs.e);
                self.regs.set_e(carry);
            }
            Op::Wai => self.state = State::Waiting,
            Op::Stp => {
                warn!(
                    "65816 stopped by STP at {:06X}",
                    self.regs.program_address().wrapping_sub(1)
                );
                self.state = State::Stopped;
            }
            Op::Wdm | Op::Nop => {}
            _ => self.execute_implied(),
        }
    }

    /// Pulled value at the operation's width.
    fn pulled(&self) -> u16 {
        if self.wide {
            self.data as u16
        } else {
            u16::from(self.data as u8)
        }
    }

    fn branch_taken(&self) -> bool {
        let p = self.regs.p;
        match self.op {
            Op::Bpl => !p.is_set(N),
            Op::Bmi => p.is_set(N),
            Op::Bvc => !p.is_set(V),
            Op::Bvs => p.is_set(V),
            Op::Bcc => !p.is_set(C),
            Op::Bcs => p.is_set(C),
            Op::Bne => !p.is_set(Z),
            Op::Beq => p.is_set(Z),
            Op::Bra => true,
            op => unreachable!("{op:?} is not a branch"),
        }
    }

    // ========================================================================
    // Bus access
    // ========================================================================

    fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let address = self.regs.program_address();
        let value = bus.read(address);
        self.capture
            .record(self.total_cycles.get(), BusOpKind::OpcodeFetch, address, value);
        value
    }

    fn read<B: Bus>(&mut self, bus: &mut B, address: u32) -> u8 {
        let value = bus.read(address);
        self.capture
            .record(self.total_cycles.get(), BusOpKind::Read, address, value);
        value
    }

    fn write<B: Bus>(&mut self, bus: &mut B, address: u32, value: u8) {
        bus.write(address, value);
        self.capture
            .record(self.total_cycles.get(), BusOpKind::Write, address, value);
    }

    fn read_program<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read(bus, self.regs.program_address());
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Internal cycle: no valid address on the bus.
    fn idle(&mut self) {
        self.capture.record(
            self.total_cycles.get(),
            BusOpKind::Internal,
            self.regs.program_address(),
            0,
        );
    }
}

fn with_byte(value: u32, byte: Byte, new: u8) -> u32 {
    let shift = byte.shift();
    (value & !(0xFF << shift)) | (u32::from(new) << shift)
}

// ============================================================================
// Trait implementations
// ============================================================================

impl Cpu for Wdc65816 {
    type Registers = Registers;
    type Register = Register;

    fn tick<B: Bus>(&mut self, bus: &mut B) {
        if !self.is_frozen() {
            self.execute_cycle(bus);
        }
        self.total_cycles += Ticks::new(1);
    }

    fn pc(&self) -> u32 {
        self.regs.program_address()
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn register(&self, id: Register) -> Result<u32, CoreError> {
        let value = match id {
            Register::A => self.regs.c,
            Register::X => self.regs.x,
            Register::Y => self.regs.y,
            Register::S => self.regs.s,
            Register::P => self.regs.p.0.into(),
            Register::Pc => self.regs.pc,
            Register::D => self.regs.d,
            Register::Dbr => self.regs.dbr.into(),
            Register::Pbr => self.regs.pbr.into(),
            Register::E => self.regs.e.into(),
        };
        Ok(value.into())
    }

    /// Index registers keep only their low byte while X is set, and S its
    /// low byte in emulation mode.
    fn set_register(&mut self, id: Register, value: u32) -> Result<(), CoreError> {
        let out_of_range = || CoreError::ValueOutOfRange {
            register: id.name(),
            value,
        };
        let byte = || u8::try_from(value).map_err(|_| out_of_range());
        let word = || u16::try_from(value).map_err(|_| out_of_range());
        let index_mask = if self.regs.p.is_set(X) { 0x00FF } else { 0xFFFF };
        match id {
            Register::A => self.regs.c = word()?,
            Register::X => self.regs.x = word()? & index_mask,
            Register::Y => self.regs.y = word()? & index_mask,
            Register::S => {
                let s = word()?;
                self.regs.s = if self.regs.e { 0x0100 | (s & 0x00FF) } else { s };
            }
            Register::P => self.regs.set_p(byte()?),
            Register::Pc => self.regs.pc = word()?,
            Register::D => self.regs.d = word()?,
            Register::Dbr => self.regs.dbr = byte()?,
            Register::Pbr => self.regs.pbr = byte()?,
            Register::E => match value {
                0 | 1 => self.regs.set_e(value == 1),
                _ => return Err(out_of_range()),
            },
        }
        Ok(())
    }

    fn set_line(&mut self, line: Line, asserted: bool) {
        match line {
            Line::Nmi => {
                if asserted && !self.nmi_line {
                    self.nmi_latched = true;
                }
                self.nmi_line = asserted;
            }
            Line::Irq => self.irq_line = asserted,
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
        self.state == State::Waiting
    }

    fn is_stopped(&self) -> bool {
        self.state == State::Stopped
    }

    fn is_frozen(&self) -> bool {
        self.wait_line || self.reset_line
    }

    fn stop(&mut self) {
        self.state = State::Stopped;
    }

    fn reset(&mut self) {
        debug!("65816 reset");
        let regs = &mut self.regs;
        regs.set_e(true);
        regs.p.set(I);
        regs.p.clear(D);
        regs.d = 0;
        regs.dbr = 0;
        regs.pbr = 0;
        self.queue.clear();
        self.state = State::FetchOpcode;
        self.poll = None;
        self.nmi_latched = false;
        self.pending = Some(Interrupt::Reset);
    }

    fn at_instruction_boundary(&self) -> bool {
        matches!(self.state, State::FetchOpcode | State::Waiting)
    }

    fn total_cycles(&self) -> Ticks {
        self.total_cycles
    }

    fn traps(&self) -> &TrapTable {
        &self.config.traps
    }

    fn capture(&mut self) -> &mut BusCapture {
        &mut self.capture
    }
}

impl Observable for Wdc65816 {
    fn query(&self, path: &str) -> Option<Value> {
        let p = self.regs.p;
        match path {
            "pc" => Some(self.regs.program_address().into()),
            "pbr" => Some(self.regs.pbr.into()),
            "dbr" => Some(self.regs.dbr.into()),
            "c" => Some(self.regs.c.into()),
            "a" => Some(self.regs.a().into()),
            "b" => Some(((self.regs.c >> 8) as u8).into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "d" => Some(self.regs.d.into()),
            "p" | "status" => Some(p.0.into()),
            "e" => Some(self.regs.e.into()),
            "flags.c" => Some(p.is_set(C).into()),
            "flags.z" => Some(p.is_set(Z).into()),
            "flags.i" => Some(p.is_set(I).into()),
            "flags.d" => Some(p.is_set(D).into()),
            "flags.x" => Some(p.is_set(X).into()),
            "flags.m" => Some(p.is_set(M).into()),
            "flags.v" => Some(p.is_set(V).into()),
            "flags.n" => Some(p.is_set(N).into()),
            "opcode" => Some(self.opcode.into()),
            "cycle" => Some(Value::U64(self.total_cycles.get())),
            "waiting" => Some(self.is_halted().into()),
            "stopped" => Some(self.is_stopped().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "pbr", "dbr", "c", "a", "b", "x", "y", "s", "d", "p", "e", "flags.c", "flags.z",
            "flags.i", "flags.d", "flags.x", "flags.m", "flags.v", "flags.n", "opcode", "cycle",
            "waiting", "stopped",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    fn native(cpu: &mut Wdc65816) {
        cpu.regs.set_e(false);
        cpu.regs.set_p(0);
    }

    #[test]
    fn lda_immediate_emulation() {
        let mut cpu = Wdc65816::new();
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0xA9, 0x42]);

        cpu.tick(&mut bus);
        cpu.tick(&mut bus);

        assert_eq!(cpu.regs.a(), 0x42);
        assert_eq!(cpu.regs.pc, 0x0002);
        assert!(cpu.is_instruction_complete());
    }

    #[test]
    fn lda_immediate_sixteen_bit_takes_three_cycles() {
        let mut cpu = Wdc65816::new();
        let mut bus = SimpleBus::new();
        native(&mut cpu);
        bus.load(0x0000, &[0xA9, 0x34, 0x12]);

        let summary = cpu.step_instruction(&mut bus);

        assert_eq!(summary.cycles, 3);
        assert_eq!(cpu.regs.c, 0x1234);
        assert_eq!(cpu.regs.pc, 3);
    }

    #[test]
    fn direct_page_penalty_depends_on_d_low_byte() {
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0xA5, 0x10]);

        let mut cpu = Wdc65816::new();
        assert_eq!(cpu.step_instruction(&mut bus).cycles, 3);

        let mut cpu = Wdc65816::new();
        cpu.regs.d = 0x0001;
        assert_eq!(cpu.step_instruction(&mut bus).cycles, 4);
    }

    #[test]
    fn with_byte_replaces_one_byte() {
        assert_eq!(with_byte(0x12_3456, Byte::Hi, 0xAB), 0x12_AB56);
        assert_eq!(with_byte(0, Byte::Bank, 0x7E), 0x7E_0000);
    }

    #[test]
    fn frozen_core_counts_cycles_only() {
        let mut cpu = Wdc65816::new();
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0xA9, 0x42]);

        cpu.set_line(Line::Wait, true);
        for _ in 0..4 {
            cpu.tick(&mut bus);
        }
        assert_eq!(cpu.regs.pc, 0);
        assert_eq!(cpu.total_cycles(), Ticks::new(4));
    }
}
