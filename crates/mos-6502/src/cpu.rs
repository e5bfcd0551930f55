//! 6502 CPU implementation.
//!
//! Cycle-accurate emulation where each `tick()` performs exactly one
//! bus access. Instructions are broken down into their component cycles:
//! the addressing mode supplies the address cycles (see `addressing`) and
//! the operation supplies the ALU step (see `alu`).

mod addressing;
mod alu;

use emu_core::{
    Bus, BusCapture, BusOpKind, CoreError, Cpu, Line, Observable, Ticks, TrapTable, Value,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::flags::{C, D, I, N, V, Z};
use crate::table::{Access, Mode, OPCODES, Op};
use crate::{Register, Registers, Status};

const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

/// Which chip is being emulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// NMOS 6502/6510 with working decimal mode.
    #[default]
    Nmos6502,
    /// Ricoh 2A03/2A07: the D flag exists but ADC/SBC ignore it.
    Ricoh2A03,
}

impl Variant {
    const fn name(self) -> &'static str {
        match self {
            Variant::Nmos6502 => "NMOS 6502",
            Variant::Ricoh2A03 => "Ricoh 2A03",
        }
    }
}

/// Construction-time configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub variant: Variant,
    /// Opcode-fetch addresses the run loop stops at.
    pub traps: TrapTable,
}

/// Internal state tracking instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Fetching opcode byte (or starting interrupt entry).
    FetchOpcode,
    /// Executing instruction cycles.
    Execute,
    /// CPU is stopped (JAM/KIL instruction or halting trap).
    Stopped,
}

/// Hardware interrupt sources, in the order they run through the BRK
/// sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Reset,
    Nmi,
    Irq,
}

/// The MOS 6502 CPU.
///
/// Implements cycle-accurate execution where each `tick()` advances
/// exactly one CPU cycle. The 6502 performs one bus access per cycle.
#[derive(Debug)]
pub struct Mos6502 {
    /// CPU registers.
    pub regs: Registers,

    config: Config,

    /// Current execution state.
    state: State,

    /// Current opcode being executed.
    opcode: u8,
    op: Op,
    mode: Mode,

    /// Current cycle within the instruction (0 = opcode fetch).
    cycle: u8,

    /// Cycle at which `addr` holds the effective address, 0 until then.
    ready_at: u8,

    /// Temporary address register for addressing modes.
    addr: u16,

    /// Temporary data register.
    data: u8,

    /// Pointer for indirect addressing.
    pointer: u8,

    /// High byte of the unindexed base address.
    base_hi: u8,

    /// Indexing carried into the high byte.
    page_crossed: bool,

    /// Vector chosen by the BRK/interrupt sequence.
    vector: u16,

    /// Interrupt being entered through the BRK sequence; `None` for BRK.
    servicing: Option<Interrupt>,

    /// Interrupt sampled at the start of the current cycle.
    poll: Option<Interrupt>,

    /// Poll result from the first cycle of a branch.
    branch_poll: Option<Interrupt>,

    /// Interrupt to enter instead of the next opcode fetch.
    pending: Option<Interrupt>,

    /// NMI edge detector - true once an asserting edge has been seen.
    nmi_latched: bool,
    nmi_line: bool,

    /// IRQ level - true while the line is asserted.
    irq_line: bool,

    wait_line: bool,
    reset_line: bool,

    /// Total cycles executed.
    total_cycles: Ticks,

    capture: BusCapture,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// NMOS 6502 with no traps, ready to fetch at PC = $0000.
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
            opcode: 0,
            op: Op::Brk,
            mode: Mode::Imp,
            cycle: 0,
            ready_at: 0,
            addr: 0,
            data: 0,
            pointer: 0,
            base_hi: 0,
            page_crossed: false,
            vector: IRQ_VECTOR,
            servicing: None,
            poll: None,
            branch_poll: None,
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

    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.config.variant
    }

    /// True between instructions.
    #[must_use]
    pub fn is_instruction_complete(&self) -> bool {
        self.state != State::Execute
    }

    /// Opcode of the instruction in progress (or last executed).
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Execute one CPU cycle.
    fn execute_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.state {
            State::FetchOpcode => {
                if let Some(source) = self.pending.take() {
                    self.begin_interrupt(bus, source);
                    return;
                }

                self.opcode = self.fetch(bus);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                (self.op, self.mode) = OPCODES[usize::from(self.opcode)];
                self.cycle = 1;
                self.state = State::Execute;
            }
            State::Execute => {
                self.poll = self.sample_interrupts();
                self.execute_instruction(bus);
                self.cycle = self.cycle.wrapping_add(1);
            }
            State::Stopped => {}
        }
    }

    /// Interrupt the CPU would take if this were the last cycle.
    fn sample_interrupts(&self) -> Option<Interrupt> {
        if self.nmi_latched {
            Some(Interrupt::Nmi)
        } else if self.irq_line && !self.regs.p.is_set(I) {
            Some(Interrupt::Irq)
        } else {
            None
        }
    }

    /// Replace the opcode fetch with a forced BRK.
    fn begin_interrupt<B: Bus>(&mut self, bus: &mut B, source: Interrupt) {
        debug!("6502 {source:?} entry at {:#06X}", self.regs.pc);
        let _ = self.read(bus, self.regs.pc);
        self.opcode = 0x00;
        (self.op, self.mode) = (Op::Brk, Mode::Imp);
        self.servicing = Some(source);
        self.cycle = 1;
        self.state = State::Execute;
    }

    /// Execute one cycle of the current instruction.
    fn execute_instruction<B: Bus>(&mut self, bus: &mut B) {
        match self.mode {
            Mode::Imp => self.implied(bus),
            Mode::Acc => {
                let _ = self.read(bus, self.regs.pc);
                self.regs.a = self.modify(self.regs.a);
                self.finish();
            }
            Mode::Rel => self.op_branch(bus),
            Mode::Ind => self.op_jmp_ind(bus),
            _ => match self.op.access() {
                Access::Read => {
                    if self.address_step(bus, Access::Read) {
                        let value = self.read(bus, self.addr);
                        self.execute_read(value);
                        self.finish();
                    }
                }
                Access::Write => {
                    if self.address_step(bus, Access::Write) {
                        let value = self.store_value();
                        self.write(bus, self.addr, value);
                        self.finish();
                    }
                }
                Access::Modify => {
                    if self.address_step(bus, Access::Modify) {
                        self.modify_step(bus);
                    }
                }
                Access::Other => match self.op {
                    Op::Jsr => self.op_jsr(bus),
                    Op::Jmp => self.op_jmp_abs(bus),
                    op => unreachable!("{op:?} has no handler for {:?}", self.mode),
                },
            },
        }
    }

    /// Finish current instruction and return to opcode fetch.
    fn finish(&mut self) {
        self.state = State::FetchOpcode;
        self.ready_at = 0;
        self.pending = self.poll;
    }

    // ========================================================================
    // Bus access
    // ========================================================================

    fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let address = u32::from(self.regs.pc);
        let value = bus.read(address);
        self.capture
            .record(self.total_cycles.get(), BusOpKind::OpcodeFetch, address, value);
        value
    }

    fn read<B: Bus>(&mut self, bus: &mut B, address: u16) -> u8 {
        let value = bus.read(u32::from(address));
        self.capture.record(
            self.total_cycles.get(),
            BusOpKind::Read,
            u32::from(address),
            value,
        );
        value
    }

    fn write<B: Bus>(&mut self, bus: &mut B, address: u16, value: u8) {
        bus.write(u32::from(address), value);
        self.capture.record(
            self.total_cycles.get(),
            BusOpKind::Write,
            u32::from(address),
            value,
        );
    }

    /// Read the byte at PC and step past it.
    fn read_pc<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    // ========================================================================
    // Individual instruction implementations
    // ========================================================================

    /// Single-byte instructions.
    fn implied<B: Bus>(&mut self, bus: &mut B) {
        match self.op {
            Op::Brk => self.op_brk(bus),
            Op::Rti => self.op_rti(bus),
            Op::Rts => self.op_rts(bus),
            Op::Pha => self.op_push(bus, self.regs.a),
            Op::Php => self.op_push(bus, self.regs.p.to_byte_brk()),
            Op::Pla | Op::Plp => self.op_pull(bus),
            Op::Jam => {
                let _ = self.read(bus, self.regs.pc);
                warn!(
                    "6502 jammed on opcode {:#04X} at {:#06X}",
                    self.opcode,
                    self.regs.pc.wrapping_sub(1)
                );
                self.state = State::Stopped;
            }
            _ => {
                let _ = self.read(bus, self.regs.pc);
                self.execute_implied();
                self.finish();
            }
        }
    }

    /// BRK, and the IRQ/NMI/reset entry that borrows its sequence.
    fn op_brk<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                // BRK skips its padding byte; hardware entry does not.
                let _ = self.read(bus, self.regs.pc);
                if self.servicing.is_none() {
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                }
            }
            2..=4 => {
                let value = match self.cycle {
                    2 => (self.regs.pc >> 8) as u8,
                    3 => self.regs.pc as u8,
                    _ if self.servicing.is_none() => self.regs.p.to_byte_brk(),
                    _ => self.regs.p.to_byte_irq(),
                };
                let addr = self.regs.push();
                if self.servicing == Some(Interrupt::Reset) {
                    // Reset runs the pushes as reads.
                    let _ = self.read(bus, addr);
                } else {
                    self.write(bus, addr, value);
                }
                if self.cycle == 4 {
                    self.vector = self.select_vector();
                }
            }
            5 => {
                self.addr = u16::from(self.read(bus, self.vector));
                self.regs.p.set(I);
            }
            6 => {
                let hi = self.read(bus, self.vector.wrapping_add(1));
                self.regs.pc = self.addr | (u16::from(hi) << 8);
                self.finish();
                // The first handler instruction always runs.
                self.pending = None;
                self.servicing = None;
            }
            _ => unreachable!(),
        }
    }

    /// Vector for the sequence in progress. A latched NMI takes over a
    /// BRK or IRQ that has not yet fetched its vector.
    fn select_vector(&mut self) -> u16 {
        if self.servicing == Some(Interrupt::Reset) {
            self.nmi_latched = false;
            RESET_VECTOR
        } else if self.nmi_latched {
            self.nmi_latched = false;
            NMI_VECTOR
        } else {
            IRQ_VECTOR
        }
    }

    fn op_rti<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read(bus, self.regs.pc);
            }
            2 => {
                let _ = self.read(bus, self.regs.stack_addr());
            }
            3 => {
                let addr = self.regs.pop();
                self.regs.p = Status::from_byte(self.read(bus, addr));
            }
            4 => {
                let addr = self.regs.pop();
                self.addr = u16::from(self.read(bus, addr));
            }
            5 => {
                let addr = self.regs.pop();
                let hi = self.read(bus, addr);
                self.regs.pc = self.addr | (u16::from(hi) << 8);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_rts<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read(bus, self.regs.pc);
            }
            2 => {
                let _ = self.read(bus, self.regs.stack_addr());
            }
            3 => {
                let addr = self.regs.pop();
                self.addr = u16::from(self.read(bus, addr));
            }
            4 => {
                let addr = self.regs.pop();
                let hi = self.read(bus, addr);
                self.regs.pc = self.addr | (u16::from(hi) << 8);
            }
            5 => {
                let _ = self.read_pc(bus);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_jsr<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_pc(bus));
            }
            2 => {
                let _ = self.read(bus, self.regs.stack_addr());
            }
            3 => {
                let addr = self.regs.push();
                self.write(bus, addr, (self.regs.pc >> 8) as u8);
            }
            4 => {
                let addr = self.regs.push();
                self.write(bus, addr, self.regs.pc as u8);
            }
            5 => {
                let hi = self.read(bus, self.regs.pc);
                self.regs.pc = self.addr | (u16::from(hi) << 8);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_jmp_abs<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_pc(bus));
            }
            2 => {
                let hi = self.read(bus, self.regs.pc);
                self.regs.pc = self.addr | (u16::from(hi) << 8);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// JMP ($xxxx), with the page-wrap bug on the pointer high byte.
    fn op_jmp_ind<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_pc(bus));
            }
            2 => {
                self.addr |= u16::from(self.read_pc(bus)) << 8;
            }
            3 => {
                self.data = self.read(bus, self.addr);
            }
            4 => {
                let hi_addr = (self.addr & 0xFF00) | (self.addr.wrapping_add(1) & 0x00FF);
                let hi = self.read(bus, hi_addr);
                self.regs.pc = u16::from(self.data) | (u16::from(hi) << 8);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_branch<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.data = self.read_pc(bus);
                if self.branch_taken() {
                    self.branch_poll = self.poll;
                } else {
                    self.finish();
                }
            }
            2 => {
                let _ = self.read(bus, self.regs.pc);
                let target = self.regs.pc.wrapping_add(self.data as i8 as u16);
                if (target ^ self.regs.pc) & 0xFF00 == 0 {
                    self.regs.pc = target;
                    self.finish();
                    // No interrupt poll on this cycle.
                    self.pending = self.branch_poll;
                } else {
                    self.addr = target;
                }
            }
            3 => {
                let _ = self.read(bus, (self.regs.pc & 0xFF00) | (self.addr & 0x00FF));
                self.regs.pc = self.addr;
                self.finish();
            }
            _ => unreachable!(),
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
            op => unreachable!("{op:?} is not a branch"),
        }
    }

    fn op_push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        match self.cycle {
            1 => {
                let _ = self.read(bus, self.regs.pc);
            }
            2 => {
                let addr = self.regs.push();
                self.write(bus, addr, value);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_pull<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read(bus, self.regs.pc);
            }
            2 => {
                let _ = self.read(bus, self.regs.stack_addr());
            }
            3 => {
                let addr = self.regs.pop();
                let value = self.read(bus, addr);
                if self.op == Op::Plp {
                    self.regs.p = Status::from_byte(value);
                } else {
                    self.regs.a = value;
                    self.regs.p.update_nz(value);
                }
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// Read, dummy write and final write of a read-modify-write.
    fn modify_step<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle - self.ready_at {
            0 => {
                self.data = self.read(bus, self.addr);
            }
            1 => {
                // NMOS parts write the unmodified value back first.
                self.write(bus, self.addr, self.data);
                self.data = self.modify(self.data);
            }
            2 => {
                self.write(bus, self.addr, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn decimal_enabled(&self) -> bool {
        self.config.variant == Variant::Nmos6502 && self.regs.p.is_set(D)
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

impl Cpu for Mos6502 {
    type Registers = Registers;
    type Register = Register;

    fn tick<B: Bus>(&mut self, bus: &mut B) {
        if !self.is_frozen() {
            self.execute_cycle(bus);
        }
        self.total_cycles += Ticks::new(1);
    }

    fn pc(&self) -> u32 {
        u32::from(self.regs.pc)
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn register(&self, id: Register) -> Result<u32, CoreError> {
        match id {
            Register::A => Ok(self.regs.a.into()),
            Register::X => Ok(self.regs.x.into()),
            Register::Y => Ok(self.regs.y.into()),
            Register::S => Ok(self.regs.s.into()),
            Register::P => Ok(self.regs.p.0.into()),
            Register::Pc => Ok(self.regs.pc.into()),
            Register::D | Register::Dbr | Register::Pbr | Register::E => {
                Err(CoreError::InvalidRegister {
                    register: id.name(),
                    variant: self.config.variant.name(),
                })
            }
        }
    }

    fn set_register(&mut self, id: Register, value: u32) -> Result<(), CoreError> {
        if id == Register::Pc {
            self.regs.pc = u16::try_from(value).map_err(|_| CoreError::ValueOutOfRange {
                register: id.name(),
                value,
            })?;
            return Ok(());
        }
        // Validate the id before the width.
        self.register(id)?;
        let byte = u8::try_from(value).map_err(|_| CoreError::ValueOutOfRange {
            register: id.name(),
            value,
        })?;
        match id {
            Register::A => self.regs.a = byte,
            Register::X => self.regs.x = byte,
            Register::Y => self.regs.y = byte,
            Register::S => self.regs.s = byte,
            Register::P => self.regs.p = Status::from_byte(byte),
            _ => unreachable!(),
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
        false
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
        debug!("6502 reset");
        self.state = State::FetchOpcode;
        self.cycle = 0;
        self.ready_at = 0;
        self.poll = None;
        self.nmi_latched = false;
        self.pending = Some(Interrupt::Reset);
    }

    fn at_instruction_boundary(&self) -> bool {
        self.state == State::FetchOpcode
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

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "p" | "status" => Some(self.regs.p.0.into()),
            "flags.c" | "c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" | "z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" | "i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" | "d" => Some(self.regs.p.is_set(D).into()),
            "flags.v" | "v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" | "n" => Some(self.regs.p.is_set(N).into()),
            "opcode" => Some(self.opcode.into()),
            "cycle" => Some(Value::U64(self.total_cycles.get())),
            "irq" => Some(self.irq_line.into()),
            "nmi_pending" => Some(self.nmi_latched.into()),
            "stopped" => Some(self.is_stopped().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc",
            "a",
            "x",
            "y",
            "s",
            "p",
            "flags.c",
            "flags.z",
            "flags.i",
            "flags.d",
            "flags.v",
            "flags.n",
            "opcode",
            "cycle",
            "irq",
            "nmi_pending",
            "stopped",
        ]
    }
}
