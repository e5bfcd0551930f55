//! Micro-operations for T-state accurate Z80 execution.
//!
//! Each instruction is a sequence of machine cycles. The CPU steps through
//! them one T-state at a time; the bus access lands on a cycle's last
//! T-state.

/// One machine cycle, or a zero-length execute step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicroOp {
    /// M1: fetch the opcode at PC, increment PC and R (4 T-states).
    FetchOpcode,
    /// Interrupt acknowledge M1 with two wait states (6 T-states).
    /// The byte on the bus is an opcode in IM0 and a vector in IM2.
    Acknowledge,
    /// Fetch the IX/IY displacement and form the operand address
    /// (3 T-states).
    FetchDisplacement,
    /// Read the byte at PC into `data_lo` (3 T-states).
    ReadImm8,
    /// Read the byte at PC into `data_lo` (3 T-states).
    ReadImm16Lo,
    /// Read the byte at PC into `data_hi` (3 T-states).
    ReadImm16Hi,
    /// Read the byte at `addr` into `data_lo` (3 T-states).
    ReadMem,
    /// Read the byte at `addr` into `data_lo`, then step `addr` (3 T-states).
    ReadMem16Lo,
    /// Read the byte at `addr` into `data_hi` (3 T-states).
    ReadMem16Hi,
    /// Write `data_lo` to `addr` (3 T-states).
    WriteMem,
    /// Write `data_lo` to `addr`, then step `addr` (3 T-states).
    WriteMem16Lo,
    /// Write `data_hi` to `addr` (3 T-states).
    WriteMem16Hi,
    /// Decrement SP and write `data_hi` there (3 T-states).
    PushHi,
    /// Decrement SP and write `data_lo` there (3 T-states).
    PushLo,
    /// Read the byte at SP into `data_lo`, then increment SP (3 T-states).
    PopLo,
    /// Read the byte at SP into `data_hi`, then increment SP (3 T-states).
    PopHi,
    /// Read port `addr` into `data_lo` (4 T-states).
    IoRead,
    /// Write `data_lo` to port `addr` (4 T-states).
    IoWrite,
    /// No bus activity for the given number of T-states.
    Internal(u8),
    /// Run the next stage of the instruction (0 T-states).
    Execute,
}

impl MicroOp {
    #[must_use]
    pub const fn t_states(self) -> u8 {
        match self {
            Self::FetchOpcode | Self::IoRead | Self::IoWrite => 4,
            Self::Acknowledge => 6,
            Self::Internal(n) => n,
            Self::Execute => 0,
            _ => 3,
        }
    }
}

const CAPACITY: usize = 16;

/// Fixed-size queue of pending micro-ops.
#[derive(Debug, Clone)]
pub(crate) struct MicroOpQueue {
    ops: [MicroOp; CAPACITY],
    len: u8,
    pos: u8,
}

impl MicroOpQueue {
    pub const fn new() -> Self {
        Self {
            ops: [MicroOp::Execute; CAPACITY],
            len: 0,
            pos: 0,
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.pos = 0;
    }

    pub fn push(&mut self, op: MicroOp) {
        debug_assert!(usize::from(self.len) < CAPACITY, "micro-op queue overflow");
        self.ops[usize::from(self.len)] = op;
        self.len += 1;
    }

    pub fn current(&self) -> Option<MicroOp> {
        (self.pos < self.len).then(|| self.ops[usize::from(self.pos)])
    }

    pub fn advance(&mut self) {
        if self.pos < self.len {
            self.pos += 1;
        }
    }

    /// All queued ops consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.len
    }
}
