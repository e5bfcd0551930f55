//! Bus-activity capture for comparison against reference traces.

use serde::{Deserialize, Serialize};

/// What a core did on the bus during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusOpKind {
    /// Data or operand read.
    Read,
    /// Data write.
    Write,
    /// Opcode fetch (6502 SYNC / Z80 M1).
    OpcodeFetch,
    /// No bus transfer; the core was busy internally.
    Internal,
    /// Interrupt-acknowledge cycle.
    InterruptAcknowledge,
    /// I/O port read.
    IoRead,
    /// I/O port write.
    IoWrite,
}

/// One recorded bus operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusOperation {
    /// Core cycle counter at the time of the access.
    pub cycle: u64,
    pub kind: BusOpKind,
    /// 16- or 24-bit address (port number for I/O).
    pub address: u32,
    /// Byte transferred. Zero for internal cycles.
    pub value: u8,
}

/// In-order recorder of bus operations.
///
/// Disabled by default; recording allocates, so it is meant for
/// verification runs rather than normal stepping.
#[derive(Debug, Clone, Default)]
pub struct BusCapture {
    enabled: bool,
    operations: Vec<BusOperation>,
}

impl BusCapture {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: false,
            operations: Vec::new(),
        }
    }

    /// Start recording. Previously recorded operations are kept.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop recording.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one operation if capture is on.
    pub fn record(&mut self, cycle: u64, kind: BusOpKind, address: u32, value: u8) {
        if self.enabled {
            self.operations.push(BusOperation {
                cycle,
                kind,
                address,
                value,
            });
        }
    }

    /// Operations recorded so far.
    #[must_use]
    pub fn operations(&self) -> &[BusOperation] {
        &self.operations
    }

    /// Remove and return everything recorded so far.
    pub fn take(&mut self) -> Vec<BusOperation> {
        std::mem::take(&mut self.operations)
    }
}
