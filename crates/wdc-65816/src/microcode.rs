//! Micro-step definitions for cycle-accurate 65816 execution.
//!
//! Decode turns each instruction into a sequence of steps. Most steps take
//! one cycle. `Pointer`, `Address`, `Prepare` and `Execute` take none. The
//! three penalty steps take one cycle or none, decided when they reach the
//! front of the queue.

/// Which byte of a 24-bit value a step moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Byte {
    Lo,
    Hi,
    Bank,
}

impl Byte {
    pub const fn shift(self) -> u32 {
        match self {
            Byte::Lo => 0,
            Byte::Hi => 8,
            Byte::Bank => 16,
        }
    }

    pub const fn offset(self) -> u32 {
        self.shift() / 8
    }
}

/// One step of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Read an operand byte at PBR:PC, increment PC.
    Operand(Byte),
    /// Read an immediate data byte at PBR:PC, increment PC.
    Immediate(Byte),
    /// Internal operation.
    Io,
    /// Internal operation when the low byte of D is non-zero.
    DirectPenalty,
    /// Internal operation for writes, 16-bit index registers, and reads
    /// whose indexing carries into the next page.
    IndexPenalty,
    /// Internal operation when an emulation-mode branch changes page.
    BranchPenalty,
    /// Form the indirect pointer address.
    Pointer,
    /// Read a byte of the indirect address.
    Indirect(Byte),
    /// Form the effective data address.
    Address,
    /// Read a data byte.
    Read(Byte),
    /// Write a data byte.
    Write(Byte),
    /// Read-modify-write modify cycle.
    Modify,
    /// Push a byte of `data`.
    Push(Byte),
    /// Pull a byte into `data`.
    Pull(Byte),
    /// Push PBR.
    PushBank,
    /// Push P, choosing the interrupt vector.
    PushStatus,
    /// Pull P, applying width changes at once.
    PullStatus,
    /// Read a byte of the interrupt vector.
    Vector(Byte),
    /// MVN/MVP source read.
    BlockRead,
    /// MVN/MVP destination write.
    BlockWrite,
    /// Load `data` with what the instruction pushes or stores.
    Prepare,
    /// Finish the operation.
    Execute,
}

impl Step {
    /// True for bookkeeping steps that never take a cycle.
    pub const fn is_free(self) -> bool {
        matches!(
            self,
            Step::Pointer | Step::Address | Step::Prepare | Step::Execute
        )
    }
}

/// Queue of pending micro-steps.
/// Fixed size to avoid allocation.
#[derive(Debug, Clone)]
pub struct StepQueue {
    steps: [Step; 16],
    len: u8,
    pos: u8,
}

impl Default for StepQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl StepQueue {
    pub const fn new() -> Self {
        Self {
            steps: [Step::Io; 16],
            len: 0,
            pos: 0,
        }
    }

    /// Clear the queue and start fresh.
    pub fn clear(&mut self) {
        self.len = 0;
        self.pos = 0;
    }

    pub fn push(&mut self, step: Step) {
        debug_assert!((self.len as usize) < self.steps.len(), "step queue overflow");
        self.steps[self.len as usize] = step;
        self.len += 1;
    }

    pub fn extend(&mut self, steps: &[Step]) {
        for &step in steps {
            self.push(step);
        }
    }

    pub fn current(&self) -> Option<Step> {
        if self.pos < self.len {
            Some(self.steps[self.pos as usize])
        } else {
            None
        }
    }

    pub fn advance(&mut self) {
        if self.pos < self.len {
            self.pos += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_run_in_order() {
        let mut queue = StepQueue::new();
        queue.extend(&[Step::Operand(Byte::Lo), Step::Address, Step::Read(Byte::Lo)]);
        assert_eq!(queue.current(), Some(Step::Operand(Byte::Lo)));
        queue.advance();
        assert!(queue.current().is_some_and(Step::is_free));
        queue.advance();
        queue.advance();
        assert!(queue.is_empty());
        queue.advance();
        assert_eq!(queue.current(), None);
    }

    #[test]
    fn byte_offsets() {
        assert_eq!(Byte::Hi.shift(), 8);
        assert_eq!(Byte::Bank.offset(), 2);
    }
}
