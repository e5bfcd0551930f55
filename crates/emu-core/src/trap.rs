//! Trap addresses checked at each opcode-fetch boundary.
//!
//! A host uses traps to intercept "system calls" (e.g. a CP/M BDOS entry
//! point), to stop on a test's success loop, or to catch a runaway program.
//! The check happens before the opcode at that address is fetched, so a
//! trapped instruction has not executed when control returns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What the run loop does when an instruction boundary is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrapOutcome {
    /// Keep executing.
    #[default]
    Continue,
    /// Return control to the host. The core is left at the boundary and
    /// resumes normally once the host moves PC or drops the trap.
    Trap,
    /// Stop the core as if it had jammed. Only a reset restarts it.
    Halt,
}

/// Host-supplied predicate evaluated at every opcode-fetch boundary.
pub trait TrapPredicate {
    fn check(&mut self, address: u32) -> TrapOutcome;
}

impl<F> TrapPredicate for F
where
    F: FnMut(u32) -> TrapOutcome,
{
    fn check(&mut self, address: u32) -> TrapOutcome {
        self(address)
    }
}

/// Fixed table of trap addresses, part of a core's configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapTable {
    entries: BTreeMap<u32, TrapOutcome>,
}

impl TrapTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, address: u32, outcome: TrapOutcome) -> Self {
        self.insert(address, outcome);
        self
    }

    /// Register an address. `Continue` removes it.
    pub fn insert(&mut self, address: u32, outcome: TrapOutcome) {
        if outcome == TrapOutcome::Continue {
            self.entries.remove(&address);
        } else {
            self.entries.insert(address, outcome);
        }
    }

    pub fn remove(&mut self, address: u32) {
        self.entries.remove(&address);
    }

    #[must_use]
    pub fn lookup(&self, address: u32) -> TrapOutcome {
        self.entries.get(&address).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TrapPredicate for TrapTable {
    fn check(&mut self, address: u32) -> TrapOutcome {
        self.lookup(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lookup() {
        let table = TrapTable::new()
            .with(0x0005, TrapOutcome::Trap)
            .with(0x3469, TrapOutcome::Halt);
        assert_eq!(table.lookup(0x0005), TrapOutcome::Trap);
        assert_eq!(table.lookup(0x3469), TrapOutcome::Halt);
        assert_eq!(table.lookup(0x0000), TrapOutcome::Continue);
    }

    #[test]
    fn inserting_continue_removes() {
        let mut table = TrapTable::new().with(0x10, TrapOutcome::Trap);
        table.insert(0x10, TrapOutcome::Continue);
        assert!(table.is_empty());
    }

    #[test]
    fn closures_are_predicates() {
        let mut hits = 0;
        let mut predicate = |address: u32| {
            hits += 1;
            if address >= 0xFF00 {
                TrapOutcome::Halt
            } else {
                TrapOutcome::Continue
            }
        };
        assert_eq!(predicate.check(0xFF10), TrapOutcome::Halt);
        assert_eq!(predicate.check(0x0200), TrapOutcome::Continue);
        assert_eq!(hits, 2);
    }
}
