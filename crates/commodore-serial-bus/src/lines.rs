//! Open-collector ATN, CLK and DATA lines.
//!
//! Each participant can independently pull a line low. A line reads high
//! only when nobody pulls it low, as on real hardware where each line has
//! a pull-up resistor and any device can ground it.

use std::fmt;

/// One of the two actors on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// The computer, acting as talker.
    Host,
    /// The attached peripheral, acting as listener.
    Device,
}

impl Party {
    const fn index(self) -> usize {
        match self {
            Party::Host => 0,
            Party::Device => 1,
        }
    }
}

/// A bus line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Atn,
    Clock,
    Data,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Atn => "ATN",
            Signal::Clock => "CLK",
            Signal::Data => "DATA",
        })
    }
}

/// Pull-downs on each line: `[host, device]`. `true` = pulling low.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineLevels {
    atn_pulls: [bool; 2],
    clk_pulls: [bool; 2],
    data_pulls: [bool; 2],
}

impl LineLevels {
    /// All lines released (high).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pulls(&self, signal: Signal) -> &[bool; 2] {
        match signal {
            Signal::Atn => &self.atn_pulls,
            Signal::Clock => &self.clk_pulls,
            Signal::Data => &self.data_pulls,
        }
    }

    /// Set whether `party` pulls `signal` low.
    pub fn pull(&mut self, party: Party, signal: Signal, pull_low: bool) {
        let pulls = match signal {
            Signal::Atn => &mut self.atn_pulls,
            Signal::Clock => &mut self.clk_pulls,
            Signal::Data => &mut self.data_pulls,
        };
        pulls[party.index()] = pull_low;
    }

    /// Whether `party` is currently pulling `signal` low.
    #[must_use]
    pub fn is_pulling(&self, party: Party, signal: Signal) -> bool {
        self.pulls(signal)[party.index()]
    }

    /// Line state (true = high). High when nobody pulls it low.
    #[must_use]
    pub fn level(&self, signal: Signal) -> bool {
        let [host, device] = *self.pulls(signal);
        !host && !device
    }

    #[must_use]
    pub fn atn(&self) -> bool {
        self.level(Signal::Atn)
    }

    #[must_use]
    pub fn clock(&self) -> bool {
        self.level(Signal::Clock)
    }

    #[must_use]
    pub fn data(&self) -> bool {
        self.level(Signal::Data)
    }

    /// Let go of every line `party` is holding.
    pub fn release_all(&mut self, party: Party) {
        for signal in [Signal::Atn, Signal::Clock, Signal::Data] {
            self.pull(party, signal, false);
        }
    }
}
