//! Host-side talker sequencing.
//!
//! Drives the host lines the way a KERNAL serial routine does, stepping
//! the bus one cycle at a time while it waits on the listener.

use crate::{Phase, SerialBus, SerialBusError, Signal};

/// Walks the host through attention, byte transfer and release.
///
/// Every method returns the number of bus cycles it consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TalkerDriver {
    /// Cycles DATA is held before CLK is released for each bit.
    pub setup: u32,
    /// Longest the driver waits for any one line change.
    pub patience: u32,
}

impl Default for TalkerDriver {
    fn default() -> Self {
        Self {
            setup: 20,
            patience: 10_000,
        }
    }
}

impl TalkerDriver {
    /// Pull ATN and CLK, then wait for the listener to pull DATA.
    pub fn attention(&self, bus: &mut SerialBus) -> Result<u32, SerialBusError> {
        if bus.phase() != Phase::Idle {
            return Err(SerialBusError::OutOfSequence {
                expected: Phase::Idle,
                actual: bus.phase(),
            });
        }
        bus.set_host_data(false);
        bus.set_host_atn(true);
        bus.set_host_clock(true);
        self.wait_for(bus, Signal::Data, false)
    }

    /// Send one byte, LSB first, and wait for the listener's acknowledge.
    pub fn send_byte(&self, bus: &mut SerialBus, byte: u8) -> Result<u32, SerialBusError> {
        if bus.phase() != Phase::ListenerReady {
            return Err(SerialBusError::OutOfSequence {
                expected: Phase::ListenerReady,
                actual: bus.phase(),
            });
        }

        // Ready to send; the listener answers by releasing DATA.
        bus.set_host_clock(false);
        let mut cycles = self.wait_for(bus, Signal::Data, true)?;

        for bit in 0..8 {
            bus.set_host_clock(true);
            bus.set_host_data(byte & (1 << bit) == 0);
            bus.advance(self.setup)?;
            cycles += self.setup;
            bus.set_host_clock(false);
            cycles += self.wait_for(bus, Signal::Clock, false)?;
            cycles += self.wait_for(bus, Signal::Clock, true)?;
        }

        bus.set_host_clock(true);
        bus.set_host_data(false);
        cycles += self.wait_for(bus, Signal::Data, false)?;
        Ok(cycles)
    }

    /// Let go of every host line.
    pub fn release(&self, bus: &mut SerialBus) {
        bus.set_host_atn(false);
        bus.set_host_clock(false);
        bus.set_host_data(false);
    }

    fn wait_for(
        &self,
        bus: &mut SerialBus,
        signal: Signal,
        high: bool,
    ) -> Result<u32, SerialBusError> {
        let mut waited = 0;
        while bus.level(signal) != high {
            if waited >= self.patience {
                return Err(SerialBusError::LineStuck {
                    signal,
                    expected_high: high,
                    waited,
                });
            }
            bus.advance(1)?;
            waited += 1;
        }
        Ok(waited)
    }
}
