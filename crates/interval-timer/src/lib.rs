//! Programmable interval timer.
//!
//! A 16-bit down-counter with a reload latch, in the style of the timers
//! inside the 6522 VIA and the 6526/8520 CIA. The counter decrements once
//! per clock, or once every eight clocks in divide-by-8 mode. On underflow
//! it either reloads from the latch (continuous) or parks at `0xFFFF` and
//! stops (one-shot), setting the underflow flag either way.
//!
//! # Registers
//!
//! | Reg | Read          | Write                                         |
//! |-----|---------------|-----------------------------------------------|
//! | $0  | counter low   | latch low                                     |
//! | $1  | counter high  | latch high, load counter, start, clear flag   |
//! | $2  | latch low     | latch low                                     |
//! | $3  | latch high    | latch high only                               |
//! | $4  | control       | control                                       |
//! | $5  | status (read clears flag) | write 1s to clear flag            |
//!
//! Control bits: 0 start, 1 continuous, 2 divide-by-8, 3 IRQ enable,
//! 4 force load (strobe, reads back as 0).
//!
//! Status bits: 0 underflow flag, 7 IRQ output.

use emu_core::{Observable, Tickable, Ticks, Value};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const REG_COUNTER_LO: u8 = 0;
pub const REG_COUNTER_HI: u8 = 1;
pub const REG_LATCH_LO: u8 = 2;
pub const REG_LATCH_HI: u8 = 3;
pub const REG_CONTROL: u8 = 4;
pub const REG_STATUS: u8 = 5;

/// Control register: counting enabled.
pub const CTRL_START: u8 = 0x01;
/// Control register: reload on underflow instead of stopping.
pub const CTRL_CONTINUOUS: u8 = 0x02;
/// Control register: decrement once every eight clocks.
pub const CTRL_DIVIDE_BY_8: u8 = 0x04;
/// Control register: drive the IRQ output while the underflow flag is set.
pub const CTRL_IRQ_ENABLE: u8 = 0x08;
/// Control register: copy the latch into the counter now.
pub const CTRL_FORCE_LOAD: u8 = 0x10;

/// Status register: the counter has underflowed since the flag was cleared.
pub const STATUS_UNDERFLOW: u8 = 0x01;
/// Status register: IRQ output asserted.
pub const STATUS_IRQ: u8 = 0x80;

const PRESCALE: u8 = 8;

/// Power-on settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Latch and counter value after construction or reset.
    pub reset_latch: u16,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            reset_latch: 0xFFFF,
        }
    }
}

/// 16-bit interval timer.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    config: TimerConfig,
    counter: u16,
    latch: u16,
    /// Control bits, without the force-load strobe.
    control: u8,
    /// Clocks seen since the last divided decrement.
    prescaler: u8,
    underflow: bool,
}

impl IntervalTimer {
    #[must_use]
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            counter: config.reset_latch,
            latch: config.reset_latch,
            control: 0,
            prescaler: 0,
            underflow: false,
        }
    }

    /// Return to power-on state.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Advance by `cycles` clocks.
    pub fn advance(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock();
        }
    }

    fn clock(&mut self) {
        if self.control & CTRL_START == 0 {
            return;
        }

        if self.control & CTRL_DIVIDE_BY_8 != 0 {
            self.prescaler += 1;
            if self.prescaler < PRESCALE {
                return;
            }
            self.prescaler = 0;
        }

        let (value, underflow) = self.counter.overflowing_sub(1);
        self.counter = value;

        if underflow {
            self.underflow = true;
            if self.control & CTRL_CONTINUOUS != 0 {
                self.counter = self.latch;
                trace!(latch = self.latch, "timer underflow, reload");
            } else {
                // One-shot: park at $FFFF until software reloads.
                self.control &= !CTRL_START;
                trace!("timer underflow, stopped");
            }
        }
    }

    /// Read a register. Reading status clears the underflow flag.
    pub fn read_register(&mut self, index: u8) -> u8 {
        match index {
            REG_COUNTER_LO => self.counter as u8,
            REG_COUNTER_HI => (self.counter >> 8) as u8,
            REG_LATCH_LO => self.latch as u8,
            REG_LATCH_HI => (self.latch >> 8) as u8,
            REG_CONTROL => self.control,
            REG_STATUS => {
                let status = self.status();
                self.underflow = false;
                status
            }
            _ => 0xFF,
        }
    }

    /// Write a register.
    pub fn write_register(&mut self, index: u8, value: u8) {
        match index {
            REG_COUNTER_LO | REG_LATCH_LO => {
                self.latch = (self.latch & 0xFF00) | u16::from(value);
            }
            REG_COUNTER_HI => {
                self.latch = (self.latch & 0x00FF) | (u16::from(value) << 8);
                self.counter = self.latch;
                self.prescaler = 0;
                self.underflow = false;
                self.control |= CTRL_START;
            }
            REG_LATCH_HI => {
                self.latch = (self.latch & 0x00FF) | (u16::from(value) << 8);
            }
            REG_CONTROL => self.write_control(value),
            REG_STATUS => {
                if value & STATUS_UNDERFLOW != 0 {
                    self.underflow = false;
                }
            }
            _ => {}
        }
    }

    fn write_control(&mut self, value: u8) {
        if value & CTRL_FORCE_LOAD != 0 {
            self.counter = self.latch;
        }
        // A prescale change keeps the visible count; only the sub-count restarts.
        if (value ^ self.control) & CTRL_DIVIDE_BY_8 != 0 {
            self.prescaler = 0;
        }
        self.control = value & !CTRL_FORCE_LOAD;
    }

    /// Status byte without the read side effect.
    #[must_use]
    pub fn status(&self) -> u8 {
        let mut status = 0;
        if self.underflow {
            status |= STATUS_UNDERFLOW;
        }
        if self.irq() {
            status |= STATUS_IRQ;
        }
        status
    }

    /// IRQ output line (true = asserted).
    #[must_use]
    pub fn irq(&self) -> bool {
        self.underflow && self.control & CTRL_IRQ_ENABLE != 0
    }

    #[must_use]
    pub fn counter(&self) -> u16 {
        self.counter
    }

    #[must_use]
    pub fn latch(&self) -> u16 {
        self.latch
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.control & CTRL_START != 0
    }
}

impl Default for IntervalTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl Tickable for IntervalTimer {
    fn tick(&mut self) {
        self.clock();
    }

    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.clock();
        }
    }
}

impl Observable for IntervalTimer {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "counter" => Some(self.counter.into()),
            "latch" => Some(self.latch.into()),
            "control" => Some(self.control.into()),
            "prescaler" => Some(self.prescaler.into()),
            "running" => Some(self.is_running().into()),
            "underflow" => Some(self.underflow.into()),
            "irq" => Some(self.irq().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "counter",
            "latch",
            "control",
            "prescaler",
            "running",
            "underflow",
            "irq",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(value: u16, control: u8) -> IntervalTimer {
        let mut timer = IntervalTimer::default();
        timer.write_register(REG_CONTROL, control & !CTRL_START);
        timer.write_register(REG_COUNTER_LO, value as u8);
        timer.write_register(REG_COUNTER_HI, (value >> 8) as u8);
        timer
    }

    #[test]
    fn high_byte_write_loads_and_starts() {
        let timer = started(0x1234, 0);
        assert!(timer.is_running());
        assert_eq!(timer.counter(), 0x1234);
        assert_eq!(timer.latch(), 0x1234);
    }

    #[test]
    fn continuous_round_trip() {
        let mut timer = started(5, CTRL_CONTINUOUS);
        timer.advance(5);
        assert_eq!(timer.counter(), 0);
        assert_eq!(timer.status() & STATUS_UNDERFLOW, 0);

        timer.advance(1);
        assert_eq!(timer.counter(), 5);
        assert_ne!(timer.status() & STATUS_UNDERFLOW, 0);
        assert!(timer.is_running());

        // Period is latch + 1.
        timer.read_register(REG_STATUS);
        timer.advance(6);
        assert_eq!(timer.counter(), 5);
        assert_ne!(timer.status() & STATUS_UNDERFLOW, 0);
    }

    #[test]
    fn one_shot_parks_at_all_ones() {
        let mut timer = started(5, 0);
        timer.advance(5);
        assert_eq!(timer.counter(), 0);

        timer.advance(1);
        assert_eq!(timer.counter(), 0xFFFF);
        assert!(!timer.is_running());

        timer.advance(100);
        assert_eq!(timer.counter(), 0xFFFF);

        // Reloading restarts it.
        timer.write_register(REG_COUNTER_HI, 0);
        assert_eq!(timer.counter(), 5);
        assert!(timer.is_running());
    }

    #[test]
    fn divide_by_8_counts_every_eighth_clock() {
        let mut timer = started(3, CTRL_DIVIDE_BY_8 | CTRL_CONTINUOUS);
        timer.advance(7);
        assert_eq!(timer.counter(), 3);
        timer.advance(1);
        assert_eq!(timer.counter(), 2);
        timer.advance(16);
        assert_eq!(timer.counter(), 0);
        timer.advance(8);
        assert_eq!(timer.counter(), 3);
        assert_ne!(timer.status() & STATUS_UNDERFLOW, 0);
    }

    #[test]
    fn switching_prescale_keeps_count_and_restarts_sub_count() {
        let mut timer = started(100, CTRL_CONTINUOUS);
        timer.advance(10);
        assert_eq!(timer.counter(), 90);

        timer.write_register(REG_CONTROL, CTRL_START | CTRL_CONTINUOUS | CTRL_DIVIDE_BY_8);
        assert_eq!(timer.counter(), 90);
        timer.advance(7);
        assert_eq!(timer.counter(), 90);
        timer.advance(1);
        assert_eq!(timer.counter(), 89);

        // Partway into a divided step, switch back: the count stays, the
        // five sub-count clocks are dropped.
        timer.advance(5);
        timer.write_register(REG_CONTROL, CTRL_START | CTRL_CONTINUOUS);
        assert_eq!(timer.counter(), 89);
        timer.advance(3);
        assert_eq!(timer.counter(), 86);

        // And into divide-by-8 again: a full eight clocks before the next step.
        timer.write_register(REG_CONTROL, CTRL_START | CTRL_CONTINUOUS | CTRL_DIVIDE_BY_8);
        timer.advance(7);
        assert_eq!(timer.counter(), 86);
        timer.advance(1);
        assert_eq!(timer.counter(), 85);
    }

    #[test]
    fn irq_follows_enable_and_status_read_clears() {
        let mut timer = started(1, CTRL_IRQ_ENABLE | CTRL_CONTINUOUS);
        timer.advance(2);
        assert!(timer.irq());
        assert_eq!(timer.read_register(REG_STATUS), STATUS_UNDERFLOW | STATUS_IRQ);
        assert!(!timer.irq());
        assert_eq!(timer.read_register(REG_STATUS), 0);
    }

    #[test]
    fn underflow_without_enable_does_not_interrupt() {
        let mut timer = started(0, CTRL_CONTINUOUS);
        timer.advance(1);
        assert!(!timer.irq());
        assert_eq!(timer.status(), STATUS_UNDERFLOW);
        timer.write_register(REG_STATUS, STATUS_UNDERFLOW);
        assert_eq!(timer.status(), 0);
    }

    #[test]
    fn force_load_copies_latch() {
        let mut timer = started(50, CTRL_CONTINUOUS);
        timer.advance(20);
        timer.write_register(REG_LATCH_LO, 0x00);
        timer.write_register(REG_LATCH_HI, 0x02);
        assert_eq!(timer.counter(), 30);
        timer.write_register(REG_CONTROL, CTRL_START | CTRL_CONTINUOUS | CTRL_FORCE_LOAD);
        assert_eq!(timer.counter(), 0x0200);
        assert_eq!(timer.read_register(REG_CONTROL) & CTRL_FORCE_LOAD, 0);
    }

    #[test]
    fn stopped_timer_holds() {
        let mut timer = started(10, 0);
        timer.write_register(REG_CONTROL, 0);
        timer.advance(50);
        assert_eq!(timer.counter(), 10);
    }

    #[test]
    fn tickable_matches_advance() {
        let mut a = started(300, CTRL_DIVIDE_BY_8 | CTRL_CONTINUOUS);
        let mut b = a.clone();
        a.advance(1000);
        b.tick_n(Ticks::new(1000));
        assert_eq!(a.counter(), b.counter());
    }
}
