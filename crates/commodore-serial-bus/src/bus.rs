//! Listener-side handshake state machine.
//!
//! The host drives its side of the lines through the `set_host_*` setters.
//! Each setter compares against what the host was already doing, so only
//! genuine edges reach the state machine, and an edge is acted on only in
//! the phase that waits for it. The device reacts after its configured
//! latency; meanwhile a watchdog counts cycles since the triggering edge.
//!
//! ```text
//! Idle --ATN+CLK low--> AttentionAsserted --device DATA low--> ListenerReady
//! ListenerReady --host CLK release, device DATA release--> BitTransfer(0)
//! BitTransfer(n) --host CLK release, device CLK low, latch, release--> BitTransfer(n+1)
//! BitTransfer(7) --...--> ByteAcknowledge --host CLK low, device DATA low--> ListenerReady
//! any --ATN release--> Idle
//! ```

use std::fmt;

use emu_core::{Observable, Value};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::{LineLevels, Party, SerialBusError, Signal};

/// Handshake phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    /// ATN is low; waiting for the listener to pull DATA.
    AttentionAsserted,
    /// Listener holds DATA low, waiting for the talker to release CLK.
    ListenerReady,
    /// Transferring bit `n` (0 = LSB).
    BitTransfer(u8),
    /// All 8 bits latched; waiting for the talker to pull CLK.
    ByteAcknowledge,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::AttentionAsserted => f.write_str("attention asserted"),
            Phase::ListenerReady => f.write_str("listener ready"),
            Phase::BitTransfer(bit) => write!(f, "bit transfer {bit}"),
            Phase::ByteAcknowledge => f.write_str("byte acknowledge"),
        }
    }
}

/// What [`SerialBus::status`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusStatus {
    /// Nothing outstanding.
    Ready,
    /// The host made an edge and the device has not answered yet.
    AwaitingDevice,
    /// The device missed its acknowledge window. Cleared by ATN release.
    Timeout,
}

/// Listener response times, in bus cycles. Zero is treated as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTiming {
    /// A device is attached and answers at all.
    pub present: bool,
    /// ATN+CLK to DATA low, and final CLK low to byte acknowledge.
    pub response_latency: u32,
    /// Host CLK release to the device's answer.
    pub ack_latency: u32,
    /// How long the device holds CLK low after latching a bit.
    pub ack_hold: u32,
}

impl Default for DeviceTiming {
    fn default() -> Self {
        Self {
            present: true,
            response_latency: 60,
            ack_latency: 20,
            ack_hold: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialBusConfig {
    /// Cycles the device may take to answer an edge before it times out.
    pub acknowledge_window: u32,
    pub device: DeviceTiming,
}

impl Default for SerialBusConfig {
    fn default() -> Self {
        Self {
            acknowledge_window: 1000,
            device: DeviceTiming::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceAction {
    Listen,
    ReadyForData,
    LatchBit,
    ReleaseClock,
    AcknowledgeByte,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    remaining: u32,
    action: DeviceAction,
}

/// Serial bus with one listener device attached.
#[derive(Debug, Clone)]
pub struct SerialBus {
    config: SerialBusConfig,
    lines: LineLevels,
    phase: Phase,
    scheduled: Option<Scheduled>,
    /// Cycles since the host edge the device still owes an answer to.
    watchdog: Option<u32>,
    timed_out: bool,
    shift: u8,
    received: Vec<u8>,
}

impl SerialBus {
    #[must_use]
    pub fn new(config: SerialBusConfig) -> Self {
        Self {
            config,
            lines: LineLevels::new(),
            phase: Phase::Idle,
            scheduled: None,
            watchdog: None,
            timed_out: false,
            shift: 0,
            received: Vec::with_capacity(64),
        }
    }

    // --- Host side ---

    /// Set whether the host pulls ATN low.
    pub fn set_host_atn(&mut self, pull_low: bool) {
        if !self.host_edge(Signal::Atn, pull_low) {
            return;
        }
        if pull_low {
            if self.phase == Phase::Idle {
                self.set_phase(Phase::AttentionAsserted);
                self.arm_listen();
            }
        } else {
            self.release_device();
        }
    }

    /// Set whether the host pulls CLK low.
    pub fn set_host_clock(&mut self, pull_low: bool) {
        if !self.host_edge(Signal::Clock, pull_low) {
            return;
        }
        if self.scheduled.is_some() {
            trace!(phase = %self.phase, "host CLK edge while device busy, ignored");
            return;
        }
        match (self.phase, pull_low) {
            (Phase::AttentionAsserted, true) => self.arm_listen(),
            (Phase::ListenerReady, false) => {
                self.expect_device(DeviceAction::ReadyForData, self.config.device.ack_latency);
            }
            (Phase::BitTransfer(_), false) => {
                self.expect_device(DeviceAction::LatchBit, self.config.device.ack_latency);
            }
            (Phase::ByteAcknowledge, true) => {
                self.expect_device(
                    DeviceAction::AcknowledgeByte,
                    self.config.device.response_latency,
                );
            }
            _ => {}
        }
    }

    /// Set whether the host pulls DATA low. The device samples DATA, so no
    /// edge of its own drives the handshake.
    pub fn set_host_data(&mut self, pull_low: bool) {
        self.lines.pull(Party::Host, Signal::Data, pull_low);
    }

    /// Record a host pull and report whether it changed.
    fn host_edge(&mut self, signal: Signal, pull_low: bool) -> bool {
        let was = self.lines.is_pulling(Party::Host, signal);
        self.lines.pull(Party::Host, signal, pull_low);
        was != pull_low
    }

    // --- Line state (true = high) ---

    #[must_use]
    pub fn atn(&self) -> bool {
        self.lines.atn()
    }

    #[must_use]
    pub fn clock(&self) -> bool {
        self.lines.clock()
    }

    #[must_use]
    pub fn data(&self) -> bool {
        self.lines.data()
    }

    #[must_use]
    pub fn level(&self, signal: Signal) -> bool {
        self.lines.level(signal)
    }

    #[must_use]
    pub fn lines(&self) -> &LineLevels {
        &self.lines
    }

    // --- Handshake ---

    /// Advance by `cycles` bus cycles.
    ///
    /// An acknowledge timeout is reported once, after all cycles have
    /// elapsed. The bus keeps reporting [`BusStatus::Timeout`] until the host
    /// releases ATN.
    pub fn advance(&mut self, cycles: u32) -> Result<(), SerialBusError> {
        let mut result = Ok(());
        for _ in 0..cycles {
            if let Some(mut scheduled) = self.scheduled.take() {
                scheduled.remaining -= 1;
                if scheduled.remaining == 0 {
                    self.perform(scheduled.action);
                } else {
                    self.scheduled = Some(scheduled);
                }
            }

            if let Some(waited) = self.watchdog {
                let waited = waited + 1;
                if waited > self.config.acknowledge_window {
                    warn!(phase = %self.phase, waited, "serial bus acknowledge timeout");
                    self.watchdog = None;
                    self.timed_out = true;
                    result = Err(SerialBusError::AcknowledgeTimeout {
                        phase: self.phase,
                        waited,
                    });
                } else {
                    self.watchdog = Some(waited);
                }
            }
        }
        result
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn status(&self) -> BusStatus {
        if self.timed_out {
            BusStatus::Timeout
        } else if self.watchdog.is_some() {
            BusStatus::AwaitingDevice
        } else {
            BusStatus::Ready
        }
    }

    /// Bytes the device has acknowledged, oldest first.
    #[must_use]
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Drain the received bytes.
    pub fn take_received(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.received)
    }

    #[must_use]
    pub fn config(&self) -> &SerialBusConfig {
        &self.config
    }

    /// Return to power-on state: lines released, nothing received.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    fn arm_listen(&mut self) {
        if self.phase == Phase::AttentionAsserted
            && self.lines.is_pulling(Party::Host, Signal::Clock)
            && self.scheduled.is_none()
            && self.watchdog.is_none()
        {
            self.expect_device(DeviceAction::Listen, self.config.device.response_latency);
        }
    }

    /// Start the watchdog and schedule the device's answer.
    fn expect_device(&mut self, action: DeviceAction, latency: u32) {
        if !self.timed_out {
            self.watchdog = Some(0);
        }
        self.schedule(action, latency);
    }

    fn schedule(&mut self, action: DeviceAction, latency: u32) {
        if self.config.device.present {
            self.scheduled = Some(Scheduled {
                remaining: latency.max(1),
                action,
            });
        }
    }

    fn perform(&mut self, action: DeviceAction) {
        match action {
            DeviceAction::Listen => {
                self.watchdog = None;
                self.lines.pull(Party::Device, Signal::Data, true);
                self.set_phase(Phase::ListenerReady);
            }
            DeviceAction::ReadyForData => {
                self.watchdog = None;
                self.lines.pull(Party::Device, Signal::Data, false);
                self.shift = 0;
                self.set_phase(Phase::BitTransfer(0));
            }
            DeviceAction::LatchBit => {
                self.watchdog = None;
                if let Phase::BitTransfer(bit) = self.phase {
                    if self.lines.data() {
                        self.shift |= 1 << bit;
                    }
                }
                self.lines.pull(Party::Device, Signal::Clock, true);
                self.schedule(DeviceAction::ReleaseClock, self.config.device.ack_hold);
            }
            DeviceAction::ReleaseClock => {
                self.lines.pull(Party::Device, Signal::Clock, false);
                let next = match self.phase {
                    Phase::BitTransfer(bit) if bit < 7 => Phase::BitTransfer(bit + 1),
                    _ => Phase::ByteAcknowledge,
                };
                self.set_phase(next);
            }
            DeviceAction::AcknowledgeByte => {
                self.watchdog = None;
                self.lines.pull(Party::Device, Signal::Data, true);
                trace!(byte = self.shift, "serial bus byte received");
                self.received.push(self.shift);
                self.set_phase(Phase::ListenerReady);
            }
        }
    }

    /// ATN released: the device lets go and the handshake starts over.
    fn release_device(&mut self) {
        self.scheduled = None;
        self.watchdog = None;
        self.timed_out = false;
        self.lines.release_all(Party::Device);
        self.set_phase(Phase::Idle);
    }

    fn set_phase(&mut self, phase: Phase) {
        if phase != self.phase {
            trace!(from = %self.phase, to = %phase, "serial bus phase");
            self.phase = phase;
        }
    }
}

impl Default for SerialBus {
    fn default() -> Self {
        Self::new(SerialBusConfig::default())
    }
}

impl Observable for SerialBus {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "atn" => Some(self.atn().into()),
            "clock" => Some(self.clock().into()),
            "data" => Some(self.data().into()),
            "timeout" => Some(self.timed_out.into()),
            "received" => Some((self.received.len() as u32).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["atn", "clock", "data", "timeout", "received"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(response: u32, ack: u32, hold: u32) -> SerialBusConfig {
        SerialBusConfig {
            acknowledge_window: 100,
            device: DeviceTiming {
                present: true,
                response_latency: response,
                ack_latency: ack,
                ack_hold: hold,
            },
        }
    }

    fn attention(bus: &mut SerialBus) {
        bus.set_host_atn(true);
        bus.set_host_clock(true);
    }

    #[test]
    fn device_answers_attention_after_latency() {
        let mut bus = SerialBus::new(timing(30, 5, 5));
        attention(&mut bus);
        assert_eq!(bus.phase(), Phase::AttentionAsserted);
        assert_eq!(bus.status(), BusStatus::AwaitingDevice);

        bus.advance(29).unwrap();
        assert!(bus.data());
        bus.advance(1).unwrap();
        assert!(!bus.data());
        assert_eq!(bus.phase(), Phase::ListenerReady);
        assert_eq!(bus.status(), BusStatus::Ready);
    }

    #[test]
    fn attention_waits_for_clock() {
        let mut bus = SerialBus::new(timing(30, 5, 5));
        bus.set_host_atn(true);
        bus.advance(500).unwrap();
        assert_eq!(bus.phase(), Phase::AttentionAsserted);
        assert_eq!(bus.status(), BusStatus::Ready);
        assert!(bus.data());

        bus.set_host_clock(true);
        bus.advance(30).unwrap();
        assert_eq!(bus.phase(), Phase::ListenerReady);
    }

    #[test]
    fn missing_device_times_out_once() {
        let mut config = timing(30, 5, 5);
        config.device.present = false;
        let mut bus = SerialBus::new(config);
        attention(&mut bus);

        bus.advance(100).unwrap();
        assert_eq!(
            bus.advance(1),
            Err(SerialBusError::AcknowledgeTimeout {
                phase: Phase::AttentionAsserted,
                waited: 101,
            })
        );
        assert_eq!(bus.status(), BusStatus::Timeout);
        bus.advance(1000).unwrap();
        assert_eq!(bus.status(), BusStatus::Timeout);

        bus.set_host_atn(false);
        assert_eq!(bus.status(), BusStatus::Ready);
        assert_eq!(bus.phase(), Phase::Idle);
    }

    #[test]
    fn slow_device_misses_window() {
        let mut bus = SerialBus::new(timing(150, 5, 5));
        attention(&mut bus);
        let err = bus.advance(120).unwrap_err();
        assert!(matches!(
            err,
            SerialBusError::AcknowledgeTimeout { waited: 101, .. }
        ));
        // It still answers eventually; the timeout stays latched.
        bus.advance(30).unwrap();
        assert_eq!(bus.phase(), Phase::ListenerReady);
        assert_eq!(bus.status(), BusStatus::Timeout);
    }

    #[test]
    fn clock_edges_in_idle_are_ignored() {
        let mut bus = SerialBus::new(timing(10, 5, 5));
        bus.set_host_clock(true);
        bus.set_host_clock(false);
        bus.advance(50).unwrap();
        assert_eq!(bus.phase(), Phase::Idle);
        assert_eq!(bus.status(), BusStatus::Ready);
        assert!(bus.data());
        assert!(bus.clock());
    }

    #[test]
    fn repeated_setter_is_not_an_edge() {
        let mut bus = SerialBus::new(timing(10, 5, 5));
        attention(&mut bus);
        bus.advance(10).unwrap();
        bus.set_host_clock(true);
        bus.advance(50).unwrap();
        assert_eq!(bus.phase(), Phase::ListenerReady);
    }

    #[test]
    fn single_bit_is_latched_and_released() {
        let mut bus = SerialBus::new(timing(10, 5, 8));
        attention(&mut bus);
        bus.advance(10).unwrap();

        // Ready to send.
        bus.set_host_clock(false);
        bus.advance(5).unwrap();
        assert_eq!(bus.phase(), Phase::BitTransfer(0));
        assert!(bus.data());

        // Bit 0 = 1: DATA left high, CLK released.
        bus.set_host_clock(true);
        bus.advance(3).unwrap();
        bus.set_host_clock(false);
        assert!(bus.clock());
        bus.advance(5).unwrap();
        assert!(!bus.clock());
        bus.advance(7).unwrap();
        assert!(!bus.clock());
        bus.advance(1).unwrap();
        assert!(bus.clock());
        assert_eq!(bus.phase(), Phase::BitTransfer(1));
    }

    #[test]
    fn atn_release_mid_byte_resets() {
        let mut bus = SerialBus::new(timing(10, 5, 50));
        attention(&mut bus);
        bus.advance(10).unwrap();
        bus.set_host_clock(false);
        bus.advance(5).unwrap();
        bus.set_host_clock(true);
        bus.set_host_clock(false);
        bus.advance(5).unwrap();
        assert!(!bus.clock());

        bus.set_host_atn(false);
        assert_eq!(bus.phase(), Phase::Idle);
        assert!(bus.clock());
        assert!(bus.data());
        bus.advance(100).unwrap();
        assert!(bus.received().is_empty());
    }
}
