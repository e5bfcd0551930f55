//! Commodore serial bus handshake.
//!
//! The bus between a Commodore computer and its disk drive is three
//! open-collector lines: ATN, CLK and DATA. The host (talker) announces a
//! command by pulling ATN, then clocks bytes out LSB first; the drive
//! (listener) answers each step by pulling lines of its own. This crate
//! models the lines and a listener device with configurable response
//! latencies, and reports a device that misses its acknowledge window.

mod bus;
mod error;
mod lines;
mod talker;

pub use bus::{BusStatus, DeviceTiming, Phase, SerialBus, SerialBusConfig};
pub use error::SerialBusError;
pub use lines::{LineLevels, Party, Signal};
pub use talker::TalkerDriver;
