use thiserror::Error;

use crate::{Phase, Signal};

/// Serial-bus protocol failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SerialBusError {
    /// The device did not answer a host edge within the acknowledge window.
    #[error("no device acknowledge after {waited} cycles in {phase}")]
    AcknowledgeTimeout { phase: Phase, waited: u32 },

    /// A line the host was waiting on never reached the expected level.
    #[error("{signal} stuck {} for {waited} cycles", if *.expected_high { "low" } else { "high" })]
    LineStuck {
        signal: Signal,
        expected_high: bool,
        waited: u32,
    },

    /// The host started a step the handshake is not ready for.
    #[error("expected {expected}, bus is in {actual}")]
    OutOfSequence { expected: Phase, actual: Phase },
}
