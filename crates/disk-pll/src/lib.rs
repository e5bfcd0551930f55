//! Bit-recovery phase-locked loop.
//!
//! A floppy read head produces a pulse for every flux transition. The
//! data separator slices time into bit cells ("windows"): a window that
//! sees a pulse decodes as 1, a window that passes without one decodes
//! as 0. Drive speed wobbles, so the window length tracks the average
//! pulse spacing over the last few pulses, within a fixed band around
//! the nominal cell length. Each accepted pulse also pulls the window
//! phase halfway toward centring the pulse, which is what keeps lock
//! when the input runs uniformly fast or slow.
//!
//! ```
//! use disk_pll::{DigitalPll, PllConfig};
//!
//! let mut pll: DigitalPll = DigitalPll::new(PllConfig::default());
//! pll.advance(16);
//! pll.pulse();
//! pll.advance(32 + 32);
//! pll.pulse();
//! assert_eq!(pll.stream() & 0b111, 0b101);
//! ```

use emu_core::{Observable, Tickable, Value};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Where newly decoded bits enter the shift register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitOrder {
    /// New bit at bit 0; older bits move up.
    #[default]
    MsbFirst,
    /// New bit at bit 63; older bits move down.
    LsbFirst,
}

/// Loop parameters, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PllConfig {
    /// Nominal bit-cell length in clocks.
    pub clocks_per_bit: u32,
    /// Maximum deviation of the window from nominal, in clocks.
    pub tolerance: u32,
    pub bit_order: BitOrder,
}

impl Default for PllConfig {
    /// 2 µs cells at a 16 MHz sample clock, ±15%.
    fn default() -> Self {
        Self {
            clocks_per_bit: 32,
            tolerance: 5,
            bit_order: BitOrder::MsbFirst,
        }
    }
}

/// Digital PLL with a `HISTORY`-deep pulse-spacing average.
#[derive(Debug, Clone)]
pub struct DigitalPll<const HISTORY: usize = 3> {
    config: PllConfig,
    /// Current window length in clocks.
    window: u32,
    /// Clocks into the current window.
    phase: u32,
    /// The current window has already produced a 1.
    filled: bool,
    /// Clocks since the last accepted pulse.
    since_pulse: u32,
    history: [u32; HISTORY],
    history_next: usize,
    stream: u64,
    bits: u64,
}

impl<const HISTORY: usize> DigitalPll<HISTORY> {
    /// Build a loop. A zero `clocks_per_bit` is treated as one clock, and
    /// the tolerance is capped so the window can never shrink to zero.
    #[must_use]
    pub fn new(config: PllConfig) -> Self {
        let clocks_per_bit = config.clocks_per_bit.max(1);
        let config = PllConfig {
            clocks_per_bit,
            tolerance: config.tolerance.min(clocks_per_bit - 1),
            ..config
        };
        Self {
            config,
            window: clocks_per_bit,
            phase: 0,
            filled: false,
            since_pulse: 0,
            history: [0; HISTORY],
            history_next: 0,
            stream: 0,
            bits: 0,
        }
    }

    /// Drop lock and clear the decoded stream.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Let `cycles` clocks pass. Every window that closes without a pulse
    /// decodes as a 0.
    pub fn advance(&mut self, cycles: u32) {
        self.since_pulse = self.since_pulse.saturating_add(cycles);
        self.phase = self.phase.saturating_add(cycles);
        if self.phase < self.window {
            return;
        }

        let mut closed = self.phase / self.window;
        if self.filled {
            closed -= 1;
        }
        for _ in 0..closed {
            self.shift(false);
        }
        self.filled = false;
        self.phase %= self.window;
    }

    /// Report a flux transition at the current clock.
    ///
    /// Only the first pulse in a window counts; later ones are noise and
    /// do not disturb the spacing history.
    pub fn pulse(&mut self) {
        if self.filled {
            return;
        }
        self.shift(true);
        self.filled = true;
        let spacing = self.since_pulse;
        self.since_pulse = 0;
        self.retune(spacing);
    }

    fn retune(&mut self, spacing: u32) {
        if HISTORY > 0 {
            self.history[self.history_next] = spacing;
            self.history_next = (self.history_next + 1) % HISTORY;
        }

        let nominal = u64::from(self.config.clocks_per_bit);
        let (clocks, cells) = self
            .history
            .iter()
            .map(|&spacing| {
                let spacing = u64::from(spacing);
                (spacing, (spacing + nominal / 2) / nominal)
            })
            .filter(|&(_, cells)| cells > 0)
            .fold((0u64, 0u64), |(c, n), (spacing, cells)| (c + spacing, n + cells));

        if cells > 0 {
            let low = nominal - u64::from(self.config.tolerance);
            let high = nominal + u64::from(self.config.tolerance);
            let window = (clocks / cells).clamp(low, high) as u32;
            if window != self.window {
                trace!(window, "pll window retuned");
            }
            self.window = window;
        }

        // Pull the window centre halfway toward the pulse.
        let error = i64::from(self.phase) - i64::from(self.window / 2);
        self.phase = (i64::from(self.phase) - ((error + 1) >> 1)).max(0) as u32;
    }

    fn shift(&mut self, bit: bool) {
        let bit = u64::from(bit);
        self.stream = match self.config.bit_order {
            BitOrder::MsbFirst => (self.stream << 1) | bit,
            BitOrder::LsbFirst => (self.stream >> 1) | (bit << 63),
        };
        self.bits += 1;
    }

    /// The last 64 decoded bits.
    #[must_use]
    pub fn stream(&self) -> u64 {
        self.stream
    }

    /// Total bits decoded since construction or reset.
    #[must_use]
    pub fn bits_decoded(&self) -> u64 {
        self.bits
    }

    /// Current window length in clocks.
    #[must_use]
    pub fn window(&self) -> u32 {
        self.window
    }

    #[must_use]
    pub fn config(&self) -> &PllConfig {
        &self.config
    }
}

impl<const HISTORY: usize> Tickable for DigitalPll<HISTORY> {
    fn tick(&mut self) {
        self.advance(1);
    }
}

impl<const HISTORY: usize> Observable for DigitalPll<HISTORY> {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "window" => Some(self.window.into()),
            "phase" => Some(self.phase.into()),
            "stream" => Some(self.stream.into()),
            "bits" => Some(self.bits.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["window", "phase", "stream", "bits"]
    }
}
