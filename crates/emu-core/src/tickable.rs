//! Trait for peripherals advanced by clock ticks.

use crate::Ticks;

/// A peripheral stepped by the host loop alongside a CPU core.
///
/// Timers, the bit-recovery PLL and the serial bus all implement this. A
/// peripheral never runs on its own; it only moves when the host ticks it.
pub trait Tickable {
    /// Advance by one clock.
    fn tick(&mut self);

    /// Advance by several clocks.
    ///
    /// Implementations may override this for speed but must match calling
    /// `tick()` `count` times.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
