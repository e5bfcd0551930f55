//! Effective-address cycles.
//!
//! Each call runs at most one bus cycle of the current addressing mode.
//! Reads skip the high-byte fix-up cycle when indexing stays in the page;
//! writes and read-modify-writes always spend it on a dummy read.

use emu_core::Bus;

use super::Mos6502;
use crate::table::{Access, Mode};

impl Mos6502 {
    /// Advance address calculation by one cycle.
    ///
    /// Returns `true`, without touching the bus, once `self.addr` holds the
    /// effective address; the caller then performs the data cycle itself.
    pub(super) fn address_step<B: Bus>(&mut self, bus: &mut B, access: Access) -> bool {
        if self.ready_at != 0 && self.cycle >= self.ready_at {
            return true;
        }

        match (self.mode, self.cycle) {
            (Mode::Imm, 1) => {
                self.addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.ready_at = 1;
                return true;
            }

            (Mode::Zp, 1) => {
                self.addr = u16::from(self.read_pc(bus));
                self.ready_at = 2;
            }

            (Mode::Zpx | Mode::Zpy, 1) => {
                self.pointer = self.read_pc(bus);
            }
            (Mode::Zpx | Mode::Zpy, 2) => {
                // Dummy read while adding the index (wraps in zero page)
                let _ = self.read(bus, u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.index()));
                self.ready_at = 3;
            }

            (Mode::Abs, 1) => {
                self.addr = u16::from(self.read_pc(bus));
            }
            (Mode::Abs, 2) => {
                self.addr |= u16::from(self.read_pc(bus)) << 8;
                self.ready_at = 3;
            }

            (Mode::Abx | Mode::Aby, 1) => {
                self.addr = u16::from(self.read_pc(bus));
            }
            (Mode::Abx | Mode::Aby, 2) => {
                let hi = self.read_pc(bus);
                self.index_base(self.addr as u8, hi, access, 3);
            }
            (Mode::Abx | Mode::Aby, 3) => self.fix_page(bus),

            (Mode::Izx, 1) => {
                self.pointer = self.read_pc(bus);
            }
            (Mode::Izx, 2) => {
                let _ = self.read(bus, u16::from(self.pointer));
                self.pointer = self.pointer.wrapping_add(self.regs.x);
            }
            (Mode::Izx, 3) => {
                self.addr = u16::from(self.read(bus, u16::from(self.pointer)));
            }
            (Mode::Izx, 4) => {
                let hi = self.read(bus, u16::from(self.pointer.wrapping_add(1)));
                self.addr |= u16::from(hi) << 8;
                self.ready_at = 5;
            }

            (Mode::Izy, 1) => {
                self.pointer = self.read_pc(bus);
            }
            (Mode::Izy, 2) => {
                self.addr = u16::from(self.read(bus, u16::from(self.pointer)));
            }
            (Mode::Izy, 3) => {
                let hi = self.read(bus, u16::from(self.pointer.wrapping_add(1)));
                self.index_base(self.addr as u8, hi, access, 4);
            }
            (Mode::Izy, 4) => self.fix_page(bus),

            (mode, cycle) => unreachable!("no address cycle {cycle} for {mode:?}"),
        }
        false
    }

    /// Y for the ,Y modes, X otherwise.
    fn index(&self) -> u8 {
        match self.mode {
            Mode::Zpy | Mode::Aby | Mode::Izy => self.regs.y,
            _ => self.regs.x,
        }
    }

    /// Add the index to the low byte only. The fix-up cycle that follows
    /// is skipped for reads that stay within the page.
    fn index_base(&mut self, lo: u8, hi: u8, access: Access, cycle: u8) {
        let (lo, carry) = lo.overflowing_add(self.index());
        self.addr = u16::from(lo) | (u16::from(hi) << 8);
        self.base_hi = hi;
        self.page_crossed = carry;
        if access == Access::Read && !carry {
            self.ready_at = cycle;
        }
    }

    /// Dummy read at the unfixed address, then carry into the high byte.
    fn fix_page<B: Bus>(&mut self, bus: &mut B) {
        let _ = self.read(bus, self.addr);
        if self.page_crossed {
            self.addr = self.addr.wrapping_add(0x100);
        }
        self.ready_at = self.cycle + 1;
    }
}
