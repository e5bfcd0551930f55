//! Memory and I/O bus interface.

/// Memory and I/O bus interface.
///
/// Cores never touch memory directly. Every bus cycle a core performs is a
/// single synchronous call on this trait, made in cycle order. The host
/// decodes addresses and routes them to RAM, ROM or peripheral registers.
///
/// Addresses are `u32` so the same trait serves 16-bit (6502, Z80) and
/// 24-bit (65816) cores. Narrower cores zero-extend.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u32) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u32, value: u8);

    /// Read a byte from an I/O port (Z80 `IN`).
    ///
    /// Unconnected ports float high.
    fn io_read(&mut self, port: u16) -> u8 {
        let _ = port;
        0xFF
    }

    /// Write a byte to an I/O port (Z80 `OUT`).
    fn io_write(&mut self, port: u16, value: u8) {
        let _ = (port, value);
    }

    /// Byte placed on the data bus by the interrupting device during an
    /// interrupt-acknowledge cycle.
    ///
    /// The Z80 executes it as an opcode in mode 0 and uses it as the vector
    /// low byte in mode 2. With nothing driving the bus it reads `0xFF`.
    fn interrupt_acknowledge(&mut self) -> u8 {
        0xFF
    }
}

/// Flat RAM bus for tests and simple hosts.
///
/// Addresses wrap modulo the memory size. I/O ports are a separate 64K
/// space; writes land in `ports` and reads return whatever was last stored
/// there.
#[derive(Debug, Clone)]
pub struct SimpleBus {
    memory: Vec<u8>,
    ports: Vec<u8>,
    ack: u8,
}

impl SimpleBus {
    /// 64 KiB of zeroed RAM.
    #[must_use]
    pub fn new() -> Self {
        Self::with_size(0x1_0000)
    }

    /// Zeroed RAM of the given size (use `0x100_0000` for a full 24-bit space).
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        assert!(size > 0, "bus must have at least one byte of memory");
        Self {
            memory: vec![0; size],
            ports: vec![0xFF; 0x1_0000],
            ack: 0xFF,
        }
    }

    fn index(&self, address: u32) -> usize {
        address as usize % self.memory.len()
    }

    /// Copy `data` into memory starting at `address`.
    pub fn load(&mut self, address: u32, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            let i = self.index(address.wrapping_add(offset as u32));
            self.memory[i] = byte;
        }
    }

    /// Read memory without side effects.
    #[must_use]
    pub fn peek(&self, address: u32) -> u8 {
        self.memory[self.index(address)]
    }

    /// Write memory without going through a core.
    pub fn poke(&mut self, address: u32, value: u8) {
        let i = self.index(address);
        self.memory[i] = value;
    }

    /// Value last written to (or preset on) an I/O port.
    #[must_use]
    pub fn port(&self, port: u16) -> u8 {
        self.ports[usize::from(port)]
    }

    /// Preset the value an `IN` from this port returns.
    pub fn set_port(&mut self, port: u16, value: u8) {
        self.ports[usize::from(port)] = value;
    }

    /// Byte returned during interrupt-acknowledge cycles.
    pub fn set_acknowledge_byte(&mut self, value: u8) {
        self.ack = value;
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u32) -> u8 {
        self.peek(address)
    }

    fn write(&mut self, address: u32, value: u8) {
        self.poke(address, value);
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.port(port)
    }

    fn io_write(&mut self, port: u16, value: u8) {
        self.set_port(port, value);
    }

    fn interrupt_acknowledge(&mut self) -> u8 {
        self.ack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_peek() {
        let mut bus = SimpleBus::new();
        bus.load(0x1234, &[0xAA, 0xBB]);
        assert_eq!(bus.peek(0x1234), 0xAA);
        assert_eq!(bus.peek(0x1235), 0xBB);
    }

    #[test]
    fn addresses_wrap_to_memory_size() {
        let mut bus = SimpleBus::new();
        bus.write(0x1_0005, 0x42);
        assert_eq!(bus.read(0x0005), 0x42);
    }

    #[test]
    fn ports_are_separate_from_memory() {
        let mut bus = SimpleBus::new();
        bus.io_write(0x00FE, 0x07);
        assert_eq!(bus.io_read(0x00FE), 0x07);
        assert_eq!(bus.peek(0x00FE), 0x00);
    }

    #[test]
    fn unconnected_defaults() {
        struct Empty;
        impl Bus for Empty {
            fn read(&mut self, _: u32) -> u8 {
                0
            }
            fn write(&mut self, _: u32, _: u8) {}
        }
        let mut bus = Empty;
        assert_eq!(bus.io_read(0x10), 0xFF);
        assert_eq!(bus.interrupt_acknowledge(), 0xFF);
    }
}
