//! Z80 flag register (F) bits.

/// Sign.
pub const SF: u8 = 0x80;
/// Zero.
pub const ZF: u8 = 0x40;
/// Undocumented copy of bit 5.
pub const YF: u8 = 0x20;
/// Half carry.
pub const HF: u8 = 0x10;
/// Undocumented copy of bit 3.
pub const XF: u8 = 0x08;
/// Parity / overflow.
pub const PF: u8 = 0x04;
/// Add / subtract.
pub const NF: u8 = 0x02;
/// Carry.
pub const CF: u8 = 0x01;

/// Bits 5 and 3 of a value, as they land in F.
#[must_use]
pub const fn xy(value: u8) -> u8 {
    value & (YF | XF)
}

/// PF when `value` has an even number of set bits.
#[must_use]
pub const fn parity(value: u8) -> u8 {
    if value.count_ones() % 2 == 0 { PF } else { 0 }
}

/// S, Z, Y and X for a result byte.
#[must_use]
pub const fn sz53(value: u8) -> u8 {
    let zero = if value == 0 { ZF } else { 0 };
    (value & SF) | zero | xy(value)
}

/// S, Z, Y, X and parity for a result byte.
#[must_use]
pub const fn sz53p(value: u8) -> u8 {
    sz53(value) | parity(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_counts_bits() {
        assert_eq!(parity(0x00), PF);
        assert_eq!(parity(0x01), 0);
        assert_eq!(parity(0x03), PF);
        assert_eq!(parity(0xFF), PF);
    }

    #[test]
    fn sz53p_combines() {
        assert_eq!(sz53p(0x00), ZF | PF);
        assert_eq!(sz53p(0x80), SF);
        assert_eq!(sz53p(0x28), YF | XF | PF);
    }
}
