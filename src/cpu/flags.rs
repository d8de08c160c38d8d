//! 6502 processor status register (P) flag bits.

use bitflags::bitflags;

bitflags! {
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        const CARRY = 1 << 0;
        const ZERO = 1 << 1;
        const INTERRUPT_DISABLE = 1 << 2;
        /// Tracked only; arithmetic stays binary.
        const DECIMAL = 1 << 3;
        /// Only meaningful in the copy BRK pushes.
        const BREAK = 1 << 4;
        /// Reserved bit, forced on by reset, PLP and RTI.
        const ALWAYS = 1 << 5;
        const OVERFLOW = 1 << 6;
        const NEGATIVE = 1 << 7;
    }
}

impl Flags {
    /// Set Zero and Negative from an 8-bit result.
    pub fn set_zn(&mut self, value: u8) {
        self.set(Flags::ZERO, value == 0);
        self.set(Flags::NEGATIVE, value & 0x80 != 0);
    }

    /// Carry as the 0/1 value arithmetic and rotates shift in.
    pub fn carry_bit(self) -> u8 {
        u8::from(self.contains(Flags::CARRY))
    }
}
