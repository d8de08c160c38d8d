//! 6502 addressing modes.
//!
//! Every mode except `Implied` and `Accumulator` resolves to an effective
//! address (see `CPU::resolve`), never to a dereferenced value. Immediate
//! resolves to the address of the operand byte itself and Relative to the
//! branch target, so instruction bodies read and write uniformly through the bus.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// JMP only.
    Indirect,
    /// `($zp,X)`: pointer pre-indexed by X inside the zero page.
    IndirectX,
    /// `($zp),Y`: pointer dereferenced, then post-indexed by Y.
    IndirectY,
    /// Branches: signed 8-bit displacement from the next instruction.
    Relative,
}

impl AddressingMode {
    /// Operand bytes following the opcode.
    pub const fn operand_len(self) -> u16 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY
            | AddressingMode::Relative => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }
}

/// What an addressing mode hands to an instruction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Accumulator,
    Address(u16),
}

impl Operand {
    /// Effective address of a memory operand.
    ///
    /// Instructions decoded with `Implied` or `Accumulator` never ask for one;
    /// the decode table pairs every mnemonic with the modes it accepts.
    pub fn address(self) -> u16 {
        debug_assert!(
            matches!(self, Operand::Address(_)),
            "memory operand expected, got {self:?}"
        );

        match self {
            Operand::Address(addr) => addr,
            Operand::None | Operand::Accumulator => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_of_memory_operand() {
        assert_eq!(Operand::Address(0xD050).address(), 0xD050);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "memory operand expected")]
    fn address_of_accumulator_operand_is_a_bug() {
        Operand::Accumulator.address();
    }
}
