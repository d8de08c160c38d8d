//! 6502 CPU emulation.
//!
//! Documented NMOS instruction set with binary-only arithmetic. Invalid
//! opcodes and stack exhaustion halt the CPU instead of raising errors.
//! Bus trait used for memory and I/O (RAM, ROM, video RAM, keyboard).

pub mod addressing;
pub mod cpu;
pub mod flags;
pub mod instructions;
pub mod opcodes;
