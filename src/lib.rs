//! Superboard: an Ohio Scientific Superboard II / Challenger 1P emulator.
//!
//! A documented-opcode NMOS 6502 running the SYN600 monitor and OSI BASIC,
//! paced in real time against a 1 MHz clock, with a memory-mapped 64×32
//! character screen and an 8×8 keyboard matrix.
//!
//! ## Modules
//!
//! - **bus** – 64 KiB address space: RAM below `$8000`, write-protected ROM,
//!   video RAM at `$D000`, keyboard port at `$DF00`
//! - **cpu** – 6502 core: decode table, addressing modes, instruction bodies;
//!   invalid opcodes and stack exhaustion halt the CPU
//! - **keyboard** – row-select keyboard matrix and host key table
//! - **rom** – ROM image descriptors and the all-or-nothing loader
//! - **scheduler** – tick-based real-time pacing and screen change notification
//! - **display** – minifb window and terminal frontends
//! - **config** – command-line options

pub mod bus;
pub mod config;
pub mod cpu;
pub mod display;
pub mod keyboard;
pub mod rom;
pub mod scheduler;
