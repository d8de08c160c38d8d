use log::{Level, debug, log_enabled, trace, warn};
use thiserror::Error;

use crate::{
    bus::Bus,
    cpu::{
        addressing::{AddressingMode, Operand},
        flags::Flags,
        instructions::{self, read_word},
        opcodes,
    },
};

pub const STACK_BASE: u16 = 0x0100;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const BRK_VECTOR: u16 = 0xFFFE;

/// Why the CPU halted. Both classes are terminal until `reset()`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("invalid opcode ${opcode:02X} at ${address:04X}")]
    InvalidOpcode { opcode: u8, address: u16 },

    #[error("stack overflow pushing {bytes} byte(s) with SP=${sp:02X}")]
    StackOverflow { sp: u8, bytes: usize },

    #[error("stack underflow popping {bytes} byte(s) with SP=${sp:02X}")]
    StackUnderflow { sp: u8, bytes: usize },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    /// Stack lives at `0x0100 + sp` and grows down.
    pub sp: u8,
    /// Instruction pointer.
    pub pc: u16,
    pub flags: Flags,
}

pub struct CPU<B: Bus> {
    pub regs: Registers,
    pub cycles: u64,
    pub bus: B,
    halted: bool,
    fault: Option<Fault>,
}

impl<B: Bus> CPU<B> {
    /// Build a CPU over `bus` and reset it from the bus's reset vector.
    pub fn new(bus: B) -> Self {
        let mut cpu = CPU {
            regs: Registers::default(),
            cycles: 0,
            bus,
            halted: false,
            fault: None,
        };
        cpu.reset();
        cpu
    }

    pub fn reset(&mut self) {
        self.regs = Registers {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: read_word(&mut self.bus, RESET_VECTOR),
            flags: Flags::ALWAYS | Flags::INTERRUPT_DISABLE,
        };

        self.cycles = 0;
        self.halted = false;
        self.fault = None;

        debug!("reset: pc=${:04X}", self.regs.pc);
    }

    /// Execute one instruction. Does nothing once halted.
    pub fn step(&mut self) {
        if self.halted {
            return;
        }

        let pc = self.regs.pc;
        let opcode = self.fetch_byte();

        let Some(op) = opcodes::decode(opcode) else {
            self.jam(Fault::InvalidOpcode {
                opcode,
                address: pc,
            });
            return;
        };

        if log_enabled!(Level::Trace) {
            self.trace(pc, opcode);
        }

        let operand = self.resolve(op.mode);
        match instructions::execute(op.mnemonic, &mut self.regs, &mut self.bus, operand) {
            Ok(extra) => self.cycles += u64::from(op.cycles + extra),
            Err(fault) => self.jam(fault),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The fault that halted the CPU, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    fn jam(&mut self, fault: Fault) {
        warn!("CPU halted: {fault}");
        self.halted = true;
        self.fault = Some(fault);
    }

    fn fetch_byte(&mut self) -> u8 {
        let byte = self.bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        byte
    }

    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte();
        let hi = self.fetch_byte();
        u16::from_le_bytes([lo, hi])
    }

    /// Consume the operand bytes for `mode` and produce the effective address.
    fn resolve(&mut self, mode: AddressingMode) -> Operand {
        let addr = match mode {
            AddressingMode::Implied => return Operand::None,
            AddressingMode::Accumulator => return Operand::Accumulator,
            AddressingMode::Immediate => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                addr
            }
            AddressingMode::ZeroPage => self.fetch_byte() as u16,
            AddressingMode::ZeroPageX => self.fetch_byte().wrapping_add(self.regs.x) as u16,
            AddressingMode::ZeroPageY => self.fetch_byte().wrapping_add(self.regs.y) as u16,
            AddressingMode::Absolute => self.fetch_word(),
            AddressingMode::AbsoluteX => self.fetch_word().wrapping_add(self.regs.x as u16),
            AddressingMode::AbsoluteY => self.fetch_word().wrapping_add(self.regs.y as u16),
            AddressingMode::Indirect => {
                let ptr = self.fetch_word();
                read_word(&mut self.bus, ptr)
            }
            AddressingMode::IndirectX => {
                let ptr = self.fetch_byte().wrapping_add(self.regs.x);
                self.read_zero_page_word(ptr)
            }
            AddressingMode::IndirectY => {
                let ptr = self.fetch_byte();
                self.read_zero_page_word(ptr)
                    .wrapping_add(self.regs.y as u16)
            }
            AddressingMode::Relative => {
                let offset = self.fetch_byte() as i8;
                self.regs.pc.wrapping_add(offset as u16)
            }
        };

        Operand::Address(addr)
    }

    /// Pointer high byte wraps within the zero page.
    fn read_zero_page_word(&mut self, ptr: u8) -> u16 {
        let lo = self.bus.read(ptr as u16);
        let hi = self.bus.read(ptr.wrapping_add(1) as u16);
        u16::from_le_bytes([lo, hi])
    }

    fn trace(&self, pc: u16, opcode: u8) {
        let r = &self.regs;
        trace!(
            "{:04X}  {:02X}        A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            opcode,
            r.a,
            r.x,
            r.y,
            r.flags.bits(),
            r.sp,
            self.cycles
        );
    }
}
