//! Instruction bodies.
//!
//! Each instruction is a plain function over the register file and the bus,
//! so it can be exercised without a running interpreter. Bodies receive the
//! operand already resolved by the addressing mode and return the extra
//! cycles they cost on top of the opcode's base cost (only taken branches
//! have any). A `Fault` means the instruction did not complete.

use crate::{
    bus::Bus,
    cpu::{
        addressing::Operand,
        cpu::{Fault, Registers, BRK_VECTOR, STACK_BASE},
        flags::Flags,
        opcodes::Mnemonic,
    },
};

pub fn execute<B: Bus>(
    mnemonic: Mnemonic,
    regs: &mut Registers,
    bus: &mut B,
    operand: Operand,
) -> Result<u8, Fault> {
    use Mnemonic::*;

    match mnemonic {
        Lda => regs.a = load(&mut regs.flags, read(regs.a, bus, operand)),
        Ldx => regs.x = load(&mut regs.flags, read(regs.a, bus, operand)),
        Ldy => regs.y = load(&mut regs.flags, read(regs.a, bus, operand)),
        Sta => bus.write(operand.address(), regs.a),
        Stx => bus.write(operand.address(), regs.x),
        Sty => bus.write(operand.address(), regs.y),

        Tax => regs.x = load(&mut regs.flags, regs.a),
        Tay => regs.y = load(&mut regs.flags, regs.a),
        Txa => regs.a = load(&mut regs.flags, regs.x),
        Tya => regs.a = load(&mut regs.flags, regs.y),
        Tsx => regs.x = load(&mut regs.flags, regs.sp),
        Txs => regs.sp = regs.x,

        Adc => regs.a = adc(&mut regs.flags, regs.a, read(regs.a, bus, operand)),
        Sbc => regs.a = sbc(&mut regs.flags, regs.a, read(regs.a, bus, operand)),
        And => regs.a = load(&mut regs.flags, regs.a & read(regs.a, bus, operand)),
        Ora => regs.a = load(&mut regs.flags, regs.a | read(regs.a, bus, operand)),
        Eor => regs.a = load(&mut regs.flags, regs.a ^ read(regs.a, bus, operand)),
        Bit => bit(&mut regs.flags, regs.a, read(regs.a, bus, operand)),
        Cmp => compare(&mut regs.flags, regs.a, read(regs.a, bus, operand)),
        Cpx => compare(&mut regs.flags, regs.x, read(regs.a, bus, operand)),
        Cpy => compare(&mut regs.flags, regs.y, read(regs.a, bus, operand)),

        Inc => modify(regs, bus, operand, |_, v| v.wrapping_add(1)),
        Dec => modify(regs, bus, operand, |_, v| v.wrapping_sub(1)),
        Inx => regs.x = load(&mut regs.flags, regs.x.wrapping_add(1)),
        Iny => regs.y = load(&mut regs.flags, regs.y.wrapping_add(1)),
        Dex => regs.x = load(&mut regs.flags, regs.x.wrapping_sub(1)),
        Dey => regs.y = load(&mut regs.flags, regs.y.wrapping_sub(1)),

        Asl => modify(regs, bus, operand, asl),
        Lsr => modify(regs, bus, operand, lsr),
        Rol => modify(regs, bus, operand, rol),
        Ror => modify(regs, bus, operand, ror),

        Bcc => return Ok(branch(&mut regs.pc, operand, !regs.flags.contains(Flags::CARRY))),
        Bcs => return Ok(branch(&mut regs.pc, operand, regs.flags.contains(Flags::CARRY))),
        Bne => return Ok(branch(&mut regs.pc, operand, !regs.flags.contains(Flags::ZERO))),
        Beq => return Ok(branch(&mut regs.pc, operand, regs.flags.contains(Flags::ZERO))),
        Bpl => return Ok(branch(&mut regs.pc, operand, !regs.flags.contains(Flags::NEGATIVE))),
        Bmi => return Ok(branch(&mut regs.pc, operand, regs.flags.contains(Flags::NEGATIVE))),
        Bvc => return Ok(branch(&mut regs.pc, operand, !regs.flags.contains(Flags::OVERFLOW))),
        Bvs => return Ok(branch(&mut regs.pc, operand, regs.flags.contains(Flags::OVERFLOW))),

        Jmp => regs.pc = operand.address(),
        Jsr => jsr(regs, bus, operand.address())?,
        Rts => rts(regs, bus)?,
        Brk => brk(regs, bus)?,
        Rti => rti(regs, bus)?,

        Pha => {
            let a = regs.a;
            push(regs, bus, &[a])?;
        }
        Php => {
            let status = regs.flags.bits();
            push(regs, bus, &[status])?;
        }
        Pla => {
            let [value] = pop(regs, bus)?;
            regs.a = load(&mut regs.flags, value);
        }
        Plp => {
            let [status] = pop(regs, bus)?;
            regs.flags = Flags::from_bits_retain(status) | Flags::ALWAYS;
        }

        Clc => regs.flags.remove(Flags::CARRY),
        Cld => regs.flags.remove(Flags::DECIMAL),
        Cli => regs.flags.remove(Flags::INTERRUPT_DISABLE),
        Clv => regs.flags.remove(Flags::OVERFLOW),
        Sec => regs.flags.insert(Flags::CARRY),
        Sed => regs.flags.insert(Flags::DECIMAL),
        Sei => regs.flags.insert(Flags::INTERRUPT_DISABLE),

        Nop => {}
    }

    Ok(0)
}

fn read<B: Bus>(a: u8, bus: &mut B, operand: Operand) -> u8 {
    match operand {
        Operand::Accumulator => a,
        Operand::Address(addr) => bus.read(addr),
        Operand::None => 0,
    }
}

/// Read-modify-write through the accumulator or memory; `f` may update flags.
fn modify<B: Bus>(
    regs: &mut Registers,
    bus: &mut B,
    operand: Operand,
    f: impl FnOnce(&mut Flags, u8) -> u8,
) {
    let value = read(regs.a, bus, operand);
    let result = f(&mut regs.flags, value);
    regs.flags.set_zn(result);

    match operand {
        Operand::Accumulator => regs.a = result,
        Operand::Address(addr) => bus.write(addr, result),
        Operand::None => {}
    }
}

fn load(flags: &mut Flags, value: u8) -> u8 {
    flags.set_zn(value);
    value
}

/// `A + M + C`. Returns the new accumulator.
pub fn adc(flags: &mut Flags, a: u8, value: u8) -> u8 {
    let sum = a as u16 + value as u16 + flags.carry_bit() as u16;
    let result = sum as u8;

    flags.set(Flags::CARRY, sum >= 0x100);
    flags.set(Flags::OVERFLOW, (!(a ^ value) & (a ^ result) & 0x80) != 0);

    load(flags, result)
}

/// `A - M - (1 - C)`. Carry is set when no borrow occurred.
pub fn sbc(flags: &mut Flags, a: u8, value: u8) -> u8 {
    let borrow = 1 - flags.carry_bit() as u16;
    let result = (a as u16).wrapping_sub(value as u16).wrapping_sub(borrow);

    flags.set(Flags::OVERFLOW, ((a ^ value) & (a ^ result as u8) & 0x80) != 0);
    flags.set(Flags::CARRY, result & 0x100 == 0);

    load(flags, result as u8)
}

pub fn compare(flags: &mut Flags, register: u8, value: u8) {
    flags.set(Flags::CARRY, register >= value);
    flags.set_zn(register.wrapping_sub(value));
}

fn bit(flags: &mut Flags, a: u8, value: u8) {
    flags.set(Flags::ZERO, a & value == 0);
    flags.set(Flags::NEGATIVE, value & 0x80 != 0);
    flags.set(Flags::OVERFLOW, value & 0x40 != 0);
}

fn asl(flags: &mut Flags, value: u8) -> u8 {
    flags.set(Flags::CARRY, value & 0x80 != 0);
    value << 1
}

fn lsr(flags: &mut Flags, value: u8) -> u8 {
    flags.set(Flags::CARRY, value & 0x01 != 0);
    value >> 1
}

fn rol(flags: &mut Flags, value: u8) -> u8 {
    let old_carry = flags.carry_bit();
    flags.set(Flags::CARRY, value & 0x80 != 0);
    (value << 1) | old_carry
}

fn ror(flags: &mut Flags, value: u8) -> u8 {
    let old_carry = flags.carry_bit();
    flags.set(Flags::CARRY, value & 0x01 != 0);
    (value >> 1) | (old_carry << 7)
}

fn branch(pc: &mut u16, operand: Operand, condition: bool) -> u8 {
    if condition {
        *pc = operand.address();
        1
    } else {
        0
    }
}

fn jsr<B: Bus>(regs: &mut Registers, bus: &mut B, target: u16) -> Result<(), Fault> {
    // pc already sits past the operand; the 6502 pushes one less
    let return_addr = regs.pc.wrapping_sub(1);
    push(regs, bus, &[(return_addr >> 8) as u8, return_addr as u8])?;
    regs.pc = target;
    Ok(())
}

fn rts<B: Bus>(regs: &mut Registers, bus: &mut B) -> Result<(), Fault> {
    let [lo, hi] = pop(regs, bus)?;
    regs.pc = u16::from_le_bytes([lo, hi]).wrapping_add(1);
    Ok(())
}

fn brk<B: Bus>(regs: &mut Registers, bus: &mut B) -> Result<(), Fault> {
    // +1 for the padding byte after BRK
    let return_addr = regs.pc.wrapping_add(1);
    let status = regs.flags | Flags::BREAK;

    push(
        regs,
        bus,
        &[(return_addr >> 8) as u8, return_addr as u8, status.bits()],
    )?;

    regs.flags.insert(Flags::INTERRUPT_DISABLE);
    regs.pc = read_word(bus, BRK_VECTOR);
    Ok(())
}

fn rti<B: Bus>(regs: &mut Registers, bus: &mut B) -> Result<(), Fault> {
    let [status, lo, hi] = pop(regs, bus)?;
    regs.flags = (Flags::from_bits_retain(status) - Flags::BREAK) | Flags::ALWAYS;
    regs.pc = u16::from_le_bytes([lo, hi]);
    Ok(())
}

pub fn read_word<B: Bus>(bus: &mut B, addr: u16) -> u16 {
    let lo = bus.read(addr);
    let hi = bus.read(addr.wrapping_add(1));
    u16::from_le_bytes([lo, hi])
}

/// Push `bytes` in order. Fails before writing anything if they do not all fit.
pub fn push<B: Bus>(regs: &mut Registers, bus: &mut B, bytes: &[u8]) -> Result<(), Fault> {
    if (regs.sp as usize) < bytes.len() {
        return Err(Fault::StackOverflow {
            sp: regs.sp,
            bytes: bytes.len(),
        });
    }

    for &byte in bytes {
        bus.write(STACK_BASE | regs.sp as u16, byte);
        regs.sp = regs.sp.wrapping_sub(1);
    }
    Ok(())
}

/// Pop `N` bytes, first popped first. Fails before moving SP if the stack holds fewer.
pub fn pop<B: Bus, const N: usize>(
    regs: &mut Registers,
    bus: &mut B,
) -> Result<[u8; N], Fault> {
    if regs.sp as usize + N > 0xFF {
        return Err(Fault::StackUnderflow {
            sp: regs.sp,
            bytes: N,
        });
    }

    let mut out = [0; N];
    for byte in &mut out {
        regs.sp = regs.sp.wrapping_add(1);
        *byte = bus.read(STACK_BASE | regs.sp as u16);
    }
    Ok(out)
}
