//! Memory bus and address decoding for the Superboard.
//!
//! Maps CPU addresses to RAM, ROM, video RAM, and the keyboard port.

use log::warn;

use crate::keyboard::Keyboard;

/// Trait for memory-mapped I/O and bus access used by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
}

/// A device mounted on the I/O window. Every address in the window reaches
/// the same port.
pub trait IoDevice {
    fn read_byte(&mut self) -> u8;
    fn write_byte(&mut self, value: u8);
}

/// Writes at or above this address are dropped unless they hit an I/O window.
pub const RAM_END: u16 = 0x8000;

pub const VRAM_START: u16 = 0xD000;
pub const VRAM_END: u16 = 0xD800;
pub const VRAM_SIZE: usize = (VRAM_END - VRAM_START) as usize;

pub const KEYBOARD_START: u16 = 0xDF00;
pub const KEYBOARD_END: u16 = 0xE000;

pub type Vram = [u8; VRAM_SIZE];

/// 64 KiB address space with the video and keyboard windows.
pub struct Memory<D: IoDevice = Keyboard> {
    bytes: Box<[u8; 0x10000]>,
    screen_dirty: bool,
    pub keyboard: D,
}

impl Memory<Keyboard> {
    pub fn new() -> Self {
        Self::with_device(Keyboard::new())
    }
}

impl Default for Memory<Keyboard> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: IoDevice> Memory<D> {
    /// Zeroed memory with `keyboard` mounted on the I/O window.
    pub fn with_device(keyboard: D) -> Self {
        Self {
            bytes: Box::new([0; 0x10000]),
            screen_dirty: false,
            keyboard,
        }
    }

    pub fn read_byte(&mut self, addr: u16) -> u8 {
        if is_keyboard(addr) {
            return self.keyboard.read_byte();
        }
        self.bytes[addr as usize]
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        if is_vram(addr) {
            self.bytes[addr as usize] = value;
            self.screen_dirty = true;
        } else if is_keyboard(addr) {
            self.keyboard.write_byte(value);
        } else if addr < RAM_END {
            self.bytes[addr as usize] = value;
        }
        // ROM: silently dropped
    }

    /// Copy `data` to `base`, ignoring write protection. Boot only.
    ///
    /// Bytes that would run past the end of the address space are dropped.
    pub fn initialize_region(&mut self, data: &[u8], base: u16) {
        let start = base as usize;
        let room = self.bytes.len() - start;
        let len = data.len().min(room);

        if len < data.len() {
            warn!(
                "initialize_region: {} byte(s) at ${:04X} run past $FFFF, truncated",
                data.len() - len,
                base
            );
        }

        self.bytes[start..start + len].copy_from_slice(&data[..len]);
    }

    /// True if video RAM was written since the last `clear_screen_writes`.
    pub fn screen_writes(&self) -> bool {
        self.screen_dirty
    }

    pub fn clear_screen_writes(&mut self) {
        self.screen_dirty = false;
    }

    /// Copy of video RAM.
    pub fn vram(&self) -> Vram {
        let mut vram = [0; VRAM_SIZE];
        vram.copy_from_slice(&self.bytes[VRAM_START as usize..VRAM_END as usize]);
        vram
    }
}

impl<D: IoDevice> Bus for Memory<D> {
    fn read(&mut self, addr: u16) -> u8 {
        self.read_byte(addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.write_byte(addr, data)
    }
}

fn is_vram(addr: u16) -> bool {
    (VRAM_START..VRAM_END).contains(&addr)
}

fn is_keyboard(addr: u16) -> bool {
    (KEYBOARD_START..KEYBOARD_END).contains(&addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what the bus forwards to the I/O window.
    #[derive(Default)]
    struct Port {
        written: Vec<u8>,
        reply: u8,
    }

    impl IoDevice for Port {
        fn read_byte(&mut self) -> u8 {
            self.reply
        }

        fn write_byte(&mut self, value: u8) {
            self.written.push(value);
        }
    }

    #[test]
    fn uninitialized_memory_reads_zero() {
        let mut mem = Memory::new();
        assert_eq!(mem.read_byte(0x0000), 0);
        assert_eq!(mem.read_byte(0x7FFF), 0);
        assert_eq!(mem.read_byte(0xFFFF), 0);
    }

    #[test]
    fn ram_reads_back_what_was_written() {
        let mut mem = Memory::new();
        mem.write_byte(0x1000, 42);
        assert_eq!(mem.read_byte(0x1000), 42);
    }

    #[test]
    fn initialized_region_reads_back() {
        let mut mem = Memory::new();
        mem.initialize_region(&[1, 2, 3], 0x1000);
        assert_eq!(mem.read_byte(0x1000), 1);
        assert_eq!(mem.read_byte(0x1001), 2);
        assert_eq!(mem.read_byte(0x1002), 3);
    }

    #[test]
    fn rom_is_write_protected_after_boot() {
        let mut mem = Memory::new();
        mem.initialize_region(&[0xAA, 0xBB], 0xA000);

        mem.write_byte(0xA000, 0x00);
        mem.write_byte(RAM_END, 0x55);

        assert_eq!(mem.read_byte(0xA000), 0xAA);
        assert_eq!(mem.read_byte(0xA001), 0xBB);
        assert_eq!(mem.read_byte(RAM_END), 0x00);
        assert!(!mem.screen_writes());
    }

    #[test]
    fn last_ram_byte_is_writable() {
        let mut mem = Memory::new();
        mem.write_byte(RAM_END - 1, 0x77);
        assert_eq!(mem.read_byte(RAM_END - 1), 0x77);
    }

    #[test]
    fn vram_write_sets_dirty_flag_and_shows_in_snapshot() {
        let mut mem = Memory::new();
        assert!(!mem.screen_writes());

        mem.write_byte(0xD050, 0x41);

        assert!(mem.screen_writes());
        assert_eq!(mem.vram()[0x50], 0x41);
        assert_eq!(mem.read_byte(0xD050), 0x41);

        mem.clear_screen_writes();
        assert!(!mem.screen_writes());
        assert_eq!(mem.vram()[0x50], 0x41);
    }

    #[test]
    fn vram_window_bounds() {
        let mut mem = Memory::new();

        mem.write_byte(VRAM_END, 0x01);
        assert!(!mem.screen_writes());

        mem.write_byte(VRAM_END - 1, 0x02);
        assert!(mem.screen_writes());
        assert_eq!(mem.vram()[VRAM_SIZE - 1], 0x02);
    }

    #[test]
    fn vram_snapshot_is_a_copy() {
        let mut mem = Memory::new();
        mem.write_byte(VRAM_START, 0x10);

        let snapshot = mem.vram();
        mem.write_byte(VRAM_START, 0x20);

        assert_eq!(snapshot[0], 0x10);
        assert_eq!(mem.vram()[0], 0x20);
    }

    #[test]
    fn keyboard_window_routes_to_device() {
        let mut mem = Memory::with_device(Port {
            reply: 0x5A,
            ..Port::default()
        });

        mem.write_byte(0xDF00, 0xFE);
        mem.write_byte(0xDFFF, 0x7F);

        assert_eq!(mem.keyboard.written, vec![0xFE, 0x7F]);
        assert_eq!(mem.read_byte(0xDF00), 0x5A);
        assert_eq!(mem.read_byte(0xDF80), 0x5A);
        assert!(!mem.screen_writes());
    }

    #[test]
    fn keyboard_writes_do_not_touch_backing_store() {
        let mut mem = Memory::with_device(Port::default());
        mem.initialize_region(&[0x99], 0xDF00);

        mem.write_byte(0xDF00, 0x01);

        assert_eq!(mem.bytes[0xDF00], 0x99);
    }

    #[test]
    fn initialize_region_truncates_at_end_of_address_space() {
        let mut mem = Memory::new();
        mem.initialize_region(&[1, 2, 3, 4], 0xFFFE);
        assert_eq!(mem.read_byte(0xFFFE), 1);
        assert_eq!(mem.read_byte(0xFFFF), 2);
        assert_eq!(mem.read_byte(0x0000), 0);
    }
}
