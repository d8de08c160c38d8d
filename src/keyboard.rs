//! Superboard keyboard matrix.
//!
//! Eight rows of eight keys. The CPU writes a row-select mask to the keyboard
//! port; reading the port returns every selected row ORed together, with a
//! bit set for each held key. The host delivers key events with explicit
//! `key_down`/`key_up` calls and the matrix is rebuilt after each one.

use crate::bus::IoDevice;

const ROWS: usize = 8;

/// Left shift on the emulated keyboard, pressed for shifted characters.
const LEFT_SHIFT_ROW: usize = 0;
const LEFT_SHIFT_MASK: u8 = 0x04;

/// A key as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character, as typed (including shift).
    Char(char),
    CapsLock,
    Control,
    Backspace,
    Escape,
    Enter,
}

/// Where a host key lands in the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeymapEntry {
    pub row: usize,
    pub mask: u8,
    /// The emulated keyboard needs shift held to produce this character.
    pub needs_shift: bool,
    /// Held independently of the single ordinary key (CapsLock, Control).
    pub is_meta: bool,
}

const fn key(row: usize, mask: u8) -> Option<KeymapEntry> {
    Some(KeymapEntry {
        row,
        mask,
        needs_shift: false,
        is_meta: false,
    })
}

const fn shifted(row: usize, mask: u8) -> Option<KeymapEntry> {
    Some(KeymapEntry {
        row,
        mask,
        needs_shift: true,
        is_meta: false,
    })
}

const fn meta(row: usize, mask: u8) -> Option<KeymapEntry> {
    Some(KeymapEntry {
        row,
        mask,
        needs_shift: false,
        is_meta: true,
    })
}

/// Matrix position for a host key, or `None` if the Superboard has no such key.
///
/// Upper and lower case letters share an entry; the ROM sorts out shift from
/// the CapsLock state.
pub fn lookup(k: Key) -> Option<KeymapEntry> {
    match k {
        Key::CapsLock => meta(0, 0x01),
        Key::Control => meta(0, 0x40),
        Key::Backspace => key(6, 0x04),
        Key::Escape => key(0, 0x20),
        Key::Enter => key(5, 0x08),
        Key::Char(c) => lookup_char(c),
    }
}

fn lookup_char(c: char) -> Option<KeymapEntry> {
    match c.to_ascii_lowercase() {
        'a' => key(1, 0x40),
        'b' => key(2, 0x10),
        'c' => key(2, 0x40),
        'd' => key(3, 0x40),
        'e' => key(4, 0x40),
        'f' => key(3, 0x20),
        'g' => key(3, 0x10),
        'h' => key(3, 0x08),
        'i' => key(4, 0x02),
        'j' => key(3, 0x04),
        'k' => key(3, 0x02),
        'l' => key(5, 0x40),
        'm' => key(2, 0x04),
        'n' => key(2, 0x08),
        'o' => key(5, 0x20),
        'p' => key(1, 0x02),
        'q' => key(1, 0x80),
        'r' => key(4, 0x20),
        's' => key(3, 0x80),
        't' => key(4, 0x10),
        'u' => key(4, 0x04),
        'v' => key(2, 0x20),
        'w' => key(4, 0x80),
        'x' => key(2, 0x80),
        'y' => key(4, 0x08),
        'z' => key(1, 0x20),

        '1' => key(7, 0x80),
        '2' => key(7, 0x40),
        '3' => key(7, 0x20),
        '4' => key(7, 0x10),
        '5' => key(7, 0x08),
        '6' => key(7, 0x04),
        '7' => key(7, 0x02),
        '8' => key(6, 0x80),
        '9' => key(6, 0x40),
        '0' => key(6, 0x20),

        '!' => shifted(7, 0x80),
        '"' => shifted(7, 0x40),
        '#' => shifted(7, 0x20),
        '$' => shifted(7, 0x10),
        '%' => shifted(7, 0x08),
        '&' => shifted(7, 0x04),
        '\'' => shifted(7, 0x02),
        '(' => shifted(6, 0x80),
        ')' => shifted(6, 0x40),

        ':' => key(6, 0x10),
        '*' => shifted(6, 0x10),
        '-' => key(6, 0x08),
        '=' => shifted(6, 0x08),
        ';' => key(1, 0x04),
        '+' => shifted(1, 0x04),
        ',' => key(2, 0x02),
        '<' => shifted(2, 0x02),
        '.' => key(5, 0x80),
        '>' => shifted(5, 0x80),
        '/' => key(1, 0x08),
        '?' => shifted(1, 0x08),

        ' ' => key(1, 0x10),
        _ => None,
    }
}

/// The keyboard port mounted at `$DF00`.
#[derive(Debug, Clone)]
pub struct Keyboard {
    rows: [u8; ROWS],
    row_mask: u8,
    down_meta: Vec<Key>,
    down_key: Option<Key>,
}

impl Keyboard {
    /// No keys held except CapsLock, which the machine powers up with.
    pub fn new() -> Self {
        let mut keyboard = Keyboard {
            rows: [0; ROWS],
            row_mask: 0,
            down_meta: vec![Key::CapsLock],
            down_key: None,
        };
        keyboard.rebuild_rows();
        keyboard
    }

    pub fn key_down(&mut self, k: Key) {
        let Some(entry) = lookup(k) else {
            return;
        };

        if entry.is_meta {
            if !self.down_meta.contains(&k) {
                self.down_meta.push(k);
            }
        } else {
            self.down_key = Some(k);
        }

        self.rebuild_rows();
    }

    /// Release `k`. Releasing an ordinary key other than the one held is ignored.
    pub fn key_up(&mut self, k: Key) {
        let Some(entry) = lookup(k) else {
            return;
        };

        if entry.is_meta {
            self.down_meta.retain(|held| *held != k);
        } else if self.down_key == Some(k) {
            self.down_key = None;
        }

        self.rebuild_rows();
    }

    /// Current matrix, one column mask per row.
    pub fn rows(&self) -> [u8; ROWS] {
        self.rows
    }

    fn rebuild_rows(&mut self) {
        self.rows = [0; ROWS];

        for entry in self.down_meta.iter().filter_map(|k| lookup(*k)) {
            self.rows[entry.row] |= entry.mask;
        }

        if let Some(entry) = self.down_key.and_then(lookup) {
            self.rows[entry.row] |= entry.mask;

            if entry.needs_shift {
                self.rows[LEFT_SHIFT_ROW] |= LEFT_SHIFT_MASK;
            }
        }
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl IoDevice for Keyboard {
    fn read_byte(&mut self) -> u8 {
        (0..ROWS)
            .filter(|row| self.row_mask & (1 << row) != 0)
            .fold(0, |value, row| value | self.rows[row])
    }

    /// Select which rows subsequent reads see.
    fn write_byte(&mut self, value: u8) {
        self.row_mask = value;
    }
}
