//! Frontends for the 64×32 character screen.
//!
//! - **WindowHost**: minifb window, 8×8 glyph cells, keyboard input.
//! - **TerminalHost**: redraws the screen as text on stdout; no input.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use ansi_term::Colour::Green;
use minifb::{Key as HostKey, KeyRepeat, Scale, Window, WindowOptions};
use thiserror::Error;

use crate::{
    bus::Vram,
    keyboard::{Key, Keyboard},
    scheduler::{Display, Host},
};

pub const COLUMNS: usize = 64;
pub const ROWS: usize = 32;

const GLYPH: usize = 8;
const WIDTH: usize = COLUMNS * GLYPH;
const HEIGHT: usize = ROWS * GLYPH;
const CHARGEN_SIZE: usize = 256 * GLYPH;

const FOREGROUND: u32 = 0x00F0_F0F0;
const BACKGROUND: u32 = 0x0000_0000;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("failed to open window: {0}")]
    Window(#[from] minifb::Error),

    #[error("failed to read character ROM {path}: {source}")]
    Chargen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("character ROM {path} is {actual} bytes, expected {CHARGEN_SIZE}")]
    ChargenSize { path: PathBuf, actual: usize },
}

/// Printable form of one screen byte: the low 7 bits, control codes as space.
pub fn screen_char(byte: u8) -> char {
    match byte & 0x7F {
        c if c < 0x20 => ' ',
        c => c as char,
    }
}

/// Screen contents as 32 lines of 64 characters.
pub fn screen_lines(vram: &Vram) -> Vec<String> {
    vram.chunks(COLUMNS)
        .take(ROWS)
        .map(|row| row.iter().map(|&b| screen_char(b)).collect())
        .collect()
}

/// Load a 2 KiB character generator ROM: 256 glyphs, 8 bytes each, top row first.
pub fn load_chargen(path: &Path) -> Result<Vec<u8>, DisplayError> {
    let data = fs::read(path).map_err(|source| DisplayError::Chargen {
        path: path.to_path_buf(),
        source,
    })?;

    if data.len() != CHARGEN_SIZE {
        return Err(DisplayError::ChargenSize {
            path: path.to_path_buf(),
            actual: data.len(),
        });
    }

    Ok(data)
}

/// Rasterize video RAM into a `WIDTH × HEIGHT` framebuffer.
///
/// Without a character ROM, non-blank cells are drawn as outlined boxes.
pub fn render(vram: &Vram, chargen: Option<&[u8]>, framebuffer: &mut [u32]) {
    for (cell, &code) in vram.iter().enumerate().take(COLUMNS * ROWS) {
        let (col, row) = (cell % COLUMNS, cell / COLUMNS);

        for y in 0..GLYPH {
            let bits = match chargen {
                Some(rom) => rom[code as usize * GLYPH + y],
                None if screen_char(code) == ' ' => 0x00,
                None if y == 0 || y == GLYPH - 1 => 0xFF,
                None => 0x81,
            };

            let line = (row * GLYPH + y) * WIDTH + col * GLYPH;
            for x in 0..GLYPH {
                framebuffer[line + x] = if bits & (0x80 >> x) != 0 {
                    FOREGROUND
                } else {
                    BACKGROUND
                };
            }
        }
    }
}

/// What a physical key types on a US layout, given the shift state.
fn translate(key: HostKey, shift: bool) -> Option<Key> {
    let pick = |plain: char, shifted: char| Some(Key::Char(if shift { shifted } else { plain }));

    match key {
        HostKey::A => pick('a', 'A'),
        HostKey::B => pick('b', 'B'),
        HostKey::C => pick('c', 'C'),
        HostKey::D => pick('d', 'D'),
        HostKey::E => pick('e', 'E'),
        HostKey::F => pick('f', 'F'),
        HostKey::G => pick('g', 'G'),
        HostKey::H => pick('h', 'H'),
        HostKey::I => pick('i', 'I'),
        HostKey::J => pick('j', 'J'),
        HostKey::K => pick('k', 'K'),
        HostKey::L => pick('l', 'L'),
        HostKey::M => pick('m', 'M'),
        HostKey::N => pick('n', 'N'),
        HostKey::O => pick('o', 'O'),
        HostKey::P => pick('p', 'P'),
        HostKey::Q => pick('q', 'Q'),
        HostKey::R => pick('r', 'R'),
        HostKey::S => pick('s', 'S'),
        HostKey::T => pick('t', 'T'),
        HostKey::U => pick('u', 'U'),
        HostKey::V => pick('v', 'V'),
        HostKey::W => pick('w', 'W'),
        HostKey::X => pick('x', 'X'),
        HostKey::Y => pick('y', 'Y'),
        HostKey::Z => pick('z', 'Z'),

        HostKey::Key1 => pick('1', '!'),
        HostKey::Key2 => pick('2', '@'),
        HostKey::Key3 => pick('3', '#'),
        HostKey::Key4 => pick('4', '$'),
        HostKey::Key5 => pick('5', '%'),
        HostKey::Key6 => pick('6', '^'),
        HostKey::Key7 => pick('7', '&'),
        HostKey::Key8 => pick('8', '*'),
        HostKey::Key9 => pick('9', '('),
        HostKey::Key0 => pick('0', ')'),

        HostKey::Apostrophe => pick('\'', '"'),
        HostKey::Semicolon => pick(';', ':'),
        HostKey::Comma => pick(',', '<'),
        HostKey::Period => pick('.', '>'),
        HostKey::Slash => pick('/', '?'),
        HostKey::Minus => pick('-', '_'),
        HostKey::Equal => pick('=', '+'),
        HostKey::Space => Some(Key::Char(' ')),

        HostKey::Enter => Some(Key::Enter),
        HostKey::Backspace => Some(Key::Backspace),
        HostKey::Escape => Some(Key::Escape),
        HostKey::CapsLock => Some(Key::CapsLock),
        HostKey::LeftCtrl | HostKey::RightCtrl => Some(Key::Control),
        _ => None,
    }
}

fn window_scale(scale: usize) -> Scale {
    match scale {
        1 => Scale::X1,
        2 => Scale::X2,
        4 => Scale::X4,
        8 => Scale::X8,
        _ => Scale::FitScreen,
    }
}

/// minifb window frontend. F12 or closing the window quits.
pub struct WindowHost {
    window: Window,
    framebuffer: Vec<u32>,
    chargen: Option<Vec<u8>>,
    /// Emulated key each held physical key produced, so release matches press.
    held: Vec<(HostKey, Key)>,
    redraw: bool,
}

impl WindowHost {
    pub fn new(scale: usize, chargen: Option<Vec<u8>>) -> Result<Self, DisplayError> {
        let mut window = Window::new(
            "Superboard",
            WIDTH,
            HEIGHT,
            WindowOptions {
                resize: true,
                scale: window_scale(scale),
                scale_mode: minifb::ScaleMode::AspectRatioStretch,
                ..WindowOptions::default()
            },
        )?;

        // the scheduler paces itself
        window.set_target_fps(0);

        Ok(WindowHost {
            window,
            framebuffer: vec![BACKGROUND; WIDTH * HEIGHT],
            chargen,
            held: Vec::new(),
            redraw: true,
        })
    }

    fn forward_keys(&mut self, keyboard: &mut Keyboard) {
        let shift = self.window.is_key_down(HostKey::LeftShift)
            || self.window.is_key_down(HostKey::RightShift);

        for host_key in self.window.get_keys_released() {
            if let Some(i) = self.held.iter().position(|(held, _)| *held == host_key) {
                let (_, key) = self.held.swap_remove(i);
                keyboard.key_up(key);
            }
        }

        for host_key in self.window.get_keys_pressed(KeyRepeat::No) {
            if let Some(key) = translate(host_key, shift) {
                self.held.push((host_key, key));
                keyboard.key_down(key);
            }
        }
    }
}

impl Display for WindowHost {
    fn screen_changed(&mut self, vram: &Vram) {
        render(vram, self.chargen.as_deref(), &mut self.framebuffer);
        self.redraw = true;
    }
}

impl Host for WindowHost {
    fn poll(&mut self, keyboard: &mut Keyboard) -> bool {
        if !self.window.is_open() || self.window.is_key_down(HostKey::F12) {
            return false;
        }

        let updated = if self.redraw {
            self.redraw = false;
            self.window
                .update_with_buffer(&self.framebuffer, WIDTH, HEIGHT)
                .map_err(|e| log::error!("window update failed: {e}"))
                .is_ok()
        } else {
            self.window.update();
            true
        };

        self.forward_keys(keyboard);
        updated
    }
}

/// Text frontend: prints the whole screen to stdout on every change.
pub struct TerminalHost<W: Write> {
    out: W,
}

impl TerminalHost<io::Stdout> {
    pub fn stdout() -> Self {
        TerminalHost { out: io::stdout() }
    }
}

impl<W: Write> TerminalHost<W> {
    pub fn new(out: W) -> Self {
        TerminalHost { out }
    }

    fn draw(&mut self, vram: &Vram) -> io::Result<()> {
        // home the cursor and overwrite the previous frame
        write!(self.out, "\x1b[H")?;
        writeln!(self.out, "{}", Green.bold().paint("SUPERBOARD"))?;
        for line in screen_lines(vram) {
            writeln!(self.out, "{}", line.trim_end())?;
        }
        self.out.flush()
    }
}

impl<W: Write> Display for TerminalHost<W> {
    fn screen_changed(&mut self, vram: &Vram) {
        if let Err(e) = self.draw(vram) {
            log::warn!("terminal redraw failed: {e}");
        }
    }
}

impl<W: Write> Host for TerminalHost<W> {
    fn poll(&mut self, _keyboard: &mut Keyboard) -> bool {
        true
    }
}
