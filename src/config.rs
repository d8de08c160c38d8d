//! Command-line configuration.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use thiserror::Error;

use crate::{rom::RomImage, scheduler::Clock};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frontend {
    /// minifb window with keyboard input.
    Window,
    /// Text screen on stdout, no input.
    Terminal,
}

#[derive(Parser, Debug)]
#[command(
    name = "superboard",
    about = "Ohio Scientific Superboard II emulator (6502, 1 MHz, SYN600 monitor + OSI BASIC)."
)]
pub struct Args {
    /// Directory holding the ROM images.
    #[arg(long, value_name = "DIR", default_value = "roms")]
    pub rom_dir: PathBuf,

    /// Monitor ROM file name inside --rom-dir.
    #[arg(long, value_name = "FILE", default_value = "SYN600.ROM")]
    pub monitor: String,

    /// BASIC ROM file name inside --rom-dir.
    #[arg(long, value_name = "FILE", default_value = "OSIBASIC.ROM")]
    pub basic: String,

    /// 2 KiB character generator ROM for the window frontend.
    #[arg(long, value_name = "PATH")]
    pub chargen: Option<PathBuf>,

    /// Emulated clock rate.
    #[arg(long, value_name = "HZ", default_value_t = 1_000_000)]
    pub clock_hz: u64,

    /// Scheduling tick length in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 10)]
    pub tick_ms: u64,

    #[arg(long, value_enum, default_value_t = Frontend::Window)]
    pub frontend: Frontend,

    /// Window pixel scale (1, 2, 4 or 8; anything else fits the screen).
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub scale: usize,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--clock-hz must be greater than zero")]
    ZeroClock,

    #[error("--tick-ms must be greater than zero")]
    ZeroTick,

    #[error("--scale must be greater than zero")]
    ZeroScale,
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rom_dir: PathBuf,
    pub images: Vec<RomImage>,
    pub chargen: Option<PathBuf>,
    pub clock: Clock,
    pub frontend: Frontend,
    pub scale: usize,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.clock_hz == 0 {
            return Err(ConfigError::ZeroClock);
        }
        if args.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        if args.scale == 0 {
            return Err(ConfigError::ZeroScale);
        }

        Ok(Config {
            rom_dir: args.rom_dir,
            images: vec![RomImage::monitor(args.monitor), RomImage::basic(args.basic)],
            chargen: args.chargen,
            clock: Clock {
                rate_hz: args.clock_hz,
                tick: Duration::from_millis(args.tick_ms),
            },
            frontend: args.frontend,
            scale: args.scale,
        })
    }
}

impl Config {
    /// Parse the process arguments. Exits with usage on malformed input.
    pub fn from_env() -> Result<Self, ConfigError> {
        Args::parse().try_into()
    }
}
