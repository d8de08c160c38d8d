//! Superboard emulator entry point.
//!
//! Loads the monitor and BASIC ROMs and runs the machine in a window (or on
//! the terminal) until the CPU halts or the frontend is closed.
//! Usage: superboard [--rom-dir DIR] [--frontend window|terminal] ...

use std::process::ExitCode;

use ansi_term::Colour::Red;
use log::{error, info};
use thiserror::Error;

use superboard::{
    config::{Config, ConfigError, Frontend},
    display::{self, DisplayError, TerminalHost, WindowHost},
    rom::{FileRomSource, RomError},
    scheduler::{RunOutcome, Scheduler},
};

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rom(#[from] RomError),

    #[error(transparent)]
    Display(#[from] DisplayError),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", Red.bold().paint("ERROR"));
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let mut scheduler = Scheduler::new(config.clock);
    scheduler.load(&FileRomSource::new(&config.rom_dir), &config.images)?;

    info!(
        "running at {} Hz, {} cycles per {:?} tick",
        config.clock.rate_hz,
        config.clock.cycles_per_tick(),
        config.clock.tick
    );

    let outcome = match config.frontend {
        Frontend::Window => {
            let chargen = config
                .chargen
                .as_deref()
                .map(display::load_chargen)
                .transpose()?;
            let mut host = WindowHost::new(config.scale, chargen)?;
            scheduler.run(&mut host)
        }
        Frontend::Terminal => scheduler.run(&mut TerminalHost::stdout()),
    };

    match outcome {
        RunOutcome::Halted => {
            if let Some(fault) = scheduler.cpu.fault() {
                info!("stopped after {} cycles: {fault}", scheduler.cpu.cycles());
            }
        }
        RunOutcome::Closed => info!("frontend closed"),
    }

    Ok(())
}
