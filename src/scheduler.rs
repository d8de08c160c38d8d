//! Real-time pacing.
//!
//! The scheduler runs the CPU in ticks. A tick executes instructions until
//! the cycle budget for one tick duration is spent or the CPU halts, tells
//! the display once if video RAM changed, then sleeps for what is left of
//! the tick (at least 1 ms). A slow tick is never caught up.

use std::{
    thread,
    time::{Duration, Instant},
};

use log::{info, trace};

use crate::{
    bus::{Memory, Vram},
    cpu::cpu::CPU,
    keyboard::Keyboard,
    rom::{self, RomError, RomImage, RomSource},
};

pub const CLOCK_RATE_HZ: u64 = 1_000_000;
pub const TICK: Duration = Duration::from_millis(10);
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Receives screen change notifications.
pub trait Display {
    /// Video RAM changed during the last tick. Called at most once per tick.
    fn screen_changed(&mut self, vram: &Vram);
}

/// The application the emulator is embedded in.
pub trait Host: Display {
    /// Deliver pending input to the keyboard. Returns false once the host is gone.
    fn poll(&mut self, keyboard: &mut Keyboard) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub rate_hz: u64,
    pub tick: Duration,
}

impl Clock {
    /// Emulated cycles one tick may spend.
    pub fn cycles_per_tick(&self) -> u64 {
        (self.rate_hz as u128 * self.tick.as_nanos() / 1_000_000_000) as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock {
            rate_hz: CLOCK_RATE_HZ,
            tick: TICK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { cycles: u64, screen_changed: bool },
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The CPU halted; no further ticks.
    Halted,
    /// The host went away.
    Closed,
}

pub struct Scheduler {
    pub cpu: CPU<Memory>,
    clock: Clock,
    budget: u64,
}

impl Scheduler {
    pub fn new(clock: Clock) -> Self {
        Self::with_memory(Memory::new(), clock)
    }

    pub fn with_memory(memory: Memory, clock: Clock) -> Self {
        Scheduler {
            cpu: CPU::new(memory),
            clock,
            budget: clock.cycles_per_tick(),
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.cpu.bus
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.cpu.bus
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Install the ROM images and reset. On error nothing is installed and
    /// the CPU is left as it was.
    pub fn load(&mut self, source: &dyn RomSource, images: &[RomImage]) -> Result<(), RomError> {
        rom::load_into(&mut self.cpu.bus, source, images)?;
        self.cpu.reset();
        info!("booted at ${:04X}", self.cpu.regs.pc);
        Ok(())
    }

    /// Run one tick's worth of instructions. Always executes at least one step.
    pub fn tick(&mut self, display: &mut impl Display) -> TickOutcome {
        self.cpu.bus.clear_screen_writes();
        let start_cycles = self.cpu.cycles();

        loop {
            self.cpu.step();
            if self.cpu.is_halted() || self.cpu.cycles() - start_cycles >= self.budget {
                break;
            }
        }

        if self.cpu.is_halted() {
            return TickOutcome::Halted;
        }

        let screen_changed = self.cpu.bus.screen_writes();
        if screen_changed {
            display.screen_changed(&self.cpu.bus.vram());
        }

        TickOutcome::Running {
            cycles: self.cpu.cycles() - start_cycles,
            screen_changed,
        }
    }

    /// How long to wait before the next tick when this one took `elapsed`.
    pub fn next_delay(&self, elapsed: Duration) -> Duration {
        self.clock.tick.saturating_sub(elapsed).max(MIN_DELAY)
    }

    /// Tick until the CPU halts or the host goes away.
    pub fn run(&mut self, host: &mut impl Host) -> RunOutcome {
        loop {
            if !host.poll(&mut self.cpu.bus.keyboard) {
                return RunOutcome::Closed;
            }

            let start = Instant::now();
            let outcome = self.tick(&mut *host);
            let elapsed = start.elapsed();

            match outcome {
                TickOutcome::Halted => {
                    info!("CPU halted; stopping.");
                    return RunOutcome::Halted;
                }
                TickOutcome::Running { cycles, .. } => {
                    trace!("ran for {elapsed:?} [{cycles} cycles]");
                }
            }

            thread::sleep(self.next_delay(elapsed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::tests::MapSource;

    /// Counts notifications and keeps the last snapshot.
    #[derive(Default)]
    struct Screen {
        changes: usize,
        last: Option<Vram>,
        polls: usize,
        poll_limit: usize,
    }

    impl Display for Screen {
        fn screen_changed(&mut self, vram: &Vram) {
            self.changes += 1;
            self.last = Some(*vram);
        }
    }

    impl Host for Screen {
        fn poll(&mut self, _keyboard: &mut Keyboard) -> bool {
            self.polls += 1;
            self.polls <= self.poll_limit
        }
    }

    /// Memory with `program` at $0200 and the reset vector pointing there.
    fn memory_with(program: &[u8]) -> Memory {
        let mut memory = Memory::new();
        memory.initialize_region(program, 0x0200);
        memory.initialize_region(&[0x00, 0x02], 0xFFFC);
        memory
    }

    fn small_clock() -> Clock {
        // 100 cycles per tick
        Clock {
            rate_hz: 10_000,
            tick: Duration::from_millis(10),
        }
    }

    #[test]
    fn default_budget_is_ten_thousand_cycles() {
        assert_eq!(Clock::default().cycles_per_tick(), 10_000);
    }

    #[test]
    fn tick_runs_until_budget_spent() {
        // JMP $0200 forever, 3 cycles each
        let mut scheduler = Scheduler::with_memory(memory_with(&[0x4C, 0x00, 0x02]), small_clock());
        let mut screen = Screen::default();

        let outcome = scheduler.tick(&mut screen);

        // 34 * 3 = 102 is the first total at or past 100
        assert_eq!(
            outcome,
            TickOutcome::Running {
                cycles: 102,
                screen_changed: false
            }
        );
        assert_eq!(screen.changes, 0);
    }

    #[test]
    fn screen_change_notified_once_per_tick() {
        // loop: STA $D000 ; INC $D001 ; JMP loop
        let program = [0x8D, 0x00, 0xD0, 0xEE, 0x01, 0xD0, 0x4C, 0x00, 0x02];
        let mut scheduler = Scheduler::with_memory(memory_with(&program), small_clock());
        let mut screen = Screen::default();

        let outcome = scheduler.tick(&mut screen);

        assert!(matches!(
            outcome,
            TickOutcome::Running {
                screen_changed: true,
                ..
            }
        ));
        assert_eq!(screen.changes, 1);
        let vram = screen.last.unwrap();
        assert_ne!(vram[1], 0);
    }

    #[test]
    fn dirty_flag_cleared_at_start_of_each_tick() {
        let mut scheduler = Scheduler::with_memory(memory_with(&[0x4C, 0x00, 0x02]), small_clock());
        scheduler.memory_mut().write_byte(0xD000, 0x41);
        let mut screen = Screen::default();

        scheduler.tick(&mut screen);

        assert_eq!(screen.changes, 0);
    }

    #[test]
    fn halt_ends_tick_without_notification() {
        // STA $D000 then invalid opcode $02
        let program = [0x8D, 0x00, 0xD0, 0x02];
        let mut scheduler = Scheduler::with_memory(memory_with(&program), small_clock());
        let mut screen = Screen::default();

        assert_eq!(scheduler.tick(&mut screen), TickOutcome::Halted);
        assert_eq!(screen.changes, 0);
        assert_eq!(scheduler.cpu.cycles(), 4);
    }

    #[test]
    fn run_stops_when_cpu_halts() {
        let mut scheduler = Scheduler::with_memory(memory_with(&[0xEA, 0xEA, 0x02]), small_clock());
        let mut host = Screen {
            poll_limit: usize::MAX,
            ..Screen::default()
        };

        assert_eq!(scheduler.run(&mut host), RunOutcome::Halted);
        assert_eq!(host.polls, 1);
    }

    #[test]
    fn run_stops_when_host_closes() {
        let mut scheduler = Scheduler::with_memory(memory_with(&[0x4C, 0x00, 0x02]), small_clock());
        let mut host = Screen {
            poll_limit: 2,
            ..Screen::default()
        };

        assert_eq!(scheduler.run(&mut host), RunOutcome::Closed);
        assert_eq!(host.polls, 3);
        assert!(!scheduler.cpu.is_halted());
    }

    #[test]
    fn next_delay_fills_remaining_tick() {
        let scheduler = Scheduler::new(Clock::default());

        assert_eq!(scheduler.next_delay(Duration::from_millis(3)), Duration::from_millis(7));
        assert_eq!(scheduler.next_delay(Duration::ZERO), Duration::from_millis(10));
    }

    #[test]
    fn next_delay_never_below_one_millisecond() {
        let scheduler = Scheduler::new(Clock::default());

        assert_eq!(scheduler.next_delay(Duration::from_millis(10)), MIN_DELAY);
        assert_eq!(scheduler.next_delay(Duration::from_millis(25)), MIN_DELAY);
    }

    #[test]
    fn load_installs_roms_and_resets_from_vector() {
        let mut monitor = vec![0xEA; 0x400];
        // reset vector lives in the last bytes of the monitor image
        monitor[0x3FC] = 0x00;
        monitor[0x3FD] = 0xFE;
        let source = MapSource::default()
            .with("SYN600.ROM", monitor)
            .with("OSIBASIC.ROM", vec![0x60; 0x2000]);
        let mut scheduler = Scheduler::new(Clock::default());

        scheduler
            .load(
                &source,
                &[RomImage::monitor("SYN600.ROM"), RomImage::basic("OSIBASIC.ROM")],
            )
            .unwrap();

        assert_eq!(scheduler.cpu.regs.pc, 0xFE00);
        assert_eq!(scheduler.memory().vram(), [0; crate::bus::VRAM_SIZE]);
        assert_eq!(scheduler.cpu.bus.read_byte(0xA000), 0x60);
    }

    #[test]
    fn failed_load_does_not_reset() {
        let source = MapSource::default().with("SYN600.ROM", vec![0; 0x400]);
        let mut scheduler = Scheduler::with_memory(memory_with(&[0xEA]), Clock::default());
        scheduler.cpu.step();

        let result = scheduler.load(
            &source,
            &[RomImage::monitor("SYN600.ROM"), RomImage::basic("OSIBASIC.ROM")],
        );

        assert!(result.is_err());
        assert_eq!(scheduler.cpu.regs.pc, 0x0201);
        assert_eq!(scheduler.cpu.cycles(), 2);
    }
}
