//! Tick scheduler.
//!
//! One tick polls the inbound queue, raises at most one interrupt, and steps
//! the engine until its elapsed-cycle counter reaches the budget. The tick
//! itself is independent of wall-clock time ([`Scheduler::run_tick`]); the
//! real-time driver ([`Scheduler::due_ticks`]) only decides how many ticks a
//! caller should run for a given `Instant`.

use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::engine::{Bus, Engine};

/// Ticks the real-time driver will report at once before giving up on catching up
pub const MAX_CATCH_UP: u32 = 8;

/// Tick period and per-tick cycle budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    pub period: Duration,
    pub cycles_per_tick: u64,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// An interrupt was requested at tick start
    pub interrupt: bool,
    /// Engine steps executed
    pub steps: u64,
    /// Elapsed cycles at tick end, before the counter was cleared
    pub cycles: u64,
    /// Tick ended early because a step did not advance the cycle counter
    pub stalled: bool,
}

/// Armed periodic timer.
#[derive(Debug, Clone, Copy)]
struct TickTimer {
    next_due: Instant,
}

pub struct Scheduler {
    config: TickConfig,
    timer: Option<TickTimer>,
    /// Ticks completed since creation
    pub ticks: u64,
}

impl Scheduler {
    pub fn new(config: TickConfig) -> Self {
        Scheduler { config, timer: None, ticks: 0 }
    }

    pub fn config(&self) -> TickConfig {
        self.config
    }

    /// Run one tick against `engine`.
    ///
    /// `input_pending` is sampled by the caller at tick start; one interrupt is
    /// raised for the whole tick no matter how many bytes are queued.
    pub fn run_tick<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        bus: &mut dyn Bus,
        input_pending: bool,
    ) -> TickReport {
        let mut report = TickReport::default();
        if input_pending {
            engine.request_interrupt();
            report.interrupt = true;
        }

        let budget = self.config.cycles_per_tick;
        while engine.elapsed_cycles() < budget {
            let before = engine.elapsed_cycles();
            engine.step(bus);
            report.steps += 1;
            if engine.elapsed_cycles() <= before {
                warn!("engine step made no progress at {} cycles; ending tick early", before);
                report.stalled = true;
                break;
            }
        }

        report.cycles = engine.elapsed_cycles();
        engine.reset_elapsed_cycles();
        self.ticks += 1;
        trace!(tick = self.ticks, steps = report.steps, cycles = report.cycles, "tick");
        report
    }

    /// Arm the timer. Any previously armed timer is cancelled first.
    pub fn start(&mut self, now: Instant) {
        self.timer = Some(TickTimer { next_due: now + self.config.period });
    }

    /// Disarm the timer.
    pub fn stop(&mut self) {
        self.timer = None;
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Install a new period and budget. A running timer is cancelled and
    /// restarted from `now`; a stopped one stays stopped.
    pub fn reconfigure(&mut self, config: TickConfig, now: Instant) {
        self.config = config;
        if self.timer.is_some() {
            self.start(now);
        }
    }

    /// Number of ticks that have come due by `now`.
    ///
    /// Advances the deadline by one period per reported tick. When more than
    /// [`MAX_CATCH_UP`] ticks are overdue the backlog is dropped and the timer
    /// resynchronises to `now`.
    pub fn due_ticks(&mut self, now: Instant) -> u32 {
        let period = self.config.period;
        let Some(timer) = self.timer.as_mut() else {
            return 0;
        };
        if period.is_zero() {
            return 0;
        }
        let mut n = 0;
        while timer.next_due <= now && n < MAX_CATCH_UP {
            timer.next_due += period;
            n += 1;
        }
        if timer.next_due <= now {
            warn!("scheduler fell behind; skipping overdue ticks");
            timer.next_due = now + period;
        }
        n
    }
}
