//! # zterm-core
//!
//! Emulation core for a small 8-bit home computer with a serial terminal:
//! 64 KB address space with write-protected ROM below 0x8000, an ACIA on I/O
//! ports 0x80/0x81, a tick scheduler feeding cycle budgets to an execution
//! engine, and a colour character terminal that turns transmitted bytes into
//! draw intents.
//!
//! ## Architecture
//!
//! - [`Machine`] - Top-level machine that wires together memory, serial, engine and scheduler
//! - [`AddressSpace`] - 64 KB memory with a ROM write guard
//! - [`SerialAdapter`] - ACIA status/data ports, inbound keyboard queue, output sink
//! - [`Scheduler`] - Per-tick interrupt polling and cycle-budget stepping
//! - [`Engine`] / [`Bus`] - Contract between the machine and an instruction engine
//! - [`EchoMonitor`] - Stand-in engine: banner printer and line echo
//! - [`Terminal`] - Escape-sequence state machine, character grid, frame builder
//! - [`rom`] - ROM descriptors, sources and image sizing
//! - [`config`] - JSON machine configuration
//! - [`debugger`] - Access trace and memory viewer
//!
//! ## Tick
//!
//! A tick samples the inbound queue once. If anything is waiting, exactly one
//! interrupt is requested. The engine is then stepped until it has used the
//! tick's cycle budget; every byte it writes to the data port reaches the
//! output sink before the next step starts.

pub mod config;
pub mod debugger;
pub mod engine;
pub mod hex;
pub mod memory;
pub mod rom;
pub mod scheduler;
pub mod serial;
pub mod terminal;

use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

pub use config::MachineConfig;
pub use debugger::AccessTrace;
pub use engine::{Bus, EchoMonitor, Engine};
pub use memory::AddressSpace;
pub use rom::{FileRomSource, RomDescriptor, RomSource};
pub use scheduler::{Scheduler, TickConfig, TickReport};
pub use serial::{OutputSink, SerialAdapter, Transcript};
pub use terminal::Terminal;

/// Address space size (64 KB)
pub const MEMORY_SIZE: usize = 0x10000;
/// First writable address; everything below is ROM
pub const RAM_START: u16 = 0x8000;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("Intel HEX line {line}: {reason}")]
    Hex { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Bus view handed to the engine for the duration of one tick.
struct Board<'a, S> {
    memory: &'a mut AddressSpace,
    serial: &'a mut SerialAdapter<S>,
    trace: &'a mut AccessTrace,
}

impl<S: OutputSink> Bus for Board<'_, S> {
    #[inline(always)]
    fn memory_read(&mut self, addr: u16) -> u8 {
        self.trace.record_read(addr);
        self.memory.read(addr)
    }

    #[inline(always)]
    fn memory_write(&mut self, addr: u16, value: u8) {
        self.trace.record_write(addr);
        self.memory.write(addr, value as u32);
    }

    #[inline(always)]
    fn port_read(&mut self, port: u16) -> u8 {
        self.serial.read(port)
    }

    #[inline(always)]
    fn port_write(&mut self, port: u16, value: u8) {
        self.serial.write(port, value);
    }
}

/// Complete machine: memory, serial line, engine and scheduler.
pub struct Machine<E, S> {
    pub memory: AddressSpace,
    pub serial: SerialAdapter<S>,
    pub engine: E,
    pub scheduler: Scheduler,
    /// Last memory addresses touched by the engine
    pub trace: AccessTrace,
}

impl<E: Engine, S: OutputSink> Machine<E, S> {
    /// Build a machine from `config`. ROMs are not installed here; see
    /// [`Machine::install_roms`].
    pub fn new(config: &MachineConfig, engine: E, sink: S) -> Self {
        Machine {
            memory: AddressSpace::new(),
            serial: SerialAdapter::new(sink, config.limits.max_input_queue),
            engine,
            scheduler: Scheduler::new(config.tick_config()),
            trace: AccessTrace::new(),
        }
    }

    /// Copy fetched image bytes into memory, bypassing the ROM guard.
    ///
    /// The image is sized to `desc.size` first (zero-filled or truncated).
    /// Returns the number of bytes written.
    pub fn install_rom(&mut self, desc: &RomDescriptor, bytes: Vec<u8>) -> usize {
        if desc.start as usize >= MEMORY_SIZE {
            warn!(
                "ROM {} start {:#X} is outside the address space; skipped",
                desc.name, desc.start
            );
            return 0;
        }
        let image = rom::prepare_image(desc, bytes);
        let n = self.memory.load_image(&image, desc.start as u16);
        info!("installed ROM {} at {:04X} ({} bytes)", desc.name, desc.start, n);
        n
    }

    /// Fetch and install every ROM in order. Later images overwrite earlier
    /// ones where they overlap.
    pub fn install_roms(&mut self, roms: &[RomDescriptor], source: &dyn RomSource) -> usize {
        roms.iter()
            .map(|desc| {
                let bytes = source.fetch(&desc.locator);
                self.install_rom(desc, bytes)
            })
            .sum()
    }

    /// Reset the engine and clear RAM and pending input.
    ///
    /// ROM contents below the write guard are preserved.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.memory.clear_ram();
        self.serial.clear_input();
        self.trace = AccessTrace::new();
        debug!("machine reset");
    }

    /// Run one scheduler tick.
    pub fn tick(&mut self) -> TickReport {
        let pending = self.serial.rx_pending();
        let mut board = Board {
            memory: &mut self.memory,
            serial: &mut self.serial,
            trace: &mut self.trace,
        };
        self.scheduler.run_tick(&mut self.engine, &mut board, pending)
    }

    /// Arm the real-time tick timer.
    pub fn start(&mut self, now: Instant) {
        self.scheduler.start(now);
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Change tick period and budget, restarting a running timer from `now`.
    pub fn reconfigure(&mut self, config: TickConfig, now: Instant) {
        self.scheduler.reconfigure(config, now);
    }

    /// Run every tick that has come due by `now`. Returns how many ran.
    pub fn run_due(&mut self, now: Instant) -> u32 {
        let n = self.scheduler.due_ticks(now);
        for _ in 0..n {
            self.tick();
        }
        n
    }

    /// Queue raw keyboard bytes for the engine.
    pub fn send_input(&mut self, bytes: &[u8]) -> usize {
        self.serial.push_input(bytes)
    }

    /// Queue typed text for the engine.
    pub fn send_text(&mut self, text: &str) -> usize {
        self.serial.push_text(text)
    }

    pub fn sink(&self) -> &S {
        self.serial.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.serial.sink_mut()
    }

    /// Hex + ASCII dump of `length` bytes from `start`.
    pub fn dump_memory(&self, start: u16, length: usize) -> String {
        debugger::dump_memory(&self.memory.data, start, length)
    }

    /// One-line machine status for debug output.
    pub fn status(&self) -> String {
        format!(
            "tick {}  rx {}  dropped {}  guarded writes {}  {}",
            self.scheduler.ticks,
            self.serial.rx_len(),
            self.serial.dropped,
            self.memory.guarded_writes(),
            self.trace.summary()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn small_config() -> MachineConfig {
        MachineConfig { cycles_per_tick: 1000, ..MachineConfig::default() }
    }

    fn banner(text: &[u8]) -> (RomDescriptor, Vec<u8>) {
        let mut bytes = text.to_vec();
        bytes.push(0);
        let desc = RomDescriptor {
            name: "monitor".into(),
            start: 0,
            size: bytes.len() as u32,
            locator: "monitor.bin".into(),
        };
        (desc, bytes)
    }

    fn terminal_machine(text: &[u8]) -> Machine<EchoMonitor, Terminal> {
        let cfg = small_config();
        let term =
            Terminal::new(cfg.terminal.width, cfg.terminal.height, cfg.limits.max_escape_len);
        let mut m = Machine::new(&cfg, EchoMonitor::new(), term);
        let (desc, bytes) = banner(text);
        m.install_rom(&desc, bytes);
        m
    }

    #[test]
    fn test_banner_reaches_terminal() {
        let mut m = terminal_machine(b"Hello\r\nWorld");
        m.tick();
        assert_eq!(m.sink().row_text(0).trim_end(), "Hello");
        assert_eq!(m.sink().row_text(1).trim_end(), "World");
    }

    #[test]
    fn test_one_byte_echoed_per_tick() {
        let mut m = terminal_machine(b"");
        m.tick();
        assert_eq!(m.send_text("hi\r"), 3);
        let r = m.tick();
        assert!(r.interrupt);
        assert_eq!(m.serial.rx_len(), 2);
        m.tick();
        assert_eq!(m.sink().row_text(0).trim_end(), "hi");
        m.tick();
        assert_eq!(m.serial.rx_len(), 0);
        assert_eq!(m.sink().cursor().y, 1);
        let r = m.tick();
        assert!(!r.interrupt);
    }

    #[test]
    fn test_tick_uses_budget_then_resets() {
        let mut m = terminal_machine(b"");
        let r = m.tick();
        assert!(r.cycles >= 1000);
        assert!(!r.stalled);
        assert_eq!(m.engine.elapsed_cycles(), 0);
        assert_eq!(m.scheduler.ticks, 1);
    }

    #[test]
    fn test_engine_cannot_write_rom() {
        let mut m = terminal_machine(b"AB");
        let mut board = Board { memory: &mut m.memory, serial: &mut m.serial, trace: &mut m.trace };
        board.memory_write(0x0000, b'Z');
        board.memory_write(0x8000, b'Z');
        assert_eq!(m.memory.read(0x0000), b'A');
        assert_eq!(m.memory.read(0x8000), b'Z');
        assert_eq!(m.memory.guarded_writes(), 1);
        assert_eq!(m.trace.last_write, 0x8000);
    }

    #[test]
    fn test_line_buffer_in_ram() {
        let mut m = terminal_machine(b"");
        m.send_text("ok");
        for _ in 0..3 {
            m.tick();
        }
        assert_eq!(m.memory.read(engine::LINE_BUF), b'o');
        assert_eq!(m.memory.read(engine::LINE_BUF + 1), b'k');
        assert_eq!(m.memory.read(engine::LINE_LEN), 2);
        assert!(m.dump_memory(RAM_START, 16).contains("ok"));
    }

    #[test]
    fn test_install_roms_from_source() {
        let cfg = small_config();
        let mut m = Machine::new(&cfg, EchoMonitor::new(), Transcript::default());
        let mut src = HashMap::new();
        src.insert("a.bin".to_string(), vec![1u8, 2, 3]);
        let roms = vec![
            RomDescriptor { name: "a".into(), start: 0x10, size: 4, locator: "a.bin".into() },
            RomDescriptor { name: "gone".into(), start: 0x20, size: 2, locator: "missing".into() },
        ];
        assert_eq!(m.install_roms(&roms, &src), 6);
        assert_eq!(&m.memory.data[0x10..0x14], &[1, 2, 3, 0]);
        assert_eq!(&m.memory.data[0x20..0x22], &[0, 0]);
    }

    #[test]
    fn test_install_rom_outside_memory_skipped() {
        let mut m = Machine::new(&small_config(), EchoMonitor::new(), Transcript::default());
        let desc = RomDescriptor {
            name: "high".into(),
            start: 0x10000,
            size: 4,
            locator: "x".into(),
        };
        assert_eq!(m.install_rom(&desc, vec![1, 2, 3, 4]), 0);
        assert!(m.memory.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_closure_sink() {
        let cfg = small_config();
        let mut out = Vec::new();
        {
            let mut m = Machine::new(&cfg, EchoMonitor::new(), |b: u8| out.push(b));
            let (desc, bytes) = banner(b"READY");
            m.install_rom(&desc, bytes);
            m.tick();
        }
        assert_eq!(out, b"READY");
    }

    #[test]
    fn test_reset_keeps_rom_and_reprints_banner() {
        let mut m = Machine::new(&small_config(), EchoMonitor::new(), Transcript::default());
        let (desc, bytes) = banner(b"HI");
        m.install_rom(&desc, bytes);
        m.send_text("x");
        m.tick();
        m.tick();
        m.send_text("yz");
        m.reset();
        assert_eq!(m.serial.rx_len(), 0);
        assert_eq!(m.memory.read(engine::LINE_LEN), 0);
        assert_eq!(m.trace, AccessTrace::new());
        m.tick();
        assert_eq!(m.sink().0, b"HIxHI");
    }

    #[test]
    fn test_run_due() {
        let mut m = Machine::new(&small_config(), EchoMonitor::new(), Transcript::default());
        let t0 = Instant::now();
        assert_eq!(m.run_due(t0 + Duration::from_millis(50)), 0);
        m.start(t0);
        assert_eq!(m.run_due(t0 + Duration::from_millis(25)), 2);
        assert_eq!(m.scheduler.ticks, 2);
        m.reconfigure(TickConfig { period: Duration::from_millis(5), cycles_per_tick: 100 }, t0);
        assert_eq!(m.run_due(t0 + Duration::from_millis(10)), 2);
        m.stop();
        assert_eq!(m.run_due(t0 + Duration::from_secs(1)), 0);
    }

    #[test]
    fn test_status_line() {
        let mut m = terminal_machine(b"");
        m.tick();
        let s = m.status();
        assert!(s.starts_with("tick 1"));
        assert!(s.contains("last write FFFF"));
    }
}
