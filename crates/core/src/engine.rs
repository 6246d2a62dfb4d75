//! Execution engine contract and a stand-in serial monitor.
//!
//! The instruction engine is an external collaborator. It never holds the
//! machine: each [`Engine::step`] receives a [`Bus`] borrowed for the
//! duration of that step, exposing only memory and port access.

use crate::serial::{ACIA_CONTROL, ACIA_DATA, STATUS_RDRF};
use crate::RAM_START;

/// Memory and port access offered to the engine.
pub trait Bus {
    fn memory_read(&mut self, addr: u16) -> u8;
    fn memory_write(&mut self, addr: u16, value: u8);
    fn port_read(&mut self, port: u16) -> u8;
    fn port_write(&mut self, port: u16, value: u8);
}

/// Opaque stepping engine driven by the scheduler.
pub trait Engine {
    /// Return to the power-on state.
    fn reset(&mut self);
    /// Execute one unit of work, advancing the elapsed-cycle counter.
    fn step(&mut self, bus: &mut dyn Bus);
    /// Latch a maskable interrupt request.
    fn request_interrupt(&mut self);
    /// Cycles elapsed since the last [`Engine::reset_elapsed_cycles`].
    fn elapsed_cycles(&self) -> u64;
    fn reset_elapsed_cycles(&mut self);
}

/// Cycle cost of an idle step (HALT-like)
pub const IDLE_CYCLES: u64 = 4;
/// Cycle cost of transmitting one banner byte
pub const BANNER_CYCLES: u64 = 30;
/// Cycle cost of servicing one interrupt
pub const IRQ_CYCLES: u64 = 60;

/// Start of the monitor's line buffer in RAM
pub const LINE_BUF: u16 = RAM_START;
/// Line length byte, just below the end of the first RAM page
pub const LINE_LEN: u16 = RAM_START + 0xFF;
const LINE_MAX: u8 = 0xFE;

/// Minimal serial monitor standing in for a real instruction core.
///
/// After reset it transmits the NUL-terminated banner stored at 0x0000, then
/// idles. Each interrupt reads at most one byte from the ACIA and echoes it,
/// expanding CR to CR LF. The current input line is kept in RAM at
/// [`LINE_BUF`] with its length at [`LINE_LEN`].
pub struct EchoMonitor {
    /// Next banner byte to send, `None` once the banner is done
    banner: Option<u16>,
    irq_pending: bool,
    cycles: u64,
}

impl EchoMonitor {
    pub fn new() -> Self {
        EchoMonitor {
            banner: Some(0),
            irq_pending: false,
            cycles: 0,
        }
    }

    fn spend(&mut self, c: u64) {
        self.cycles += c;
    }

    fn service_irq(&mut self, bus: &mut dyn Bus) {
        self.irq_pending = false;
        if bus.port_read(ACIA_CONTROL as u16) & STATUS_RDRF == 0 {
            return;
        }
        let ch = bus.port_read(ACIA_DATA as u16);
        let len = bus.memory_read(LINE_LEN);
        match ch {
            b'\r' | b'\n' => {
                bus.port_write(ACIA_DATA as u16, b'\r');
                bus.port_write(ACIA_DATA as u16, b'\n');
                bus.memory_write(LINE_LEN, 0);
            }
            0x08 | 0x7F => {
                if len > 0 {
                    bus.port_write(ACIA_DATA as u16, 0x08);
                    bus.memory_write(LINE_LEN, len - 1);
                }
            }
            _ => {
                bus.port_write(ACIA_DATA as u16, ch);
                if len < LINE_MAX {
                    bus.memory_write(LINE_BUF + len as u16, ch);
                    bus.memory_write(LINE_LEN, len + 1);
                }
            }
        }
    }
}

impl Default for EchoMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for EchoMonitor {
    fn reset(&mut self) {
        *self = EchoMonitor::new();
    }

    fn step(&mut self, bus: &mut dyn Bus) {
        if let Some(addr) = self.banner {
            let b = bus.memory_read(addr);
            if b == 0 || addr >= RAM_START - 1 {
                self.banner = None;
            } else {
                bus.port_write(ACIA_DATA as u16, b);
                self.banner = Some(addr + 1);
            }
            self.spend(BANNER_CYCLES);
            return;
        }
        if self.irq_pending {
            self.service_irq(bus);
            self.spend(IRQ_CYCLES);
            return;
        }
        self.spend(IDLE_CYCLES);
    }

    fn request_interrupt(&mut self) {
        self.irq_pending = true;
    }

    fn elapsed_cycles(&self) -> u64 {
        self.cycles
    }

    fn reset_elapsed_cycles(&mut self) {
        self.cycles = 0;
    }
}
