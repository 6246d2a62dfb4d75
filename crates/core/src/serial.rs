//! ACIA-style serial adapter on two I/O ports.
//!
//! Port numbers are masked to their low byte before dispatch:
//!
//! | Port | Read                           | Write               |
//! |------|--------------------------------|---------------------|
//! | 0x80 | status flags (non-destructive) | ignored             |
//! | 0x81 | pop next received byte, or 0   | transmit one byte   |
//!
//! Status bits: RDRF (bit 0) tracks the inbound queue; TDRE, DCD and CTS
//! (bits 1–3) are always set, so the line looks permanently connected and
//! ready to transmit.

use std::collections::VecDeque;

use tracing::warn;

/// ACIA control/status port
pub const ACIA_CONTROL: u8 = 0x80;
/// ACIA data port
pub const ACIA_DATA: u8 = 0x81;

/// Receive data register full
pub const STATUS_RDRF: u8 = 0x01;
/// Transmit data register empty
pub const STATUS_TDRE: u8 = 0x02;
/// Data carrier detect
pub const STATUS_DCD: u8 = 0x04;
/// Clear to send
pub const STATUS_CTS: u8 = 0x08;

/// Receiver of transmitted characters. Called exactly once per data-port write.
pub trait OutputSink {
    fn emit(&mut self, byte: u8);
}

impl<F: FnMut(u8)> OutputSink for F {
    fn emit(&mut self, byte: u8) {
        self(byte)
    }
}

/// Sink that records every transmitted byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript(pub Vec<u8>);

impl OutputSink for Transcript {
    fn emit(&mut self, byte: u8) {
        self.0.push(byte);
    }
}

/// Serial adapter bridging the inbound keyboard queue and an output sink.
pub struct SerialAdapter<S> {
    rx: VecDeque<u8>,
    /// Bytes the inbound queue may hold before further input is dropped
    max_rx: usize,
    /// Bytes dropped because the queue was full
    pub dropped: u64,
    sink: S,
}

impl<S: OutputSink> SerialAdapter<S> {
    pub fn new(sink: S, max_rx: usize) -> Self {
        SerialAdapter { rx: VecDeque::new(), max_rx, dropped: 0, sink }
    }

    /// Read an I/O port.
    pub fn read(&mut self, port: u16) -> u8 {
        match (port & 0xFF) as u8 {
            ACIA_DATA => self.rx.pop_front().unwrap_or(0),
            ACIA_CONTROL => self.status(),
            _ => 0,
        }
    }

    /// Write an I/O port.
    pub fn write(&mut self, port: u16, value: u8) {
        if (port & 0xFF) as u8 == ACIA_DATA {
            self.sink.emit(value);
        }
    }

    /// Status byte as seen on the control port.
    pub fn status(&self) -> u8 {
        let mut s = STATUS_TDRE | STATUS_DCD | STATUS_CTS;
        if !self.rx.is_empty() {
            s |= STATUS_RDRF;
        }
        s
    }

    /// Append raw bytes to the inbound queue. Returns how many were accepted.
    pub fn push_input(&mut self, bytes: &[u8]) -> usize {
        let room = self.max_rx.saturating_sub(self.rx.len());
        let n = bytes.len().min(room);
        self.rx.extend(&bytes[..n]);
        if n < bytes.len() {
            let lost = (bytes.len() - n) as u64;
            self.dropped += lost;
            warn!("serial input queue full ({} bytes), dropped {} bytes", self.max_rx, lost);
        }
        n
    }

    /// Append text to the inbound queue, one byte per character.
    ///
    /// Characters above U+00FF are sent as their low byte.
    pub fn push_text(&mut self, text: &str) -> usize {
        let bytes: Vec<u8> = text.chars().map(|c| (c as u32 & 0xFF) as u8).collect();
        self.push_input(&bytes)
    }

    /// True if at least one received byte is waiting.
    pub fn rx_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }

    pub fn clear_input(&mut self) {
        self.rx.clear();
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> SerialAdapter<Transcript> {
        SerialAdapter::new(Transcript::default(), 16)
    }

    #[test]
    fn test_data_write_emits_in_order() {
        let mut acia = adapter();
        acia.write(ACIA_DATA as u16, 72);
        acia.write(ACIA_DATA as u16, 105);
        assert_eq!(acia.sink().0, vec![72, 105]);
    }

    #[test]
    fn test_closure_sink_called_once_per_write() {
        let mut seen = Vec::new();
        {
            let mut acia = SerialAdapter::new(|b: u8| seen.push(b), 16);
            acia.write(0x81, b'H');
            acia.write(0x81, b'i');
            acia.write(0x80, b'!');
        }
        assert_eq!(seen, b"Hi");
    }

    #[test]
    fn test_data_read_pops_fifo() {
        let mut acia = adapter();
        acia.push_input(&[65, 66]);
        assert_eq!(acia.read(0x81), 65);
        assert_eq!(acia.read(0x81), 66);
        assert_eq!(acia.read(0x81), 0);
    }

    #[test]
    fn test_status_flags() {
        let mut acia = adapter();
        assert_eq!(acia.read(0x80), 0x0E);
        acia.push_text("x");
        assert_eq!(acia.read(0x80), 0x0F);
        // polling the control port does not consume input
        assert_eq!(acia.read(0x80), 0x0F);
        assert_eq!(acia.rx_len(), 1);
    }

    #[test]
    fn test_port_masked_to_low_byte() {
        let mut acia = adapter();
        acia.push_input(&[7]);
        assert_eq!(acia.read(0x1280), 0x0F);
        assert_eq!(acia.read(0xFF81), 7);
        acia.write(0x3481, b'z');
        assert_eq!(acia.sink().0, vec![b'z']);
    }

    #[test]
    fn test_unknown_ports() {
        let mut acia = adapter();
        acia.push_input(&[1]);
        assert_eq!(acia.read(0x82), 0);
        acia.write(0x82, 5);
        assert!(acia.sink().0.is_empty());
        assert_eq!(acia.rx_len(), 1);
    }

    #[test]
    fn test_input_limit() {
        let mut acia = SerialAdapter::new(Transcript::default(), 3);
        assert_eq!(acia.push_text("abcde"), 3);
        assert_eq!(acia.dropped, 2);
        assert_eq!(acia.read(0x81), b'a');
        assert_eq!(acia.push_input(&[b'f']), 1);
        assert_eq!(acia.rx_len(), 3);
    }
}
