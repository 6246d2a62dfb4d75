//! Debugging facilities.
//!
//! - **Access trace**: last memory read/write addresses and access counts
//! - **Memory viewer**: hex + ASCII dump of any address-space region
//!
//! The trace is updated on every bus access the engine makes.

/// Address recorded before any access has happened
pub const NO_ACCESS: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessTrace {
    pub last_read: u16,
    pub last_write: u16,
    pub reads: u64,
    pub writes: u64,
}

impl AccessTrace {
    pub fn new() -> Self {
        AccessTrace { last_read: NO_ACCESS, last_write: NO_ACCESS, reads: 0, writes: 0 }
    }

    #[inline]
    pub fn record_read(&mut self, addr: u16) {
        self.last_read = addr;
        self.reads += 1;
    }

    #[inline]
    pub fn record_write(&mut self, addr: u16) {
        self.last_write = addr;
        self.writes += 1;
    }

    pub fn summary(&self) -> String {
        format!(
            "last read {:04X}  last write {:04X}  reads={} writes={}",
            self.last_read, self.last_write, self.reads, self.writes
        )
    }
}

impl Default for AccessTrace {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Memory Viewer ──────────────────────────────────────────────────────────

/// Format a hex + ASCII dump, 16 bytes per line.
pub fn dump_memory(data: &[u8], start: u16, length: usize) -> String {
    let mut s = String::new();
    let start = start as usize;
    let end = start.saturating_add(length).min(data.len());
    let mut addr = start;
    while addr < end {
        let line_end = (addr + 16).min(end);
        s.push_str(&format!("{:04X}: ", addr));
        for i in addr..addr + 16 {
            if i < line_end {
                s.push_str(&format!("{:02X} ", data[i]));
            } else {
                s.push_str("   ");
            }
            if i == addr + 7 {
                s.push(' ');
            }
        }
        s.push(' ');
        s.extend(data[addr..line_end].iter().map(|&c| {
            if (0x20..0x7F).contains(&c) { c as char } else { '.' }
        }));
        s.push('\n');
        addr += 16;
    }
    s
}
