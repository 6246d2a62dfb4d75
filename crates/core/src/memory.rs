//! 64 KB address space with a ROM/RAM write guard.
//!
//! | Address Range | Content                                   |
//! |---------------|-------------------------------------------|
//! | 0x0000–0x7FFF | ROM (writes from the engine are dropped)  |
//! | 0x8000–0xFFFF | RAM                                       |
//!
//! ROM images are installed with [`AddressSpace::load_image`], which ignores
//! the guard. Nothing in here fails: guarded or out-of-range writes are
//! absorbed and only leave a diagnostic behind.

use tracing::{debug, warn};

use crate::{MEMORY_SIZE, RAM_START};

/// Flat 64 KB memory map.
pub struct AddressSpace {
    /// Backing store, always exactly [`MEMORY_SIZE`] bytes
    pub data: Vec<u8>,
    /// Lowest writable address
    boundary: u16,
    /// Writes dropped by the guard since power-on
    guarded_writes: u64,
}

impl AddressSpace {
    pub fn new() -> Self {
        AddressSpace {
            data: vec![0u8; MEMORY_SIZE],
            boundary: RAM_START,
            guarded_writes: 0,
        }
    }

    #[inline(always)]
    pub fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    /// Write a byte. Only the low 8 bits of `value` are stored; writes below
    /// the boundary are dropped.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u32) {
        if addr < self.boundary {
            self.guarded_writes += 1;
            debug!("no RAM at address {:04X}, write of {:02X} dropped", addr, value & 0xFF);
            return;
        }
        self.data[addr as usize] = (value & 0xFF) as u8;
    }

    /// Copy `bytes` into memory starting at `start`, bypassing the write guard.
    ///
    /// Returns the number of bytes actually stored. Bytes that would land past
    /// 0xFFFF are dropped.
    pub fn load_image(&mut self, bytes: &[u8], start: u16) -> usize {
        let start = start as usize;
        let room = MEMORY_SIZE - start;
        let n = bytes.len().min(room);
        self.data[start..start + n].copy_from_slice(&bytes[..n]);
        if n < bytes.len() {
            warn!(
                "image at {:04X} truncated: {} of {} bytes fit below the top of memory",
                start, n, bytes.len()
            );
        }
        n
    }

    /// Lowest address the engine may write.
    pub fn boundary(&self) -> u16 {
        self.boundary
    }

    /// Number of writes the guard has dropped.
    pub fn guarded_writes(&self) -> u64 {
        self.guarded_writes
    }

    /// Clear RAM, leaving installed ROM content untouched.
    pub fn clear_ram(&mut self) {
        let b = self.boundary as usize;
        self.data[b..].fill(0);
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_size_and_boundary() {
        let mem = AddressSpace::new();
        assert_eq!(mem.data.len(), 65536);
        assert_eq!(mem.boundary(), 0x8000);
    }

    #[test]
    fn test_write_masks_to_byte() {
        let mut mem = AddressSpace::new();
        mem.write(0x9000, 0x1234);
        assert_eq!(mem.read(0x9000), 0x34);
    }

    #[test]
    fn test_guarded_write_counts() {
        let mut mem = AddressSpace::new();
        mem.write(0x7FFF, 0xAA);
        mem.write(0x0000, 0xBB);
        assert_eq!(mem.read(0x7FFF), 0);
        assert_eq!(mem.guarded_writes(), 2);
        mem.write(0x8000, 0xCC);
        assert_eq!(mem.read(0x8000), 0xCC);
        assert_eq!(mem.guarded_writes(), 2);
    }

    #[test]
    fn test_load_image_bypasses_guard() {
        let mut mem = AddressSpace::new();
        let n = mem.load_image(&[1, 2, 3, 4], 0x7FFE);
        assert_eq!(n, 4);
        assert_eq!(mem.read(0x7FFD), 0);
        assert_eq!(mem.read(0x7FFE), 1);
        assert_eq!(mem.read(0x7FFF), 2);
        assert_eq!(mem.read(0x8000), 3);
        assert_eq!(mem.read(0x8001), 4);
        assert_eq!(mem.read(0x8002), 0);
    }

    #[test]
    fn test_load_image_truncates_at_top() {
        let mut mem = AddressSpace::new();
        let n = mem.load_image(&[9, 9, 9, 9], 0xFFFE);
        assert_eq!(n, 2);
        assert_eq!(mem.read(0xFFFF), 9);
    }

    #[test]
    fn test_clear_ram_keeps_rom() {
        let mut mem = AddressSpace::new();
        mem.load_image(&[0x3E], 0x0000);
        mem.write(0xC000, 0x55);
        mem.clear_ram();
        assert_eq!(mem.read(0x0000), 0x3E);
        assert_eq!(mem.read(0xC000), 0);
    }

    proptest! {
        #[test]
        fn prop_ram_write_reads_back(addr in 0x8000u16..=0xFFFF, value in any::<u32>()) {
            let mut mem = AddressSpace::new();
            mem.write(addr, value);
            prop_assert_eq!(mem.read(addr), (value & 0xFF) as u8);
        }

        #[test]
        fn prop_rom_write_is_noop(
            addr in 0u16..0x8000,
            value in any::<u32>(),
            seed in any::<u8>(),
        ) {
            let mut mem = AddressSpace::new();
            mem.load_image(&[seed], addr);
            mem.write(addr, value);
            prop_assert_eq!(mem.read(addr), seed);
        }
    }
}
