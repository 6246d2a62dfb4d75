//! Machine configuration.
//!
//! Loaded from JSON; every field is optional and falls back to the defaults
//! below. The output sink is not part of the file: it is handed to
//! [`crate::Machine::new`] alongside the config.
//!
//! ```json
//! {
//!   "roms": [{ "name": "basic", "start": 0, "size": 8192, "locator": "basic.bin" }],
//!   "tick_period_ms": 10,
//!   "cycles_per_tick": 73728,
//!   "terminal": { "width": 64, "height": 32 },
//!   "limits": { "max_input_queue": 4096, "max_escape_len": 32 }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rom::RomDescriptor;
use crate::scheduler::TickConfig;
use crate::{CoreError, Result, MEMORY_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig { width: 64, height: 32 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Bytes the serial input queue holds before dropping keystrokes
    pub max_input_queue: usize,
    /// Longest escape sequence body before it is discarded
    pub max_escape_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_input_queue: 4096, max_escape_len: 32 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub roms: Vec<RomDescriptor>,
    pub tick_period_ms: u64,
    /// 7.3728 MHz × 10 ms by default
    pub cycles_per_tick: u64,
    pub terminal: TerminalConfig,
    pub limits: Limits,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            roms: Vec::new(),
            tick_period_ms: 10,
            cycles_per_tick: 73_728,
            terminal: TerminalConfig::default(),
            limits: Limits::default(),
        }
    }
}

impl MachineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: MachineConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| CoreError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_period_ms == 0 {
            return Err(CoreError::InvalidConfig("tick_period_ms must be at least 1".into()));
        }
        if self.cycles_per_tick == 0 {
            return Err(CoreError::InvalidConfig("cycles_per_tick must be at least 1".into()));
        }
        if self.terminal.width == 0 || self.terminal.height == 0 {
            return Err(CoreError::InvalidConfig("terminal must be at least 1x1".into()));
        }
        for rom in &self.roms {
            if rom.start as usize >= MEMORY_SIZE {
                return Err(CoreError::InvalidConfig(format!(
                    "ROM {} starts at {:#X}, beyond the 64K address space",
                    rom.name, rom.start
                )));
            }
        }
        Ok(())
    }

    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            period: Duration::from_millis(self.tick_period_ms),
            cycles_per_tick: self.cycles_per_tick,
        }
    }
}
