//! ROM descriptors and image sources.
//!
//! A descriptor names where an image comes from and where it goes. Fetching
//! is delegated to a [`RomSource`]; a failed fetch yields an empty image,
//! which installs as `size` zero bytes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::hex::parse_hex;
use crate::{CoreError, Result, MEMORY_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomDescriptor {
    pub name: String,
    /// First address the image occupies
    pub start: u32,
    /// Bytes to install
    pub size: u32,
    /// Where to fetch the image from (a file path for [`FileRomSource`])
    #[serde(alias = "uri")]
    pub locator: String,
}

impl RomDescriptor {
    /// Parse `NAME@START:SIZE=LOCATOR`. START and SIZE accept decimal or
    /// `0x`-prefixed hex.
    pub fn parse_arg(s: &str) -> Result<Self> {
        let bad = || {
            CoreError::InvalidConfig(format!(
                "bad ROM argument {:?}, expected NAME@START:SIZE=PATH",
                s
            ))
        };
        let (name, rest) = s.split_once('@').ok_or_else(bad)?;
        let (range, locator) = rest.split_once('=').ok_or_else(bad)?;
        let (start, size) = range.split_once(':').ok_or_else(bad)?;
        Ok(RomDescriptor {
            name: name.to_string(),
            start: parse_num(start).ok_or_else(bad)?,
            size: parse_num(size).ok_or_else(bad)?,
            locator: locator.to_string(),
        })
    }

    fn is_hex(&self) -> bool {
        Path::new(&self.locator)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("hex"))
    }
}

fn parse_num(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(h) => u32::from_str_radix(h, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Transport for ROM image bytes.
pub trait RomSource {
    /// Fetch the raw bytes behind `locator`; empty on failure.
    fn fetch(&self, locator: &str) -> Vec<u8>;
}

/// In-memory images keyed by locator.
impl RomSource for HashMap<String, Vec<u8>> {
    fn fetch(&self, locator: &str) -> Vec<u8> {
        self.get(locator).cloned().unwrap_or_default()
    }
}

/// Reads images from the local filesystem.
pub struct FileRomSource {
    /// Relative locators are resolved against this directory
    pub base_dir: Option<PathBuf>,
}

impl FileRomSource {
    pub fn new() -> Self {
        FileRomSource { base_dir: None }
    }

    pub fn relative_to(dir: impl Into<PathBuf>) -> Self {
        FileRomSource { base_dir: Some(dir.into()) }
    }
}

impl Default for FileRomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RomSource for FileRomSource {
    fn fetch(&self, locator: &str) -> Vec<u8> {
        let path = match &self.base_dir {
            Some(dir) => dir.join(locator),
            None => PathBuf::from(locator),
        };
        match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("ROM fetch failed for {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }
}

/// Turn fetched bytes into exactly `desc.size` bytes of image.
///
/// `.hex` locators are decoded as Intel HEX; anything else is taken as a raw
/// binary. Short images are zero-filled, long ones truncated.
pub fn prepare_image(desc: &RomDescriptor, raw: Vec<u8>) -> Vec<u8> {
    let size = (desc.size as usize).min(MEMORY_SIZE);
    if desc.is_hex() {
        let mut image = vec![0u8; size];
        let text = String::from_utf8_lossy(&raw);
        match parse_hex(&text, &mut image) {
            Ok(n) => debug!("{}: {} bytes decoded from Intel HEX", desc.name, n),
            Err(e) => {
                warn!("{}: {}", desc.name, e);
                image.fill(0);
            }
        }
        return image;
    }
    let mut image = raw;
    if image.len() < size {
        warn!(
            "{}: image is {} bytes, {} expected; padding with zeros",
            desc.name,
            image.len(),
            size
        );
    }
    image.resize(size, 0);
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(locator: &str, size: u32) -> RomDescriptor {
        RomDescriptor { name: "basic".into(), start: 0, size, locator: locator.into() }
    }

    #[test]
    fn test_parse_rom_arg() {
        let d = RomDescriptor::parse_arg("basic@0x0000:0x2000=roms/basic.bin").unwrap();
        assert_eq!(d, RomDescriptor {
            name: "basic".into(), start: 0, size: 0x2000, locator: "roms/basic.bin".into(),
        });
        let d = RomDescriptor::parse_arg("mon@4096:16=a=b").unwrap();
        assert_eq!((d.start, d.size, d.locator.as_str()), (4096, 16, "a=b"));
        assert!(RomDescriptor::parse_arg("nope").is_err());
        assert!(RomDescriptor::parse_arg("x@zz:1=f").is_err());
    }

    #[test]
    fn test_raw_image_sized_to_descriptor() {
        assert_eq!(prepare_image(&desc("a.bin", 4), vec![1, 2]), vec![1, 2, 0, 0]);
        assert_eq!(prepare_image(&desc("a.bin", 2), vec![1, 2, 3]), vec![1, 2]);
        assert_eq!(prepare_image(&desc("a.bin", 3), Vec::new()), vec![0, 0, 0]);
    }

    #[test]
    fn test_hex_image_decoded() {
        let raw = b":03000000C300003A\n:00000001FF\n".to_vec();
        assert_eq!(prepare_image(&desc("mon.HEX", 4), raw), vec![0xC3, 0, 0, 0]);
        let broken = b":03000000C30000FF\n".to_vec();
        assert_eq!(prepare_image(&desc("mon.hex", 2), broken), vec![0, 0]);
    }

    #[test]
    fn test_map_source() {
        let mut src = HashMap::new();
        src.insert("a".to_string(), vec![7u8]);
        assert_eq!(src.fetch("a"), vec![7]);
        assert!(src.fetch("missing").is_empty());
    }

    #[test]
    fn test_file_source_missing_is_empty() {
        let src = FileRomSource::new();
        assert!(src.fetch("/definitely/not/here.bin").is_empty());
    }
}
