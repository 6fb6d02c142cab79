/*!
 * In-memory tag link
 *
 * Simulates a reader/tag pair over a fixed page image: presence can be
 * toggled, faults can be scripted or injected at random, and the page
 * image can be loaded from / saved to a raw file for the CLI tools.
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

use super::{LinkError, LinkResult, TagLink};
use crate::error::{OrbError, Result};

/// Usable 4-byte pages on the simulated tag
pub const TAG_PAGES: usize = 45;

/// In-memory reader/tag pair
pub struct MemoryTag {
    present: bool,
    pages: [[u8; 4]; TAG_PAGES],
    fail_reads: u32,
    fail_writes: u32,
    fail_detects: u32,
    reselects: u64,
    flake: Option<(f64, StdRng)>,
}

impl MemoryTag {
    /// Empty reader with no tag in the field
    pub fn new() -> Self {
        Self {
            present: false,
            pages: [[0; 4]; TAG_PAGES],
            fail_reads: 0,
            fail_writes: 0,
            fail_detects: 0,
            reselects: 0,
            flake: None,
        }
    }

    /// Place or remove the tag from the field
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Raw page access for scripting tag contents
    pub fn set_page(&mut self, page: u8, data: [u8; 4]) {
        self.pages[page as usize] = data;
    }

    pub fn page(&self, page: u8) -> [u8; 4] {
        self.pages[page as usize]
    }

    /// Fail the next `n` read attempts
    pub fn fail_reads(&mut self, n: u32) {
        self.fail_reads = n;
    }

    /// Fail the next `n` write attempts
    pub fn fail_writes(&mut self, n: u32) {
        self.fail_writes = n;
    }

    /// Fail the next `n` presence probes at the wire layer
    pub fn fail_detects(&mut self, n: u32) {
        self.fail_detects = n;
    }

    /// Number of re-select actions issued so far
    pub fn reselect_count(&self) -> u64 {
        self.reselects
    }

    /// Make every page attempt fail with probability `p`, seeded for
    /// reproducible runs
    pub fn set_flakiness(&mut self, p: f64, seed: u64) {
        self.flake = Some((p.clamp(0.0, 1.0), StdRng::seed_from_u64(seed)));
    }

    fn flaked(&mut self) -> bool {
        match &mut self.flake {
            Some((p, rng)) => rng.random_bool(*p),
            None => false,
        }
    }

    /// Serialize the page image as raw bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pages.iter().flatten().copied().collect()
    }

    /// Build a tag from a raw page image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TAG_PAGES * 4 {
            return Err(OrbError::TagImage(format!(
                "expected {} bytes, got {}",
                TAG_PAGES * 4,
                bytes.len()
            )));
        }
        let mut tag = Self::new();
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            tag.pages[i].copy_from_slice(chunk);
        }
        Ok(tag)
    }

    /// Load a page image from disk; the tag starts present
    pub fn load_image(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut tag = Self::from_bytes(&bytes)?;
        tag.present = true;
        Ok(tag)
    }

    /// Save the page image to disk
    pub fn save_image(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

impl Default for MemoryTag {
    fn default() -> Self {
        Self::new()
    }
}

impl TagLink for MemoryTag {
    fn detect(&mut self) -> LinkResult<bool> {
        if self.fail_detects > 0 {
            self.fail_detects -= 1;
            return Err(LinkError::Probe("wire probe failed".to_string()));
        }
        Ok(self.present)
    }

    fn read_page(&mut self, page: u8) -> LinkResult<[u8; 4]> {
        if !self.present {
            return Err(LinkError::NoTarget);
        }
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(LinkError::ReadFailed { page });
        }
        if self.flaked() {
            return Err(LinkError::ReadFailed { page });
        }
        self.pages
            .get(page as usize)
            .copied()
            .ok_or(LinkError::ReadFailed { page })
    }

    fn write_page(&mut self, page: u8, data: [u8; 4]) -> LinkResult<()> {
        if !self.present {
            return Err(LinkError::NoTarget);
        }
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(LinkError::WriteFailed { page });
        }
        if self.flaked() {
            return Err(LinkError::WriteFailed { page });
        }
        match self.pages.get_mut(page as usize) {
            Some(slot) => {
                *slot = data;
                Ok(())
            }
            None => Err(LinkError::WriteFailed { page }),
        }
    }

    fn reselect(&mut self) -> LinkResult<()> {
        self.reselects += 1;
        Ok(())
    }

    fn link_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_tag_fails_page_io() {
        let mut tag = MemoryTag::new();
        assert!(!tag.detect().unwrap());
        assert!(tag.read_page(4).is_err());
        assert!(tag.write_page(4, [0; 4]).is_err());
    }

    #[test]
    fn test_page_io_round_trip() {
        let mut tag = MemoryTag::new();
        tag.set_present(true);
        tag.write_page(4, *b"ORBS").unwrap();
        assert_eq!(tag.read_page(4).unwrap(), *b"ORBS");
    }

    #[test]
    fn test_scripted_faults_decrement() {
        let mut tag = MemoryTag::new();
        tag.set_present(true);
        tag.fail_reads(2);
        assert!(tag.read_page(4).is_err());
        assert!(tag.read_page(4).is_err());
        assert!(tag.read_page(4).is_ok());
    }

    #[test]
    fn test_image_round_trip() {
        let mut tag = MemoryTag::new();
        tag.set_page(4, *b"ORBS");
        tag.set_page(5, [1, 0, 0, 0]);
        let bytes = tag.to_bytes();
        assert_eq!(bytes.len(), TAG_PAGES * 4);

        let restored = MemoryTag::from_bytes(&bytes).unwrap();
        assert_eq!(restored.page(4), *b"ORBS");
        assert_eq!(restored.page(5), [1, 0, 0, 0]);
    }

    #[test]
    fn test_image_wrong_size_rejected() {
        assert!(MemoryTag::from_bytes(&[0u8; 10]).is_err());
    }
}
