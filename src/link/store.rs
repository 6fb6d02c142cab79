/*!
 * Bounded-retry page store
 *
 * Wraps a raw tag link with the retry policy every record operation
 * goes through: a fixed attempt ceiling per page operation, with a
 * target re-select and a short delay between attempts. Exhausting the
 * ceiling propagates a failure; garbled or partial data is never
 * surfaced as success.
 */

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::TagLink;
use crate::config::DockConfig;
use crate::error::{OrbError, Result};

/// Page I/O counters maintained by the store
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreTally {
    pub pages_read: u64,
    pub pages_written: u64,
    pub retries: u64,
}

/// Retrying adapter over a [`TagLink`]
///
/// Knows nothing about the record format; it only turns a flaky page
/// primitive into an all-or-nothing one.
pub struct PageStore<L: TagLink> {
    link: L,
    max_retries: u32,
    retry_delay: Duration,
    tally: StoreTally,
}

impl<L: TagLink> PageStore<L> {
    pub fn new(link: L, config: &DockConfig) -> Self {
        Self {
            link,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            tally: StoreTally::default(),
        }
    }

    /// Single presence probe; not retried (the poll loop re-runs it on
    /// its own cadence)
    pub fn detect(&mut self) -> Result<bool> {
        Ok(self.link.detect()?)
    }

    /// Read one page, retrying up to the ceiling
    pub fn read_page(&mut self, page: u8) -> Result<[u8; 4]> {
        let mut attempt = 0;
        loop {
            match self.link.read_page(page) {
                Ok(data) => {
                    self.tally.pages_read += 1;
                    return Ok(data);
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        warn!(page, attempts = attempt, "read failed after retries");
                        return Err(OrbError::RetriesExhausted { attempts: attempt });
                    }
                    debug!(page, attempt, %err, "retrying read");
                    self.recover();
                }
            }
        }
    }

    /// Write one page, retrying up to the ceiling
    pub fn write_page(&mut self, page: u8, data: [u8; 4]) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.link.write_page(page, data) {
                Ok(()) => {
                    self.tally.pages_written += 1;
                    return Ok(());
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        warn!(page, attempts = attempt, "write failed after retries");
                        return Err(OrbError::RetriesExhausted { attempts: attempt });
                    }
                    debug!(page, attempt, %err, "retrying write");
                    self.recover();
                }
            }
        }
    }

    /// Re-select the target and back off before the next attempt. A
    /// failed re-select is not itself fatal; the next attempt decides.
    fn recover(&mut self) {
        self.tally.retries += 1;
        if let Err(err) = self.link.reselect() {
            debug!(%err, "re-select failed");
        }
        if !self.retry_delay.is_zero() {
            thread::sleep(self.retry_delay);
        }
    }

    pub fn tally(&self) -> StoreTally {
        self.tally
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MemoryTag;

    fn store_with(tag: MemoryTag) -> PageStore<MemoryTag> {
        let config = DockConfig {
            retry_delay_ms: 0,
            ..Default::default()
        };
        PageStore::new(tag, &config)
    }

    #[test]
    fn test_read_succeeds_within_ceiling() {
        let mut tag = MemoryTag::new();
        tag.set_present(true);
        tag.set_page(4, *b"ORBS");
        tag.fail_reads(3);

        let mut store = store_with(tag);
        assert_eq!(store.read_page(4).unwrap(), *b"ORBS");
        // Three failed attempts, three re-selects, then success
        assert_eq!(store.link().reselect_count(), 3);
        assert_eq!(store.tally().retries, 3);
    }

    #[test]
    fn test_read_exhausts_ceiling() {
        let mut tag = MemoryTag::new();
        tag.set_present(true);
        tag.fail_reads(4);

        let mut store = store_with(tag);
        let err = store.read_page(4).unwrap_err();
        assert!(matches!(err, OrbError::RetriesExhausted { attempts: 4 }));
        // Re-select only between attempts, never after the last
        assert_eq!(store.link().reselect_count(), 3);
    }

    #[test]
    fn test_write_retries_then_lands() {
        let mut tag = MemoryTag::new();
        tag.set_present(true);
        tag.fail_writes(1);

        let mut store = store_with(tag);
        store.write_page(6, [1, 2, 3, 4]).unwrap();
        assert_eq!(store.link().page(6), [1, 2, 3, 4]);
        assert_eq!(store.tally().pages_written, 1);
        assert_eq!(store.tally().retries, 1);
    }
}
