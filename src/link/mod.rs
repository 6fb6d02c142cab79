/*!
 * Tag link abstraction
 *
 * `TagLink` is the hardware seam: the raw presence probe and 4-byte
 * page primitives of a reader/tag pair. `PageStore` wraps a link with
 * the bounded-retry policy the session relies on. `MemoryTag` is the
 * in-process link used by tests and the simulator.
 */

mod memory;
mod store;

pub use memory::{MemoryTag, TAG_PAGES};
pub use store::{PageStore, StoreTally};

use thiserror::Error;

pub type LinkResult<T> = std::result::Result<T, LinkError>;

/// Wire-layer errors for a single probe or page attempt
///
/// These cover transient field-coupling loss, not corrupted content;
/// the retry policy above this layer decides what to do with them.
#[derive(Error, Debug)]
pub enum LinkError {
    /// No target in the field
    #[error("no target in field")]
    NoTarget,

    /// A single page read attempt failed
    #[error("page {page} read failed")]
    ReadFailed { page: u8 },

    /// A single page write attempt failed
    #[error("page {page} write failed")]
    WriteFailed { page: u8 },

    /// Presence probe failed at the wire layer
    #[error("presence probe failed: {0}")]
    Probe(String),
}

/// Raw reader/tag link: presence detection and page-granular I/O
///
/// Implementations have no knowledge of the record format. A failed
/// call reports the single attempt only; retrying is the page store's
/// job.
pub trait TagLink {
    /// Probe for a target in the field. `Ok(false)` means no tag; an
    /// error means the probe itself failed at the wire layer.
    fn detect(&mut self) -> LinkResult<bool>;

    /// Read one 4-byte page
    fn read_page(&mut self, page: u8) -> LinkResult<[u8; 4]>;

    /// Write one 4-byte page
    fn write_page(&mut self, page: u8, data: [u8; 4]) -> LinkResult<()>;

    /// Re-select the target after a failed attempt (compensates for
    /// transient coupling loss)
    fn reselect(&mut self) -> LinkResult<()>;

    /// Link name for logging
    fn link_name(&self) -> &'static str;
}
