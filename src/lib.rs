/*!
 * orbdock - Orb station session controller
 *
 * Drives an interactive installation node around a passive NFC tag
 * ("orb") used as a portable save-record:
 * - Bounded-retry page I/O over a pluggable tag link
 * - Fixed page-based record codec (trait + per-station energy)
 * - Presence polling and a connect/disconnect/error/unformatted
 *   lifecycle
 * - Pluggable per-node station behaviors on top of the session
 */

pub mod behavior;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod record;
pub mod session;
pub mod stats;

// Re-export commonly used types
pub use behavior::StationBehavior;
pub use config::{DockConfig, LogLevel};
pub use error::{OrbError, Result};
pub use link::{MemoryTag, PageStore, TagLink};
pub use record::{EnergyWidth, OrbRecord, StationId, StationRecord, TraitId};
pub use session::{Lifecycle, OrbApi, OrbSession};
pub use stats::SessionStats;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
