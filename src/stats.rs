/*!
 * Session statistics for end-of-run diagnostics
 */

use serde::Serialize;

/// Counters accumulated over a session's lifetime
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    /// Poll evaluations actually executed (not throttled ticks)
    pub polls: u64,
    /// Transitions into OrbConnected
    pub connects: u64,
    /// Transitions out of OrbConnected
    pub disconnects: u64,
    /// Unformatted tags encountered
    pub unformatted: u64,
    /// Errors surfaced through the error callback
    pub errors: u64,
    /// Successful page reads (after retries)
    pub pages_read: u64,
    /// Successful page writes (after retries)
    pub pages_written: u64,
    /// Individual attempt retries across all page operations
    pub retries: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-line human summary for the console
    pub fn summary(&self) -> String {
        format!(
            "{} polls, {} connects, {} disconnects, {} unformatted, {} errors, {} pages read, {} pages written, {} retries",
            self.polls,
            self.connects,
            self.disconnects,
            self.unformatted,
            self.errors,
            self.pages_read,
            self.pages_written,
            self.retries
        )
    }
}
