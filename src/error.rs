/*!
 * Error types for orbdock
 */

use std::fmt;
use std::io;

use crate::link::LinkError;

pub type Result<T> = std::result::Result<T, OrbError>;

#[derive(Debug)]
pub enum OrbError {
    /// Wire-layer failure on the tag link (probe or single page attempt)
    Link(LinkError),

    /// Retries exhausted on a page operation
    RetriesExhausted { attempts: u32 },

    /// Decoded trait ordinal outside the known enumeration
    TraitOutOfRange { ordinal: u8 },

    /// Station ordinal outside the configured record
    StationOutOfRange { ordinal: u8 },

    /// Mutation that requires a connected orb
    NotConnected,

    /// Format or reset requested with no tag present
    NoTag,

    /// Configuration error
    Config(String),

    /// Tag image error (bad size, unreadable file)
    TagImage(String),

    /// I/O error
    Io(io::Error),
}

impl OrbError {
    /// Check if this error is transient (worth trying again next poll)
    pub fn is_transient(&self) -> bool {
        match self {
            // The field coupling comes and goes; the next poll may succeed
            OrbError::Link(_) => true,
            OrbError::RetriesExhausted { .. } => true,

            // Everything else is a caller or data problem
            OrbError::TraitOutOfRange { .. } => false,
            OrbError::StationOutOfRange { .. } => false,
            OrbError::NotConnected => false,
            OrbError::NoTag => false,
            OrbError::Config(_) => false,
            OrbError::TagImage(_) => false,
            OrbError::Io(_) => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            OrbError::Link(_) | OrbError::RetriesExhausted { .. } => ErrorCategory::LinkIo,
            OrbError::TraitOutOfRange { .. } | OrbError::StationOutOfRange { .. } => {
                ErrorCategory::Decode
            }
            OrbError::NotConnected | OrbError::NoTag => ErrorCategory::Lifecycle,
            OrbError::Config(_) => ErrorCategory::Configuration,
            OrbError::TagImage(_) | OrbError::Io(_) => ErrorCategory::Image,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Tag link I/O errors (probe, page read/write, retry exhaustion)
    LinkIo,
    /// Record decode errors (out-of-range ordinals)
    Decode,
    /// Lifecycle misuse (mutation without a connected orb)
    Lifecycle,
    /// Configuration errors
    Configuration,
    /// Tag image file errors
    Image,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::LinkIo => write!(f, "link-io"),
            ErrorCategory::Decode => write!(f, "decode"),
            ErrorCategory::Lifecycle => write!(f, "lifecycle"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Image => write!(f, "image"),
        }
    }
}

impl fmt::Display for OrbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrbError::Link(err) => {
                write!(f, "Tag link error: {}", err)
            }
            OrbError::RetriesExhausted { attempts } => {
                write!(f, "All {} page attempts exhausted", attempts)
            }
            OrbError::TraitOutOfRange { ordinal } => {
                write!(f, "Trait ordinal {} outside the known enumeration", ordinal)
            }
            OrbError::StationOutOfRange { ordinal } => {
                write!(f, "Station ordinal {} outside the configured record", ordinal)
            }
            OrbError::NotConnected => {
                write!(f, "No orb connected")
            }
            OrbError::NoTag => {
                write!(f, "No tag present on the reader")
            }
            OrbError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            OrbError::TagImage(msg) => {
                write!(f, "Tag image error: {}", msg)
            }
            OrbError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
        }
    }
}

impl std::error::Error for OrbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrbError::Link(err) => Some(err),
            OrbError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for OrbError {
    fn from(err: io::Error) -> Self {
        OrbError::Io(err)
    }
}

impl From<LinkError> for OrbError {
    fn from(err: LinkError) -> Self {
        OrbError::Link(err)
    }
}

impl From<serde_json::Error> for OrbError {
    fn from(err: serde_json::Error) -> Self {
        OrbError::Config(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(OrbError::Link(LinkError::NoTarget).is_transient());
        assert!(OrbError::RetriesExhausted { attempts: 4 }.is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!OrbError::NotConnected.is_transient());
        assert!(!OrbError::TraitOutOfRange { ordinal: 9 }.is_transient());
        assert!(!OrbError::Config("bad station".to_string()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = OrbError::RetriesExhausted { attempts: 4 };
        assert_eq!(err.to_string(), "All 4 page attempts exhausted");

        let err = OrbError::TraitOutOfRange { ordinal: 42 };
        assert_eq!(
            err.to_string(),
            "Trait ordinal 42 outside the known enumeration"
        );
    }

    #[test]
    fn test_category() {
        assert_eq!(
            OrbError::RetriesExhausted { attempts: 4 }.category(),
            ErrorCategory::LinkIo
        );
        assert_eq!(
            OrbError::TraitOutOfRange { ordinal: 6 }.category(),
            ErrorCategory::Decode
        );
        assert_eq!(OrbError::NotConnected.category(), ErrorCategory::Lifecycle);
        assert_eq!(ErrorCategory::LinkIo.to_string(), "link-io");
    }
}
