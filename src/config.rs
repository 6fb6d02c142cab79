/*!
 * Configuration types for orbdock
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OrbError, Result};
use crate::record::{EnergyWidth, StationId};

/// Node configuration for one dock
///
/// Station count, energy width and page offset vary across node
/// generations; everything else is shared policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockConfig {
    /// This node's station identity; indexes the record's station slots
    pub station: StationId,

    /// Number of station slots on the wire (14 or 15 across generations)
    #[serde(default = "default_station_count")]
    pub station_count: usize,

    /// Wire width of the energy counter
    #[serde(default)]
    pub energy_width: EnergyWidth,

    /// First tag page used by the record
    #[serde(default = "default_page_offset")]
    pub page_offset: u8,

    /// Attempt ceiling for a single page operation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between page attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Interval between presence checks in milliseconds
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            station: StationId::Generic,
            station_count: default_station_count(),
            energy_width: EnergyWidth::U16,
            page_offset: default_page_offset(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            check_interval_ms: default_check_interval_ms(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

impl DockConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: DockConfig =
            toml::from_str(&contents).map_err(|e| OrbError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| OrbError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check the configuration for values the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.station_count == 0 {
            return Err(OrbError::Config("station_count must be nonzero".to_string()));
        }
        if self.station_count > StationId::COUNT as usize {
            return Err(OrbError::Config(format!(
                "station_count {} exceeds the known station space of {}",
                self.station_count,
                StationId::COUNT
            )));
        }
        if (self.station.ordinal() as usize) >= self.station_count {
            return Err(OrbError::StationOutOfRange {
                ordinal: self.station.ordinal(),
            });
        }
        if self.max_retries == 0 {
            return Err(OrbError::Config("max_retries must be nonzero".to_string()));
        }
        Ok(())
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_station_count() -> usize {
    StationId::COUNT as usize
}

fn default_page_offset() -> u8 {
    4
}

fn default_max_retries() -> u32 {
    4
}

fn default_retry_delay_ms() -> u64 {
    10
}

fn default_check_interval_ms() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = DockConfig::default();
        assert_eq!(config.station_count, 15);
        assert_eq!(config.page_offset, 4);
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.check_interval_ms, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_station_outside_record() {
        let config = DockConfig {
            station: StationId::Hunt,
            station_count: 14,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_retries() {
        let config = DockConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = DockConfig {
            station: StationId::Casino,
            energy_width: EnergyWidth::U8,
            station_count: 14,
            ..Default::default()
        };

        let file = NamedTempFile::new().unwrap();
        config.to_file(file.path()).unwrap();
        let loaded = DockConfig::from_file(file.path()).unwrap();

        assert_eq!(loaded.station, StationId::Casino);
        assert_eq!(loaded.energy_width, EnergyWidth::U8);
        assert_eq!(loaded.station_count, 14);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: DockConfig = toml::from_str("station = \"pipes\"").unwrap();
        assert_eq!(config.station, StationId::Pipes);
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.energy_width, EnergyWidth::U16);
    }
}
