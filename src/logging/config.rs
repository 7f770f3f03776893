//! Logging configuration
//!
//! Global level plus per-component overrides for the shift search and the
//! raster I/O layer, console and file output toggles.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    pub global_level: String,

    /// Level for the shift search (`algorithms`)
    pub search_level: String,

    /// Level for raster reading and writing (`raster`)
    pub io_level: String,

    /// Enable console output
    pub console_output: bool,

    /// Directory for JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// Include file location in console logs
    pub include_file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "warn".to_string(),
            search_level: "warn".to_string(),
            io_level: "warn".to_string(),
            console_output: true,
            log_directory: None,
            include_file_location: false,
        }
    }
}

impl LoggingConfig {
    /// Verbose console logging with candidate-level tracing
    pub fn development() -> Self {
        Self {
            global_level: "debug".to_string(),
            search_level: "trace".to_string(),
            io_level: "debug".to_string(),
            console_output: true,
            log_directory: Some(PathBuf::from("logs")),
            include_file_location: true,
        }
    }

    /// File-only logging of warnings and outcomes
    pub fn production() -> Self {
        Self {
            global_level: "info".to_string(),
            search_level: "info".to_string(),
            io_level: "warn".to_string(),
            console_output: false,
            log_directory: Some(PathBuf::from("/var/log/tile-shift")),
            include_file_location: false,
        }
    }

    /// Same configuration with every level set to `level`
    pub fn with_level(mut self, level: &str) -> Self {
        self.global_level = level.to_string();
        self.search_level = level.to_string();
        self.io_level = level.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("global_level", &self.global_level),
            ("search_level", &self.search_level),
            ("io_level", &self.io_level),
        ] {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid {}: {}. Must be one of: {:?}",
                    name, level, VALID_LEVELS
                ));
            }
        }

        if let Some(ref log_dir) = self.log_directory {
            if let Some(parent) = log_dir.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(format!("Log directory parent does not exist: {:?}", parent));
                }
            }
        }

        Ok(())
    }

    /// Effective level for a component name
    pub fn get_component_level(&self, component: &str) -> &str {
        match component {
            "search" | "algorithms" => &self.search_level,
            "io" | "raster" => &self.io_level,
            _ => &self.global_level,
        }
    }

    /// `EnvFilter` directives for this crate
    pub fn filter_directives(&self) -> String {
        let krate = env!("CARGO_PKG_NAME").replace('-', "_");
        format!(
            "{krate}={},{krate}::algorithms={},{krate}::raster={}",
            self.global_level, self.search_level, self.io_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.global_level, "warn");
        assert!(config.console_output);
        assert!(config.log_directory.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let dev = LoggingConfig::development();
        assert_eq!(dev.search_level, "trace");
        assert!(dev.include_file_location);

        let prod = LoggingConfig::production();
        assert!(!prod.console_output);
        assert!(prod.log_directory.is_some());
    }

    #[test]
    fn test_config_validation() {
        let mut config = LoggingConfig::default();
        config.io_level = "loud".to_string();
        assert!(config.validate().is_err());

        let config = LoggingConfig::default().with_level("debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_component_level_selection() {
        let config = LoggingConfig::development();
        assert_eq!(config.get_component_level("search"), "trace");
        assert_eq!(config.get_component_level("raster"), "debug");
        assert_eq!(config.get_component_level("pipeline"), "debug");
    }

    #[test]
    fn test_filter_directives() {
        let directives = LoggingConfig::default().with_level("info").filter_directives();
        assert_eq!(
            directives,
            "tile_shift=info,tile_shift::algorithms=info,tile_shift::raster=info"
        );
    }
}
