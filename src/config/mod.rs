use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::logging::LoggingConfig;
use crate::raster::GeoTiffCompression;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Parameters of the shift search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Tile samples are `reference + value_offset` where the two agree
    pub value_offset: u8,
    /// Tile samples at or above this value never take part in the comparison
    pub nodata_sentinel: u8,
    /// Excluded edges lose `1 / margin_divisor` of the tile width or height
    pub margin_divisor: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub compression: GeoTiffCompression,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            value_offset: 1,
            nodata_sentinel: 255,
            margin_divisor: 3,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // 2 * (n / d) < n for every n >= 1 only holds from d = 3 upwards
        if self.margin_divisor < 3 {
            errors.push(format!(
                "search.margin_divisor must be at least 3, got {}",
                self.margin_divisor
            ));
        }

        if self.nodata_sentinel == 0 {
            errors.push("search.nodata_sentinel of 0 would exclude every pixel".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {}: {}", path.display(), e))?;

        if content.trim_start().starts_with('{') {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> crate::Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(search_errors) = self.search.validate() {
            errors.extend(search_errors);
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ConfigFormat {
    Json,
    Toml,
}

pub fn load_config_or_default(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => {
                if let Err(errors) = config.validate() {
                    eprintln!("Configuration validation errors:");
                    for error in errors {
                        eprintln!("  - {}", error);
                    }
                    eprintln!("Using default configuration instead.");
                    Config::default()
                } else {
                    config
                }
            }
            Err(e) => {
                eprintln!("Failed to load config from '{}': {}", path.display(), e);
                eprintln!("Using default configuration.");
                Config::default()
            }
        },
        None => Config::default(),
    }
}
