//! Application configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::location::{Coordinate, LocationRequest, Priority};
use crate::map::{MAX_ZOOM, MARINA, MIN_ZOOM, MapType};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON for [`AppConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// The point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarinaConfig {
    /// Where the camera and marker start.
    pub position: Coordinate,
    /// Marker title.
    pub title: String,
    /// Marker snippet.
    pub snippet: String,
}

impl Default for MarinaConfig {
    fn default() -> Self {
        Self {
            position: MARINA,
            title: "Marina".to_owned(),
            snippet: "Bald Head Island Marina".to_owned(),
        }
    }
}

/// Initial map presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial zoom level.
    pub zoom: f32,
    /// Base imagery.
    pub map_type: MapType,
    /// Show the +/- zoom buttons.
    pub zoom_controls: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: 25.0,
            map_type: MapType::Satellite,
            zoom_controls: true,
        }
    }
}

/// Location feed cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Target interval between updates, in milliseconds.
    pub interval_ms: u64,
    /// Minimum interval between updates, in milliseconds.
    pub min_interval_ms: u64,
    /// Accuracy priority.
    pub priority: Priority,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            min_interval_ms: 5_000,
            priority: Priority::HighAccuracy,
        }
    }
}

impl LocationConfig {
    /// The feed request described by this config.
    #[must_use]
    pub fn request(&self) -> LocationRequest {
        LocationRequest::builder(Duration::from_millis(self.interval_ms))
            .min_update_interval(Duration::from_millis(self.min_interval_ms))
            .priority(self.priority)
            .build()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The point of interest.
    pub marina: MarinaConfig,
    /// Initial map presentation.
    pub map: MapConfig,
    /// Location feed cadence.
    pub location: LocationConfig,
}

impl AppConfig {
    /// Parse and validate a JSON config.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the text is not valid JSON or a value is out of range.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.marina.position.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "marina position {:?} is out of range",
                self.marina.position
            )));
        }
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.map.zoom) {
            return Err(ConfigError::Invalid(format!(
                "zoom {} is outside {MIN_ZOOM}..={MAX_ZOOM}",
                self.map.zoom
            )));
        }
        let location = &self.location;
        if location.interval_ms == 0 || location.min_interval_ms == 0 {
            return Err(ConfigError::Invalid("location intervals must be positive".into()));
        }
        if location.min_interval_ms > location.interval_ms {
            return Err(ConfigError::Invalid(format!(
                "min_interval_ms {} exceeds interval_ms {}",
                location.min_interval_ms, location.interval_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.location.request(), LocationRequest::default());
    }

    #[test]
    fn partial_override() {
        let config = AppConfig::from_json_str(
            r#"{
                "marina": { "position": { "latitude": 34.0, "longitude": -78.0 } },
                "location": { "priority": "balanced" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.marina.position, Coordinate::new(34.0, -78.0));
        assert_eq!(config.marina.title, "Marina");
        assert_eq!(config.location.priority, Priority::Balanced);
        assert_eq!(config.location.interval_ms, 10_000);
    }

    #[test]
    fn rejects_inverted_intervals() {
        let err = AppConfig::from_json_str(
            r#"{ "location": { "interval_ms": 1000, "min_interval_ms": 2000 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_coordinates() {
        let err = AppConfig::from_json_str(
            r#"{ "marina": { "position": { "latitude": 120.0, "longitude": 0.0 } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn reports_parse_errors() {
        let err = AppConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::load("/nonexistent/marinamap.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
