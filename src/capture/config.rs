//! Frame acquisition configuration.
//!
//! Resolution and frame rate are fixed configuration, never negotiated at
//! runtime: the detector geometry is derived from them at setup.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for frame acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Source identifier: `"mock"`, a camera index, or a raw video path.
    pub source: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate configured at the source.
    pub fps: u32,
    /// Percentage of source frames actually sampled from live sources.
    pub fps_percent: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: "mock".to_string(),
            width: 640,
            height: 480,
            fps: 15,
            fps_percent: 40,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.fps_percent == 0 || self.fps_percent > 100 {
            return Err(ConfigError::InvalidFpsPercent(self.fps_percent));
        }
        Ok(())
    }

    /// Source grabs spent per retained frame.
    ///
    /// Integer division, so 40% keeps one frame of every two.
    pub fn grabs_per_frame(&self) -> u32 {
        (100 / self.fps_percent.max(1)).max(1)
    }

    /// Effective frames per second reaching the detector.
    pub fn sampled_fps(&self) -> f64 {
        f64::from(self.fps) * f64::from(self.fps_percent) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CaptureConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_fps_percent_invalid() {
        let mut config = CaptureConfig::default();
        config.fps_percent = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidFpsPercent(0)));
        config.fps_percent = 150;
        assert_eq!(config.validate(), Err(ConfigError::InvalidFpsPercent(150)));
    }

    #[test]
    fn test_grabs_per_frame() {
        let mut config = CaptureConfig::default();
        assert_eq!(config.grabs_per_frame(), 2);
        assert!((config.sampled_fps() - 6.0).abs() < 1e-9);

        config.fps_percent = 100;
        assert_eq!(config.grabs_per_frame(), 1);

        config.fps_percent = 10;
        assert_eq!(config.grabs_per_frame(), 10);

        config.fps_percent = 70;
        assert_eq!(config.grabs_per_frame(), 1);
    }
}
