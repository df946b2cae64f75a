//! Configuration file format and validation errors.
//!
//! Chunk geometry and the magnitude threshold are static configuration.
//! Every value is validated once at setup; a failure here is fatal and no
//! detection cycle is ever started with it.

use crate::capture::CaptureConfig;
use crate::detection::MagnitudeMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("frame of {width}x{height} pixels is too large")]
    FrameTooLarge { width: u32, height: u32 },
    #[error("invalid chunk geometry: {dimension} {size} is not divisible into {chunks} chunks")]
    IndivisibleGeometry {
        dimension: &'static str,
        size: u32,
        chunks: u32,
    },
    #[error("chunk block size {block_size} is not a power of two")]
    BlockNotPowerOfTwo { block_size: u32 },
    #[error("chunk block size {block_size} exceeds the maximum of {max}")]
    BlockTooLarge { block_size: u32, max: u32 },
    #[error("invalid motion percent {0} (must be 1-100)")]
    InvalidMotionPercent(u32),
    #[error("invalid fixed-width magnitude of {0} bits (must be 2-16)")]
    InvalidMagnitudeWidth(u8),
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("invalid sampled frame percent {0} (must be 1-100)")]
    InvalidFpsPercent(u32),
    #[error("frame buffer capacity must be at least 2 frames")]
    InvalidBufferCapacity,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Detection parameters: chunk geometry, threshold and decision fraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Number of chunk rows per frame.
    pub chunk_lines: u32,
    /// Number of chunk columns per frame (one register lane each).
    pub chunk_columns: u32,
    /// A chunk moved when its mean magnitude is strictly above this.
    pub threshold: u16,
    /// Percentage of chunks that must move for a positive result.
    pub motion_percent: u32,
    /// How the per-chunk difference magnitude is computed.
    pub magnitude: MagnitudeMode,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            chunk_lines: 30,
            chunk_columns: 40,
            threshold: 15,
            motion_percent: 25,
            magnitude: MagnitudeMode::Exact,
        }
    }
}

impl DetectionConfig {
    /// Validates the parameters that do not depend on frame size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.motion_percent == 0 || self.motion_percent > 100 {
            return Err(ConfigError::InvalidMotionPercent(self.motion_percent));
        }
        self.magnitude.validate()
    }
}

/// Frame buffer and consumer loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the bounded frame buffer, in frames.
    pub buffer_capacity: usize,
    /// Resume a producer paused on a full buffer once a pair is drained.
    ///
    /// Off by default: a paused producer waits for an explicit resume.
    pub auto_resume: bool,
    /// Stop after this many completed cycles.
    pub max_cycles: Option<u64>,
    /// Slice length of the blocking wait on an empty buffer.
    pub poll_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 20,
            auto_resume: false,
            max_cycles: None,
            poll_interval_ms: 100,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity < 2 {
            return Err(ConfigError::InvalidBufferCapacity);
        }
        Ok(())
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print every detection event as a JSON line on stdout.
    pub json: bool,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            metrics_port: 0,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.detection.validate()?;
        self.pipeline.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_motion_percent_bounds() {
        let mut config = DetectionConfig::default();
        config.motion_percent = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMotionPercent(0)));

        config.motion_percent = 101;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidMotionPercent(101))
        );

        config.motion_percent = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = FileConfig::from_toml(
            r#"
            [capture]
            width = 320
            height = 240

            [detection]
            chunk_lines = 15
            chunk_columns = 20
            threshold = 20
            magnitude = { mode = "fixed_width", bits = 9 }

            [pipeline]
            auto_resume = true
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.width, 320);
        assert_eq!(config.capture.fps, 15);
        assert_eq!(config.detection.chunk_lines, 15);
        assert_eq!(config.detection.threshold, 20);
        assert_eq!(config.detection.motion_percent, 25);
        assert_eq!(
            config.detection.magnitude,
            MagnitudeMode::FixedWidth { bits: 9 }
        );
        assert!(config.pipeline.auto_resume);
        assert_eq!(config.pipeline.buffer_capacity, 20);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let result = FileConfig::from_toml(
            r#"
            [pipeline]
            buffer_capacity = 1
            "#,
        );
        assert_eq!(result.unwrap_err(), ConfigError::InvalidBufferCapacity);

        let result = FileConfig::from_toml("[detection]\nthreshold = \"high\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = FileConfig::from_file("/nonexistent/fsm-motion.toml");
        assert!(matches!(result, Err(ConfigError::FileReadError(_))));
    }
}
