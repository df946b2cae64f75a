//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over frame sources,
//! allowing real devices, recorded video and synthetic scenes to feed the
//! same producer.

use super::{CaptureConfig, Frame, PixelFormat};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("end of stream after {0} frames")]
    EndOfStream(u64),
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for frame sources.
pub trait Camera {
    /// Opens and initializes the source with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures a single frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the source is currently open.
    fn is_open(&self) -> bool;

    /// Closes the source and releases the device.
    fn close(&mut self);
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        (**self).open(config)
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        (**self).capture()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Synthetic scene rendered by [`MockCamera`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockScene {
    /// The same frame every time.
    Still,
    /// A bright square sliding across a dark gradient.
    #[default]
    MovingSquare,
}

/// Mock camera for testing that renders synthetic RGB frames.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    scene: MockScene,
    sequence: u64,
    pace: Option<Duration>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock camera rendering the given scene.
    pub fn with_scene(scene: MockScene) -> Self {
        Self {
            scene,
            ..Self::default()
        }
    }

    /// Sleeps for one source frame period per capture.
    pub fn paced(mut self, enabled: bool) -> Self {
        self.pace = enabled.then_some(Duration::ZERO);
        self
    }

    fn render(&self, config: &CaptureConfig) -> Vec<u8> {
        let (width, height) = (config.width as usize, config.height as usize);
        let side = (width.min(height) / 4).max(1);
        let step = (width / 16).max(1);
        let left = match self.scene {
            MockScene::Still => 0,
            MockScene::MovingSquare => (self.sequence as usize * step) % width,
        };
        let top = (height - side) / 2;

        let mut pixels = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let inside = y >= top
                    && y < top + side
                    && (x + width - left) % width < side;
                let rgb = if inside {
                    [240, 230, 220]
                } else {
                    let shade = (x * 64 / width) as u8 + 16;
                    [shade, shade, shade / 2]
                };
                pixels.extend_from_slice(&rgb);
            }
        }
        pixels
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        if self.pace.is_some() {
            self.pace = Some(Duration::from_secs_f64(1.0 / f64::from(config.fps)));
        }
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!(scene = ?self.scene, "MockCamera opened with config: {:?}", config);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;
        if let Some(period) = self.pace {
            std::thread::sleep(period);
        }

        let pixels = self.render(config);
        self.sequence += 1;
        Ok(Frame::new(
            pixels,
            config.width,
            config.height,
            PixelFormat::Rgb24,
            self.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            tracing::info!("MockCamera closed");
        }
    }
}
