//! Concrete frame sources and source selection.

use super::{Camera, CameraError, CaptureConfig, Frame, MockCamera, PixelFormat};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::PathBuf;

/// Reads packed raw frames from a file.
///
/// The file is a plain concatenation of `width * height * channels` byte
/// frames, e.g. the output of `ffmpeg -f rawvideo -pix_fmt rgb24`.
/// Reaching the end of the file is reported as [`CameraError::EndOfStream`].
#[derive(Debug)]
pub struct RawVideoFile {
    path: PathBuf,
    format: PixelFormat,
    reader: Option<BufReader<File>>,
    dimensions: (u32, u32),
    sequence: u64,
}

impl RawVideoFile {
    /// A source of packed `rgb24` frames.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_format(path, PixelFormat::Rgb24)
    }

    pub fn with_format(path: impl Into<PathBuf>, format: PixelFormat) -> Self {
        Self {
            path: path.into(),
            format,
            reader: None,
            dimensions: (0, 0),
            sequence: 0,
        }
    }
}

impl Camera for RawVideoFile {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CameraError::DeviceNotFound(self.path.display().to_string()),
            _ => CameraError::OpenFailed(format!("{}: {}", self.path.display(), e)),
        })?;

        self.reader = Some(BufReader::new(file));
        self.dimensions = (config.width, config.height);
        self.sequence = 0;
        tracing::info!(path = %self.path.display(), format = ?self.format, "Raw video opened");
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let reader = self.reader.as_mut().ok_or(CameraError::NotInitialized)?;
        let (width, height) = self.dimensions;
        let mut pixels = vec![0u8; width as usize * height as usize * self.format.channels()];

        reader.read_exact(&mut pixels).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => CameraError::EndOfStream(self.sequence),
            _ => CameraError::CaptureFailed(e.to_string()),
        })?;

        self.sequence += 1;
        Ok(Frame::new(pixels, width, height, self.format, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::info!(path = %self.path.display(), "Raw video closed");
        }
    }
}

/// Frame-rate decimation over a live source.
///
/// Each retained frame costs [`CaptureConfig::grabs_per_frame`] captures
/// from the inner source; only the last one is returned.
#[derive(Debug)]
pub struct SampledCamera<C> {
    inner: C,
    grabs: u32,
}

impl<C: Camera> SampledCamera<C> {
    pub fn new(inner: C) -> Self {
        Self { inner, grabs: 1 }
    }

    /// Returns the wrapped source.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Camera> Camera for SampledCamera<C> {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        self.inner.open(config)?;
        self.grabs = config.grabs_per_frame();
        tracing::debug!(
            grabs_per_frame = self.grabs,
            sampled_fps = config.sampled_fps(),
            "Decimation enabled"
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let mut frame = self.inner.capture()?;
        for _ in 1..self.grabs {
            frame = self.inner.capture()?;
        }
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) {
        self.inner.close()
    }
}

/// Live camera through the platform capture backend.
#[cfg(feature = "camera")]
pub struct DeviceCamera {
    index: u32,
    inner: Option<nokhwa::Camera>,
    dimensions: (u32, u32),
    sequence: u64,
}

#[cfg(feature = "camera")]
impl DeviceCamera {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            inner: None,
            dimensions: (0, 0),
            sequence: 0,
        }
    }
}

#[cfg(feature = "camera")]
impl Camera for DeviceCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        use nokhwa::pixel_format::RgbFormat;
        use nokhwa::utils::{
            CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
            Resolution,
        };

        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;

        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));
        let mut camera = nokhwa::Camera::new(CameraIndex::Index(self.index), requested)
            .map_err(|e| CameraError::DeviceNotFound(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;

        self.inner = Some(camera);
        self.dimensions = (config.width, config.height);
        self.sequence = 0;
        tracing::info!(index = self.index, "Camera device opened");
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        use nokhwa::pixel_format::RgbFormat;

        let camera = self.inner.as_mut().ok_or(CameraError::NotInitialized)?;
        let buffer = camera
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        let (width, height) = self.dimensions;
        if image.width() != width || image.height() != height {
            return Err(CameraError::CaptureFailed(format!(
                "device delivered {}x{}, configured {}x{}",
                image.width(),
                image.height(),
                width,
                height
            )));
        }

        self.sequence += 1;
        Ok(Frame::new(
            image.into_raw(),
            width,
            height,
            PixelFormat::Rgb24,
            self.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.inner.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "Failed to stop camera stream");
            }
            tracing::info!(index = self.index, "Camera device released");
        }
    }
}

/// Builds the (unopened) source named by `config.source`.
///
/// `"mock"` selects the synthetic scene, a bare integer selects a camera
/// device and anything else is a raw video path. Live sources are
/// decimated; files are read frame by frame.
pub fn build_source(config: &CaptureConfig) -> Result<Box<dyn Camera>, CameraError> {
    let source = config.source.trim();
    if source.eq_ignore_ascii_case("mock") {
        return Ok(Box::new(SampledCamera::new(MockCamera::new().paced(true))));
    }
    if let Ok(index) = source.parse::<u32>() {
        return device_source(index);
    }
    Ok(Box::new(RawVideoFile::new(source)))
}

#[cfg(feature = "camera")]
fn device_source(index: u32) -> Result<Box<dyn Camera>, CameraError> {
    Ok(Box::new(SampledCamera::new(DeviceCamera::new(index))))
}

#[cfg(not(feature = "camera"))]
fn device_source(index: u32) -> Result<Box<dyn Camera>, CameraError> {
    Err(CameraError::DeviceNotFound(format!(
        "camera {index} requested but the `camera` feature is disabled"
    )))
}
