//! Frame acquisition.
//!
//! Sources deliver fixed-resolution frames in acquisition order. A single
//! producer thread pushes them into a bounded buffer that the detector
//! drains one pair at a time.

mod camera;
mod config;
mod frame;
mod producer;
mod sources;

pub use camera::{Camera, CameraError, MockCamera, MockScene};
pub use config::CaptureConfig;
pub use frame::{Frame, PixelFormat};
pub use producer::{
    frame_buffer, FrameProducer, FrameReceiver, FrameSender, PauseReason, ProducerHandle,
    ProducerResumer, ProducerStatus,
};
#[cfg(feature = "camera")]
pub use sources::DeviceCamera;
pub use sources::{build_source, RawVideoFile, SampledCamera};
