//! FSM Motion Detection Library
//!
//! A bit-exact, fixed-point motion detector modelled on a hardware
//! datapath. Frames are split into a grid of chunks, each chunk is reduced
//! to an integer mean, and motion is reported when enough chunk means move
//! by more than a threshold between two consecutive frames.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → frame buffer → pipeline (detection state machine) → observers
//!     ↑                        │
//!     └──── pause / resume ────┘
//! ```
//!
//! # Design Principles
//!
//! - **Integer only**: luma, chunk means and magnitudes use no floating point
//! - **Explicit states**: one detection cycle is a fixed walk of a state
//!   machine whose length depends only on the geometry
//! - **Static geometry**: chunk layout is validated once, before any frame
//! - **Bounded buffering**: a full buffer pauses acquisition instead of
//!   growing
//!
//! # Example
//!
//! ```no_run
//! use fsm_motion::{
//!     capture::{Camera, CaptureConfig, MockCamera},
//!     config::DetectionConfig,
//!     detection::MotionDetector,
//! };
//!
//! let config = CaptureConfig::default();
//! let mut camera = MockCamera::new();
//! camera.open(&config).unwrap();
//!
//! let mut detector =
//!     MotionDetector::new(config.width, config.height, &DetectionConfig::default()).unwrap();
//!
//! let a = camera.capture().unwrap();
//! let b = camera.capture().unwrap();
//! let report = detector.run_cycle(&a, &b).unwrap();
//! println!("motion: {} ({} moved, {} required)", report.detected, report.motion_count, report.required);
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod detection;
pub mod metrics;
pub mod observer;
pub mod pipeline;

// Re-export commonly used types at crate root
pub use capture::{Camera, CaptureConfig, Frame, FrameProducer, MockCamera, ProducerHandle};
pub use config::{ConfigError, DetectionConfig, FileConfig, PipelineConfig};
pub use detection::{ChunkGeometry, CycleReport, DetectorError, MagnitudeMode, MotionDetector};
pub use observer::{DetectionEvent, DetectionObserver, LogObserver};
pub use pipeline::{Pipeline, RunOutcome};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
