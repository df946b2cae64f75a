//! Prometheus metrics exporter for the detection pipeline.
//!
//! [`MetricsRegistry`] is a [`DetectionObserver`](crate::observer::DetectionObserver):
//! subscribe a clone to the pipeline and it tracks every published cycle.
//!
//! # Metrics Exposed
//!
//! ## Detection Metrics
//! - `fsm_motion_cycles_total` - Completed detection cycles
//! - `fsm_motion_detections_total` - Cycles that reported motion
//! - `fsm_motion_state` - Result of the last cycle (1=motion, 0=no motion)
//! - `fsm_motion_last_motion_count` - Chunks above threshold in the last cycle
//! - `fsm_motion_required_count` - Chunks needed for a positive result
//!
//! ## Acquisition Metrics
//! - `fsm_motion_producer_paused` - Whether the frame producer is paused
//!
//! With the `metrics` feature, [`MetricsServer`] serves them on `/metrics`
//! alongside a `/health` check.
//!
//! # Example
//!
//! ```no_run
//! use fsm_motion::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! println!("{}", registry.encode().expect("Failed to encode metrics"));
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
