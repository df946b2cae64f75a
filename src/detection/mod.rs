//! Fixed-point chunk motion detection.
//!
//! Mirrors a hardware datapath: a frame pair is linearized into one
//! intensity stream, summed per chunk in a bank of lane registers,
//! quantized to chunk means by a right shift, differenced in place against
//! the previous frame's means and thresholded into a motion count.
//!
//! ```text
//! linearize → accumulate → quantize → store (A) / diff + threshold (B) → decide
//! ```
//!
//! Every step is one transition of an explicit state machine, so the
//! number of iterations per cycle depends only on the geometry.

mod accumulator;
mod decision;
mod difference;
mod driver;
mod fsm;
mod geometry;
mod grid;
mod linearize;

pub use accumulator::ChunkAccumulator;
pub use decision::{required_chunks, MotionDecision};
pub use difference::{DifferenceEngine, MotionCounter};
pub use driver::{CycleReport, DetectorError, MotionDetector};
pub use fsm::{CycleContext, State};
pub use geometry::{ChunkGeometry, MAX_BLOCK_SIZE};
pub use grid::{ChunkMeanGrid, MagnitudeMode};
pub use linearize::{linearize_pair, luma, PixelStream};
