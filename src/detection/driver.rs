//! Cycle driver.
//!
//! Owns the state machine and its context, and runs exactly one cycle per
//! frame pair on the caller's thread.

use super::{
    linearize_pair, ChunkGeometry, CycleContext, DifferenceEngine, MotionDecision, PixelStream,
    State,
};
use crate::capture::Frame;
use crate::config::{ConfigError, DetectionConfig};
use serde::Serialize;

/// Errors raised for a frame pair; the cycle is not started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    #[error(
        "frame {sequence} is {width}x{height}, detector expects {expected_width}x{expected_height}"
    )]
    FrameMismatch {
        sequence: u64,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
    #[error("frame {sequence} pixel buffer does not match its dimensions")]
    MalformedFrame { sequence: u64 },
    #[error("a detection cycle is already in progress")]
    CycleInProgress,
}

/// Outcome and bookkeeping of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Zero-based cycle number.
    pub cycle: u64,
    pub detected: bool,
    pub motion_count: u32,
    pub required: u32,
    pub total_chunks: u32,
    /// Samples fetched from the stream.
    pub fetches: usize,
    /// Samples added to the register bank.
    pub samples_ingested: usize,
    /// Threshold comparisons performed.
    pub evaluations: u32,
    /// State machine steps, `Prepare` through `Reset`.
    pub transitions: u64,
}

/// Fixed-point chunk motion detector.
#[derive(Debug)]
pub struct MotionDetector {
    geometry: ChunkGeometry,
    engine: DifferenceEngine,
    decision: MotionDecision,
    state: State,
    context: CycleContext,
    stream: Option<PixelStream>,
    cycles: u64,
}

impl MotionDetector {
    /// Builds a detector for `width` x `height` frames.
    pub fn new(width: u32, height: u32, config: &DetectionConfig) -> Result<Self, ConfigError> {
        let geometry = ChunkGeometry::new(width, height, config.chunk_lines, config.chunk_columns)?;
        Self::with_geometry(geometry, config)
    }

    /// Builds a detector over an already validated geometry.
    ///
    /// The chunk counts of `config` are ignored in favor of `geometry`.
    pub fn with_geometry(
        geometry: ChunkGeometry,
        config: &DetectionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        tracing::info!(
            width = geometry.width(),
            height = geometry.height(),
            chunk_lines = geometry.chunk_lines(),
            chunk_columns = geometry.chunk_columns(),
            block_size = geometry.block_size(),
            threshold = config.threshold,
            motion_percent = config.motion_percent,
            "Motion detector configured"
        );

        Ok(Self {
            geometry,
            engine: DifferenceEngine::new(config.threshold, config.magnitude),
            decision: MotionDecision::new(geometry.total_chunks(), config.motion_percent),
            state: State::Prepare,
            context: CycleContext::new(&geometry),
            stream: None,
            cycles: 0,
        })
    }

    #[inline]
    pub fn geometry(&self) -> &ChunkGeometry {
        &self.geometry
    }

    #[inline]
    pub fn decision(&self) -> &MotionDecision {
        &self.decision
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn context(&self) -> &CycleContext {
        &self.context
    }

    /// Completed cycles.
    #[inline]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The `Prepare` effect: validates and linearizes a frame pair.
    ///
    /// Counters are untouched when the pair is rejected.
    pub fn load(&mut self, a: &Frame, b: &Frame) -> Result<(), DetectorError> {
        if self.state != State::Prepare || self.stream.is_some() {
            return Err(DetectorError::CycleInProgress);
        }
        self.check_frame(a)?;
        self.check_frame(b)?;

        self.stream = Some(linearize_pair(a, b));
        Ok(())
    }

    fn check_frame(&self, frame: &Frame) -> Result<(), DetectorError> {
        let (width, height) = (self.geometry.width(), self.geometry.height());
        if frame.width() != width || frame.height() != height {
            return Err(DetectorError::FrameMismatch {
                sequence: frame.sequence(),
                width: frame.width(),
                height: frame.height(),
                expected_width: width,
                expected_height: height,
            });
        }
        if !frame.is_valid() {
            return Err(DetectorError::MalformedFrame {
                sequence: frame.sequence(),
            });
        }
        Ok(())
    }

    /// Runs the current state's effect and moves to the next state.
    ///
    /// In `Prepare` without a loaded pair nothing happens. Returns the
    /// report when the step was `Reset`.
    pub fn step(&mut self) -> Option<CycleReport> {
        let stream = self.stream.as_ref()?;

        let ctx = &mut self.context;
        match self.state {
            State::Prepare | State::Reset => {}
            State::Fetch => ctx.fetch(stream),
            State::Accumulate => ctx.accumulate(),
            State::AdvanceLane => ctx.advance_lane(),
            State::RowDone => ctx.complete_row(),
            State::Quantize => ctx.quantize(),
            State::StoreMean => ctx.store_means(),
            State::Diff => ctx.diff(&self.engine),
            State::AbsThreshold => ctx.threshold(&self.engine),
            State::Decide => ctx.decide(&self.decision),
        }
        ctx.count_transition();

        let current = self.state;
        self.state = current.next(&self.context, &self.geometry);

        (current == State::Reset).then(|| self.finish_cycle())
    }

    /// Runs a whole cycle over one frame pair.
    pub fn run_cycle(&mut self, a: &Frame, b: &Frame) -> Result<CycleReport, DetectorError> {
        self.load(a, b)?;
        loop {
            if let Some(report) = self.step() {
                return Ok(report);
            }
        }
    }

    /// Drops a partially processed pair without publishing anything.
    pub fn abandon(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!(state = ?self.state, "Abandoning detection cycle");
        }
        self.context.reset();
        self.state = State::Prepare;
    }

    fn finish_cycle(&mut self) -> CycleReport {
        let ctx = &self.context;
        let report = CycleReport {
            cycle: self.cycles,
            detected: ctx.detected().unwrap_or(false),
            motion_count: ctx.counter().get(),
            required: self.decision.required(),
            total_chunks: self.decision.total_chunks(),
            fetches: ctx.fetches(),
            samples_ingested: ctx.accumulator().byte_index(),
            evaluations: ctx.evaluations(),
            transitions: ctx.transitions(),
        };

        tracing::trace!(
            cycle = report.cycle,
            motion_count = report.motion_count,
            required = report.required,
            detected = report.detected,
            transitions = report.transitions,
            "Cycle complete"
        );

        self.context.reset();
        self.stream = None;
        self.cycles += 1;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelFormat;
    use crate::detection::MagnitudeMode;
    use proptest::prelude::*;

    fn config(lines: u32, columns: u32) -> DetectionConfig {
        DetectionConfig {
            chunk_lines: lines,
            chunk_columns: columns,
            ..DetectionConfig::default()
        }
    }

    fn gray(value: u8, width: u32, height: u32) -> Frame {
        Frame::gray(vec![value; (width * height) as usize], width, height, 0)
    }

    /// Gray frame whose chunk (row, col) is filled with `means[row][col]`.
    fn chunked(geometry: &ChunkGeometry, means: &[Vec<u8>]) -> Frame {
        let (width, height) = (geometry.width(), geometry.height());
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let row = (y / geometry.chunk_height()) as usize;
                let col = (x / geometry.chunk_width()) as usize;
                pixels.push(means[row][col]);
            }
        }
        Frame::gray(pixels, width, height, 0)
    }

    #[test]
    fn test_toy_geometry_full_motion() {
        let mut detector = MotionDetector::new(4, 4, &config(2, 2)).unwrap();
        let report = detector
            .run_cycle(&gray(40, 4, 4), &gray(100, 4, 4))
            .unwrap();

        assert_eq!(report.motion_count, 4);
        assert_eq!(report.required, 1);
        assert!(report.detected);
        assert_eq!(report.fetches, 32);
        assert_eq!(report.samples_ingested, 32);
        assert_eq!(report.evaluations, 4);
    }

    #[test]
    fn test_two_chunk_geometry() {
        // One chunk row of two 2x4 chunks.
        let mut detector = MotionDetector::new(4, 4, &config(1, 2)).unwrap();
        let report = detector
            .run_cycle(&gray(40, 4, 4), &gray(100, 4, 4))
            .unwrap();

        assert_eq!(report.total_chunks, 2);
        assert_eq!(report.motion_count, 2);
        assert!(report.detected);
    }

    #[test]
    fn test_grid_holds_magnitudes_before_reset() {
        let mut detector = MotionDetector::new(4, 4, &config(2, 2)).unwrap();
        detector
            .load(&gray(100, 4, 4), &gray(40, 4, 4))
            .unwrap();

        while detector.state() != State::Decide {
            assert!(detector.step().is_none());
        }
        let grid = detector.context().grid();
        assert_eq!(grid.row(0), &[60, 60]);
        assert_eq!(grid.row(1), &[60, 60]);

        detector.step();
        assert_eq!(detector.state(), State::Reset);
        assert!(detector.step().is_some());
        assert_eq!(detector.state(), State::Prepare);
    }

    #[test]
    fn test_identical_mixed_frames_no_motion() {
        let mut detector = MotionDetector::new(16, 8, &config(2, 4)).unwrap();
        let pixels: Vec<u8> = (0..128).map(|i| (i * 37 % 251) as u8).collect();
        let a = Frame::gray(pixels.clone(), 16, 8, 1);
        let b = Frame::gray(pixels, 16, 8, 2);

        let report = detector.run_cycle(&a, &b).unwrap();
        assert_eq!(report.motion_count, 0);
        assert!(!report.detected);
    }

    #[test]
    fn test_chunk_means_truncate() {
        // Four 2x2 chunks. Frame A chunk (0,0) sums to 6 -> mean 1.
        let mut detector = MotionDetector::new(4, 4, &config(2, 2)).unwrap();
        let a = Frame::gray(
            vec![3, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            4,
            4,
            1,
        );
        detector.load(&a, &gray(0, 4, 4)).unwrap();
        while detector.state() != State::Decide {
            detector.step();
        }
        assert_eq!(detector.context().grid().get(0, 0), 1);
    }

    #[test]
    fn test_decision_boundary() {
        // 4x4 grid of 2x2 chunks: 16 chunks, 25% requires 4.
        let geometry = ChunkGeometry::new(8, 8, 4, 4).unwrap();
        let mut detector = MotionDetector::with_geometry(geometry, &config(4, 4)).unwrap();
        let still = vec![vec![50u8; 4]; 4];

        let mut moved = still.clone();
        moved[0] = vec![90, 90, 90, 50];
        let report = detector
            .run_cycle(&chunked(&geometry, &still), &chunked(&geometry, &moved))
            .unwrap();
        assert_eq!(report.required, 4);
        assert_eq!(report.motion_count, 3);
        assert!(!report.detected);

        moved[3][3] = 10;
        let report = detector
            .run_cycle(&chunked(&geometry, &still), &chunked(&geometry, &moved))
            .unwrap();
        assert_eq!(report.motion_count, 4);
        assert!(report.detected);
    }

    #[test]
    fn test_threshold_is_strict_per_chunk() {
        let geometry = ChunkGeometry::new(4, 2, 1, 2).unwrap();
        let mut detector = MotionDetector::with_geometry(geometry, &config(1, 2)).unwrap();
        let a = chunked(&geometry, &[vec![100, 100]]);
        let b = chunked(&geometry, &[vec![115, 84]]);

        let report = detector.run_cycle(&a, &b).unwrap();
        // |100 - 115| = 15 is not above 15; |100 - 84| = 16 is.
        assert_eq!(report.motion_count, 1);
    }

    #[test]
    fn test_fixed_width_magnitude_changes_result() {
        let geometry = ChunkGeometry::new(2, 2, 1, 1).unwrap();
        let narrow = DetectionConfig {
            chunk_lines: 1,
            chunk_columns: 1,
            magnitude: MagnitudeMode::FixedWidth { bits: 8 },
            ..DetectionConfig::default()
        };
        let mut detector = MotionDetector::with_geometry(geometry, &narrow).unwrap();

        // 0 - 250 wraps to +6 in an 8-bit register: below threshold.
        let report = detector
            .run_cycle(&gray(0, 2, 2), &gray(250, 2, 2))
            .unwrap();
        assert_eq!(report.motion_count, 0);
    }

    #[test]
    fn test_color_frames_are_converted() {
        let mut detector = MotionDetector::new(4, 4, &config(2, 2)).unwrap();
        let a = Frame::solid_rgb([40, 40, 40], 4, 4, 1);
        let b = Frame::new(vec![100; 48], 4, 4, PixelFormat::Bgr24, 2);

        let report = detector.run_cycle(&a, &b).unwrap();
        assert_eq!(report.motion_count, 4);
    }

    #[test]
    fn test_mismatched_frame_leaves_counters() {
        let mut detector = MotionDetector::new(4, 4, &config(2, 2)).unwrap();
        let fresh = detector.context().clone();

        let result = detector.run_cycle(&gray(0, 4, 4), &gray(0, 8, 4));
        assert!(matches!(result, Err(DetectorError::FrameMismatch { .. })));
        assert_eq!(detector.context(), &fresh);
        assert_eq!(detector.state(), State::Prepare);

        let short = Frame::gray(vec![0; 3], 4, 4, 9);
        assert_eq!(
            detector.load(&short, &gray(0, 4, 4)),
            Err(DetectorError::MalformedFrame { sequence: 9 })
        );
    }

    #[test]
    fn test_step_blocks_without_pair() {
        let mut detector = MotionDetector::new(4, 4, &config(2, 2)).unwrap();
        assert!(detector.step().is_none());
        assert_eq!(detector.state(), State::Prepare);
        assert_eq!(detector.context().transitions(), 0);
    }

    #[test]
    fn test_load_rejected_mid_cycle_and_abandon() {
        let mut detector = MotionDetector::new(4, 4, &config(2, 2)).unwrap();
        detector.load(&gray(1, 4, 4), &gray(2, 4, 4)).unwrap();
        for _ in 0..10 {
            detector.step();
        }
        assert_eq!(
            detector.load(&gray(1, 4, 4), &gray(2, 4, 4)),
            Err(DetectorError::CycleInProgress)
        );

        detector.abandon();
        assert_eq!(detector.state(), State::Prepare);
        assert_eq!(detector.cycles(), 0);
        assert!(detector.run_cycle(&gray(1, 4, 4), &gray(2, 4, 4)).is_ok());
        assert_eq!(detector.cycles(), 1);
    }

    #[test]
    fn test_reset_isolates_cycles() {
        let mut detector = MotionDetector::new(4, 4, &config(2, 2)).unwrap();
        let fresh = detector.context().clone();

        let first = detector
            .run_cycle(&gray(0, 4, 4), &gray(255, 4, 4))
            .unwrap();
        assert!(first.detected);
        assert_eq!(detector.context(), &fresh);

        let second = detector
            .run_cycle(&gray(7, 4, 4), &gray(7, 4, 4))
            .unwrap();
        assert_eq!(second.cycle, 1);
        assert_eq!(second.motion_count, 0);
        assert!(!second.detected);
    }

    #[test]
    fn test_default_geometry_cycle() {
        let mut detector = MotionDetector::new(640, 480, &DetectionConfig::default()).unwrap();
        let report = detector
            .run_cycle(&gray(30, 640, 480), &gray(200, 640, 480))
            .unwrap();

        assert_eq!(report.fetches, 2 * 640 * 480);
        assert_eq!(report.evaluations, 1200);
        assert_eq!(report.motion_count, 1200);
        assert_eq!(report.required, 300);
        assert!(report.detected);
    }

    /// Steps of one cycle, derived from the geometry alone.
    fn expected_transitions(g: &ChunkGeometry) -> u64 {
        let samples = g.stream_len() as u64;
        let lane_advances = samples / u64::from(g.chunk_width());
        let rows = 2 * u64::from(g.height());
        let quantizations = 2 * u64::from(g.chunk_lines());
        let stores = u64::from(g.chunk_lines());
        let chunks = u64::from(g.total_chunks());
        // Prepare, Decide and Reset once each.
        3 + 2 * samples + lane_advances + rows + quantizations + stores + 2 * chunks
    }

    proptest! {
        #[test]
        fn prop_cycle_counts_depend_only_on_geometry(
            chunk_w_log in 0u32..3,
            chunk_h_log in 0u32..3,
            lines in 1u32..5,
            columns in 1u32..5,
            seed in any::<u64>(),
        ) {
            let width = columns << chunk_w_log;
            let height = lines << chunk_h_log;
            let geometry = ChunkGeometry::new(width, height, lines, columns).unwrap();
            let mut detector =
                MotionDetector::with_geometry(geometry, &config(lines, columns)).unwrap();

            let len = (width * height) as usize;
            let noise = |salt: u64| -> Vec<u8> {
                (0..len as u64)
                    .map(|i| {
                        let x = (seed ^ salt).wrapping_add(i).wrapping_mul(6364136223846793005);
                        (x >> 56) as u8
                    })
                    .collect()
            };
            let a = Frame::gray(noise(1), width, height, 1);
            let b = Frame::gray(noise(2), width, height, 2);

            let report = detector.run_cycle(&a, &b).unwrap();
            prop_assert_eq!(report.fetches, 2 * len);
            prop_assert_eq!(report.samples_ingested, 2 * len);
            prop_assert_eq!(report.evaluations, lines * columns);
            prop_assert_eq!(report.transitions, expected_transitions(&geometry));
            prop_assert!(report.motion_count <= report.total_chunks);
        }

        #[test]
        fn prop_identical_pair_never_moves(
            pixels in proptest::collection::vec(any::<u8>(), 64),
            threshold in 0u16..300,
        ) {
            let cfg = DetectionConfig {
                chunk_lines: 2,
                chunk_columns: 2,
                threshold,
                ..DetectionConfig::default()
            };
            let mut detector = MotionDetector::new(8, 8, &cfg).unwrap();
            let a = Frame::gray(pixels.clone(), 8, 8, 1);
            let b = Frame::gray(pixels, 8, 8, 2);

            let report = detector.run_cycle(&a, &b).unwrap();
            prop_assert_eq!(report.motion_count, 0);
            prop_assert!(!report.detected);
        }
    }
}
