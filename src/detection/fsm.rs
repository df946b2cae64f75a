//! Detection state machine.
//!
//! [`State::next`] is a pure function of the current state, the cycle
//! cursors and the geometry. The side effect of each state is a method on
//! [`CycleContext`]; the driver runs the effect, then asks for the next
//! state.

use super::{
    ChunkAccumulator, ChunkGeometry, ChunkMeanGrid, DifferenceEngine, MotionCounter,
    MotionDecision, PixelStream,
};

/// States of one detection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Wait for a frame pair and linearize it.
    Prepare,
    /// Latch the sample at the stream cursor.
    Fetch,
    /// Add the latched sample to the current lane.
    Accumulate,
    /// Select the next lane after a full row segment.
    AdvanceLane,
    /// Wrap the lane selector after a full pixel row.
    RowDone,
    /// Shift every lane sum down to a chunk mean.
    Quantize,
    /// Store a chunk row of frame A means.
    StoreMean,
    /// Overwrite one stored mean with its magnitude against frame B.
    Diff,
    /// Compare one magnitude against the threshold.
    AbsThreshold,
    /// Compare the motion counter against the required count.
    Decide,
    /// Publish the result and clear the context.
    Reset,
}

impl State {
    /// Next state, given the context after this state's effect ran.
    pub fn next(self, ctx: &CycleContext, geometry: &ChunkGeometry) -> State {
        let acc = &ctx.accumulator;
        match self {
            State::Prepare => State::Fetch,
            State::Fetch => State::Accumulate,
            State::Accumulate => {
                if acc.segment_full() {
                    State::AdvanceLane
                } else {
                    State::Fetch
                }
            }
            State::AdvanceLane => {
                if acc.lane() < geometry.chunk_columns() as usize {
                    State::Fetch
                } else {
                    State::RowDone
                }
            }
            State::RowDone => {
                if acc.row_in_block() < geometry.chunk_height() {
                    State::Fetch
                } else {
                    State::Quantize
                }
            }
            State::Quantize => {
                if ctx.stored_rows < geometry.chunk_lines() {
                    State::StoreMean
                } else {
                    State::Diff
                }
            }
            State::StoreMean => State::Fetch,
            State::Diff => State::AbsThreshold,
            State::AbsThreshold => {
                if ctx.column < geometry.chunk_columns() {
                    State::Diff
                } else if acc.byte_index() < geometry.stream_len() {
                    State::Fetch
                } else {
                    State::Decide
                }
            }
            State::Decide => State::Reset,
            State::Reset => State::Prepare,
        }
    }
}

/// Everything a cycle mutates: register bank, grid, counter and cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleContext {
    accumulator: ChunkAccumulator,
    grid: ChunkMeanGrid,
    counter: MotionCounter,
    /// Chunk rows of frame A stored so far.
    stored_rows: u32,
    /// Chunk row of frame B being differenced.
    diff_row: u32,
    /// Column cursor within `diff_row`.
    column: u32,
    sample: u8,
    magnitude: i32,
    fetches: usize,
    evaluations: u32,
    transitions: u64,
    detected: Option<bool>,
}

impl CycleContext {
    pub fn new(geometry: &ChunkGeometry) -> Self {
        Self {
            accumulator: ChunkAccumulator::new(geometry),
            grid: ChunkMeanGrid::new(
                geometry.chunk_lines() as usize,
                geometry.chunk_columns() as usize,
            ),
            counter: MotionCounter::default(),
            stored_rows: 0,
            diff_row: 0,
            column: 0,
            sample: 0,
            magnitude: 0,
            fetches: 0,
            evaluations: 0,
            transitions: 0,
            detected: None,
        }
    }

    pub(crate) fn fetch(&mut self, stream: &PixelStream) {
        self.sample = stream.sample(self.accumulator.byte_index());
        self.fetches += 1;
    }

    pub(crate) fn accumulate(&mut self) {
        self.accumulator.ingest(self.sample);
    }

    pub(crate) fn advance_lane(&mut self) {
        self.accumulator.advance_lane();
    }

    pub(crate) fn complete_row(&mut self) {
        self.accumulator.complete_row();
    }

    pub(crate) fn quantize(&mut self) {
        self.accumulator.quantize_row_block();
        self.column = 0;
    }

    pub(crate) fn store_means(&mut self) {
        let row = self.stored_rows as usize;
        for col in 0..self.grid.columns() {
            let mean = self.accumulator.take_lane(col);
            self.grid.store_mean(row, col, mean);
        }
        self.stored_rows += 1;
    }

    pub(crate) fn diff(&mut self, engine: &DifferenceEngine) {
        let col = self.column as usize;
        let mean = self.accumulator.take_lane(col);
        self.magnitude = engine.difference(&mut self.grid, self.diff_row as usize, col, mean);
    }

    pub(crate) fn threshold(&mut self, engine: &DifferenceEngine) {
        engine.evaluate(self.magnitude, &mut self.counter);
        self.evaluations += 1;
        self.column += 1;
        if self.column as usize == self.grid.columns() {
            self.diff_row += 1;
        }
    }

    pub(crate) fn decide(&mut self, decision: &MotionDecision) {
        self.detected = Some(decision.decide(self.counter));
    }

    pub(crate) fn count_transition(&mut self) {
        self.transitions += 1;
    }

    /// Returns every register, cell, counter and cursor to zero.
    pub fn reset(&mut self) {
        self.accumulator.clear();
        self.grid.clear();
        self.counter.reset();
        self.stored_rows = 0;
        self.diff_row = 0;
        self.column = 0;
        self.sample = 0;
        self.magnitude = 0;
        self.fetches = 0;
        self.evaluations = 0;
        self.transitions = 0;
        self.detected = None;
    }

    #[inline]
    pub fn accumulator(&self) -> &ChunkAccumulator {
        &self.accumulator
    }

    #[inline]
    pub fn grid(&self) -> &ChunkMeanGrid {
        &self.grid
    }

    #[inline]
    pub fn counter(&self) -> MotionCounter {
        self.counter
    }

    #[inline]
    pub fn stored_rows(&self) -> u32 {
        self.stored_rows
    }

    #[inline]
    pub fn diff_row(&self) -> u32 {
        self.diff_row
    }

    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[inline]
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    #[inline]
    pub fn evaluations(&self) -> u32 {
        self.evaluations
    }

    #[inline]
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Result of the cycle once `Decide` has run.
    #[inline]
    pub fn detected(&self) -> Option<bool> {
        self.detected
    }
}
