//! Per-chunk differencing and thresholding.

use super::{ChunkMeanGrid, MagnitudeMode};

/// Number of chunks whose magnitude exceeded the threshold this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MotionCounter(u32);

impl MotionCounter {
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn increment(&mut self) {
        self.0 += 1;
    }

    #[inline]
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Compares chunk-mean magnitudes of frame B against frame A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifferenceEngine {
    threshold: u16,
    mode: MagnitudeMode,
}

impl DifferenceEngine {
    pub fn new(threshold: u16, mode: MagnitudeMode) -> Self {
        Self { threshold, mode }
    }

    #[inline]
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    #[inline]
    pub fn mode(&self) -> MagnitudeMode {
        self.mode
    }

    /// Overwrites a stored frame A mean with its magnitude against `mean`.
    #[inline]
    pub fn difference(&self, grid: &mut ChunkMeanGrid, row: usize, col: usize, mean: u32) -> i32 {
        grid.diff_in_place(row, col, mean, self.mode)
    }

    /// Counts the chunk as moved if its magnitude is above the threshold.
    #[inline]
    pub fn evaluate(&self, magnitude: i32, counter: &mut MotionCounter) -> bool {
        let moved = magnitude > i32::from(self.threshold);
        if moved {
            counter.increment();
        }
        moved
    }
}

impl Default for DifferenceEngine {
    fn default() -> Self {
        Self::new(15, MagnitudeMode::Exact)
    }
}
