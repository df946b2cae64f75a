//! Chunk mean grid and magnitude computation.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// How the magnitude of a chunk difference is formed.
///
/// Both modes negate negative differences explicitly. `FixedWidth` also
/// models a signed register of `bits` bits: the difference and its
/// negation wrap at that width, as a two's-complement datapath would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MagnitudeMode {
    /// Conditional negation on a 32-bit signed difference. Never wraps for
    /// 8-bit means.
    #[default]
    Exact,
    /// Conditional negation inside a `bits`-wide signed register.
    FixedWidth { bits: u8 },
}

impl MagnitudeMode {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            MagnitudeMode::Exact => Ok(()),
            MagnitudeMode::FixedWidth { bits } if (2..=16).contains(&bits) => Ok(()),
            MagnitudeMode::FixedWidth { bits } => Err(ConfigError::InvalidMagnitudeWidth(bits)),
        }
    }

    /// Magnitude of `difference` under this mode.
    pub fn magnitude(self, difference: i32) -> i32 {
        match self {
            MagnitudeMode::Exact => {
                if difference < 0 {
                    -difference
                } else {
                    difference
                }
            }
            MagnitudeMode::FixedWidth { bits } => {
                let wrapped = wrap_signed(difference, bits);
                if wrapped < 0 {
                    // The most negative value negates to itself.
                    wrap_signed(wrapped.wrapping_neg(), bits)
                } else {
                    wrapped
                }
            }
        }
    }
}

/// Sign-extends the low `bits` bits of `value`.
#[inline]
fn wrap_signed(value: i32, bits: u8) -> i32 {
    let unused = 32 - u32::from(bits);
    value.wrapping_shl(unused).wrapping_shr(unused)
}

/// Grid of per-chunk values, row-major.
///
/// During frame A's pass a cell holds that chunk's mean. During frame B's
/// pass it is overwritten once with the magnitude of the difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMeanGrid {
    cells: Vec<i32>,
    lines: usize,
    columns: usize,
}

impl ChunkMeanGrid {
    pub fn new(lines: usize, columns: usize) -> Self {
        Self {
            cells: vec![0; lines * columns],
            lines,
            columns,
        }
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.lines && col < self.columns);
        row * self.columns + col
    }

    /// Stores a frame A chunk mean.
    #[inline]
    pub fn store_mean(&mut self, row: usize, col: usize, mean: u32) {
        let index = self.index(row, col);
        // Means of 8-bit samples never exceed 255.
        self.cells[index] = mean as i32;
    }

    /// Replaces the stored mean with `|stored - mean|` and returns it.
    #[inline]
    pub fn diff_in_place(&mut self, row: usize, col: usize, mean: u32, mode: MagnitudeMode) -> i32 {
        let index = self.index(row, col);
        let magnitude = mode.magnitude(self.cells[index] - mean as i32);
        self.cells[index] = magnitude;
        magnitude
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.cells[self.index(row, col)]
    }

    /// Cells of one chunk row.
    pub fn row(&self, row: usize) -> &[i32] {
        let start = self.index(row, 0);
        &self.cells[start..start + self.columns]
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    #[inline]
    pub fn lines(&self) -> usize {
        self.lines
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_then_diff() {
        let mut grid = ChunkMeanGrid::new(2, 3);
        grid.store_mean(1, 2, 40);
        assert_eq!(grid.get(1, 2), 40);

        assert_eq!(grid.diff_in_place(1, 2, 100, MagnitudeMode::Exact), 60);
        assert_eq!(grid.get(1, 2), 60);
        assert_eq!(grid.row(1), &[0, 0, 60]);
    }

    #[test]
    fn test_exact_magnitude_is_symmetric() {
        for d in [-255, -16, -1, 0, 1, 16, 255] {
            assert_eq!(MagnitudeMode::Exact.magnitude(d), d.abs());
        }
    }

    #[test]
    fn test_fixed_width_wraps() {
        let mode = MagnitudeMode::FixedWidth { bits: 8 };
        // -200 does not fit in 8 bits and reads back as +56.
        assert_eq!(mode.magnitude(-200), 56);
        assert_eq!(mode.magnitude(-100), 100);
        // -128 has no positive counterpart at 8 bits.
        assert_eq!(mode.magnitude(-128), -128);

        // Nine bits hold every difference of two 8-bit means.
        let wide = MagnitudeMode::FixedWidth { bits: 9 };
        for d in -255..=255 {
            assert_eq!(wide.magnitude(d), d.abs());
        }
    }

    #[test]
    fn test_fixed_width_validation() {
        assert!(MagnitudeMode::FixedWidth { bits: 9 }.validate().is_ok());
        assert_eq!(
            MagnitudeMode::FixedWidth { bits: 1 }.validate(),
            Err(ConfigError::InvalidMagnitudeWidth(1))
        );
        assert_eq!(
            MagnitudeMode::FixedWidth { bits: 17 }.validate(),
            Err(ConfigError::InvalidMagnitudeWidth(17))
        );
    }

    #[test]
    fn test_clear() {
        let mut grid = ChunkMeanGrid::new(2, 2);
        grid.store_mean(0, 0, 9);
        grid.clear();
        assert_eq!(grid, ChunkMeanGrid::new(2, 2));
    }
}
