//! Register bank accumulating chunk-row sums.
//!
//! One lane per chunk column. Samples arrive row-major, so a pixel row is
//! split into `chunk_columns` segments of `chunk_width` samples and each
//! segment lands in the next lane. After `chunk_height` pixel rows every
//! lane holds the sum of one chunk and is quantized by a right shift.

use super::ChunkGeometry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkAccumulator {
    lanes: Vec<u32>,
    byte_index: usize,
    lane: usize,
    row_in_block: u32,
    chunk_width: usize,
    shift: u32,
}

impl ChunkAccumulator {
    pub fn new(geometry: &ChunkGeometry) -> Self {
        Self {
            lanes: vec![0; geometry.chunk_columns() as usize],
            byte_index: 0,
            lane: 0,
            row_in_block: 0,
            chunk_width: geometry.chunk_width() as usize,
            shift: geometry.shift(),
        }
    }

    /// Adds a sample to the current lane and advances the stream cursor.
    #[inline]
    pub fn ingest(&mut self, sample: u8) {
        self.lanes[self.lane] += u32::from(sample);
        self.byte_index += 1;
    }

    /// True when the current lane has received a whole row segment.
    #[inline]
    pub fn segment_full(&self) -> bool {
        self.byte_index % self.chunk_width == 0
    }

    /// Moves to the next lane. May step one past the last lane; a
    /// following [`complete_row`](Self::complete_row) wraps it.
    #[inline]
    pub fn advance_lane(&mut self) {
        self.lane += 1;
    }

    /// Wraps the lane selector and counts one consumed pixel row.
    #[inline]
    pub fn complete_row(&mut self) {
        self.lane = 0;
        self.row_in_block += 1;
    }

    /// Turns every lane sum into a chunk mean (floor division).
    pub fn quantize_row_block(&mut self) {
        for lane in &mut self.lanes {
            *lane >>= self.shift;
        }
        self.row_in_block = 0;
    }

    /// Reads a lane and clears it for the next chunk row.
    #[inline]
    pub fn take_lane(&mut self, lane: usize) -> u32 {
        std::mem::take(&mut self.lanes[lane])
    }

    /// Zeroes every register and cursor.
    pub fn clear(&mut self) {
        self.lanes.fill(0);
        self.byte_index = 0;
        self.lane = 0;
        self.row_in_block = 0;
    }

    #[inline]
    pub fn lanes(&self) -> &[u32] {
        &self.lanes
    }

    /// Samples ingested since the last clear.
    #[inline]
    pub fn byte_index(&self) -> usize {
        self.byte_index
    }

    #[inline]
    pub fn lane(&self) -> usize {
        self.lane
    }

    #[inline]
    pub fn row_in_block(&self) -> u32 {
        self.row_in_block
    }
}
