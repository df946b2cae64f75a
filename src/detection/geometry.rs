//! Chunk geometry derived from frame size and chunk grid.

use crate::config::ConfigError;

/// Largest block size whose lane sum of 8-bit samples fits in 32 bits.
pub const MAX_BLOCK_SIZE: u32 = 1 << 24;

/// Validated frame and chunk dimensions.
///
/// Every iteration count of a detection cycle is derived from this value,
/// so a cycle over a given geometry always performs the same number of
/// fetches, lane advances, quantizations and threshold evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkGeometry {
    width: u32,
    height: u32,
    chunk_lines: u32,
    chunk_columns: u32,
    chunk_width: u32,
    chunk_height: u32,
    shift: u32,
}

impl ChunkGeometry {
    /// Validates and derives a geometry.
    ///
    /// The chunk grid must evenly divide the frame and the pixel count of
    /// one chunk must be a power of two, since quantization is a right
    /// shift.
    pub fn new(
        width: u32,
        height: u32,
        chunk_lines: u32,
        chunk_columns: u32,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 || chunk_lines == 0 || chunk_columns == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        // Pixel count bounds every derived count, including total chunks.
        if u64::from(width) * u64::from(height) > u64::from(u32::MAX) {
            return Err(ConfigError::FrameTooLarge { width, height });
        }
        if width % chunk_columns != 0 {
            return Err(ConfigError::IndivisibleGeometry {
                dimension: "width",
                size: width,
                chunks: chunk_columns,
            });
        }
        if height % chunk_lines != 0 {
            return Err(ConfigError::IndivisibleGeometry {
                dimension: "height",
                size: height,
                chunks: chunk_lines,
            });
        }

        let chunk_width = width / chunk_columns;
        let chunk_height = height / chunk_lines;
        let block_size = u64::from(chunk_width) * u64::from(chunk_height);
        if block_size > u64::from(MAX_BLOCK_SIZE) {
            return Err(ConfigError::BlockTooLarge {
                block_size: u32::try_from(block_size).unwrap_or(u32::MAX),
                max: MAX_BLOCK_SIZE,
            });
        }
        let block_size = block_size as u32;
        if !block_size.is_power_of_two() {
            return Err(ConfigError::BlockNotPowerOfTwo { block_size });
        }

        Ok(Self {
            width,
            height,
            chunk_lines,
            chunk_columns,
            chunk_width,
            chunk_height,
            shift: block_size.trailing_zeros(),
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of chunk rows.
    #[inline]
    pub fn chunk_lines(&self) -> u32 {
        self.chunk_lines
    }

    /// Number of chunk columns, which is also the number of lanes.
    #[inline]
    pub fn chunk_columns(&self) -> u32 {
        self.chunk_columns
    }

    /// Pixels per chunk row segment.
    #[inline]
    pub fn chunk_width(&self) -> u32 {
        self.chunk_width
    }

    /// Pixel rows per chunk.
    #[inline]
    pub fn chunk_height(&self) -> u32 {
        self.chunk_height
    }

    /// Pixels per chunk.
    #[inline]
    pub fn block_size(&self) -> u32 {
        self.chunk_width * self.chunk_height
    }

    /// Right shift that divides a lane sum by the block size.
    #[inline]
    pub fn shift(&self) -> u32 {
        self.shift
    }

    #[inline]
    pub fn total_chunks(&self) -> u32 {
        self.chunk_lines * self.chunk_columns
    }

    /// Samples in one linearized frame.
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Samples in one linearized frame pair.
    #[inline]
    pub fn stream_len(&self) -> usize {
        2 * self.frame_len()
    }
}

impl Default for ChunkGeometry {
    /// 640x480 frames in a 30x40 grid of 16x16 pixel chunks.
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            chunk_lines: 30,
            chunk_columns: 40,
            chunk_width: 16,
            chunk_height: 16,
            shift: 8,
        }
    }
}
