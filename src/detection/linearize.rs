//! Grayscale conversion and pair linearization.
//!
//! A frame pair becomes one flat intensity sequence: frame A row-major,
//! then frame B row-major. The detector consumes it strictly in order.

use crate::capture::{Frame, PixelFormat};

const LUMA_SHIFT: u32 = 14;
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// Fixed-point BT.601 luma.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = LUMA_R * u32::from(r) + LUMA_G * u32::from(g) + LUMA_B * u32::from(b) + LUMA_ROUND;
    // Coefficients sum to 1 << LUMA_SHIFT, so the result fits in a byte.
    (y >> LUMA_SHIFT) as u8
}

/// Linearized intensity samples of one frame pair.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelStream {
    samples: Vec<u8>,
    frame_len: usize,
}

impl PixelStream {
    /// Sample at `index`. Panics past the end of the stream.
    #[inline]
    pub fn sample(&self, index: usize) -> u8 {
        self.samples[index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples contributed by each frame.
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.samples
    }
}

impl std::fmt::Debug for PixelStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelStream")
            .field("len", &self.samples.len())
            .field("frame_len", &self.frame_len)
            .finish()
    }
}

/// Converts a frame pair to grayscale and concatenates it.
///
/// Both frames must have the same dimensions; the driver checks this
/// against its geometry before calling.
pub fn linearize_pair(a: &Frame, b: &Frame) -> PixelStream {
    debug_assert_eq!((a.width(), a.height()), (b.width(), b.height()));

    let frame_len = a.pixel_count();
    let mut samples = Vec::with_capacity(frame_len + b.pixel_count());
    push_gray(a, &mut samples);
    push_gray(b, &mut samples);

    PixelStream { samples, frame_len }
}

fn push_gray(frame: &Frame, out: &mut Vec<u8>) {
    let pixels = frame.pixels();
    match frame.format() {
        PixelFormat::Gray8 => out.extend_from_slice(pixels),
        PixelFormat::Rgb24 => out.extend(pixels.chunks_exact(3).map(|p| luma(p[0], p[1], p[2]))),
        PixelFormat::Bgr24 => out.extend(pixels.chunks_exact(3).map(|p| luma(p[2], p[1], p[0]))),
    }
}
