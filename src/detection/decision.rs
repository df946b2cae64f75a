//! Final motion decision.

use super::MotionCounter;

/// Chunks required for `percent` of `total_chunks`, rounded up.
pub fn required_chunks(total_chunks: u32, percent: u32) -> u32 {
    let scaled = u64::from(total_chunks) * u64::from(percent);
    ((scaled + 99) / 100) as u32
}

/// Motion is reported when at least a fixed fraction of chunks moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionDecision {
    required: u32,
    total_chunks: u32,
}

impl MotionDecision {
    pub fn new(total_chunks: u32, motion_percent: u32) -> Self {
        Self {
            required: required_chunks(total_chunks, motion_percent),
            total_chunks,
        }
    }

    /// Moved chunks needed for a positive result.
    #[inline]
    pub fn required(&self) -> u32 {
        self.required
    }

    #[inline]
    pub fn total_chunks(&self) -> u32 {
        self.total_chunks
    }

    #[inline]
    pub fn decide(&self, counter: MotionCounter) -> bool {
        counter.get() >= self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(n: u32) -> MotionCounter {
        let mut counter = MotionCounter::default();
        for _ in 0..n {
            counter.increment();
        }
        counter
    }

    #[test]
    fn test_default_geometry_needs_300() {
        let decision = MotionDecision::new(1200, 25);
        assert_eq!(decision.required(), 300);
        assert!(decision.decide(counter(300)));
        assert!(!decision.decide(counter(299)));
    }

    #[test]
    fn test_required_rounds_up() {
        assert_eq!(required_chunks(2, 25), 1);
        assert_eq!(required_chunks(10, 25), 3);
        assert_eq!(required_chunks(30, 10), 3);
        assert_eq!(required_chunks(7, 100), 7);
    }

    #[test]
    fn test_boundary_for_odd_totals() {
        // ceil(0.25 * 6) = 2
        let decision = MotionDecision::new(6, 25);
        assert!(!decision.decide(counter(1)));
        assert!(decision.decide(counter(2)));
    }
}
