//! Frame indices and sampling schedules.
//!
//! Scene time is quantized to integer frames. A [`FrameSet`] merges keyframe
//! times and fixed-rate sample times into one ascending, duplicate-free set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Integer-quantized scene time.
pub type Frame = i32;

/// Ordered set of unique frames.
pub type FrameSet = BTreeSet<Frame>;

/// Inclusive frame range of a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: Frame,
    pub end: Frame,
}

impl FrameRange {
    #[inline]
    pub const fn new(start: Frame, end: Frame) -> Self {
        Self { start, end }
    }

    /// Every frame from `start` to `end`, both included.
    #[inline]
    pub fn frames(&self) -> std::ops::RangeInclusive<Frame> {
        self.start..=self.end
    }

    /// Number of frames in the range (0 for an inverted range).
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end.abs_diff(self.start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed-rate sample frames for a scene range.
///
/// Produces `start, start + rate, ...` while below `end`. When the walk stops
/// at or past `end` and `keyframe_at_end` is set, `end` itself is added so the
/// last frame is captured even if the range is not a multiple of `rate`.
/// A rate below 1 disables fixed-rate sampling and yields an empty set.
pub fn compute_sample_frames(sampling_rate: i32, keyframe_at_end: bool, range: FrameRange) -> FrameSet {
    let mut frames = FrameSet::new();
    if sampling_rate < 1 {
        return frames;
    }

    let mut frame = range.start;
    while frame < range.end {
        frames.insert(frame);
        frame = match frame.checked_add(sampling_rate) {
            Some(next) => next,
            None => break,
        };
    }

    if keyframe_at_end {
        frames.insert(range.end);
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_below_one_is_empty() {
        for rate in [-5, -1, 0] {
            assert!(compute_sample_frames(rate, true, FrameRange::new(1, 250)).is_empty());
            assert!(compute_sample_frames(rate, false, FrameRange::new(0, 0)).is_empty());
        }
    }

    #[test]
    fn test_rate_ten_with_end() {
        let frames = compute_sample_frames(10, true, FrameRange::new(1, 25));
        assert_eq!(frames.into_iter().collect::<Vec<_>>(), vec![1, 11, 21, 25]);
    }

    #[test]
    fn test_rate_ten_without_end() {
        let frames = compute_sample_frames(10, false, FrameRange::new(1, 25));
        assert_eq!(frames.into_iter().collect::<Vec<_>>(), vec![1, 11, 21]);
    }

    #[test]
    fn test_end_on_grid_not_duplicated() {
        let frames = compute_sample_frames(5, true, FrameRange::new(0, 10));
        assert_eq!(frames.into_iter().collect::<Vec<_>>(), vec![0, 5, 10]);
    }

    #[test]
    fn test_single_frame_range() {
        let frames = compute_sample_frames(1, true, FrameRange::new(7, 7));
        assert_eq!(frames.into_iter().collect::<Vec<_>>(), vec![7]);
        assert!(compute_sample_frames(1, false, FrameRange::new(7, 7)).is_empty());
    }

    #[test]
    fn test_range_len() {
        assert_eq!(FrameRange::new(1, 25).len(), 25);
        assert!(FrameRange::new(3, 2).is_empty());
        assert_eq!(FrameRange::new(-10, 10).len(), 21);
        // span wider than i32::MAX
        assert_eq!(FrameRange::new(-2, i32::MAX).len(), i32::MAX as usize + 3);
    }
}
