//! Core layer - frames, samples and the sample store.
//!
//! This module provides:
//! - [`Frame`] / [`FrameSet`] / [`FrameRange`] - Integer time and schedules
//! - [`Sample`] - Snapshot of one object at one frame
//! - [`SampleStore`] / [`SampleFrame`] - Time-indexed sample storage

mod frames;
mod sample;
mod store;

pub use frames::{compute_sample_frames, Frame, FrameRange, FrameSet};
pub use sample::{PropertySnapshot, PropertyValues, Sample, TransformChannel, ValueSource};
pub use store::{SampleFrame, SampleStore};
