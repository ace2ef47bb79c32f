//! Time-indexed sample storage.
//!
//! [`SampleStore`] maps frames to [`SampleFrame`]s, and each frame maps objects
//! to their [`Sample`]. The store only grows during a sampling pass and is read
//! back frame-ordered when curves are built.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::core::{Frame, Sample};
use crate::scene::{BoneId, ObjectId};
use crate::util::{Error, Mat4, Result};

/// All samples captured at a single frame.
#[derive(Clone, Debug, Default)]
pub struct SampleFrame {
    samples: HashMap<ObjectId, Sample>,
}

impl SampleFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the object's matrix, replacing any previous sample.
    pub fn add(&mut self, object: ObjectId, matrix: Mat4) -> &mut Sample {
        let sample = Sample::new(matrix);
        match self.samples.entry(object) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                *slot = sample;
                slot
            }
            Entry::Vacant(entry) => entry.insert(sample),
        }
    }

    /// Attach a bone matrix to the object's existing sample.
    pub fn add_bone(&mut self, object: ObjectId, bone: BoneId, matrix: Mat4) -> Option<&mut Sample> {
        let sample = self.samples.get_mut(&object)?;
        sample.set_bone(bone, matrix);
        Some(sample)
    }

    pub fn sample(&self, object: ObjectId) -> Option<&Sample> {
        self.samples.get(&object)
    }

    pub fn matrix(&self, object: ObjectId) -> Option<&Mat4> {
        self.samples.get(&object).map(Sample::matrix)
    }

    pub fn bone_matrix(&self, object: ObjectId, bone: BoneId) -> Option<&Mat4> {
        self.samples.get(&object)?.bone_matrix(bone)
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.samples.contains_key(&object)
    }

    pub fn contains_bone(&self, object: ObjectId, bone: BoneId) -> bool {
        self.bone_matrix(object, bone).is_some()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = (ObjectId, &Sample)> {
        self.samples.iter().map(|(id, s)| (*id, s))
    }
}

/// Ordered collection of sample frames for one sampling pass.
#[derive(Clone, Debug, Default)]
pub struct SampleStore {
    frames: BTreeMap<Frame, SampleFrame>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the object's matrix at `frame`, creating the frame if needed.
    ///
    /// Returns the new sample so bone matrices and attributes can be attached
    /// in the same pass.
    pub fn add(&mut self, object: ObjectId, matrix: Mat4, frame: Frame) -> &mut Sample {
        self.frames.entry(frame).or_default().add(object, matrix)
    }

    /// Attach a bone matrix to the object's sample at `frame`.
    ///
    /// The object must have been added at that frame first.
    pub fn add_bone(&mut self, object: ObjectId, bone: BoneId, matrix: Mat4, frame: Frame) -> Result<&mut Sample> {
        self.frames
            .get_mut(&frame)
            .and_then(|f| f.add_bone(object, bone, matrix))
            .ok_or(Error::MissingSample { object, frame })
    }

    pub fn frame(&self, frame: Frame) -> Option<&SampleFrame> {
        self.frames.get(&frame)
    }

    pub fn contains(&self, object: ObjectId, frame: Frame) -> bool {
        self.frames.get(&frame).is_some_and(|f| f.contains(object))
    }

    pub fn contains_bone(&self, object: ObjectId, bone: BoneId, frame: Frame) -> bool {
        self.frames.get(&frame).is_some_and(|f| f.contains_bone(object, bone))
    }

    /// Every frame that holds at least one sample.
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.keys().copied().collect()
    }

    /// Frames at which the object was sampled.
    pub fn object_frames(&self, object: ObjectId) -> Vec<Frame> {
        self.frames
            .iter()
            .filter(|(_, f)| f.contains(object))
            .map(|(frame, _)| *frame)
            .collect()
    }

    /// Frames at which the bone of the object was sampled.
    pub fn bone_frames(&self, object: ObjectId, bone: BoneId) -> Vec<Frame> {
        self.frames
            .iter()
            .filter(|(_, f)| f.contains_bone(object, bone))
            .map(|(frame, _)| *frame)
            .collect()
    }

    /// Time-ordered samples of the object.
    pub fn samples(&self, object: ObjectId) -> BTreeMap<Frame, &Sample> {
        self.frames
            .iter()
            .filter_map(|(frame, f)| f.sample(object).map(|s| (*frame, s)))
            .collect()
    }

    /// Time-ordered local matrices of the object.
    pub fn matrices(&self, object: ObjectId) -> BTreeMap<Frame, &Mat4> {
        self.frames
            .iter()
            .filter_map(|(frame, f)| f.matrix(object).map(|m| (*frame, m)))
            .collect()
    }

    /// Time-ordered local matrices of one bone of the object.
    pub fn bone_matrices(&self, object: ObjectId, bone: BoneId) -> BTreeMap<Frame, &Mat4> {
        self.frames
            .iter()
            .filter_map(|(frame, f)| f.bone_matrix(object, bone).map(|m| (*frame, m)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
