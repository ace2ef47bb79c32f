//! Channel identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::TransformChannel;
use crate::scene::{bone_name_from_path, bone_path_prefix, property_from_path};

/// What a curve animates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    Object,
    Bone,
    Camera,
    Light,
    Material,
}

/// Unique identifier of one scalar channel.
///
/// The tag separates same-named channels of different material slots.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurveKey {
    pub path: String,
    pub array_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u32>,
}

impl CurveKey {
    pub fn new(path: impl Into<String>, array_index: usize) -> Self {
        Self { path: path.into(), array_index, tag: None }
    }

    pub fn tagged(path: impl Into<String>, array_index: usize, tag: u32) -> Self {
        Self { path: path.into(), array_index, tag: Some(tag) }
    }

    /// Key of a transform channel of the object itself.
    pub fn object_transform(channel: TransformChannel, array_index: usize) -> Self {
        Self::new(channel.property(), array_index)
    }

    /// Key of a transform channel of a named bone.
    pub fn bone_transform(bone: &str, channel: TransformChannel, array_index: usize) -> Self {
        Self::new(format!("{}.{}", bone_path_prefix(bone), channel.property()), array_index)
    }

    /// Last path segment.
    pub fn property(&self) -> &str {
        property_from_path(&self.path)
    }

    /// Bone name, for `pose.bones["..."]` paths.
    pub fn bone_name(&self) -> Option<&str> {
        bone_name_from_path(&self.path)
    }

    pub fn transform_channel(&self) -> Option<TransformChannel> {
        TransformChannel::from_property(self.property())
    }
}

impl fmt::Display for CurveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            Some(tag) => write!(f, "{}[{}]@{}", self.path, self.array_index, tag),
            None => write!(f, "{}[{}]", self.path, self.array_index),
        }
    }
}
