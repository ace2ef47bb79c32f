//! Scene interface consumed by the sampler.
//!
//! The sampler never evaluates animation itself. Everything it needs from the
//! host application goes through [`SceneContext`]: evaluating the scene at a
//! frame, reading local transforms and pose channels, and listing actions,
//! materials and constraints.
//!
//! [`MemoryScene`] is a self-contained implementation used by the CLI and the
//! test suite.

mod description;
mod memory;
mod skeleton;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Frame, FrameRange, FrameSet, PropertySnapshot};
use crate::util::{round_frame, Mat4};

pub use description::{
    BoneDescription, ConstraintDescription, MaterialDescription, ObjectDescription, SceneDescription,
};
pub use memory::MemoryScene;
pub use skeleton::{BoneNode, Skeleton};

/// Opaque handle of a scene object, stable for one export pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a bone inside one object's [`Skeleton`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BoneId(pub u32);

impl BoneId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque handle of a material data-block.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Object type, as far as sampling cares.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Empty,
    Mesh,
    Armature,
    Camera,
    Light,
}

/// A keyframe control point of an existing curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub frame: f32,
    pub value: f32,
}

impl ControlPoint {
    pub const fn new(frame: f32, value: f32) -> Self {
        Self { frame, value }
    }
}

/// An existing keyframe curve on one scalar property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionCurve {
    /// Property path, e.g. `location` or `pose.bones["arm"].rotation_euler`.
    pub path: String,
    #[serde(default)]
    pub array_index: usize,
    #[serde(default)]
    pub points: Vec<ControlPoint>,
}

impl ActionCurve {
    pub fn new(path: impl Into<String>, array_index: usize, points: Vec<ControlPoint>) -> Self {
        Self { path: path.into(), array_index, points }
    }

    /// Rounded frames of all control points.
    pub fn keyframes(&self) -> impl Iterator<Item = Frame> + '_ {
        self.points.iter().map(|p| round_frame(p.frame))
    }

    /// Linear read of the curve, holding the end values outside its range.
    pub fn evaluate(&self, frame: f32) -> Option<f32> {
        let first = self.points.first()?;
        if frame <= first.frame {
            return Some(first.value);
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if frame <= b.frame {
                let span = (b.frame - a.frame).max(f32::EPSILON);
                let t = (frame - a.frame) / span;
                return Some(a.value + (b.value - a.value) * t);
            }
        }
        self.points.last().map(|p| p.value)
    }
}

/// Ordered set of keyframe curves owned by one data-block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action {
    pub curves: Vec<ActionCurve>,
}

impl Action {
    pub fn new(curves: Vec<ActionCurve>) -> Self {
        Self { curves }
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Add the rounded frame of every control point to `frames`.
    pub fn collect_keyframes(&self, frames: &mut FrameSet) {
        for curve in &self.curves {
            frames.extend(curve.keyframes());
        }
    }
}

/// Material bound to an object slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialSlot {
    /// Slot index on the object, used as the curve tag.
    pub index: u32,
    pub material: MaterialId,
}

/// A constraint on an object, with its target list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub enabled: bool,
    pub targets: Vec<ObjectId>,
}

impl Constraint {
    /// Constraints that are muted or have no targets cannot drive animation.
    pub fn is_valid(&self) -> bool {
        self.enabled && !self.targets.is_empty()
    }
}

/// Which animation channels are active while evaluating a pose.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ChannelScope {
    /// Every channel of the action.
    #[default]
    All,
    /// Only channels whose path starts with the prefix.
    Prefix(String),
}

impl ChannelScope {
    /// Scope that keeps only the channels of one bone.
    pub fn bone(name: &str) -> Self {
        Self::Prefix(bone_path_prefix(name))
    }

    /// Whether a channel with this path is evaluated.
    pub fn admits(&self, path: &str) -> bool {
        match self {
            Self::All => true,
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// Path prefix owning all channels of a bone: `pose.bones["<name>"]`.
pub fn bone_path_prefix(name: &str) -> String {
    format!("pose.bones[\"{name}\"]")
}

/// Bone name quoted inside a `pose.bones["..."]` path.
pub fn bone_name_from_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("pose.bones[\"")?;
    let end = rest.find("\"]")?;
    Some(&rest[..end])
}

/// Last segment of a property path: `pose.bones["a.L"].location` -> `location`.
pub fn property_from_path(path: &str) -> &str {
    let tail_start = path.rfind(']').map_or(0, |i| i + 1);
    let tail = &path[tail_start..];
    match tail.rfind('.') {
        Some(dot) => &tail[dot + 1..],
        None => tail,
    }
}

/// Host scene as seen by the sampler.
///
/// Evaluation mutates the scene in place; the sampler holds the context by
/// exclusive reference for the duration of a pass.
pub trait SceneContext {
    /// Inclusive frame range to sample.
    fn frame_range(&self) -> FrameRange;

    /// Evaluate all scene state at `frame`.
    fn evaluate(&mut self, frame: Frame);

    /// Re-evaluate the pose of an armature at the current frame with only the
    /// channels admitted by `scope` active.
    fn evaluate_pose(&mut self, object: ObjectId, scope: &ChannelScope);

    /// Display name, used for logging.
    fn object_name(&self, object: ObjectId) -> &str;

    fn object_kind(&self, object: ObjectId) -> ObjectKind;

    /// Local transform of the object at the evaluated frame.
    fn local_transform(&self, object: ObjectId) -> Mat4;

    /// Bone hierarchy of an armature.
    fn skeleton(&self, object: ObjectId) -> Option<&Skeleton>;

    /// Evaluated pose matrix (armature space) of the named bone.
    fn pose_channel(&self, object: ObjectId, bone_name: &str) -> Option<Mat4>;

    /// Keyframes on the object's own transform.
    fn transform_action(&self, object: ObjectId) -> Option<&Action>;

    /// Keyframes on camera or light data.
    fn data_action(&self, object: ObjectId) -> Option<&Action>;

    /// Evaluated camera or light properties.
    fn data_snapshot(&self, object: ObjectId) -> Option<PropertySnapshot>;

    /// Keyframes on shape keys.
    fn shape_key_action(&self, object: ObjectId) -> Option<&Action>;

    /// Materials bound to the object, in slot order.
    fn bound_materials(&self, object: ObjectId) -> Vec<MaterialSlot>;

    fn material_action(&self, material: MaterialId) -> Option<&Action>;

    /// Evaluated material properties.
    fn material_snapshot(&self, material: MaterialId) -> PropertySnapshot;

    fn constraints(&self, object: ObjectId) -> &[Constraint];

    /// Objects a constraint currently targets.
    fn resolve_constraint_targets(&self, constraint: &Constraint) -> Vec<ObjectId>;
}
