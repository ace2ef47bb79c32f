//! Per-object samples.
//!
//! A [`Sample`] is the snapshot of one object at one frame: its local matrix,
//! the local matrix of every resolvable bone, and tagged scalar attributes
//! copied from camera/light data and bound materials.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::scene::{property_from_path, BoneId};
use crate::util::{Decomposed, Mat4};

/// Scalar array values of one property (e.g. a color has 3 or 4 components).
pub type PropertyValues = SmallVec<[f32; 4]>;

/// Copy of a property container (camera, light or material) at one frame.
///
/// Keys are property paths relative to the container, e.g. `"lens"` or
/// `"diffuse_color"`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySnapshot {
    values: BTreeMap<String, PropertyValues>,
}

impl PropertySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set all components of a property.
    pub fn set(&mut self, property: impl Into<String>, values: &[f32]) {
        self.values.insert(property.into(), SmallVec::from_slice(values));
    }

    /// Set one component, growing the array with zeros if needed.
    pub fn set_component(&mut self, property: &str, index: usize, value: f32) {
        let values = self.values.entry(property.to_string()).or_default();
        if values.len() <= index {
            values.resize(index + 1, 0.0);
        }
        values[index] = value;
    }

    /// Value of one component, or `None` when the property or index is absent.
    pub fn get(&self, property: &str, index: usize) -> Option<f32> {
        self.values.get(property).and_then(|v| v.get(index).copied())
    }
}

/// Transform channel a property path addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformChannel {
    Location,
    RotationEuler,
    RotationQuaternion,
    Scale,
}

impl TransformChannel {
    /// Channels that every exported object and bone carries.
    pub const BASE: [TransformChannel; 3] = [Self::Location, Self::RotationEuler, Self::Scale];

    /// Classify a property name (the last path segment).
    pub fn from_property(property: &str) -> Option<Self> {
        match property {
            "location" => Some(Self::Location),
            "rotation_euler" => Some(Self::RotationEuler),
            "rotation_quaternion" => Some(Self::RotationQuaternion),
            "scale" => Some(Self::Scale),
            _ => None,
        }
    }

    /// Property name of this channel.
    pub fn property(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::RotationEuler => "rotation_euler",
            Self::RotationQuaternion => "rotation_quaternion",
            Self::Scale => "scale",
        }
    }

    /// Number of scalar components.
    pub fn arity(&self) -> usize {
        match self {
            Self::RotationQuaternion => 4,
            _ => 3,
        }
    }

    /// Read one component from a local matrix.
    pub fn component(&self, matrix: &Mat4, index: usize) -> Option<f32> {
        if index >= self.arity() {
            return None;
        }
        let d = Decomposed::from_matrix(matrix);
        let value = match self {
            Self::Location => d.location[index],
            Self::RotationEuler => d.euler_xyz()[index],
            Self::RotationQuaternion => d.quaternion_wxyz()[index],
            Self::Scale => d.scale[index],
        };
        Some(value)
    }
}

/// Where a scalar channel reads its value from inside a [`Sample`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueSource {
    /// The object's own local matrix.
    Object,
    /// A bone's local matrix.
    Bone(BoneId),
    /// Camera data properties.
    Camera,
    /// Light data properties.
    Light,
    /// Properties of the material bound to the given slot.
    Material(u32),
}

/// Snapshot of one object at one frame.
#[derive(Clone, Debug)]
pub struct Sample {
    matrix: Mat4,
    bones: HashMap<BoneId, Mat4>,
    camera: Option<PropertySnapshot>,
    light: Option<PropertySnapshot>,
    materials: SmallVec<[(u32, PropertySnapshot); 2]>,
}

impl Sample {
    pub fn new(matrix: Mat4) -> Self {
        Self {
            matrix,
            bones: HashMap::new(),
            camera: None,
            light: None,
            materials: SmallVec::new(),
        }
    }

    /// Object local matrix.
    #[inline]
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// Local matrix of a bone, if it was sampled.
    #[inline]
    pub fn bone_matrix(&self, bone: BoneId) -> Option<&Mat4> {
        self.bones.get(&bone)
    }

    /// Attach or overwrite a bone matrix.
    pub fn set_bone(&mut self, bone: BoneId, matrix: Mat4) {
        self.bones.insert(bone, matrix);
    }

    pub fn has_bone(&self, bone: BoneId) -> bool {
        self.bones.contains_key(&bone)
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn set_camera(&mut self, camera: PropertySnapshot) {
        self.camera = Some(camera);
    }

    pub fn set_light(&mut self, light: PropertySnapshot) {
        self.light = Some(light);
    }

    pub fn camera(&self) -> Option<&PropertySnapshot> {
        self.camera.as_ref()
    }

    pub fn light(&self) -> Option<&PropertySnapshot> {
        self.light.as_ref()
    }

    /// Attach the material snapshot of a slot; a second call for the same
    /// slot replaces the first.
    pub fn set_material(&mut self, slot: u32, material: PropertySnapshot) {
        match self.materials.iter_mut().find(|(s, _)| *s == slot) {
            Some(entry) => entry.1 = material,
            None => self.materials.push((slot, material)),
        }
    }

    pub fn material(&self, slot: u32) -> Option<&PropertySnapshot> {
        self.materials.iter().find(|(s, _)| *s == slot).map(|(_, m)| m)
    }

    /// Scalar value of `path[index]` from the given source.
    ///
    /// Transform sources only look at the last path segment, so
    /// `pose.bones["arm"].location` and `location` read the same channel.
    /// Property sources look up the full path. Returns `None` when the sample
    /// does not carry the requested data, e.g. a bone that was skipped or a
    /// material slot the object lacks.
    pub fn value(&self, source: ValueSource, path: &str, index: usize) -> Option<f32> {
        match source {
            ValueSource::Object => transform_channel(path)?.component(&self.matrix, index),
            ValueSource::Bone(bone) => {
                let matrix = self.bones.get(&bone)?;
                transform_channel(path)?.component(matrix, index)
            }
            ValueSource::Camera => self.camera.as_ref()?.get(path, index),
            ValueSource::Light => self.light.as_ref()?.get(path, index),
            ValueSource::Material(slot) => self.material(slot)?.get(path, index),
        }
    }
}

fn transform_channel(path: &str) -> Option<TransformChannel> {
    TransformChannel::from_property(property_from_path(path))
}
