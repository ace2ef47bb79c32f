//! Serializable scene descriptions.
//!
//! Objects, bones and materials refer to each other by name. A description is
//! turned into a [`MemoryScene`](super::MemoryScene), which resolves the names
//! into handles and rejects dangling references.

use serde::{Deserialize, Serialize};

use crate::core::PropertySnapshot;
use crate::scene::{Action, ObjectKind};

fn one3() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn enabled() -> bool {
    true
}

/// Whole scene: frame range, objects and materials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneDescription {
    pub frame_start: i32,
    pub frame_end: i32,
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
    #[serde(default)]
    pub materials: Vec<MaterialDescription>,
}

/// One object with its static transform and animation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    #[serde(default)]
    pub kind: ObjectKind,
    #[serde(default)]
    pub location: [f32; 3],
    /// XYZ Euler angles in radians.
    #[serde(default)]
    pub rotation_euler: [f32; 3],
    #[serde(default = "one3")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub bones: Vec<BoneDescription>,
    /// Camera or light properties.
    #[serde(default)]
    pub data: PropertySnapshot,
    #[serde(default)]
    pub data_action: Option<Action>,
    #[serde(default)]
    pub shape_key_action: Option<Action>,
    /// Material names; the position in the list is the slot index.
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDescription>,
}

impl ObjectDescription {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            location: [0.0; 3],
            rotation_euler: [0.0; 3],
            scale: one3(),
            action: None,
            bones: Vec::new(),
            data: PropertySnapshot::default(),
            data_action: None,
            shape_key_action: None,
            materials: Vec::new(),
            constraints: Vec::new(),
        }
    }
}

/// Bone of an armature, rest pose given in armature space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoneDescription {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub rest_location: [f32; 3],
    #[serde(default)]
    pub rest_rotation_euler: [f32; 3],
}

/// Constraint targeting other objects by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstraintDescription {
    pub name: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Material with base properties and optional keyframes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDescription {
    pub name: String,
    #[serde(default)]
    pub properties: PropertySnapshot,
    #[serde(default)]
    pub action: Option<Action>,
}
