//! In-memory scene.
//!
//! A small but complete [`SceneContext`]: actions are read with linear
//! interpolation, poses follow the usual armature rule
//! `pose = parent_pose * inverse(parent_rest) * rest * basis`, and camera,
//! light and material properties are overridden by their actions. Constraints
//! are recorded for dependency analysis but not solved.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::core::{Frame, FrameRange, PropertySnapshot};
use crate::scene::{
    bone_name_from_path, bone_path_prefix, property_from_path, Action, ChannelScope, Constraint, MaterialId,
    MaterialSlot, ObjectId, ObjectKind, SceneContext, SceneDescription, Skeleton,
};
use crate::util::{compose_trs, Error, Mat4, Quat, Result, Vec3};

#[derive(Debug)]
struct MemoryObject {
    name: String,
    kind: ObjectKind,
    location: Vec3,
    rotation_euler: Vec3,
    scale: Vec3,
    action: Option<Action>,
    skeleton: Option<Skeleton>,
    data: PropertySnapshot,
    data_action: Option<Action>,
    shape_key_action: Option<Action>,
    materials: Vec<MaterialSlot>,
    constraints: Vec<Constraint>,

    // Evaluated state
    local: Mat4,
    pose: Vec<Mat4>,
    evaluated_data: PropertySnapshot,
}

impl MemoryObject {
    fn evaluate(&mut self, time: f32) {
        self.local = self.evaluate_transform(time);
        self.evaluate_pose(time, &ChannelScope::All);
        self.evaluated_data = evaluate_properties(&self.data, self.data_action.as_ref(), time);
    }

    fn evaluate_transform(&self, time: f32) -> Mat4 {
        let mut location = self.location;
        let mut rotation = self.rotation_euler;
        let mut scale = self.scale;

        if let Some(action) = &self.action {
            for curve in &action.curves {
                if bone_name_from_path(&curve.path).is_some() || curve.array_index > 2 {
                    continue;
                }
                let target = match curve.path.as_str() {
                    "location" => &mut location,
                    "rotation_euler" => &mut rotation,
                    "scale" => &mut scale,
                    _ => continue,
                };
                if let Some(value) = curve.evaluate(time) {
                    target[curve.array_index] = value;
                }
            }
        }
        compose_trs(location, rotation, scale)
    }

    fn evaluate_pose(&mut self, time: f32, scope: &ChannelScope) {
        let Some(skeleton) = &self.skeleton else {
            return;
        };

        let mut pose: Vec<Mat4> = Vec::with_capacity(skeleton.len());
        for (_, bone) in skeleton.iter() {
            let basis = bone_basis(self.action.as_ref(), &bone.name, time, scope);
            let matrix = match bone.parent.and_then(|p| skeleton.get(p).map(|node| (p, node))) {
                Some((parent_id, parent)) => pose[parent_id.index()] * parent.rest.inverse() * bone.rest * basis,
                None => bone.rest * basis,
            };
            pose.push(matrix);
        }
        self.pose = pose;
    }
}

/// Local (basis) transform of a bone from its own channels within `scope`.
fn bone_basis(action: Option<&Action>, bone: &str, time: f32, scope: &ChannelScope) -> Mat4 {
    let Some(action) = action else {
        return Mat4::IDENTITY;
    };

    let prefix = bone_path_prefix(bone);
    let mut location = Vec3::ZERO;
    let mut euler = Vec3::ZERO;
    let mut quat = [1.0, 0.0, 0.0, 0.0];
    let mut scale = Vec3::ONE;
    let mut uses_quaternion = false;

    for curve in &action.curves {
        if !curve.path.starts_with(&prefix) || !scope.admits(&curve.path) {
            continue;
        }
        let Some(value) = curve.evaluate(time) else {
            continue;
        };
        let index = curve.array_index;
        match property_from_path(&curve.path) {
            "location" if index < 3 => location[index] = value,
            "rotation_euler" if index < 3 => euler[index] = value,
            "scale" if index < 3 => scale[index] = value,
            "rotation_quaternion" if index < 4 => {
                quat[index] = value;
                uses_quaternion = true;
            }
            _ => {}
        }
    }

    if uses_quaternion {
        let rotation = Quat::from_xyzw(quat[1], quat[2], quat[3], quat[0]).normalize();
        Mat4::from_scale_rotation_translation(scale, rotation, location)
    } else {
        compose_trs(location, euler, scale)
    }
}

fn evaluate_properties(base: &PropertySnapshot, action: Option<&Action>, time: f32) -> PropertySnapshot {
    let mut out = base.clone();
    if let Some(action) = action {
        for curve in &action.curves {
            if let Some(value) = curve.evaluate(time) {
                out.set_component(&curve.path, curve.array_index, value);
            }
        }
    }
    out
}

#[derive(Debug)]
struct MemoryMaterial {
    name: String,
    properties: PropertySnapshot,
    action: Option<Action>,
    evaluated: PropertySnapshot,
}

/// Scene held entirely in memory.
#[derive(Debug)]
pub struct MemoryScene {
    range: FrameRange,
    objects: Vec<MemoryObject>,
    materials: Vec<MemoryMaterial>,
    current_frame: Option<Frame>,
    evaluated_frames: Vec<Frame>,
    pose_evaluations: usize,
}

impl MemoryScene {
    /// Build a scene, resolving every name reference.
    pub fn from_description(desc: SceneDescription) -> Result<Self> {
        if desc.frame_end < desc.frame_start {
            return Err(Error::invalid(format!(
                "frame range {}..{} is inverted",
                desc.frame_start, desc.frame_end
            )));
        }

        let mut object_ids: HashMap<&str, ObjectId> = HashMap::new();
        for (i, obj) in desc.objects.iter().enumerate() {
            if object_ids.insert(obj.name.as_str(), ObjectId(i as u32)).is_some() {
                return Err(Error::invalid(format!("duplicate object name '{}'", obj.name)));
            }
        }

        let mut material_ids: HashMap<&str, MaterialId> = HashMap::new();
        for (i, mat) in desc.materials.iter().enumerate() {
            if material_ids.insert(mat.name.as_str(), MaterialId(i as u32)).is_some() {
                return Err(Error::invalid(format!("duplicate material name '{}'", mat.name)));
            }
        }

        let mut objects = Vec::with_capacity(desc.objects.len());
        for obj in &desc.objects {
            let skeleton = if obj.bones.is_empty() {
                None
            } else if obj.kind != ObjectKind::Armature {
                return Err(Error::invalid(format!("object '{}' has bones but is not an armature", obj.name)));
            } else {
                let mut skeleton = Skeleton::new();
                for bone in &obj.bones {
                    let parent = match &bone.parent {
                        Some(parent) => Some(skeleton.find(parent).ok_or_else(|| Error::UnknownBone {
                            object: obj.name.clone(),
                            bone: parent.clone(),
                        })?),
                        None => None,
                    };
                    let rest = compose_trs(
                        Vec3::from_array(bone.rest_location),
                        Vec3::from_array(bone.rest_rotation_euler),
                        Vec3::ONE,
                    );
                    skeleton.add_bone(bone.name.clone(), parent, rest)?;
                }
                Some(skeleton)
            };

            let materials = obj
                .materials
                .iter()
                .enumerate()
                .map(|(slot, name)| {
                    material_ids
                        .get(name.as_str())
                        .map(|&material| MaterialSlot { index: slot as u32, material })
                        .ok_or_else(|| Error::UnknownMaterial(name.clone()))
                })
                .collect::<Result<Vec<_>>>()?;

            let constraints = obj
                .constraints
                .iter()
                .map(|c| {
                    let targets = c
                        .targets
                        .iter()
                        .map(|t| object_ids.get(t.as_str()).copied().ok_or_else(|| Error::UnknownObject(t.clone())))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Constraint { name: c.name.clone(), enabled: c.enabled, targets })
                })
                .collect::<Result<Vec<_>>>()?;

            let pose = skeleton
                .as_ref()
                .map(|s| s.iter().map(|(_, b)| b.rest).collect())
                .unwrap_or_default();

            let mut object = MemoryObject {
                name: obj.name.clone(),
                kind: obj.kind,
                location: Vec3::from_array(obj.location),
                rotation_euler: Vec3::from_array(obj.rotation_euler),
                scale: Vec3::from_array(obj.scale),
                action: obj.action.clone(),
                skeleton,
                data: obj.data.clone(),
                data_action: obj.data_action.clone(),
                shape_key_action: obj.shape_key_action.clone(),
                materials,
                constraints,
                local: Mat4::IDENTITY,
                pose,
                evaluated_data: obj.data.clone(),
            };
            object.local = compose_trs(object.location, object.rotation_euler, object.scale);
            objects.push(object);
        }

        let materials = desc
            .materials
            .into_iter()
            .map(|m| MemoryMaterial {
                evaluated: m.properties.clone(),
                name: m.name,
                properties: m.properties,
                action: m.action,
            })
            .collect();

        Ok(Self {
            range: FrameRange::new(desc.frame_start, desc.frame_end),
            objects,
            materials,
            current_frame: None,
            evaluated_frames: Vec::new(),
            pose_evaluations: 0,
        })
    }

    /// Parse a JSON scene description.
    pub fn from_json(json: &str) -> Result<Self> {
        let desc: SceneDescription = serde_json::from_str(json)?;
        Self::from_description(desc)
    }

    /// Load a JSON scene description from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        debug!("Loading scene from {}", path.as_ref().display());
        Self::from_json(&text)
    }

    pub fn object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().position(|o| o.name == name).map(|i| ObjectId(i as u32))
    }

    pub fn material_by_name(&self, name: &str) -> Option<MaterialId> {
        self.materials.iter().position(|m| m.name == name).map(|i| MaterialId(i as u32))
    }

    /// All objects in description order.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> {
        (0..self.objects.len() as u32).map(ObjectId)
    }

    /// Frame of the last full evaluation.
    pub fn current_frame(&self) -> Option<Frame> {
        self.current_frame
    }

    /// Every frame passed to [`SceneContext::evaluate`], in call order.
    pub fn evaluated_frames(&self) -> &[Frame] {
        &self.evaluated_frames
    }

    pub fn pose_evaluations(&self) -> usize {
        self.pose_evaluations
    }

    fn object(&self, id: ObjectId) -> Option<&MemoryObject> {
        self.objects.get(id.0 as usize)
    }

    fn current_time(&self) -> f32 {
        self.current_frame.unwrap_or(self.range.start) as f32
    }
}

impl SceneContext for MemoryScene {
    fn frame_range(&self) -> FrameRange {
        self.range
    }

    fn evaluate(&mut self, frame: Frame) {
        let time = frame as f32;
        for object in &mut self.objects {
            object.evaluate(time);
        }
        for material in &mut self.materials {
            material.evaluated = evaluate_properties(&material.properties, material.action.as_ref(), time);
        }
        self.current_frame = Some(frame);
        self.evaluated_frames.push(frame);
    }

    fn evaluate_pose(&mut self, object: ObjectId, scope: &ChannelScope) {
        let time = self.current_time();
        if let Some(obj) = self.objects.get_mut(object.0 as usize) {
            obj.evaluate_pose(time, scope);
            self.pose_evaluations += 1;
        }
    }

    fn object_name(&self, object: ObjectId) -> &str {
        self.object(object).map_or("<unknown>", |o| o.name.as_str())
    }

    fn object_kind(&self, object: ObjectId) -> ObjectKind {
        self.object(object).map(|o| o.kind).unwrap_or_default()
    }

    fn local_transform(&self, object: ObjectId) -> Mat4 {
        self.object(object).map_or(Mat4::IDENTITY, |o| o.local)
    }

    fn skeleton(&self, object: ObjectId) -> Option<&Skeleton> {
        self.object(object)?.skeleton.as_ref()
    }

    fn pose_channel(&self, object: ObjectId, bone_name: &str) -> Option<Mat4> {
        let obj = self.object(object)?;
        let bone = obj.skeleton.as_ref()?.find(bone_name)?;
        obj.pose.get(bone.index()).copied()
    }

    fn transform_action(&self, object: ObjectId) -> Option<&Action> {
        self.object(object)?.action.as_ref()
    }

    fn data_action(&self, object: ObjectId) -> Option<&Action> {
        let obj = self.object(object)?;
        match obj.kind {
            ObjectKind::Camera | ObjectKind::Light => obj.data_action.as_ref(),
            _ => None,
        }
    }

    fn data_snapshot(&self, object: ObjectId) -> Option<PropertySnapshot> {
        let obj = self.object(object)?;
        match obj.kind {
            ObjectKind::Camera | ObjectKind::Light => Some(obj.evaluated_data.clone()),
            _ => None,
        }
    }

    fn shape_key_action(&self, object: ObjectId) -> Option<&Action> {
        self.object(object)?.shape_key_action.as_ref()
    }

    fn bound_materials(&self, object: ObjectId) -> Vec<MaterialSlot> {
        self.object(object).map(|o| o.materials.clone()).unwrap_or_default()
    }

    fn material_action(&self, material: MaterialId) -> Option<&Action> {
        self.materials.get(material.0 as usize)?.action.as_ref()
    }

    fn material_snapshot(&self, material: MaterialId) -> PropertySnapshot {
        self.materials
            .get(material.0 as usize)
            .map(|m| m.evaluated.clone())
            .unwrap_or_default()
    }

    fn constraints(&self, object: ObjectId) -> &[Constraint] {
        self.object(object).map(|o| o.constraints.as_slice()).unwrap_or(&[])
    }

    fn resolve_constraint_targets(&self, constraint: &Constraint) -> Vec<ObjectId> {
        constraint
            .targets
            .iter()
            .copied()
            .filter(|t| (t.0 as usize) < self.objects.len())
            .collect()
    }
}
