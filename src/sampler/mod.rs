//! Animation sampler.
//!
//! The sampler decides which frames need evaluation, drives the
//! [`SceneContext`] through the frame range and records per-object and
//! per-bone matrices plus camera, light and material snapshots into a
//! [`SampleStore`]. Curves are rebuilt from the store afterwards.
//!
//! # Example
//!
//! ```ignore
//! let mut sampler = AnimationSampler::new();
//! for object in scene.object_ids() {
//!     sampler.register_object(&scene, object);
//! }
//! sampler.run_sampling_pass(&mut scene, &SamplingOptions::default());
//!
//! let mut curves = sampler.build_curve_map(&scene, object);
//! sampler.populate_curves(object, &mut curves, ExportMode::Sample);
//! ```

mod curves;
mod dependency;
mod options;

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::core::{compute_sample_frames, Frame, FrameSet, Sample, SampleStore};
use crate::curve::AnimationCurve;
use crate::scene::{BoneId, ChannelScope, ObjectId, ObjectKind, SceneContext, Skeleton};
use crate::util::{in_range, without_translation, Mat4, MIN_DISTANCE};

pub use curves::value_set;
pub use dependency::{classify_animated, has_animations, has_any_animations};
pub use options::{ExportMode, ExportSettings, SamplingOptions};

/// Per-object state cached at registration.
#[derive(Clone, Debug)]
struct RegisteredObject {
    kind: ObjectKind,
    keyframes: FrameSet,
    skeleton: Option<Skeleton>,
}

/// Samples registered objects over a scene's frame range.
#[derive(Debug, Default)]
pub struct AnimationSampler {
    objects: BTreeMap<ObjectId, RegisteredObject>,
    store: SampleStore,
}

impl AnimationSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the object's keyframes: transform action, camera or light data
    /// action, and the action of every bound material.
    ///
    /// Registering the same object twice is a no-op.
    pub fn register_object<S: SceneContext + ?Sized>(&mut self, ctx: &S, object: ObjectId) -> &FrameSet {
        let entry = self.objects.entry(object).or_insert_with(|| {
            let kind = ctx.object_kind(object);
            let mut keyframes = FrameSet::new();
            if let Some(action) = ctx.transform_action(object) {
                action.collect_keyframes(&mut keyframes);
            }
            if matches!(kind, ObjectKind::Camera | ObjectKind::Light) {
                if let Some(action) = ctx.data_action(object) {
                    action.collect_keyframes(&mut keyframes);
                }
            }
            for slot in ctx.bound_materials(object) {
                if let Some(action) = ctx.material_action(slot.material) {
                    action.collect_keyframes(&mut keyframes);
                }
            }
            let skeleton = match kind {
                ObjectKind::Armature => ctx.skeleton(object).cloned(),
                _ => None,
            };
            debug!(
                object = ctx.object_name(object),
                ?kind,
                keyframes = keyframes.len(),
                "registered object"
            );
            RegisteredObject { kind, keyframes, skeleton }
        });
        &entry.keyframes
    }

    pub fn is_registered(&self, object: ObjectId) -> bool {
        self.objects.contains_key(&object)
    }

    /// Cached keyframes of a registered object.
    pub fn keyframes(&self, object: ObjectId) -> Option<&FrameSet> {
        self.objects.get(&object).map(|o| &o.keyframes)
    }

    /// Registered objects in id order.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    /// Walk the scene's frame range and fill the sample store.
    ///
    /// Grid frames are always evaluated. Frames off the grid are only
    /// considered when keyframes are kept or the mode is [`ExportMode::Keys`],
    /// and are evaluated lazily, once, when the first object needs them.
    #[tracing::instrument(skip_all, fields(objects = self.objects.len()))]
    pub fn run_sampling_pass<S: SceneContext + ?Sized>(&mut self, ctx: &mut S, opts: &SamplingOptions) {
        let range = ctx.frame_range();
        let grid = compute_sample_frames(opts.sampling_rate, opts.keyframe_at_end, range);
        let mut evaluations = 0usize;
        let mut sampled = 0usize;

        for frame in range.frames() {
            let is_grid_frame = grid.contains(&frame);
            let mut evaluated = false;
            if is_grid_frame {
                ctx.evaluate(frame);
                evaluated = true;
                evaluations += 1;
            }

            let needs_sampling = is_grid_frame || opts.keep_keyframes || opts.mode == ExportMode::Keys;
            if !needs_sampling {
                trace!(frame, "skip");
                continue;
            }

            for (&object, registered) in &self.objects {
                if !is_grid_frame && !registered.keyframes.contains(&frame) {
                    continue;
                }
                if !evaluated {
                    ctx.evaluate(frame);
                    evaluated = true;
                    evaluations += 1;
                }
                trace!(frame, object = ctx.object_name(object), "sample");
                sample_object(&mut self.store, ctx, object, registered, frame, opts.for_opensim);
                sampled += 1;
            }
        }

        debug!(
            grid = grid.len(),
            evaluations,
            samples = sampled,
            frames = self.store.len(),
            "sampling pass done"
        );
    }

    /// Underlying store.
    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Frames at which the object was sampled.
    pub fn sample_frames(&self, object: ObjectId) -> Vec<Frame> {
        self.store.object_frames(object)
    }

    /// Frames at which the bone was sampled.
    pub fn bone_sample_frames(&self, object: ObjectId, bone: BoneId) -> Vec<Frame> {
        self.store.bone_frames(object, bone)
    }

    /// Frames of the curve's control points after population.
    pub fn curve_frames(&self, curve: &AnimationCurve) -> Vec<Frame> {
        curve.sampled_frames()
    }

    /// Time-ordered object matrices and whether they are all equal.
    pub fn samples(&self, object: ObjectId) -> (BTreeMap<Frame, Mat4>, bool) {
        let matrices: BTreeMap<Frame, Mat4> =
            self.store.matrices(object).into_iter().map(|(f, m)| (f, *m)).collect();
        let flat = is_flat_matrices(matrices.values());
        (matrices, flat)
    }

    /// Time-ordered bone matrices and whether they are all equal.
    pub fn bone_samples(&self, object: ObjectId, bone: BoneId) -> (BTreeMap<Frame, Mat4>, bool) {
        let matrices: BTreeMap<Frame, Mat4> = self
            .store
            .bone_matrices(object, bone)
            .into_iter()
            .map(|(f, m)| (f, *m))
            .collect();
        let flat = is_flat_matrices(matrices.values());
        (matrices, flat)
    }

    /// Time-ordered full samples of an object.
    pub fn object_samples(&self, object: ObjectId) -> BTreeMap<Frame, &Sample> {
        self.store.samples(object)
    }
}

fn sample_object<S: SceneContext + ?Sized>(
    store: &mut SampleStore,
    ctx: &mut S,
    object: ObjectId,
    registered: &RegisteredObject,
    frame: Frame,
    for_opensim: bool,
) {
    let sample = store.add(object, ctx.local_transform(object), frame);

    if let Some(skeleton) = &registered.skeleton {
        for (bone, _) in skeleton.iter() {
            if let Some(matrix) = bone_matrix_local(ctx, object, skeleton, bone, for_opensim) {
                sample.set_bone(bone, matrix);
            }
        }
        ctx.evaluate_pose(object, &ChannelScope::All);
    }

    match registered.kind {
        ObjectKind::Camera => {
            if let Some(data) = ctx.data_snapshot(object) {
                sample.set_camera(data);
            }
        }
        ObjectKind::Light => {
            if let Some(data) = ctx.data_snapshot(object) {
                sample.set_light(data);
            }
        }
        _ => {}
    }

    for slot in ctx.bound_materials(object) {
        sample.set_material(slot.index, ctx.material_snapshot(slot.material));
    }
}

/// Local matrix of a bone relative to its parent.
///
/// The pose is evaluated with only the bone's own channels active. With
/// `for_opensim` the result is re-expressed against the translation-free rest
/// matrices. Returns `None` when the pose has no channel for the bone.
pub fn bone_matrix_local<S: SceneContext + ?Sized>(
    ctx: &mut S,
    object: ObjectId,
    skeleton: &Skeleton,
    bone: BoneId,
    for_opensim: bool,
) -> Option<Mat4> {
    let node = skeleton.get(bone)?;
    if ctx.pose_channel(object, &node.name).is_none() {
        warn!(object = ctx.object_name(object), bone = %node.name, "no pose channel, bone skipped");
        return None;
    }

    ctx.evaluate_pose(object, &ChannelScope::bone(&node.name));
    let pose = ctx.pose_channel(object, &node.name)?;
    let parent = skeleton.parent(bone);
    let parent_pose = parent.and_then(|p| ctx.pose_channel(object, &p.name));

    let mut matrix = match parent_pose {
        Some(parent_pose) => parent_pose.inverse() * pose,
        None => pose,
    };

    if for_opensim {
        matrix *= without_translation(&node.rest).inverse();
        if let Some(parent) = parent {
            matrix = without_translation(&parent.rest) * matrix;
        }
    }
    Some(matrix)
}

/// True for fewer than two matrices or when all are within tolerance of the first.
pub fn is_flat_matrices<'a>(matrices: impl IntoIterator<Item = &'a Mat4>) -> bool {
    let mut iter = matrices.into_iter();
    match iter.next() {
        Some(first) => iter.all(|m| in_range(m, first, MIN_DISTANCE)),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;
    use crate::util::Vec3;
    use serde_json::json;

    fn scene(desc: serde_json::Value) -> MemoryScene {
        MemoryScene::from_description(serde_json::from_value(desc).unwrap()).unwrap()
    }

    fn keyed_cube() -> MemoryScene {
        scene(json!({
            "frame_start": 1, "frame_end": 25,
            "objects": [{
                "name": "Cube", "kind": "mesh",
                "action": [{ "path": "location", "array_index": 0,
                    "points": [{ "frame": 5.0, "value": 0.0 }, { "frame": 13.4, "value": 2.0 }] }],
                "materials": ["Paint"]
            }, {
                "name": "Lamp", "kind": "light",
                "data": { "energy": [10.0] },
                "data_action": [{ "path": "energy", "points": [{ "frame": 7.0, "value": 10.0 }] }]
            }],
            "materials": [{ "name": "Paint", "properties": { "alpha": [1.0] },
                "action": [{ "path": "alpha", "points": [{ "frame": 2.0, "value": 1.0 }] }] }]
        }))
    }

    #[test]
    fn test_register_collects_keyframes() {
        let scene = keyed_cube();
        let cube = scene.object_by_name("Cube").unwrap();
        let lamp = scene.object_by_name("Lamp").unwrap();

        let mut sampler = AnimationSampler::new();
        let frames: Vec<Frame> = sampler.register_object(&scene, cube).iter().copied().collect();
        assert_eq!(frames, vec![2, 5, 13]);
        sampler.register_object(&scene, cube);
        sampler.register_object(&scene, lamp);

        assert_eq!(sampler.objects().count(), 2);
        assert_eq!(sampler.keyframes(lamp).map(|k| k.len()), Some(1));
        assert!(sampler.store().is_empty());
    }

    #[test]
    fn test_grid_pass_samples_grid_only() {
        let mut scene = keyed_cube();
        let cube = scene.object_by_name("Cube").unwrap();
        let mut sampler = AnimationSampler::new();
        sampler.register_object(&scene, cube);

        let opts = SamplingOptions { sampling_rate: 10, ..Default::default() };
        sampler.run_sampling_pass(&mut scene, &opts);

        assert_eq!(scene.evaluated_frames(), &[1, 11, 21, 25]);
        assert_eq!(sampler.sample_frames(cube), vec![1, 11, 21, 25]);
    }

    #[test]
    fn test_keep_keyframes_adds_off_grid_frames() {
        let mut scene = keyed_cube();
        let cube = scene.object_by_name("Cube").unwrap();
        let lamp = scene.object_by_name("Lamp").unwrap();
        let mut sampler = AnimationSampler::new();
        sampler.register_object(&scene, cube);
        sampler.register_object(&scene, lamp);

        let opts = SamplingOptions { sampling_rate: 10, keep_keyframes: true, ..Default::default() };
        sampler.run_sampling_pass(&mut scene, &opts);

        assert_eq!(scene.evaluated_frames(), &[1, 2, 5, 7, 11, 13, 21, 25]);
        assert_eq!(sampler.sample_frames(cube), vec![1, 2, 5, 11, 13, 21, 25]);
        assert_eq!(sampler.sample_frames(lamp), vec![1, 7, 11, 21, 25]);

        let sample = sampler.store().frame(7).and_then(|f| f.sample(lamp)).unwrap();
        assert_eq!(sample.light().and_then(|l| l.get("energy", 0)), Some(10.0));
        let sample = sampler.store().frame(5).and_then(|f| f.sample(cube)).unwrap();
        assert_eq!(sample.material(0).and_then(|m| m.get("alpha", 0)), Some(1.0));
    }

    #[test]
    fn test_flat_matrices() {
        let a = Mat4::IDENTITY;
        let b = Mat4::from_translation(Vec3::new(0.000001, 0.0, 0.0));
        let c = Mat4::from_translation(Vec3::new(0.1, 0.0, 0.0));
        assert!(is_flat_matrices([&a]));
        assert!(is_flat_matrices(std::iter::empty()));
        assert!(is_flat_matrices([&a, &b]));
        assert!(!is_flat_matrices([&a, &b, &c]));
    }

    /// Scene whose pose has no channel for one bone.
    struct MissingChannel {
        inner: MemoryScene,
        hidden: &'static str,
    }

    impl SceneContext for MissingChannel {
        fn frame_range(&self) -> crate::core::FrameRange {
            self.inner.frame_range()
        }
        fn evaluate(&mut self, frame: Frame) {
            self.inner.evaluate(frame)
        }
        fn evaluate_pose(&mut self, object: ObjectId, scope: &ChannelScope) {
            self.inner.evaluate_pose(object, scope)
        }
        fn object_name(&self, object: ObjectId) -> &str {
            self.inner.object_name(object)
        }
        fn object_kind(&self, object: ObjectId) -> ObjectKind {
            self.inner.object_kind(object)
        }
        fn local_transform(&self, object: ObjectId) -> Mat4 {
            self.inner.local_transform(object)
        }
        fn skeleton(&self, object: ObjectId) -> Option<&Skeleton> {
            self.inner.skeleton(object)
        }
        fn pose_channel(&self, object: ObjectId, bone_name: &str) -> Option<Mat4> {
            if bone_name == self.hidden {
                return None;
            }
            self.inner.pose_channel(object, bone_name)
        }
        fn transform_action(&self, object: ObjectId) -> Option<&crate::scene::Action> {
            self.inner.transform_action(object)
        }
        fn data_action(&self, object: ObjectId) -> Option<&crate::scene::Action> {
            self.inner.data_action(object)
        }
        fn data_snapshot(&self, object: ObjectId) -> Option<crate::core::PropertySnapshot> {
            self.inner.data_snapshot(object)
        }
        fn shape_key_action(&self, object: ObjectId) -> Option<&crate::scene::Action> {
            self.inner.shape_key_action(object)
        }
        fn bound_materials(&self, object: ObjectId) -> Vec<crate::scene::MaterialSlot> {
            self.inner.bound_materials(object)
        }
        fn material_action(&self, material: crate::scene::MaterialId) -> Option<&crate::scene::Action> {
            self.inner.material_action(material)
        }
        fn material_snapshot(&self, material: crate::scene::MaterialId) -> crate::core::PropertySnapshot {
            self.inner.material_snapshot(material)
        }
        fn constraints(&self, object: ObjectId) -> &[crate::scene::Constraint] {
            self.inner.constraints(object)
        }
        fn resolve_constraint_targets(&self, constraint: &crate::scene::Constraint) -> Vec<ObjectId> {
            self.inner.resolve_constraint_targets(constraint)
        }
    }

    #[test]
    fn test_bone_without_pose_channel_is_skipped() {
        let inner = scene(json!({
            "frame_start": 1, "frame_end": 3,
            "objects": [{
                "name": "Rig", "kind": "armature",
                "bones": [
                    { "name": "root" },
                    { "name": "left", "parent": "root" },
                    { "name": "right", "parent": "root" }
                ]
            }]
        }));
        let rig = inner.object_by_name("Rig").unwrap();
        let skeleton = inner.skeleton(rig).cloned().unwrap();
        let mut scene = MissingChannel { inner, hidden: "left" };

        let mut sampler = AnimationSampler::new();
        sampler.register_object(&scene, rig);
        sampler.run_sampling_pass(&mut scene, &SamplingOptions::default());

        assert_eq!(sampler.sample_frames(rig), vec![1, 2, 3]);
        assert!(sampler.bone_sample_frames(rig, skeleton.find("left").unwrap()).is_empty());
        assert_eq!(sampler.bone_sample_frames(rig, skeleton.find("root").unwrap()), vec![1, 2, 3]);
        assert_eq!(sampler.bone_sample_frames(rig, skeleton.find("right").unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn test_bone_matrix_local() {
        let mut scene = scene(json!({
            "frame_start": 1, "frame_end": 3,
            "objects": [{
                "name": "Rig", "kind": "armature",
                "bones": [
                    { "name": "root", "rest_location": [0.0, 0.0, 1.0] },
                    { "name": "arm", "parent": "root", "rest_location": [0.0, 2.0, 1.0] }
                ],
                "action": [{ "path": "pose.bones[\"root\"].location", "array_index": 0,
                    "points": [{ "frame": 1.0, "value": 0.0 }, { "frame": 3.0, "value": 4.0 }] }]
            }]
        }));
        let rig = scene.object_by_name("Rig").unwrap();
        scene.evaluate(3);
        let skeleton = scene.skeleton(rig).cloned().unwrap();
        let root = skeleton.find("root").unwrap();
        let arm = skeleton.find("arm").unwrap();

        let root_local = bone_matrix_local(&mut scene, rig, &skeleton, root, false).unwrap();
        let arm_local = bone_matrix_local(&mut scene, rig, &skeleton, arm, false).unwrap();
        assert!(in_range(&root_local, &Mat4::from_translation(Vec3::new(4.0, 0.0, 1.0)), 1e-5));
        // the child is unaffected by the parent's animation
        assert!(in_range(&arm_local, &Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)), 1e-5));
    }
}
