//! Curve extraction from the sample store.

use tracing::{debug, trace};

use crate::core::TransformChannel;
use crate::curve::{is_flat_line, AnimationCurve, CurveKey, CurveKind, CurveMap};
use crate::sampler::{AnimationSampler, ExportMode};
use crate::scene::{bone_name_from_path, ObjectId, ObjectKind, SceneContext};

impl AnimationSampler {
    /// Build the channel map of one object.
    ///
    /// Existing transform curves come first, then the nine location, rotation
    /// and scale channels of the object and of every bone are filled in with
    /// empty curves where missing. Camera or light data curves and material
    /// curves (tagged with their slot index) are added last.
    #[tracing::instrument(skip_all, fields(object = %object))]
    pub fn build_curve_map<S: SceneContext + ?Sized>(&self, ctx: &S, object: ObjectId) -> CurveMap {
        let mut curves = CurveMap::new();
        let kind = ctx.object_kind(object);
        let skeleton = match kind {
            ObjectKind::Armature => ctx.skeleton(object),
            _ => None,
        };

        if let Some(action) = ctx.transform_action(object) {
            for source in &action.curves {
                // bone paths are bone curves even when the bone is missing
                let bone_name = bone_name_from_path(&source.path).filter(|_| kind == ObjectKind::Armature);
                let curve = match bone_name {
                    Some(name) => {
                        let curve = AnimationCurve::from_action_curve(CurveKind::Bone, source, None);
                        match skeleton.and_then(|s| s.find(name)) {
                            Some(bone) => curve.with_bone(bone),
                            None => curve,
                        }
                    }
                    None => AnimationCurve::from_action_curve(CurveKind::Object, source, None),
                };
                curves.insert(curve.key().clone(), curve);
            }
        }

        for channel in TransformChannel::BASE {
            for index in 0..channel.arity() {
                let key = CurveKey::object_transform(channel, index);
                curves
                    .entry(key.clone())
                    .or_insert_with(|| AnimationCurve::new(CurveKind::Object, key));
            }
        }

        if let Some(skeleton) = skeleton {
            for bone in skeleton.depth_first() {
                let Some(node) = skeleton.get(bone) else {
                    continue;
                };
                for channel in TransformChannel::BASE {
                    for index in 0..channel.arity() {
                        let key = CurveKey::bone_transform(&node.name, channel, index);
                        curves
                            .entry(key.clone())
                            .or_insert_with(|| AnimationCurve::new(CurveKind::Bone, key).with_bone(bone));
                    }
                }
            }
        }

        let data_kind = match kind {
            ObjectKind::Camera => Some(CurveKind::Camera),
            ObjectKind::Light => Some(CurveKind::Light),
            _ => None,
        };
        if let (Some(data_kind), Some(action)) = (data_kind, ctx.data_action(object)) {
            for source in &action.curves {
                let curve = AnimationCurve::from_action_curve(data_kind, source, None);
                curves.insert(curve.key().clone(), curve);
            }
        }

        for slot in ctx.bound_materials(object) {
            let Some(action) = ctx.material_action(slot.material) else {
                continue;
            };
            for source in &action.curves {
                let curve = AnimationCurve::from_action_curve(CurveKind::Material, source, Some(slot.index));
                curves.insert(curve.key().clone(), curve);
            }
        }

        debug!(channels = curves.len(), "built curve map");
        curves
    }

    /// Fill a curve from the object's samples.
    ///
    /// In [`ExportMode::Keys`] only frames that are keyframes of this curve are
    /// read. Samples that lack the curve's coordinate are skipped.
    pub fn populate_curve(&self, object: ObjectId, curve: &mut AnimationCurve, mode: ExportMode) {
        for (frame, sample) in self.store.samples(object) {
            if mode != ExportMode::Sample && !curve.is_keyframe(frame) {
                continue;
            }
            match curve.value_from(sample) {
                Some(value) => curve.add_value(value, frame),
                None => trace!(frame, key = %curve.key(), "no value in sample"),
            }
        }
        curve.remove_unused_keyframes();
        curve.calc_handles();
    }

    /// Populate every curve of a map.
    pub fn populate_curves(&self, object: ObjectId, curves: &mut CurveMap, mode: ExportMode) {
        for curve in curves.values_mut() {
            self.populate_curve(object, curve, mode);
        }
    }
}

/// Values of a populated curve and whether they are constant.
pub fn value_set(curve: &AnimationCurve) -> (Vec<f32>, bool) {
    let values = curve.sampled_values();
    let flat = is_flat_line(&values);
    (values, flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SamplingOptions;
    use crate::scene::MemoryScene;
    use serde_json::json;

    fn scene(desc: serde_json::Value) -> MemoryScene {
        MemoryScene::from_description(serde_json::from_value(desc).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_object_has_nine_empty_channels() {
        let scene = scene(json!({ "frame_start": 1, "frame_end": 5, "objects": [{ "name": "Empty" }] }));
        let empty = scene.object_by_name("Empty").unwrap();
        let sampler = AnimationSampler::new();

        let curves = sampler.build_curve_map(&scene, empty);
        assert_eq!(curves.len(), 9);
        assert!(curves.values().all(|c| c.is_empty() && c.kind() == CurveKind::Object));
        assert!(curves.contains_key(&CurveKey::new("rotation_euler", 2)));
    }

    #[test]
    fn test_armature_channels_cover_every_bone() {
        let scene = scene(json!({
            "frame_start": 1, "frame_end": 5,
            "objects": [{
                "name": "Rig", "kind": "armature",
                "bones": [{ "name": "root" }, { "name": "tip", "parent": "root" }],
                "action": [{ "path": "pose.bones[\"tip\"].location", "array_index": 1,
                    "points": [{ "frame": 1.0, "value": 0.0 }, { "frame": 5.0, "value": 1.0 }] }]
            }]
        }));
        let rig = scene.object_by_name("Rig").unwrap();
        let curves = AnimationSampler::new().build_curve_map(&scene, rig);

        assert_eq!(curves.len(), 27);
        let keyed = &curves[&CurveKey::bone_transform("tip", TransformChannel::Location, 1)];
        assert_eq!(keyed.kind(), CurveKind::Bone);
        assert_eq!(keyed.len(), 2);
        assert!(keyed.value_source().is_some());
        assert_eq!(curves.values().filter(|c| c.kind() == CurveKind::Bone).count(), 18);
    }

    #[test]
    fn test_unknown_bone_curve_reads_nothing() {
        let mut scene = scene(json!({
            "frame_start": 1, "frame_end": 2,
            "objects": [{
                "name": "Rig", "kind": "armature", "location": [7.0, 0.0, 0.0],
                "bones": [{ "name": "root" }],
                "action": [{ "path": "pose.bones[\"ghost\"].location", "array_index": 0,
                    "points": [{ "frame": 1.0, "value": 0.0 }, { "frame": 2.0, "value": 1.0 }] }]
            }]
        }));
        let rig = scene.object_by_name("Rig").unwrap();
        let mut sampler = AnimationSampler::new();
        sampler.register_object(&scene, rig);
        sampler.run_sampling_pass(&mut scene, &SamplingOptions::default());

        let mut curves = sampler.build_curve_map(&scene, rig);
        let key = CurveKey::new("pose.bones[\"ghost\"].location", 0);
        assert_eq!(curves[&key].kind(), CurveKind::Bone);
        assert_eq!(curves[&key].value_source(), None);

        sampler.populate_curves(rig, &mut curves, ExportMode::Sample);
        // no sample carries the ghost bone, so the authored points stay untouched
        assert_eq!(curves[&key].sampled_values(), vec![0.0, 1.0]);
        assert!(!curves[&key].sampled_values().contains(&7.0));
    }

    #[test]
    fn test_material_curves_are_tagged_by_slot() {
        let scene = scene(json!({
            "frame_start": 1, "frame_end": 5,
            "objects": [{ "name": "Ball", "kind": "mesh", "materials": ["Red", "Blue"] }],
            "materials": [
                { "name": "Red", "properties": { "alpha": [1.0] },
                  "action": [{ "path": "alpha", "points": [{ "frame": 1.0, "value": 1.0 }] }] },
                { "name": "Blue", "properties": { "alpha": [0.5] },
                  "action": [{ "path": "alpha", "points": [{ "frame": 1.0, "value": 0.5 }] }] }
            ]
        }));
        let ball = scene.object_by_name("Ball").unwrap();
        let curves = AnimationSampler::new().build_curve_map(&scene, ball);

        assert_eq!(curves.len(), 11);
        assert_eq!(curves[&CurveKey::tagged("alpha", 0, 0)].kind(), CurveKind::Material);
        assert!(curves.contains_key(&CurveKey::tagged("alpha", 0, 1)));
    }

    #[test]
    fn test_populate_sample_mode() {
        let mut scene = scene(json!({
            "frame_start": 0, "frame_end": 3,
            "objects": [{ "name": "Cube", "action": [{ "path": "location", "array_index": 0,
                "points": [{ "frame": 0.0, "value": 0.0 }, { "frame": 3.0, "value": 3.0 }] }] }]
        }));
        let cube = scene.object_by_name("Cube").unwrap();
        let mut sampler = AnimationSampler::new();
        sampler.register_object(&scene, cube);
        sampler.run_sampling_pass(&mut scene, &SamplingOptions::default());

        let mut curves = sampler.build_curve_map(&scene, cube);
        sampler.populate_curves(cube, &mut curves, ExportMode::Sample);

        let x = &curves[&CurveKey::new("location", 0)];
        assert_eq!(sampler.curve_frames(x), vec![0, 1, 2, 3]);
        let (values, flat) = value_set(x);
        assert!(!flat);
        for (value, expected) in values.iter().zip([0.0, 1.0, 2.0, 3.0]) {
            assert!((value - expected).abs() < 1e-5);
        }

        let (_, flat) = value_set(&curves[&CurveKey::new("scale", 1)]);
        assert!(flat);
    }
}
