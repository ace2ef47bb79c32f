//! Keyframe curves rebuilt from samples.

use serde::Serialize;

use crate::core::{Frame, FrameSet, Sample, TransformChannel, ValueSource};
use crate::curve::{CurveKey, CurveKind};
use crate::scene::{ActionCurve, BoneId};
use crate::util::{round_frame, Vec2, MIN_DISTANCE};

/// A control point with Bezier handles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct KeyPoint {
    pub frame: f32,
    pub value: f32,
    pub handle_left: Vec2,
    pub handle_right: Vec2,
}

impl KeyPoint {
    pub fn new(frame: f32, value: f32) -> Self {
        Self {
            frame,
            value,
            handle_left: Vec2::new(frame, value),
            handle_right: Vec2::new(frame, value),
        }
    }
}

/// One scalar animation channel.
///
/// A curve starts either empty or as a copy of an existing keyframe curve.
/// Sampled values are added with [`add_value`](Self::add_value); afterwards
/// [`remove_unused_keyframes`](Self::remove_unused_keyframes) and
/// [`calc_handles`](Self::calc_handles) finalize it.
#[derive(Clone, Debug, Serialize)]
pub struct AnimationCurve {
    key: CurveKey,
    kind: CurveKind,
    #[serde(skip)]
    bone: Option<BoneId>,
    #[serde(skip)]
    keyframes: FrameSet,
    #[serde(skip)]
    written: FrameSet,
    points: Vec<KeyPoint>,
}

impl AnimationCurve {
    /// Empty curve.
    pub fn new(kind: CurveKind, key: CurveKey) -> Self {
        Self {
            key,
            kind,
            bone: None,
            keyframes: FrameSet::new(),
            written: FrameSet::new(),
            points: Vec::new(),
        }
    }

    /// Copy of an existing keyframe curve; its control point frames become the
    /// curve's keyframes.
    pub fn from_action_curve(kind: CurveKind, source: &ActionCurve, tag: Option<u32>) -> Self {
        let key = CurveKey { path: source.path.clone(), array_index: source.array_index, tag };
        let mut curve = Self::new(kind, key);
        for point in &source.points {
            curve.insert_point(point.frame, point.value);
        }
        curve.keyframes = source.keyframes().collect();
        curve
    }

    /// Bind a bone curve to the bone it reads from.
    pub fn with_bone(mut self, bone: BoneId) -> Self {
        self.bone = Some(bone);
        self
    }

    #[inline]
    pub fn key(&self) -> &CurveKey {
        &self.key
    }

    #[inline]
    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.key.path
    }

    #[inline]
    pub fn array_index(&self) -> usize {
        self.key.array_index
    }

    #[inline]
    pub fn tag(&self) -> Option<u32> {
        self.key.tag
    }

    #[inline]
    pub fn bone(&self) -> Option<BoneId> {
        self.bone
    }

    pub fn transform_channel(&self) -> Option<TransformChannel> {
        self.key.transform_channel()
    }

    /// Where this curve reads from inside a sample; `None` for a bone curve
    /// without a resolved bone or a material curve without a tag.
    pub fn value_source(&self) -> Option<ValueSource> {
        match self.kind {
            CurveKind::Object => Some(ValueSource::Object),
            CurveKind::Bone => self.bone.map(ValueSource::Bone),
            CurveKind::Camera => Some(ValueSource::Camera),
            CurveKind::Light => Some(ValueSource::Light),
            CurveKind::Material => self.key.tag.map(ValueSource::Material),
        }
    }

    /// Read this curve's scalar from a sample.
    pub fn value_from(&self, sample: &Sample) -> Option<f32> {
        sample.value(self.value_source()?, &self.key.path, self.key.array_index)
    }

    /// Whether `frame` is one of the curve's authored keyframes.
    pub fn is_keyframe(&self, frame: Frame) -> bool {
        self.keyframes.contains(&frame)
    }

    /// Authored keyframes.
    pub fn keyframes(&self) -> &FrameSet {
        &self.keyframes
    }

    /// Insert or replace the value at `frame`.
    ///
    /// Authored points at fractional frames that round to `frame` are replaced
    /// as well.
    pub fn add_value(&mut self, value: f32, frame: Frame) {
        self.points.retain(|p| round_frame(p.frame) != frame);
        self.insert_point(frame as f32, value);
        self.written.insert(frame);
    }

    fn insert_point(&mut self, frame: f32, value: f32) {
        match self.points.binary_search_by(|p| p.frame.total_cmp(&frame)) {
            Ok(i) => self.points[i] = KeyPoint::new(frame, value),
            Err(i) => self.points.insert(i, KeyPoint::new(frame, value)),
        }
    }

    /// Drop control points the sampling pass did not write, then drop
    /// interior points that sit on a plateau with both neighbors.
    ///
    /// Curves that received no values keep their authored points.
    pub fn remove_unused_keyframes(&mut self) {
        if !self.written.is_empty() {
            let written = &self.written;
            self.points
                .retain(|p| written.contains(&round_frame(p.frame)) && p.frame == round_frame(p.frame) as f32);
        }

        if self.points.len() < 3 {
            return;
        }
        let mut kept: Vec<KeyPoint> = Vec::with_capacity(self.points.len());
        let last = self.points.len() - 1;
        for (i, point) in self.points.iter().enumerate() {
            let redundant = i != 0
                && i != last
                && kept.last().is_some_and(|prev| (prev.value - point.value).abs() < MIN_DISTANCE)
                && (self.points[i + 1].value - point.value).abs() < MIN_DISTANCE;
            if !redundant {
                kept.push(*point);
            }
        }
        self.points = kept;
    }

    /// Recompute auto-clamped handles.
    ///
    /// Handles extend a third of the way to each neighbor. Endpoints and local
    /// extrema get flat handles so the curve never overshoots a key.
    pub fn calc_handles(&mut self) {
        let n = self.points.len();
        for i in 0..n {
            let point = self.points[i];
            let prev = i.checked_sub(1).map(|j| self.points[j]);
            let next = self.points.get(i + 1).copied();

            let slope = match (prev, next) {
                (Some(p), Some(q)) if (point.value - p.value) * (q.value - point.value) > 0.0 => {
                    (q.value - p.value) / (q.frame - p.frame)
                }
                _ => 0.0,
            };

            let left_len = prev.map(|p| (point.frame - p.frame) / 3.0);
            let right_len = next.map(|q| (q.frame - point.frame) / 3.0);
            let left = left_len.or(right_len).unwrap_or(1.0 / 3.0);
            let right = right_len.or(left_len).unwrap_or(1.0 / 3.0);

            let p = &mut self.points[i];
            p.handle_left = Vec2::new(point.frame - left, point.value - slope * left);
            p.handle_right = Vec2::new(point.frame + right, point.value + slope * right);
        }
    }

    pub fn points(&self) -> &[KeyPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Frames of the current control points.
    pub fn sampled_frames(&self) -> Vec<Frame> {
        self.points.iter().map(|p| round_frame(p.frame)).collect()
    }

    /// Values of the current control points.
    pub fn sampled_values(&self) -> Vec<f32> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Linear read between control points, holding the ends.
    pub fn value_at(&self, frame: f32) -> Option<f32> {
        let first = self.points.first()?;
        if frame <= first.frame {
            return Some(first.value);
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if frame <= b.frame {
                let t = (frame - a.frame) / (b.frame - a.frame);
                return Some(a.value + (b.value - a.value) * t);
            }
        }
        self.points.last().map(|p| p.value)
    }

    /// Whether the channel is constant and can be left out of the export.
    pub fn is_flat(&self) -> bool {
        is_flat_line(&self.sampled_values())
    }
}

/// True when fewer than two values exist or all are within tolerance of the first.
pub fn is_flat_line(values: &[f32]) -> bool {
    match values.split_first() {
        Some((first, rest)) if !rest.is_empty() => rest.iter().all(|v| (v - first).abs() < MIN_DISTANCE),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ControlPoint;

    fn curve() -> AnimationCurve {
        AnimationCurve::new(CurveKind::Object, CurveKey::new("location", 0))
    }

    #[test]
    fn test_increasing_values_keep_all_points() {
        let mut c = curve();
        for (frame, value) in [(0, 0.0), (1, 1.0), (2, 3.0), (3, 4.0)] {
            c.add_value(value, frame);
        }
        c.remove_unused_keyframes();
        c.calc_handles();
        assert_eq!(c.sampled_frames(), vec![0, 1, 2, 3]);
        assert_eq!(c.sampled_values(), vec![0.0, 1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_plateau_is_pruned() {
        let mut c = curve();
        for (frame, value) in [(0, 1.0), (1, 1.0), (2, 1.0), (3, 2.0), (4, 2.0)] {
            c.add_value(value, frame);
        }
        c.remove_unused_keyframes();
        assert_eq!(c.sampled_frames(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_unwritten_authored_points_are_dropped() {
        let source = ActionCurve::new(
            "location",
            0,
            vec![ControlPoint::new(1.0, 5.0), ControlPoint::new(7.0, 9.0)],
        );
        let mut c = AnimationCurve::from_action_curve(CurveKind::Object, &source, None);
        assert!(c.is_keyframe(7));
        assert!(!c.is_keyframe(4));

        c.add_value(2.0, 1);
        c.add_value(3.0, 5);
        c.remove_unused_keyframes();
        assert_eq!(c.sampled_frames(), vec![1, 5]);
        assert_eq!(c.sampled_values(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_fractional_authored_point_is_replaced() {
        let source = ActionCurve::new(
            "location",
            0,
            vec![ControlPoint::new(1.0, 0.0), ControlPoint::new(13.4, 100.0), ControlPoint::new(20.0, 50.0)],
        );
        let mut c = AnimationCurve::from_action_curve(CurveKind::Object, &source, None);
        assert!(c.is_keyframe(13));
        for frame in 1..=20 {
            c.add_value(frame as f32, frame);
        }
        c.remove_unused_keyframes();

        let frames = c.sampled_frames();
        let mut unique = frames.clone();
        unique.dedup();
        assert_eq!(frames, unique);
        assert_eq!(frames.len(), 20);
        assert!(c.points().iter().all(|p| p.frame.fract() == 0.0));
        assert!(!c.sampled_values().contains(&100.0));
    }

    #[test]
    fn test_add_value_replaces() {
        let mut c = curve();
        c.add_value(1.0, 3);
        c.add_value(2.0, 3);
        assert_eq!(c.len(), 1);
        assert_eq!(c.sampled_values(), vec![2.0]);
    }

    #[test]
    fn test_handles_auto_clamped() {
        let mut c = curve();
        for (frame, value) in [(0, 0.0), (3, 3.0), (6, 9.0), (9, 0.0)] {
            c.add_value(value, frame);
        }
        c.calc_handles();
        let p = c.points();
        // endpoints are flat
        assert_eq!(p[0].handle_right, Vec2::new(1.0, 0.0));
        // monotone interior point follows the neighbor slope
        assert_eq!(p[1].handle_left, Vec2::new(2.0, 3.0 - 1.5));
        assert_eq!(p[1].handle_right, Vec2::new(4.0, 3.0 + 1.5));
        // extremum is flat
        assert_eq!(p[2].handle_left, Vec2::new(5.0, 9.0));
    }

    #[test]
    fn test_is_flat_line() {
        assert!(is_flat_line(&[]));
        assert!(is_flat_line(&[3.0]));
        assert!(is_flat_line(&[1.0, 1.000001, 0.999999]));
        assert!(!is_flat_line(&[1.0, 1.0, 1.1]));

        let mut c = curve();
        assert!(c.is_flat());
        c.add_value(2.0, 0);
        c.add_value(2.0, 1);
        assert!(c.is_flat());
        c.add_value(2.5, 2);
        assert!(!c.is_flat());
    }

    #[test]
    fn test_value_source() {
        let bone = AnimationCurve::new(CurveKind::Bone, CurveKey::new("pose.bones[\"a\"].location", 0));
        assert_eq!(bone.value_source(), None);
        assert_eq!(bone.with_bone(BoneId(2)).value_source(), Some(ValueSource::Bone(BoneId(2))));
        let mat = AnimationCurve::new(CurveKind::Material, CurveKey::tagged("alpha", 0, 1));
        assert_eq!(mat.value_source(), Some(ValueSource::Material(1)));
    }

    #[test]
    fn test_value_at() {
        let mut c = curve();
        c.add_value(0.0, 0);
        c.add_value(10.0, 10);
        assert_eq!(c.value_at(5.0), Some(5.0));
        assert_eq!(c.value_at(-1.0), Some(0.0));
        assert_eq!(c.value_at(20.0), Some(10.0));
    }
}
