//! Math type re-exports and transform helpers.
//!
//! This module re-exports the `glam` types used for samples and adds the
//! decompositions needed to turn a local matrix into scalar channels.

pub use glam::{EulerRot, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

/// Tolerance used when deciding that two sampled values are the same.
pub const MIN_DISTANCE: f32 = 0.00001;

/// Translation, rotation and scale of a local transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    pub location: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Decomposed {
    /// Decompose an affine matrix.
    #[inline]
    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, location) = m.to_scale_rotation_translation();
        Self { location, rotation, scale }
    }

    /// Rotation as XYZ Euler angles in radians (X applied first).
    pub fn euler_xyz(&self) -> Vec3 {
        // Extrinsic XYZ is R = Rz * Ry * Rx, which glam names ZYX.
        let (z, y, x) = self.rotation.to_euler(EulerRot::ZYX);
        Vec3::new(x, y, z)
    }

    /// Rotation quaternion as (w, x, y, z).
    #[inline]
    pub fn quaternion_wxyz(&self) -> Vec4 {
        Vec4::new(self.rotation.w, self.rotation.x, self.rotation.y, self.rotation.z)
    }
}

/// Build a matrix from location, XYZ Euler rotation (radians) and scale.
pub fn compose_trs(location: Vec3, euler_xyz: Vec3, scale: Vec3) -> Mat4 {
    let rotation = Quat::from_euler(EulerRot::ZYX, euler_xyz.z, euler_xyz.y, euler_xyz.x);
    Mat4::from_scale_rotation_translation(scale, rotation, location)
}

/// Copy of `m` with the translation column cleared.
#[inline]
pub fn without_translation(m: &Mat4) -> Mat4 {
    let mut out = *m;
    out.w_axis = Vec4::new(0.0, 0.0, 0.0, m.w_axis.w);
    out
}

/// Check that every component of `a` is within `distance` of `b`.
#[inline]
pub fn in_range(a: &Mat4, b: &Mat4, distance: f32) -> bool {
    a.abs_diff_eq(*b, distance)
}

/// Round a floating point scene time to a frame index, halfway cases to even.
#[inline]
pub fn round_frame(time: f32) -> i32 {
    time.round_ties_even() as i32
}
