//! Per-frame camera transform.
//!
//! [`compute_frame_uniform`] is a pure function from a [`CameraState`] snapshot
//! to the [`FrameUniform`] block the ray marcher reads. The fragment stage
//! reconstructs each pixel's world-space ray by unprojecting NDC points with
//! `inv_view_proj`, so the matrix must be invertible; anything that would
//! break that is rejected up front as a [`DegenerateReason`].

use std::fmt;

use glam::{Mat4, Quat, Vec3};

use crate::error::{CoreError, CoreResult};

/// Snapshot of a camera taken once per frame.
///
/// `orientation` rotates camera space into world space. The camera looks
/// down its local -Z axis with +Y up (right-handed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Camera position in world space.
    pub position: Vec3,
    /// Camera-to-world rotation.
    pub orientation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl CameraState {
    /// Builds a snapshot looking from `position` towards `target`.
    ///
    /// If `up` is parallel to the view direction the orientation is not
    /// finite and [`compute_frame_uniform`] will reject it.
    #[must_use]
    pub fn look_at(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let world_to_camera = Quat::from_mat4(&Mat4::look_at_rh(position, target, up));
        Self {
            position,
            orientation: world_to_camera.inverse(),
            fov_y,
            aspect,
            near,
            far,
        }
    }

    /// Returns the world-to-camera matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.orientation.normalize();
        Mat4::from_quat(rotation.conjugate()) * Mat4::from_translation(-self.position)
    }

    /// Returns the projection matrix (wgpu depth range `[0, 1]`).
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Returns the camera's forward direction in world space.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.orientation.normalize() * Vec3::NEG_Z
    }

    fn validate(&self) -> Result<(), DegenerateReason> {
        let scalars = [self.fov_y, self.aspect, self.near, self.far];
        if !self.position.is_finite()
            || !self.orientation.is_finite()
            || scalars.iter().any(|v| !v.is_finite())
        {
            return Err(DegenerateReason::NonFinite);
        }
        if self.near <= 0.0 || self.far <= 0.0 {
            return Err(DegenerateReason::NonPositiveClip);
        }
        if self.far <= self.near {
            return Err(DegenerateReason::EmptyDepthRange);
        }
        if self.fov_y <= 0.0 || self.fov_y >= std::f32::consts::PI {
            return Err(DegenerateReason::FieldOfView);
        }
        if self.aspect <= 0.0 {
            return Err(DegenerateReason::AspectRatio);
        }
        if self.orientation.length_squared() <= f32::EPSILON {
            return Err(DegenerateReason::Orientation);
        }
        Ok(())
    }
}

/// Why a camera was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateReason {
    /// A position, orientation or projection parameter is NaN or infinite.
    NonFinite,
    /// Near or far plane is not positive.
    NonPositiveClip,
    /// Far plane is not beyond the near plane (includes `near == far`).
    EmptyDepthRange,
    /// Field of view is outside `(0, π)`.
    FieldOfView,
    /// Aspect ratio is not positive.
    AspectRatio,
    /// Orientation quaternion has zero length.
    Orientation,
    /// The composed view-projection has no finite inverse.
    NonInvertible,
}

impl fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DegenerateReason::NonFinite => "non-finite camera parameter",
            DegenerateReason::NonPositiveClip => "near and far planes must be positive",
            DegenerateReason::EmptyDepthRange => "far plane must lie beyond the near plane",
            DegenerateReason::FieldOfView => "field of view must be in (0, pi)",
            DegenerateReason::AspectRatio => "aspect ratio must be positive",
            DegenerateReason::Orientation => "orientation has zero length",
            DegenerateReason::NonInvertible => "view-projection matrix is not invertible",
        };
        f.write_str(text)
    }
}

/// Camera block uploaded once per frame.
/// Layout must match WGSL `FrameUniform` exactly (80 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct FrameUniform {
    /// Inverse of `projection * view`, column-major.
    pub inv_view_proj: [[f32; 4]; 4],
    /// Camera position in world space.
    pub eye: [f32; 3],
    /// Padding to 16-byte alignment.
    pub _padding: f32,
}

impl FrameUniform {
    /// Returns the inverse view-projection as a matrix.
    #[must_use]
    pub fn inv_view_proj_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.inv_view_proj)
    }

    /// Returns the eye position as a vector.
    #[must_use]
    pub fn eye_position(&self) -> Vec3 {
        Vec3::from_array(self.eye)
    }
}

impl Default for FrameUniform {
    fn default() -> Self {
        Self {
            inv_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            eye: [0.0, 0.0, 3.0],
            _padding: 0.0,
        }
    }
}

/// Computes the inverse view-projection and eye position for `camera`.
///
/// Pure and deterministic. A camera that cannot be inverted is a
/// configuration error and fails with [`CoreError::DegenerateCamera`].
pub fn compute_frame_uniform(camera: &CameraState) -> CoreResult<FrameUniform> {
    camera.validate().map_err(CoreError::DegenerateCamera)?;

    let view_proj = camera.projection_matrix() * camera.view_matrix();
    let det = view_proj.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(CoreError::DegenerateCamera(DegenerateReason::NonInvertible));
    }
    let inv_view_proj = view_proj.inverse();
    if !inv_view_proj.is_finite() {
        return Err(CoreError::DegenerateCamera(DegenerateReason::NonInvertible));
    }

    Ok(FrameUniform {
        inv_view_proj: inv_view_proj.to_cols_array_2d(),
        eye: camera.position.to_array(),
        _padding: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn axis_camera() -> CameraState {
        CameraState::look_at(
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::ZERO,
            Vec3::Y,
            std::f32::consts::FRAC_PI_4,
            1.0,
            0.1,
            100.0,
        )
    }

    fn assert_degenerate(camera: &CameraState, expected: DegenerateReason) {
        match compute_frame_uniform(camera) {
            Err(CoreError::DegenerateCamera(reason)) => assert_eq!(reason, expected),
            other => panic!("expected {expected:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_frame_uniform_size() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 80);
    }

    #[test]
    fn test_eye_is_camera_position() {
        let uniform = compute_frame_uniform(&axis_camera()).unwrap();
        assert_eq!(uniform.eye_position(), Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn test_look_at_forward() {
        let camera = axis_camera();
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_inverse_round_trip() {
        let camera = axis_camera();
        let view_proj = camera.projection_matrix() * camera.view_matrix();
        let inv = compute_frame_uniform(&camera).unwrap().inv_view_proj_matrix();
        let point = Vec3::new(0.25, -0.3, 0.1);
        let back = inv.project_point3(view_proj.project_point3(point));
        assert!((back - point).length() < 1e-4, "got {back:?}");
    }

    #[test]
    fn test_screen_center_unprojects_along_forward() {
        let camera = axis_camera();
        let inv = compute_frame_uniform(&camera).unwrap().inv_view_proj_matrix();
        let near = inv.project_point3(Vec3::new(0.0, 0.0, 0.0));
        let far = inv.project_point3(Vec3::new(0.0, 0.0, 1.0));
        let dir = (far - near).normalize();
        assert!((dir - Vec3::NEG_Z).length() < 1e-4, "got {dir:?}");
        assert!((near.z - (3.0 - camera.near)).abs() < 1e-3);
    }

    #[test]
    fn test_near_equals_far_is_degenerate() {
        let mut camera = axis_camera();
        camera.near = 1.0;
        camera.far = 1.0;
        assert_degenerate(&camera, DegenerateReason::EmptyDepthRange);
    }

    #[test]
    fn test_zero_fov_is_degenerate() {
        let mut camera = axis_camera();
        camera.fov_y = 0.0;
        assert_degenerate(&camera, DegenerateReason::FieldOfView);
    }

    #[test]
    fn test_zero_orientation_is_degenerate() {
        let mut camera = axis_camera();
        camera.orientation = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        assert_degenerate(&camera, DegenerateReason::Orientation);
    }

    #[test]
    fn test_parallel_up_is_degenerate() {
        let camera = CameraState::look_at(
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::ZERO,
            Vec3::Y,
            1.0,
            1.0,
            0.1,
            10.0,
        );
        assert_degenerate(&camera, DegenerateReason::NonFinite);
    }

    #[test]
    fn test_bad_aspect_and_clip() {
        let mut camera = axis_camera();
        camera.aspect = 0.0;
        assert_degenerate(&camera, DegenerateReason::AspectRatio);

        let mut camera = axis_camera();
        camera.near = -0.1;
        assert_degenerate(&camera, DegenerateReason::NonPositiveClip);
    }

    proptest! {
        #[test]
        fn prop_frame_uniform_is_deterministic(
            x in -10.0f32..10.0,
            y in -10.0f32..10.0,
            z in 1.0f32..10.0,
            yaw in -3.0f32..3.0,
            pitch in -1.4f32..1.4,
            fov in 0.1f32..3.0,
            aspect in 0.2f32..4.0,
        ) {
            let camera = CameraState {
                position: Vec3::new(x, y, z),
                orientation: Quat::from_euler(glam::EulerRot::YXZ, yaw, pitch, 0.0),
                fov_y: fov,
                aspect,
                near: 0.05,
                far: 50.0,
            };
            let a = compute_frame_uniform(&camera).unwrap();
            let b = compute_frame_uniform(&camera).unwrap();
            prop_assert_eq!(bytemuck::bytes_of(&a), bytemuck::bytes_of(&b));
        }
    }
}
