//! Orbit camera driven by mouse input.

use cytoscope_core::CameraState;
use glam::Vec3;

/// Largest elevation reachable by [`Camera::orbit`], just short of the poles
/// where the view direction would align with world up.
pub const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Closest the eye may get to the target.
pub const MIN_DISTANCE: f32 = 0.1;

/// Camera on a sphere around a target point.
///
/// Input handlers mutate it between frames; the renderer reads a
/// [`CameraState`] snapshot once per frame through [`Camera::state`].
/// `yaw` is measured about +Y from the +Z axis and `pitch` is the elevation
/// above the XZ plane.
#[derive(Debug, Clone)]
pub struct Camera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Creates a camera 2 units down +Z from the origin, looking at it.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 2.0,
            yaw: 0.0,
            pitch: 0.0,
            fov: std::f32::consts::FRAC_PI_4,
            aspect_ratio,
            near: 0.01,
            far: 100.0,
        }
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Eye position in world space.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + self.distance * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    /// Snapshot consumed by the frame uniform computation.
    #[must_use]
    pub fn state(&self) -> CameraState {
        CameraState::look_at(
            self.position(),
            self.target,
            Vec3::Y,
            self.fov,
            self.aspect_ratio,
            self.near,
            self.far,
        )
    }

    /// Screen-right and screen-up directions in world space.
    fn screen_axes(&self) -> (Vec3, Vec3) {
        let forward = (self.target - self.position()).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        (right, right.cross(forward))
    }

    /// Turns the camera around the target by `delta_yaw` and `delta_pitch`
    /// radians. Pitch stops at [`PITCH_LIMIT`].
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw -= delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Slides camera and target together in the screen plane.
    pub fn pan(&mut self, delta_right: f32, delta_up: f32) {
        let (right, up) = self.screen_axes();
        self.target += right * delta_right + up * delta_up;
    }

    /// Moves toward (positive `delta`) or away from the target.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta).max(MIN_DISTANCE);
    }

    /// Aims at the center of a box and backs off until its bounding sphere
    /// fits the vertical field of view. Clip planes follow the new distance.
    pub fn frame_box(&mut self, min: Vec3, max: Vec3) {
        let radius = ((max - min).length() * 0.5).max(MIN_DISTANCE);
        self.target = (min + max) * 0.5;
        self.distance = radius / (self.fov * 0.5).sin();
        self.near = (self.distance - radius) * 0.5;
        self.far = (self.distance + radius) * 4.0;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cytoscope_core::compute_frame_uniform;

    #[test]
    fn test_default_state_is_valid() {
        let camera = Camera::default();
        let uniform = compute_frame_uniform(&camera.state()).unwrap();
        assert!((uniform.eye_position() - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_quarter_yaw_looks_down_negative_x() {
        let mut camera = Camera::new(1.0);
        camera.yaw = std::f32::consts::FRAC_PI_2;
        assert!((camera.position() - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        let forward = camera.state().forward();
        assert!((forward - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_orbit_keeps_distance_to_target() {
        let mut camera = Camera::new(1.0);
        camera.orbit(0.7, -0.3);
        assert!((camera.position().distance(camera.target) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_orbit_stops_short_of_pole() {
        let mut camera = Camera::new(1.0);
        camera.orbit(0.0, 10.0);
        assert_eq!(camera.pitch, PITCH_LIMIT);
        assert!(compute_frame_uniform(&camera.state()).is_ok());
        camera.orbit(0.0, -20.0);
        assert_eq!(camera.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn test_pan_follows_screen_axes() {
        let mut camera = Camera::new(1.0);
        camera.pan(1.0, 0.5);
        assert!((camera.target - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-5);
        assert!((camera.position() - Vec3::new(1.0, 0.5, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_zoom_stops_short_of_target() {
        let mut camera = Camera::new(1.0);
        camera.zoom(1.0);
        assert!((camera.distance - 1.0).abs() < 1e-5);
        camera.zoom(50.0);
        assert_eq!(camera.distance, MIN_DISTANCE);
    }

    #[test]
    fn test_frame_box_contains_box_between_clip_planes() {
        let mut camera = Camera::new(1.0);
        camera.frame_box(Vec3::new(1.0, -0.5, -0.5), Vec3::new(2.0, 0.5, 0.5));
        assert_eq!(camera.target, Vec3::new(1.5, 0.0, 0.0));

        let radius = Vec3::ONE.length() * 0.5;
        assert!(camera.near > 0.0);
        assert!(camera.near < camera.distance - radius);
        assert!(camera.far > camera.distance + radius);
        assert!(compute_frame_uniform(&camera.state()).is_ok());
    }
}
