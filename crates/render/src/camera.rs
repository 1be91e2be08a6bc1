use std::f32::consts::PI;

use framelab_scene::Ray;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Perspective camera looking from `eye` at `target`.
///
/// Projection uses the wgpu depth range (`[0, 1]`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_deg: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y_deg,
            aspect,
            near,
            far,
            ..Self::default()
        }
    }

    pub fn looking(mut self, eye: Vec3, target: Vec3) -> Self {
        self.eye = eye;
        self.target = target;
        self
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the eye through a point in normalized device coordinates
    /// (x right, y up, both `[-1, 1]`).
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inv = self.view_projection().inverse();
        let far = inv * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let far = far.truncate() / far.w;
        Ray::new(self.eye, far - self.eye)
    }
}

/// Orbit rig around a target: left drag rotates, right drag pans, the wheel
/// zooms between `min_distance` and `max_distance`. No damping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Angle around +Y, 0 looking down -Z.
    pub azimuth: f32,
    /// Angle from +Y, `PI / 2` on the horizon.
    pub polar: f32,
    /// Pan speed factor.
    pub move_scale: f32,
    /// Radians per pixel of drag.
    pub rotate_speed: f32,
}

const POLAR_EPS: f32 = 1e-3;

impl OrbitCamera {
    /// Camera on +Z at `distance`, looking at the origin.
    pub fn new(distance: f32, min_distance: f32, max_distance: f32, move_scale: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            distance: distance.clamp(min_distance, max_distance),
            min_distance,
            max_distance,
            azimuth: 0.0,
            polar: PI / 2.0,
            move_scale,
            rotate_speed: 0.005,
        }
    }

    /// Rig reproducing a camera placed at `eye` looking at `target`.
    /// Zoom limits default to a tenth and ten times the starting distance.
    pub fn from_eye(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(1e-4);
        let mut cam = Self::new(distance, distance * 0.1, distance * 10.0, 1.0);
        cam.target = target;
        cam.polar = (offset.y / distance).clamp(-1.0, 1.0).acos();
        cam.azimuth = offset.x.atan2(offset.z);
        cam
    }

    pub fn eye(&self) -> Vec3 {
        let (sp, cp) = self.polar.sin_cos();
        let (sa, ca) = self.azimuth.sin_cos();
        self.target + Vec3::new(sp * sa, cp, sp * ca) * self.distance
    }

    /// Drag by `(dx, dy)` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.azimuth -= dx * self.rotate_speed;
        self.polar = (self.polar - dy * self.rotate_speed).clamp(POLAR_EPS, PI - POLAR_EPS);
    }

    /// Positive `delta` moves away from the target.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance + delta).clamp(self.min_distance, self.max_distance);
    }

    /// Slide the target in the view plane by `(dx, dy)` pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let scale = self.move_scale * self.distance * 0.001;
        self.target += (-right * dx + up * dy) * scale;
    }

    /// Point `camera` along the rig.
    pub fn apply(&self, camera: &mut PerspectiveCamera) {
        camera.eye = self.eye();
        camera.target = self.target;
        camera.up = Vec3::Y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_ray_goes_forward() {
        let cam = PerspectiveCamera::new(45.0, 1.0, 0.1, 100.0).looking(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);
        let ray = cam.ray_from_ndc(Vec2::ZERO);
        assert_eq!(ray.origin, cam.eye);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn corner_ray_leans_toward_corner() {
        let cam = PerspectiveCamera::new(60.0, 1.0, 0.1, 100.0).looking(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);
        let ray = cam.ray_from_ndc(Vec2::new(1.0, 1.0));
        assert!(ray.direction.x > 0.0 && ray.direction.y > 0.0);
        // Half the vertical fov off-axis.
        let angle = ray.direction.y.atan2(-ray.direction.z);
        assert!((angle - 30f32.to_radians()).abs() < 1e-3);
    }

    #[test]
    fn projection_is_finite() {
        let vp = PerspectiveCamera::default().view_projection();
        assert!(vp.is_finite());
    }

    #[test]
    fn orbit_starts_on_positive_z() {
        let orbit = OrbitCamera::new(5.0, 1.0, 10.0, 2.0);
        assert!((orbit.eye() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn orbit_zoom_is_clamped() {
        let mut orbit = OrbitCamera::new(5.0, 1.0, 10.0, 2.0);
        orbit.zoom(100.0);
        assert_eq!(orbit.distance, 10.0);
        orbit.zoom(-100.0);
        assert_eq!(orbit.distance, 1.0);
    }

    #[test]
    fn orbit_rotation_keeps_distance() {
        let mut orbit = OrbitCamera::new(5.0, 1.0, 10.0, 2.0);
        orbit.rotate(120.0, -4000.0);
        assert!((orbit.eye().length() - 5.0).abs() < 1e-4);
        assert!(orbit.polar >= POLAR_EPS);
    }

    #[test]
    fn from_eye_round_trips_position() {
        let eye = Vec3::new(18.0, 18.0, 24.0);
        let orbit = OrbitCamera::from_eye(eye, Vec3::ZERO);
        assert!((orbit.eye() - eye).length() < 1e-3);
    }

    #[test]
    fn pan_moves_target_sideways() {
        let mut orbit = OrbitCamera::new(5.0, 1.0, 10.0, 2.0);
        orbit.pan(100.0, 0.0);
        assert!(orbit.target.x < 0.0);
        assert!(orbit.target.z.abs() < 1e-6);
        let mut cam = PerspectiveCamera::default();
        orbit.apply(&mut cam);
        assert_eq!(cam.target, orbit.target);
    }
}
