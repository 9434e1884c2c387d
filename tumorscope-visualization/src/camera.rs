//! Perspective camera and damped orbit controls

use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use std::f32::consts::PI;

pub const DEFAULT_FOV_DEGREES: f32 = 75.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 1000.0;
pub const DEFAULT_DISTANCE: f32 = 5.0;

/// A perspective camera looking at a target point
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            target,
            up,
            fov,
            aspect_ratio,
            near,
            far,
        }
    }

    /// Camera on the +Z axis at `distance`, looking at the origin
    pub fn on_axis(distance: f32, fov_degrees: f32, aspect_ratio: f32) -> Self {
        Self::new(
            Point3::new(0.0, 0.0, distance),
            Point3::origin(),
            Vector3::y(),
            fov_degrees.to_radians(),
            aspect_ratio,
            DEFAULT_NEAR,
            DEFAULT_FAR,
        )
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let aspect = if self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0 {
            self.aspect_ratio
        } else {
            1.0
        };
        Perspective3::new(aspect, self.fov, self.near, self.far).into_inner()
    }

    /// Update the aspect ratio from a viewport size; zero sizes are ignored
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::on_axis(DEFAULT_DISTANCE, DEFAULT_FOV_DEGREES, 1.0)
    }
}

/// Orbit/zoom controls whose motion eases out over several frames.
///
/// Input accumulates into pending angles; every [`update`](Self::update)
/// applies `damping` of what is pending and keeps the rest for later frames.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pending_azimuth: f32,
    pending_polar: f32,
    pending_scale: f32,
}

/// Keeps the camera off the poles where `up` and the view direction align
const POLAR_EPSILON: f32 = 1e-4;

impl OrbitControls {
    pub fn new(damping: f32) -> Self {
        Self {
            damping: damping.clamp(0.0, 1.0),
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_scale: 1.0,
        }
    }

    /// Queue a rotation from a mouse drag of `dx`, `dy` pixels in a viewport `height` pixels tall
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        let height = height.max(1.0);
        self.pending_azimuth -= 2.0 * PI * dx / height * self.rotate_speed;
        self.pending_polar -= 2.0 * PI * dy / height * self.rotate_speed;
    }

    /// Queue a zoom; positive `steps` move the camera closer
    pub fn zoom(&mut self, steps: f32) {
        self.pending_scale *= 0.95_f32.powf(steps * self.zoom_speed);
    }

    /// True while queued motion is still being played out
    pub fn is_moving(&self) -> bool {
        self.pending_azimuth.abs() > 1e-6
            || self.pending_polar.abs() > 1e-6
            || (self.pending_scale - 1.0).abs() > 1e-6
    }

    /// Advance one frame, moving `camera` around its target
    pub fn update(&mut self, camera: &mut Camera) {
        let offset = camera.position - camera.target;
        let radius = offset.norm();
        if radius <= f32::EPSILON || !radius.is_finite() {
            self.reset();
            return;
        }

        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let step = if self.damping > 0.0 { self.damping } else { 1.0 };
        azimuth += self.pending_azimuth * step;
        polar = (polar + self.pending_polar * step).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        let radius = (radius * self.pending_scale).clamp(self.min_distance, self.max_distance);

        camera.position = camera.target
            + Vector3::new(
                radius * polar.sin() * azimuth.sin(),
                radius * polar.cos(),
                radius * polar.sin() * azimuth.cos(),
            );

        if self.damping > 0.0 {
            self.pending_azimuth *= 1.0 - self.damping;
            self.pending_polar *= 1.0 - self.damping;
        } else {
            self.pending_azimuth = 0.0;
            self.pending_polar = 0.0;
        }
        self.pending_scale = 1.0;
    }

    /// Drop any queued motion
    pub fn reset(&mut self) {
        self.pending_azimuth = 0.0;
        self.pending_polar = 0.0;
        self.pending_scale = 1.0;
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_camera() {
        let camera = Camera::default();
        assert_eq!(camera.position, Point3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(camera.fov, 75.0_f32.to_radians());
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.0);
    }

    #[test]
    fn test_viewport_ignores_zero() {
        let mut camera = Camera::default();
        camera.set_viewport(800, 400);
        assert_eq!(camera.aspect_ratio, 2.0);
        camera.set_viewport(0, 400);
        assert_eq!(camera.aspect_ratio, 2.0);
    }

    #[test]
    fn test_idle_update_keeps_position() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::default();
        controls.update(&mut camera);
        assert_relative_eq!(camera.position, Point3::new(0.0, 0.0, 5.0), epsilon = 1e-5);
    }

    #[test]
    fn test_damped_rotation_eases_out() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(0.05);
        controls.rotate(-100.0, 0.0, 600.0);

        controls.update(&mut camera);
        let first = camera.position;
        assert!(first.x > 0.0);
        assert!(controls.is_moving());

        // the distance to the target is preserved while orbiting
        assert_relative_eq!(camera.distance(), 5.0, epsilon = 1e-4);

        let mut previous = first;
        let mut previous_step = f32::INFINITY;
        for _ in 0..10 {
            controls.update(&mut camera);
            let step = (camera.position - previous).norm();
            assert!(step < previous_step);
            previous_step = step;
            previous = camera.position;
        }
    }

    #[test]
    fn test_zoom_moves_closer() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::default();
        controls.zoom(2.0);
        controls.update(&mut camera);
        assert_relative_eq!(camera.distance(), 5.0 * 0.95 * 0.95, epsilon = 1e-4);
        assert!(!controls.is_moving());
    }

    #[test]
    fn test_polar_is_clamped() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(0.0);
        controls.rotate(0.0, -100_000.0, 600.0);
        controls.update(&mut camera);
        assert!(camera.position.y < 5.0);
        assert!(camera.position.y.is_finite());
    }
}
