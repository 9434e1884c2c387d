//! Framing of attached geometry for a fixed camera

use crate::camera::{Camera, DEFAULT_DISTANCE, DEFAULT_FAR, DEFAULT_NEAR};
use nalgebra::{Point3, Vector3};
use tumorscope_core::BoundingSphere;

/// Where the geometry moves and where the camera sits for one attached object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFit {
    /// Model translation that moves the sphere center to the origin
    pub translation: Vector3<f32>,
    /// Camera distance along +Z
    pub distance: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraFit {
    /// Place `camera` on the +Z axis looking at the origin
    pub fn apply(&self, camera: &mut Camera) {
        camera.position = Point3::new(0.0, 0.0, self.distance);
        camera.target = Point3::origin();
        camera.up = Vector3::y();
        camera.near = self.near;
        camera.far = self.far;
    }
}

/// Sizes the camera distance from a bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFitter {
    pub distance_factor: f32,
    pub min_distance: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraFitter {
    pub fn new(distance_factor: f32, min_distance: f32) -> Self {
        Self {
            distance_factor,
            min_distance,
            ..Default::default()
        }
    }

    /// `distance = radius * distance_factor`, translation `-center`.
    ///
    /// A zero, negative or non-finite radius (or center) leaves the geometry
    /// where it is and uses `min_distance`.
    pub fn fit(&self, sphere: &BoundingSphere) -> CameraFit {
        let factor = if self.distance_factor.is_finite() && self.distance_factor > 0.0 {
            self.distance_factor
        } else {
            3.0
        };

        if sphere.is_degenerate() {
            let distance = self.fallback_distance();
            return CameraFit {
                translation: Vector3::zeros(),
                distance,
                near: self.near,
                far: self.far.max(distance * 2.0),
            };
        }

        let radius = sphere.radius;
        let distance = radius * factor;
        if !distance.is_finite() || distance <= 0.0 {
            let distance = self.fallback_distance();
            return CameraFit {
                translation: Vector3::zeros(),
                distance,
                near: self.near,
                far: self.far.max(distance * 2.0),
            };
        }

        // closest point of the sphere is `distance - radius` away
        let clearance = (distance - radius).max(0.0);
        let near = if clearance > 0.0 {
            self.near.min(clearance * 0.5)
        } else {
            self.near.min(radius * 1e-3)
        }
        .max(1e-4);

        CameraFit {
            translation: -sphere.center.coords,
            distance,
            near,
            far: self.far.max(distance + 2.0 * radius),
        }
    }

    fn fallback_distance(&self) -> f32 {
        if self.min_distance.is_finite() && self.min_distance > 0.0 {
            self.min_distance
        } else {
            DEFAULT_DISTANCE
        }
    }
}

impl Default for CameraFitter {
    fn default() -> Self {
        Self {
            distance_factor: 3.0,
            min_distance: DEFAULT_DISTANCE,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}
