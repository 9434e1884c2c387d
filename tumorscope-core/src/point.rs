//! Point and vertex types

use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Normal assigned to vertices whose accumulated face normal has zero length
pub const FALLBACK_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// GPU-ready vertex of a surface mesh
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl SurfaceVertex {
    pub fn new(position: Point3f, normal: Vector3f) -> Self {
        Self {
            position: [position.x, position.y, position.z],
            normal: [normal.x, normal.y, normal.z],
        }
    }

    pub fn position(&self) -> Point3f {
        Point3f::new(self.position[0], self.position[1], self.position[2])
    }

    pub fn normal(&self) -> Vector3f {
        Vector3f::new(self.normal[0], self.normal[1], self.normal[2])
    }
}

impl Default for SurfaceVertex {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            normal: FALLBACK_NORMAL,
        }
    }
}
