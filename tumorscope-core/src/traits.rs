//! Core traits for tumorscope

use crate::bounds::{Aabb, BoundingSphere};
use crate::mesh::TriangleMesh;

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object, `None` when it has no extent
    fn bounding_box(&self) -> Option<Aabb>;

    /// Sphere around the bounding box; empty geometry gives a zero-radius sphere
    fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_box()
            .map(|aabb| aabb.bounding_sphere())
            .unwrap_or_default()
    }
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }
}
