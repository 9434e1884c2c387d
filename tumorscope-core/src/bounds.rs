//! Axis-aligned bounding boxes and the bounding spheres derived from them

use crate::point::{Point3f, Vector3f};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box defined by min and max corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Point3f, max: Point3f) -> Self {
        Self { min, max }
    }

    /// The cube `[-0.5, 0.5]^3` a volume is drawn on
    pub fn unit_cube() -> Self {
        Self::new(Point3f::new(-0.5, -0.5, -0.5), Point3f::new(0.5, 0.5, 0.5))
    }

    /// Smallest box containing every point, `None` for an empty iterator
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut aabb = Self::new(first, first);
        for point in iter {
            aabb.expand(point);
        }
        Some(aabb)
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: &Point3f) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Get center point
    pub fn center(&self) -> Point3f {
        nalgebra::center(&self.min, &self.max)
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vector3f {
        self.max - self.min
    }

    /// Length of the box diagonal
    pub fn diagonal(&self) -> f32 {
        self.size().norm()
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.center(), self.diagonal() * 0.5)
    }
}

/// Sphere enclosing a geometry, derived from its bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Point3f,
    pub radius: f32,
}

impl BoundingSphere {
    /// Non-finite or negative radii collapse to zero.
    pub fn new(center: Point3f, radius: f32) -> Self {
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        Self { center, radius }
    }

    /// Sphere of radius zero at the origin, used for empty geometry
    pub fn empty() -> Self {
        Self::new(Point3f::origin(), 0.0)
    }

    /// True when the sphere cannot be used to size a camera
    pub fn is_degenerate(&self) -> bool {
        self.radius <= 0.0 || !self.center.coords.iter().all(|c| c.is_finite())
    }
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_points_and_center() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        let aabb = Aabb::from_points(&points).unwrap();
        assert_eq!(aabb.min, Point3f::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Point3f::new(1.0, 1.0, 0.0));
        assert_eq!(aabb.center(), Point3f::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_empty_points() {
        let points: Vec<Point3f> = Vec::new();
        assert!(Aabb::from_points(&points).is_none());
    }

    #[test]
    fn test_unit_cube_sphere() {
        let sphere = Aabb::unit_cube().bounding_sphere();
        assert_eq!(sphere.center, Point3f::origin());
        assert_relative_eq!(sphere.radius, 3.0_f32.sqrt() * 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_sphere() {
        assert!(BoundingSphere::empty().is_degenerate());
        assert!(BoundingSphere::new(Point3f::origin(), f32::NAN).is_degenerate());
        assert!(!BoundingSphere::new(Point3f::origin(), 1.0).is_degenerate());
    }
}
