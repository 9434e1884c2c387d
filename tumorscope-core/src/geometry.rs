//! Conversion of reconstruction payloads into GPU-ready geometry
//!
//! Two strategies share the [`GeometryBuilder`] trait: surface meshes become
//! interleaved position/normal vertices plus a `u32` index list, volumes
//! become a tightly packed byte grid for a 3D texture. Both reject bad input
//! with [`Error::MalformedPayload`] before anything reaches the GPU.

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::mesh::TriangleMesh;
use crate::payload::{Dimensions, Payload, SurfaceMeshInput, VolumetricInput};
use crate::point::{Point3f, SurfaceVertex};
use crate::traits::Drawable;

/// Builds renderable data from one kind of payload
pub trait GeometryBuilder {
    type Input;

    /// Consume the input and produce geometry, or explain why it is unusable
    fn build(&self, input: Self::Input) -> Result<BuiltGeometry>;
}

/// Interleaved surface vertices and triangle indices
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceGeometry {
    pub vertices: Vec<SurfaceVertex>,
    pub indices: Vec<u32>,
}

impl SurfaceGeometry {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn positions(&self) -> impl Iterator<Item = Point3f> + '_ {
        self.vertices.iter().map(SurfaceVertex::position)
    }
}

/// Voxel grid laid out x-fastest, then y, then z
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGeometry {
    pub dimensions: Dimensions,
    pub voxels: Vec<u8>,
}

impl VolumeGeometry {
    pub fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// Byte offset of voxel `(x, y, z)`; not bounds checked, see [`Self::intensity`]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let Dimensions { width, height, .. } = self.dimensions;
        (z as usize * height as usize + y as usize) * width as usize + x as usize
    }

    /// Normalized `[0, 1]` intensity at integer grid coordinates
    ///
    /// # Panics
    ///
    /// Panics if `(x, y, z)` lies outside [`Self::dimensions`].
    pub fn intensity(&self, x: u32, y: u32, z: u32) -> f32 {
        self.voxels[self.index(x, y, z)] as f32 / 255.0
    }
}

/// Output of a [`GeometryBuilder`]
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltGeometry {
    Surface(SurfaceGeometry),
    Volume(VolumeGeometry),
}

impl BuiltGeometry {
    pub fn kind(&self) -> &'static str {
        match self {
            BuiltGeometry::Surface(_) => "surface",
            BuiltGeometry::Volume(_) => "volume",
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            BuiltGeometry::Surface(surface) => surface.vertex_count(),
            BuiltGeometry::Volume(_) => 0,
        }
    }

    pub fn face_count(&self) -> usize {
        match self {
            BuiltGeometry::Surface(surface) => surface.face_count(),
            BuiltGeometry::Volume(_) => 0,
        }
    }
}

impl Drawable for SurfaceGeometry {
    fn bounding_box(&self) -> Option<Aabb> {
        let mut positions = self.positions();
        let first = positions.next()?;
        let mut aabb = Aabb::new(first, first);
        for p in positions {
            aabb.expand(&p);
        }
        Some(aabb)
    }
}

impl Drawable for VolumeGeometry {
    /// Volumes are always drawn on the unit cube, whatever their grid size
    fn bounding_box(&self) -> Option<Aabb> {
        Some(Aabb::unit_cube())
    }
}

impl Drawable for BuiltGeometry {
    fn bounding_box(&self) -> Option<Aabb> {
        match self {
            BuiltGeometry::Surface(surface) => surface.bounding_box(),
            BuiltGeometry::Volume(volume) => volume.bounding_box(),
        }
    }
}

/// Builds position/normal/index buffers from a surface mesh
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceMeshBuilder;

impl GeometryBuilder for SurfaceMeshBuilder {
    type Input = SurfaceMeshInput;

    fn build(&self, input: SurfaceMeshInput) -> Result<BuiltGeometry> {
        let mut mesh = TriangleMesh::from_vertices_and_faces(input.vertices, input.faces);
        if let Some(normals) = input.normals {
            mesh.set_normals(normals);
        }
        mesh.validate()?;

        let normals = mesh.vertex_normals();
        let vertices: Vec<SurfaceVertex> = mesh
            .vertices
            .iter()
            .zip(normals.iter())
            .map(|(position, normal)| SurfaceVertex::new(*position, *normal))
            .collect();
        let indices: Vec<u32> = mesh.faces.iter().flatten().copied().collect();

        log::debug!(
            "built surface geometry: {} vertices, {} faces",
            vertices.len(),
            mesh.face_count()
        );

        Ok(BuiltGeometry::Surface(SurfaceGeometry { vertices, indices }))
    }
}

/// Decodes and validates a volumetric field for a 3D texture
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeTextureBuilder;

impl GeometryBuilder for VolumeTextureBuilder {
    type Input = VolumetricInput;

    fn build(&self, input: VolumetricInput) -> Result<BuiltGeometry> {
        let dimensions = input.dimensions;
        if dimensions.is_empty() {
            return Err(Error::MalformedPayload(format!(
                "volume dimensions {}x{}x{} contain a zero",
                dimensions.width, dimensions.height, dimensions.depth
            )));
        }

        let expected = dimensions.voxel_count().ok_or_else(|| {
            Error::MalformedPayload(format!(
                "volume dimensions {}x{}x{} overflow",
                dimensions.width, dimensions.height, dimensions.depth
            ))
        })?;

        let voxels = input.data.decode()?;
        if voxels.len() != expected {
            return Err(Error::MalformedPayload(format!(
                "volume data has {} bytes, expected {} for {}x{}x{}",
                voxels.len(),
                expected,
                dimensions.width,
                dimensions.height,
                dimensions.depth
            )));
        }

        log::debug!(
            "built volume geometry: {}x{}x{} voxels",
            dimensions.width,
            dimensions.height,
            dimensions.depth
        );

        Ok(BuiltGeometry::Volume(VolumeGeometry { dimensions, voxels }))
    }
}

/// Dispatch a payload to the matching builder
pub fn build_payload(payload: Payload) -> Result<BuiltGeometry> {
    match payload {
        Payload::Surface(input) => SurfaceMeshBuilder.build(input),
        Payload::Volume(input) => VolumeTextureBuilder.build(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::EncodedBytes;
    use crate::point::Vector3f;
    use approx::assert_relative_eq;

    fn triangle() -> SurfaceMeshInput {
        SurfaceMeshInput::new(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_surface_counts() {
        let built = SurfaceMeshBuilder.build(triangle()).unwrap();
        assert_eq!(built.vertex_count(), 3);
        assert_eq!(built.face_count(), 1);

        let BuiltGeometry::Surface(surface) = built else {
            panic!("expected surface geometry");
        };
        assert_eq!(surface.indices, vec![0, 1, 2]);
        assert_relative_eq!(surface.vertices[0].normal(), Vector3f::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_surface_keeps_supplied_normals() {
        let input = triangle().with_normals(vec![Vector3f::x(); 3]);
        let BuiltGeometry::Surface(surface) = SurfaceMeshBuilder.build(input).unwrap() else {
            panic!("expected surface geometry");
        };
        assert_eq!(surface.vertices[2].normal, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_surface_rejects_out_of_range_face() {
        let mut input = triangle();
        input.faces.push([0, 1, 3]);
        assert!(matches!(
            SurfaceMeshBuilder.build(input),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_surface_rejects_empty_vertices() {
        let input = SurfaceMeshInput::new(Vec::new(), Vec::new());
        assert!(matches!(
            SurfaceMeshBuilder.build(input),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_volume_length_mismatch() {
        let input = VolumetricInput::from_bytes(vec![0; 7], Dimensions::new(2, 2, 2));
        assert!(matches!(
            VolumeTextureBuilder.build(input),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_volume_zero_dimension() {
        let input = VolumetricInput::from_bytes(Vec::new(), Dimensions::new(0, 2, 2));
        assert!(matches!(
            VolumeTextureBuilder.build(input),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_volume_decodes_base64() {
        let input = VolumetricInput::new(
            EncodedBytes::Base64("AAECAwQFBgc=".to_string()),
            Dimensions::new(2, 2, 2),
        );
        let BuiltGeometry::Volume(volume) = VolumeTextureBuilder.build(input).unwrap() else {
            panic!("expected volume geometry");
        };
        assert_eq!(volume.voxel_count(), 8);
        assert_eq!(volume.index(1, 1, 1), 7);
        assert_relative_eq!(volume.intensity(1, 0, 0), 1.0 / 255.0);
    }

    #[test]
    fn test_volume_bounds_are_unit_cube() {
        let volume = VolumeGeometry {
            dimensions: Dimensions::new(1, 1, 1),
            voxels: vec![255],
        };
        assert_eq!(volume.bounding_box(), Some(Aabb::unit_cube()));
    }

    #[test]
    #[should_panic]
    fn test_intensity_outside_grid_panics() {
        let volume = VolumeGeometry {
            dimensions: Dimensions::new(2, 1, 1),
            voxels: vec![0, 255],
        };
        volume.intensity(0, 1, 0);
    }
}
