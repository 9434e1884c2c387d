//! Triangle mesh and per-vertex normal computation

use crate::error::{Error, Result};
use crate::point::*;

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[u32; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Fail on the first face that references a vertex that does not exist
    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() {
            return Err(Error::MalformedPayload("mesh has no vertices".to_string()));
        }

        let count = self.vertices.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if let Some(bad) = face.iter().find(|&&i| i as usize >= count) {
                return Err(Error::MalformedPayload(format!(
                    "face {} references vertex {} but mesh has {} vertices",
                    face_index, bad, count
                )));
            }
        }
        Ok(())
    }

    /// Unnormalized face normal `(v1 - v0) x (v2 - v0)`; its length is twice the face area.
    ///
    /// Indices must have been validated.
    pub(crate) fn face_normal(&self, face: &[u32; 3]) -> Vector3f {
        let v0 = self.vertices[face[0] as usize];
        let v1 = self.vertices[face[1] as usize];
        let v2 = self.vertices[face[2] as usize];

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2)
    }

    /// Area-weighted vertex normals.
    ///
    /// Each face's cross product is added to its three vertices and the sums
    /// are normalized. Vertices that end up with a zero sum (unreferenced, or
    /// only touched by degenerate faces) get [`FALLBACK_NORMAL`].
    pub(crate) fn compute_vertex_normals(&self) -> Vec<Vector3f> {
        let mut accumulated = vec![Vector3f::zeros(); self.vertices.len()];

        for face in &self.faces {
            let normal = self.face_normal(face);
            for &index in face {
                accumulated[index as usize] += normal;
            }
        }

        accumulated
            .into_iter()
            .map(|sum| {
                let length = sum.norm();
                if length > f32::EPSILON && length.is_finite() {
                    sum / length
                } else {
                    Vector3f::from(FALLBACK_NORMAL)
                }
            })
            .collect()
    }

    /// Supplied normals if present, otherwise computed ones
    pub fn vertex_normals(&self) -> Vec<Vector3f> {
        match &self.normals {
            Some(normals) if normals.len() == self.vertices.len() => normals.clone(),
            _ => self.compute_vertex_normals(),
        }
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
