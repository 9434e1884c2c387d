//! Reconstruction payloads as received from the analysis service
//!
//! The service sends loosely shaped JSON: mesh coordinates may be nested
//! triples or a flat number list, faces may arrive as `faces` or `indices`,
//! and volume data is a base64 string. Everything is validated once here and
//! turned into a [`Payload`] so nothing downstream has to guess at shapes.

use crate::error::{Error, Result};
use crate::metrics::{ClassificationLabel, Metrics};
use crate::point::{Point3f, Vector3f};
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

/// A triangulated surface reconstruction
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMeshInput {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[u32; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl SurfaceMeshInput {
    pub fn new(vertices: Vec<Point3f>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vector3f>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Grid size of a volumetric field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// `width * height * depth`, `None` on overflow
    pub fn voxel_count(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.depth as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }
}

/// Volume bytes as sent over the wire
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EncodedBytes {
    /// Standard base64 text
    Base64(String),
    /// Plain JSON array of bytes
    Raw(Vec<u8>),
}

impl EncodedBytes {
    pub fn decode(&self) -> Result<Vec<u8>> {
        match self {
            EncodedBytes::Base64(text) => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| Error::malformed(format!("volume data is not valid base64: {}", e))),
            EncodedBytes::Raw(bytes) => Ok(bytes.clone()),
        }
    }
}

/// A raw scalar field sampled on a regular grid
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VolumetricInput {
    pub data: EncodedBytes,
    pub dimensions: Dimensions,
}

impl VolumetricInput {
    pub fn new(data: EncodedBytes, dimensions: Dimensions) -> Self {
        Self { data, dimensions }
    }

    /// Convenience for already-decoded voxels
    pub fn from_bytes(bytes: Vec<u8>, dimensions: Dimensions) -> Self {
        Self::new(EncodedBytes::Raw(bytes), dimensions)
    }
}

/// Geometry payload: exactly one of the two reconstruction kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Surface(SurfaceMeshInput),
    Volume(VolumetricInput),
}

impl Payload {
    /// Validate an untyped JSON payload into a typed one
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::malformed("payload is not a JSON object"))?;

        if object.contains_key("data") && object.contains_key("dimensions") {
            let volume: VolumetricInput = serde_json::from_value(value.clone())
                .map_err(|e| Error::malformed(format!("invalid volume payload: {}", e)))?;
            Ok(Payload::Volume(volume))
        } else if object.contains_key("vertices") {
            let raw: RawSurfaceMesh = serde_json::from_value(value.clone())
                .map_err(|e| Error::malformed(format!("invalid mesh payload: {}", e)))?;
            Ok(Payload::Surface(raw.into_input()?))
        } else {
            Err(Error::malformed(
                "payload has neither `vertices` nor `data` + `dimensions`",
            ))
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Surface(_) => "surface",
            Payload::Volume(_) => "volume",
        }
    }
}

impl From<SurfaceMeshInput> for Payload {
    fn from(input: SurfaceMeshInput) -> Self {
        Payload::Surface(input)
    }
}

impl From<VolumetricInput> for Payload {
    fn from(input: VolumetricInput) -> Self {
        Payload::Volume(input)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coords {
    Nested(Vec<[f32; 3]>),
    Flat(Vec<f32>),
}

impl Coords {
    fn into_triples(self, what: &str) -> Result<Vec<[f32; 3]>> {
        match self {
            Coords::Nested(triples) => Ok(triples),
            Coords::Flat(flat) => {
                if flat.len() % 3 != 0 {
                    return Err(Error::malformed(format!(
                        "flat {} length {} is not a multiple of 3",
                        what,
                        flat.len()
                    )));
                }
                Ok(flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Indices {
    Nested(Vec<[i64; 3]>),
    Flat(Vec<i64>),
}

impl Indices {
    fn into_faces(self) -> Result<Vec<[u32; 3]>> {
        let triples = match self {
            Indices::Nested(triples) => triples,
            Indices::Flat(flat) => {
                if flat.len() % 3 != 0 {
                    return Err(Error::malformed(format!(
                        "flat face index length {} is not a multiple of 3",
                        flat.len()
                    )));
                }
                flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
            }
        };

        triples
            .into_iter()
            .map(|[a, b, c]| Ok([to_index(a)?, to_index(b)?, to_index(c)?]))
            .collect()
    }
}

fn to_index(raw: i64) -> Result<u32> {
    u32::try_from(raw).map_err(|_| Error::malformed(format!("face index {} out of range", raw)))
}

#[derive(Debug, Deserialize)]
struct RawSurfaceMesh {
    vertices: Coords,
    #[serde(default, alias = "indices")]
    faces: Option<Indices>,
    #[serde(default)]
    normals: Option<Coords>,
}

impl RawSurfaceMesh {
    fn into_input(self) -> Result<SurfaceMeshInput> {
        let vertices: Vec<Point3f> = self
            .vertices
            .into_triples("vertex")?
            .into_iter()
            .map(Point3f::from)
            .collect();

        let faces = match self.faces {
            Some(indices) => indices.into_faces()?,
            None => Vec::new(),
        };

        let normals = match self.normals {
            Some(coords) => {
                let normals: Vec<Vector3f> = coords
                    .into_triples("normal")?
                    .into_iter()
                    .map(Vector3f::from)
                    .collect();
                if normals.len() == vertices.len() {
                    Some(normals)
                } else {
                    log::warn!(
                        "ignoring {} normals for {} vertices, normals will be recomputed",
                        normals.len(),
                        vertices.len()
                    );
                    None
                }
            }
            None => None,
        };

        Ok(SurfaceMeshInput {
            vertices,
            faces,
            normals,
        })
    }
}

/// A complete analysis/reconstruction response
///
/// Geometry that fails validation does not fail the response: it is left out
/// of `payload` and the reason is kept in `payload_error`, so the metrics and
/// label can still be shown.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub payload: Option<Payload>,
    pub payload_error: Option<String>,
    pub metrics: Metrics,
    pub label: ClassificationLabel,
}

#[derive(Debug, Deserialize)]
struct RawReconstruction {
    #[serde(default, alias = "mesh_data")]
    mesh: Option<Value>,
    #[serde(default)]
    volume: Option<Value>,
    #[serde(default)]
    metrics: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default, alias = "tumorType")]
    tumor_type: Option<String>,
    #[serde(default)]
    metrics: Option<Value>,
    #[serde(default, alias = "mesh_data")]
    mesh: Option<Value>,
    #[serde(default)]
    volume: Option<Value>,
    #[serde(default)]
    reconstruction: Option<RawReconstruction>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

impl AnalysisResult {
    /// Parse a service response.
    ///
    /// Top-level metrics win over the reconstruction's own metrics, and a
    /// top-level mesh or volume wins over the reconstruction's geometry.
    pub fn from_json(value: &Value) -> Result<Self> {
        let raw: RawAnalysis = serde_json::from_value(value.clone())?;

        if let Some(message) = raw.error {
            return Err(Error::malformed(format!("service reported an error: {}", message)));
        }
        if raw.success == Some(false) {
            return Err(Error::malformed("service reported failure"));
        }

        let (rec_mesh, rec_volume, rec_metrics) = match raw.reconstruction {
            Some(rec) => (rec.mesh, rec.volume, rec.metrics),
            None => (None, None, None),
        };

        let geometry = raw
            .mesh
            .or(raw.volume)
            .or(rec_mesh)
            .or(rec_volume)
            .filter(|v| !v.is_null());
        let (payload, payload_error) = match geometry.as_ref().map(Payload::from_json) {
            Some(Ok(payload)) => (Some(payload), None),
            Some(Err(e)) => {
                log::warn!("rejected geometry in response: {}", e);
                (None, Some(e.to_string()))
            }
            None => (None, None),
        };

        let metrics = raw
            .metrics
            .filter(|v| !v.is_null())
            .or(rec_metrics.filter(|v| !v.is_null()))
            .map(parse_metrics)
            .unwrap_or_default();

        Ok(Self {
            payload,
            payload_error,
            metrics,
            label: ClassificationLabel::from_option(raw.tumor_type),
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }
}

/// Metrics of the wrong shape read as no metrics at all
fn parse_metrics(value: Value) -> Metrics {
    serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("ignoring malformed metrics: {}", e);
        Metrics::default()
    })
}
