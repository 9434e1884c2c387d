//! Core data structures for tumorscope
//!
//! This crate holds everything the viewer needs that does not touch the GPU:
//! the reconstruction payload model, the geometry builders that turn payloads
//! into vertex and voxel buffers, bounding volumes, and the metrics overlay
//! formatting.

pub mod bounds;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod metrics;
pub mod payload;
pub mod point;
pub mod traits;

pub use bounds::*;
pub use error::*;
pub use geometry::*;
pub use mesh::*;
pub use metrics::*;
pub use payload::*;
pub use point::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector3};
