//! # Tumorscope GPU
//!
//! wgpu rendering for reconstructed tumor geometry.
//!
//! Surface meshes are drawn double-sided with Blinn-Phong shading. Volumes
//! are drawn as a unit cube that samples a 3D texture once per fragment and
//! discards everything under an intensity threshold. [`WgpuBackend`] owns the
//! window surface and hands out [`GpuResources`] that are destroyed
//! explicitly when a scene is replaced.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tumorscope_core::{build_payload, Payload};
//! use tumorscope_gpu::{RenderConfig, SceneFrame, WgpuBackend};
//!
//! async fn example(window: Arc<winit::window::Window>, json: &str) -> tumorscope_core::Result<()> {
//!     let size = window.inner_size();
//!     let mut backend = WgpuBackend::new(window, size, RenderConfig::default()).await?;
//!
//!     let geometry = build_payload(Payload::from_json_str(json)?)?;
//!     let resources = backend.upload(&geometry)?;
//!     backend.draw(Some(&resources), &SceneFrame::default())?;
//!     backend.release(resources);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod device;
pub mod mesh;
pub mod renderer;
pub mod uniforms;
pub mod volume;

// Re-export commonly used items
pub use backend::{GpuResources, WgpuBackend};
pub use device::GpuContext;
pub use mesh::{GpuSurfaceMesh, SurfaceMaterial, SurfacePipeline, SurfaceRenderConfig};
pub use renderer::{RenderConfig, RenderTargets};
pub use uniforms::{CameraUniform, LightingUniform, SceneFrame, VertexLayout};
pub use volume::{
    GpuVolume, VolumeParams, VolumePipeline, VolumeSampler, VolumeVertex, VOLUME_SHADER_SOURCE,
    VOLUME_SHADER_VERSION,
};
