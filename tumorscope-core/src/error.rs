//! Error types for tumorscope

use thiserror::Error;

/// Main error type for tumorscope operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload shape or content the geometry builders cannot use.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Rendering surface, device or allocation failure.
    #[error("GPU resource error: {0}")]
    GpuResource(String),

    #[error("Visualization error: {0}")]
    Visualization(String),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedPayload(msg.into())
    }

    /// True for errors the host should report as "3D view unavailable"
    pub fn is_gpu_unavailable(&self) -> bool {
        matches!(self, Error::GpuResource(_))
    }
}

/// Result type alias for tumorscope operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "gpu")]
impl From<wgpu::CreateSurfaceError> for Error {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        Error::GpuResource(format!("Failed to create surface: {}", e))
    }
}

#[cfg(feature = "gpu")]
impl From<wgpu::RequestDeviceError> for Error {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        Error::GpuResource(format!("Failed to create device: {}", e))
    }
}

#[cfg(feature = "gpu")]
impl From<wgpu::SurfaceError> for Error {
    fn from(e: wgpu::SurfaceError) -> Self {
        Error::GpuResource(format!("Failed to acquire surface texture: {:?}", e))
    }
}
