//! Uniform blocks and vertex layouts shared by the surface and volume pipelines

use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix4, Point3, Vector3};
use tumorscope_core::SurfaceVertex;

/// Per-frame camera state handed to the backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneFrame {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub model: Matrix4<f32>,
    pub eye: Point3<f32>,
}

impl Default for SceneFrame {
    fn default() -> Self {
        Self {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            model: Matrix4::identity(),
            eye: Point3::new(0.0, 0.0, 5.0),
        }
    }
}

/// Camera uniform, `@binding(0)` in both pipelines
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub view_pos: [f32; 4],
}

impl CameraUniform {
    pub fn from_frame(frame: &SceneFrame) -> Self {
        Self {
            view_proj: (frame.projection * frame.view).into(),
            model: frame.model.into(),
            view_pos: [frame.eye.x, frame.eye.y, frame.eye.z, 1.0],
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::from_frame(&SceneFrame::default())
    }
}

/// One ambient and one directional light
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LightingUniform {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    /// Direction towards the light
    pub light_direction: [f32; 3],
    pub light_intensity: f32,
    pub light_color: [f32; 3],
    pub _padding: f32,
}

impl LightingUniform {
    pub fn new(ambient_intensity: f32, light_position: Vector3<f32>, light_intensity: f32) -> Self {
        let direction = light_position
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z);
        Self {
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity,
            light_direction: direction.into(),
            light_intensity,
            light_color: [1.0, 1.0, 1.0],
            _padding: 0.0,
        }
    }
}

impl Default for LightingUniform {
    fn default() -> Self {
        Self::new(0.5, Vector3::new(0.0, 1.0, 1.0), 0.8)
    }
}

/// Vertex types that can describe their own buffer layout
pub trait VertexLayout: Pod {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a>;
}

impl VertexLayout for SurfaceVertex {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SurfaceVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 48);
        assert_eq!(std::mem::size_of::<SurfaceVertex>(), 24);
    }

    #[test]
    fn test_default_light_points_up_and_forward() {
        let lighting = LightingUniform::default();
        let half = 0.5_f32.sqrt();
        assert_relative_eq!(lighting.light_direction[0], 0.0);
        assert_relative_eq!(lighting.light_direction[1], half, epsilon = 1e-6);
        assert_relative_eq!(lighting.light_direction[2], half, epsilon = 1e-6);
        assert_eq!(lighting.ambient_intensity, 0.5);
        assert_eq!(lighting.light_intensity, 0.8);
    }

    #[test]
    fn test_camera_uniform_translation() {
        let frame = SceneFrame {
            model: Matrix4::new_translation(&Vector3::new(-0.5, -0.5, 0.0)),
            ..Default::default()
        };
        let uniform = CameraUniform::from_frame(&frame);
        // column-major: translation lives in the last column
        assert_eq!(uniform.model[3], [-0.5, -0.5, 0.0, 1.0]);
        assert_eq!(uniform.view_pos, [0.0, 0.0, 5.0, 1.0]);
    }
}
