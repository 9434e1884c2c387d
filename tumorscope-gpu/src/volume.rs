//! Threshold-based volume sampling
//!
//! A volume is drawn as the cube `[-0.5, 0.5]^3` carrying the voxel grid as a
//! 3D `R8Unorm` texture. Every fragment of the cube's front faces samples the
//! field once at `uvw = position + 0.5`: values under the threshold are
//! discarded, the rest are drawn as gray with a fixed opacity.
//!
//! [`VolumeSampler`] evaluates the same rule on the CPU. It backs the unit
//! tests and the visibility estimate logged when a volume is attached.

use crate::device::{uniform_entry, GpuContext};
use crate::uniforms::VertexLayout;
use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3};
use tumorscope_core::{Dimensions, VolumeGeometry};

/// Version of the sampling program in `shaders/volume.wgsl`
pub const VOLUME_SHADER_VERSION: u32 = 1;

/// WGSL source of the sampling program
pub const VOLUME_SHADER_SOURCE: &str = include_str!("shaders/volume.wgsl");

pub const DEFAULT_THRESHOLD: f32 = 0.3;
pub const DEFAULT_OPACITY: f32 = 0.8;

/// Sampling parameters, `@binding(1)` of the volume pipeline
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct VolumeParams {
    pub threshold: f32,
    pub opacity: f32,
    pub _padding: [f32; 2],
}

impl VolumeParams {
    pub fn new(threshold: f32, opacity: f32) -> Self {
        Self {
            threshold,
            opacity: opacity.clamp(0.0, 1.0),
            _padding: [0.0; 2],
        }
    }
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_OPACITY)
    }
}

/// Position-only vertex of the bounding cube
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct VolumeVertex {
    pub position: [f32; 3],
}

impl VertexLayout for VolumeVertex {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VolumeVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }
}

/// Corners of `[-0.5, 0.5]^3`; bit 0 of the index is x, bit 1 is y, bit 2 is z
pub fn unit_cube_vertices() -> [VolumeVertex; 8] {
    let mut corners = [VolumeVertex { position: [0.0; 3] }; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        corner.position = [
            (i & 1) as f32 - 0.5,
            ((i >> 1) & 1) as f32 - 0.5,
            ((i >> 2) & 1) as f32 - 0.5,
        ];
    }
    corners
}

/// Counter-clockwise when seen from outside the cube
pub const UNIT_CUBE_INDICES: [u16; 36] = [
    0, 2, 3, 0, 3, 1, // -z
    4, 5, 7, 4, 7, 6, // +z
    0, 1, 5, 0, 5, 4, // -y
    2, 6, 7, 2, 7, 3, // +y
    0, 4, 6, 0, 6, 2, // -x
    1, 3, 7, 1, 7, 5, // +x
];

/// Map an object-space position on the cube to texture coordinates
pub fn object_to_uvw(position: &Point3<f32>) -> Vector3<f32> {
    position.coords.add_scalar(0.5)
}

/// CPU evaluation of the sampling rule
pub struct VolumeSampler<'a> {
    volume: &'a VolumeGeometry,
    params: VolumeParams,
}

impl<'a> VolumeSampler<'a> {
    pub fn new(volume: &'a VolumeGeometry, params: VolumeParams) -> Self {
        Self { volume, params }
    }

    /// Trilinear sample at normalized coordinates with clamp-to-edge addressing
    pub fn sample(&self, uvw: &Vector3<f32>) -> f32 {
        let Dimensions {
            width,
            height,
            depth,
        } = self.volume.dimensions;

        let (x0, x1, tx) = texel_span(uvw.x, width);
        let (y0, y1, ty) = texel_span(uvw.y, height);
        let (z0, z1, tz) = texel_span(uvw.z, depth);

        let at = |x, y, z| self.volume.intensity(x, y, z);
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        let c00 = lerp(at(x0, y0, z0), at(x1, y0, z0), tx);
        let c10 = lerp(at(x0, y1, z0), at(x1, y1, z0), tx);
        let c01 = lerp(at(x0, y0, z1), at(x1, y0, z1), tx);
        let c11 = lerp(at(x0, y1, z1), at(x1, y1, z1), tx);

        lerp(lerp(c00, c10, ty), lerp(c01, c11, ty), tz)
    }

    /// RGBA color of a cube fragment at object-space `position`, `None` when
    /// it is discarded
    pub fn shade(&self, position: &Point3<f32>) -> Option<[f32; 4]> {
        let value = self.sample(&object_to_uvw(position));
        if value < self.params.threshold {
            None
        } else {
            Some([value, value, value, self.params.opacity])
        }
    }

    /// Fraction of voxels at or above the threshold
    pub fn visible_fraction(&self) -> f32 {
        let total = self.volume.voxel_count();
        if total == 0 {
            return 0.0;
        }
        let visible = self
            .volume
            .voxels
            .iter()
            .filter(|&&v| v as f32 / 255.0 >= self.params.threshold)
            .count();
        visible as f32 / total as f32
    }
}

/// Neighbouring texel indices and blend weight along one axis
fn texel_span(coord: f32, size: u32) -> (u32, u32, f32) {
    let last = size.saturating_sub(1) as f32;
    let texel = (coord * size as f32 - 0.5).clamp(0.0, last);
    let lower = texel.floor();
    let upper = (lower + 1.0).min(last);
    (lower as u32, upper as u32, texel - lower)
}

/// Render pipeline for volumes plus its bind group layout
pub struct VolumePipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl VolumePipeline {
    pub fn new(
        gpu: &GpuContext,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
        sample_count: u32,
    ) -> Self {
        let bind_group_layout = gpu.create_bind_group_layout(
            "volume_bind_group_layout",
            &[
                uniform_entry(0),
                uniform_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        );

        let shader = gpu.create_shader_module(
            &format!("Volume Shader v{}", VOLUME_SHADER_VERSION),
            VOLUME_SHADER_SOURCE,
        );

        let layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Volume Render Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = gpu
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Volume Render Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[VolumeVertex::desc()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // entry faces only
                    cull_mode: Some(wgpu::Face::Back),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            });

        Self {
            pipeline,
            bind_group_layout,
        }
    }
}

/// GPU resources of an attached volume
pub struct GpuVolume {
    pub texture: wgpu::Texture,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub params_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl GpuVolume {
    /// Upload the voxel grid as a 3D texture and bind it with the cube geometry
    pub fn upload(
        gpu: &GpuContext,
        pipeline: &VolumePipeline,
        volume: &VolumeGeometry,
        params: &VolumeParams,
        camera_buffer: &wgpu::Buffer,
    ) -> Self {
        let Dimensions {
            width,
            height,
            depth,
        } = volume.dimensions;
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: depth,
        };

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Volume Field Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &volume.voxels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Volume Field Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let vertex_buffer = gpu.create_buffer_init(
            "Volume Cube Vertex Buffer",
            &unit_cube_vertices(),
            wgpu::BufferUsages::VERTEX,
        );
        let index_buffer = gpu.create_buffer_init(
            "Volume Cube Index Buffer",
            &UNIT_CUBE_INDICES,
            wgpu::BufferUsages::INDEX,
        );
        let params_buffer = gpu.create_buffer_init(
            "Volume Params Buffer",
            std::slice::from_ref(params),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );

        let bind_group = gpu.create_bind_group(
            "volume_bind_group",
            &pipeline.bind_group_layout,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        );

        Self {
            texture,
            vertex_buffer,
            index_buffer,
            params_buffer,
            bind_group,
        }
    }

    pub fn draw<'pass>(&'pass self, pipeline: &'pass VolumePipeline, pass: &mut wgpu::RenderPass<'pass>) {
        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..UNIT_CUBE_INDICES.len() as u32, 0, 0..1);
    }

    pub fn destroy(self) {
        self.texture.destroy();
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.params_buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> VolumeGeometry {
        // 2x2x2 grid, voxel i holds i * 36
        VolumeGeometry {
            dimensions: Dimensions::new(2, 2, 2),
            voxels: (0..8).map(|i| i * 36).collect(),
        }
    }

    #[test]
    fn test_shader_declares_contract() {
        assert!(VOLUME_SHADER_SOURCE.contains(&format!("version {}", VOLUME_SHADER_VERSION)));
        for name in ["camera", "params", "volume_field", "field_sampler", "threshold", "opacity"] {
            assert!(VOLUME_SHADER_SOURCE.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_params_defaults() {
        let params = VolumeParams::default();
        assert_eq!(params.threshold, 0.3);
        assert_eq!(params.opacity, 0.8);
        assert_eq!(std::mem::size_of::<VolumeParams>(), 16);
    }

    #[test]
    fn test_sample_at_texel_centers() {
        let volume = ramp();
        let sampler = VolumeSampler::new(&volume, VolumeParams::default());
        assert_relative_eq!(sampler.sample(&Vector3::new(0.25, 0.25, 0.25)), 0.0);
        assert_relative_eq!(
            sampler.sample(&Vector3::new(0.75, 0.75, 0.75)),
            252.0 / 255.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            sampler.sample(&Vector3::new(0.75, 0.25, 0.25)),
            36.0 / 255.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_sample_blends_and_clamps() {
        let volume = ramp();
        let sampler = VolumeSampler::new(&volume, VolumeParams::default());
        // center of the grid averages all eight voxels
        assert_relative_eq!(
            sampler.sample(&Vector3::new(0.5, 0.5, 0.5)),
            126.0 / 255.0,
            epsilon = 1e-5
        );
        // outside the cube clamps to the edge texel
        assert_relative_eq!(sampler.sample(&Vector3::new(-1.0, -1.0, -1.0)), 0.0);
    }

    #[test]
    fn test_shade_discards_below_threshold() {
        let volume = ramp();
        let sampler = VolumeSampler::new(&volume, VolumeParams::default());
        assert_eq!(sampler.shade(&Point3::new(-0.25, -0.25, -0.25)), None);

        let color = sampler.shade(&Point3::new(0.25, 0.25, 0.25)).unwrap();
        assert_relative_eq!(color[0], 252.0 / 255.0, epsilon = 1e-6);
        assert_eq!(color[0], color[1]);
        assert_eq!(color[1], color[2]);
        assert_eq!(color[3], 0.8);
    }

    #[test]
    fn test_visible_fraction() {
        let volume = ramp();
        let sampler = VolumeSampler::new(&volume, VolumeParams::default());
        // 0.3 * 255 = 76.5, so 108 and above survive
        assert_relative_eq!(sampler.visible_fraction(), 5.0 / 8.0);
    }

    #[test]
    fn test_cube_corner_maps_to_texture_corner() {
        assert_relative_eq!(
            object_to_uvw(&Point3::new(-0.5, -0.5, -0.5)),
            Vector3::zeros()
        );
        assert_relative_eq!(
            object_to_uvw(&Point3::new(0.5, 0.5, 0.5)),
            Vector3::new(1.0, 1.0, 1.0)
        );
    }

    #[test]
    fn test_cube_faces_wind_outward() {
        let corners = unit_cube_vertices();
        for tri in UNIT_CUBE_INDICES.chunks(3) {
            let p = |i: u16| Vector3::from(corners[i as usize].position);
            let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
            let normal = (b - a).cross(&(c - a));
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(&centroid) > 0.0, "face {:?} winds inward", tri);
        }
    }
}
