//! Surface mesh pipeline: double-sided, translucent Blinn-Phong shading

use crate::device::{uniform_entry, GpuContext};
use crate::uniforms::{LightingUniform, VertexLayout};
use bytemuck::{Pod, Zeroable};
use tumorscope_core::{SurfaceGeometry, SurfaceVertex};

/// Material uniform, `@binding(2)` of the surface pipeline
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SurfaceMaterial {
    pub color: [f32; 3],
    pub opacity: f32,
    pub shininess: f32,
    /// Strength of the white specular highlight
    pub specular: f32,
    pub _padding: [f32; 2],
}

impl SurfaceMaterial {
    pub fn new(color: [f32; 3], opacity: f32, shininess: f32) -> Self {
        Self {
            color,
            opacity: opacity.clamp(0.0, 1.0),
            shininess: shininess.max(1.0),
            specular: 0x11 as f32 / 255.0,
            _padding: [0.0; 2],
        }
    }
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        // #ff3333
        Self::new([1.0, 0.2, 0.2], 0.95, 100.0)
    }
}

/// Surface mesh rendering configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRenderConfig {
    pub material: SurfaceMaterial,
    pub lighting: LightingUniform,
    pub double_sided: bool,
}

impl Default for SurfaceRenderConfig {
    fn default() -> Self {
        Self {
            material: SurfaceMaterial::default(),
            lighting: LightingUniform::default(),
            double_sided: true,
        }
    }
}

/// Render pipeline plus the bind group layout its meshes are bound with
pub struct SurfacePipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl SurfacePipeline {
    pub fn new(
        gpu: &GpuContext,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
        sample_count: u32,
        config: &SurfaceRenderConfig,
    ) -> Self {
        let bind_group_layout = gpu.create_bind_group_layout(
            "surface_bind_group_layout",
            &[uniform_entry(0), uniform_entry(1), uniform_entry(2)],
        );

        let shader = gpu.create_shader_module(
            "Surface Mesh Shader",
            include_str!("shaders/surface.wgsl"),
        );

        let layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Surface Render Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = gpu
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Surface Render Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[SurfaceVertex::desc()],
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
                    cull_mode: if config.double_sided {
                        None
                    } else {
                        Some(wgpu::Face::Back)
                    },
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: true,
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

/// GPU buffers of an attached surface mesh
pub struct GpuSurfaceMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub material_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub index_count: u32,
}

impl GpuSurfaceMesh {
    /// Upload a built surface and bind it against the shared camera and lighting buffers
    pub fn upload(
        gpu: &GpuContext,
        pipeline: &SurfacePipeline,
        geometry: &SurfaceGeometry,
        material: &SurfaceMaterial,
        camera_buffer: &wgpu::Buffer,
        lighting_buffer: &wgpu::Buffer,
    ) -> Self {
        let vertex_buffer = gpu.create_buffer_init(
            "Surface Vertex Buffer",
            &geometry.vertices,
            wgpu::BufferUsages::VERTEX,
        );
        let index_buffer = gpu.create_buffer_init(
            "Surface Index Buffer",
            &geometry.indices,
            wgpu::BufferUsages::INDEX,
        );
        let material_buffer = gpu.create_buffer_init(
            "Surface Material Buffer",
            std::slice::from_ref(material),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );

        let bind_group = gpu.create_bind_group(
            "surface_bind_group",
            &pipeline.bind_group_layout,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lighting_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: material_buffer.as_entire_binding(),
                },
            ],
        );

        Self {
            vertex_buffer,
            index_buffer,
            material_buffer,
            bind_group,
            index_count: geometry.indices.len() as u32,
        }
    }

    pub fn draw<'pass>(&'pass self, pipeline: &'pass SurfacePipeline, pass: &mut wgpu::RenderPass<'pass>) {
        if self.index_count == 0 {
            return;
        }
        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    /// Free the GPU memory now instead of when the handles drop
    pub fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.material_buffer.destroy();
    }
}
