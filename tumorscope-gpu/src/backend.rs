//! Window-backed wgpu renderer that owns the surface and every GPU allocation

use crate::device::GpuContext;
use crate::mesh::{GpuSurfaceMesh, SurfacePipeline};
use crate::renderer::{RenderConfig, RenderTargets};
use crate::uniforms::{CameraUniform, SceneFrame};
use crate::volume::{GpuVolume, VolumePipeline, VolumeSampler};
use tumorscope_core::{BuiltGeometry, Error, Result};
use winit::dpi::PhysicalSize;

/// GPU resources of one attached geometry
pub enum GpuResources {
    Surface(GpuSurfaceMesh),
    Volume(GpuVolume),
}

impl GpuResources {
    pub fn kind(&self) -> &'static str {
        match self {
            GpuResources::Surface(_) => "surface",
            GpuResources::Volume(_) => "volume",
        }
    }

    pub fn destroy(self) {
        match self {
            GpuResources::Surface(mesh) => mesh.destroy(),
            GpuResources::Volume(volume) => volume.destroy(),
        }
    }
}

/// Production renderer: a configured surface plus both pipelines
pub struct WgpuBackend {
    pub gpu: GpuContext,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: wgpu::SurfaceConfiguration,
    targets: RenderTargets,
    config: RenderConfig,
    camera_buffer: wgpu::Buffer,
    lighting_buffer: wgpu::Buffer,
    surface_pipeline: SurfacePipeline,
    volume_pipeline: VolumePipeline,
}

impl WgpuBackend {
    /// Create a surface for `target`, configure it at `size` and build both pipelines
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: PhysicalSize<u32>,
        config: RenderConfig,
    ) -> Result<Self> {
        let (gpu, surface) = GpuContext::with_surface(target).await?;

        let surface_caps = surface.get_capabilities(&gpu.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| Error::GpuResource("surface reports no texture formats".to_string()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &surface_config);

        let targets = RenderTargets::new(&gpu.device, &surface_config, &config);

        let camera_buffer = gpu.create_buffer_init(
            "Camera Buffer",
            &[CameraUniform::default()],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        let lighting_buffer = gpu.create_buffer_init(
            "Lighting Buffer",
            &[config.surface.lighting],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );

        let surface_pipeline = SurfacePipeline::new(
            &gpu,
            surface_format,
            config.depth_format(),
            config.sample_count(),
            &config.surface,
        );
        let volume_pipeline = VolumePipeline::new(
            &gpu,
            surface_format,
            config.depth_format(),
            config.sample_count(),
        );

        log::info!(
            "surface configured: {}x{} {:?}",
            surface_config.width,
            surface_config.height,
            surface_format
        );

        Ok(Self {
            gpu,
            surface: Some(surface),
            surface_config,
            targets,
            config,
            camera_buffer,
            lighting_buffer,
            surface_pipeline,
            volume_pipeline,
        })
    }

    /// Upload built geometry; nothing is shared with previously uploaded resources
    pub fn upload(&mut self, geometry: &BuiltGeometry) -> Result<GpuResources> {
        if self.surface.is_none() {
            return Err(Error::GpuResource("rendering surface is detached".to_string()));
        }

        let resources = match geometry {
            BuiltGeometry::Surface(surface) => GpuResources::Surface(GpuSurfaceMesh::upload(
                &self.gpu,
                &self.surface_pipeline,
                surface,
                &self.config.surface.material,
                &self.camera_buffer,
                &self.lighting_buffer,
            )),
            BuiltGeometry::Volume(volume) => {
                let max = self.gpu.device.limits().max_texture_dimension_3d;
                let dims = volume.dimensions;
                if dims.width > max || dims.height > max || dims.depth > max {
                    return Err(Error::GpuResource(format!(
                        "volume {}x{}x{} exceeds the device's 3D texture limit of {}",
                        dims.width, dims.height, dims.depth, max
                    )));
                }

                let sampler = VolumeSampler::new(volume, self.config.volume);
                log::info!(
                    "volume {}x{}x{}: {:.1}% of voxels above threshold {}",
                    volume.dimensions.width,
                    volume.dimensions.height,
                    volume.dimensions.depth,
                    sampler.visible_fraction() * 100.0,
                    self.config.volume.threshold
                );
                GpuResources::Volume(GpuVolume::upload(
                    &self.gpu,
                    &self.volume_pipeline,
                    volume,
                    &self.config.volume,
                    &self.camera_buffer,
                ))
            }
        };
        Ok(resources)
    }

    pub fn release(&mut self, resources: GpuResources) {
        log::debug!("destroying {} resources", resources.kind());
        resources.destroy();
    }

    /// Clear the frame and draw `resources` if any
    pub fn draw(&mut self, resources: Option<&GpuResources>, frame: &SceneFrame) -> Result<()> {
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| Error::GpuResource("rendering surface is detached".to_string()))?;

        let camera_uniform = CameraUniform::from_frame(frame);
        self.gpu
            .queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_uniform));

        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // skip this frame, the next one draws into the reconfigured surface
                surface.configure(&self.gpu.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface texture timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Render Encoder"),
            });

        let (color_attachment, resolve_target) = match &self.targets.msaa_view {
            Some(msaa_view) => (msaa_view, Some(&view)),
            None => (&view, None),
        };
        let [r, g, b, a] = self.config.background_color;

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_attachment,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: self.targets.depth_view.as_ref().map(|depth_view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            match resources {
                Some(GpuResources::Surface(mesh)) => {
                    mesh.draw(&self.surface_pipeline, &mut render_pass)
                }
                Some(GpuResources::Volume(volume)) => {
                    volume.draw(&self.volume_pipeline, &mut render_pass)
                }
                None => {}
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Reconfigure the surface; zero sizes (minimized windows) are ignored
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.gpu.device, &self.surface_config);
            self.targets = RenderTargets::new(&self.gpu.device, &self.surface_config, &self.config);
        }
    }

    /// Drop the surface; later draws fail with `GpuResource`
    pub fn detach_surface(&mut self) {
        if self.surface.take().is_some() {
            log::info!("rendering surface detached");
        }
    }
}
