//! Render configuration and the depth/multisample targets that follow the surface size

use crate::mesh::SurfaceRenderConfig;
use crate::volume::VolumeParams;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Rendering configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub background_color: [f64; 4],
    pub enable_depth_test: bool,
    pub enable_multisampling: bool,
    pub surface: SurfaceRenderConfig,
    pub volume: VolumeParams,
}

impl RenderConfig {
    pub fn sample_count(&self) -> u32 {
        if self.enable_multisampling {
            4
        } else {
            1
        }
    }

    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        self.enable_depth_test.then_some(DEPTH_FORMAT)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background_color: [0.0, 0.0, 0.0, 1.0],
            enable_depth_test: true,
            enable_multisampling: true,
            surface: SurfaceRenderConfig::default(),
            volume: VolumeParams::default(),
        }
    }
}

/// Attachments sized to the surface, recreated on resize
pub struct RenderTargets {
    pub depth_view: Option<wgpu::TextureView>,
    pub msaa_view: Option<wgpu::TextureView>,
}

impl RenderTargets {
    pub fn new(
        device: &wgpu::Device,
        surface_config: &wgpu::SurfaceConfiguration,
        config: &RenderConfig,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: surface_config.width.max(1),
            height: surface_config.height.max(1),
            depth_or_array_layers: 1,
        };
        let sample_count = config.sample_count();

        let depth_view = config.depth_format().map(|format| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("Depth Texture"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let msaa_view = config.enable_multisampling.then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("MSAA Texture"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: surface_config.format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        Self {
            depth_view,
            msaa_view,
        }
    }
}
