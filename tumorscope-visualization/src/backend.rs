//! [`RenderBackend`] for the wgpu window renderer

use crate::scene::RenderBackend;
use tumorscope_core::{BuiltGeometry, Result};
use tumorscope_gpu::{GpuResources, SceneFrame, WgpuBackend};
use winit::dpi::PhysicalSize;

impl RenderBackend for WgpuBackend {
    type Resources = GpuResources;

    fn allocate(&mut self, geometry: &BuiltGeometry) -> Result<GpuResources> {
        self.upload(geometry)
    }

    fn release(&mut self, resources: GpuResources) {
        WgpuBackend::release(self, resources)
    }

    fn draw(&mut self, resources: Option<&GpuResources>, frame: &SceneFrame) -> Result<()> {
        WgpuBackend::draw(self, resources, frame)
    }

    fn resize(&mut self, width: u32, height: u32) {
        WgpuBackend::resize(self, PhysicalSize::new(width, height))
    }

    fn detach_surface(&mut self) {
        WgpuBackend::detach_surface(self)
    }
}
