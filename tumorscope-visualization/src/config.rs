//! Viewer configuration

use crate::camera::{
    Camera, OrbitControls, DEFAULT_DISTANCE, DEFAULT_FAR, DEFAULT_FOV_DEGREES, DEFAULT_NEAR,
};
use crate::fit::CameraFitter;
use nalgebra::Vector3;
use serde::Deserialize;
use std::path::Path;
use tumorscope_core::Result;
use tumorscope_gpu::{
    LightingUniform, RenderConfig, SurfaceMaterial, SurfaceRenderConfig, VolumeParams,
};

/// Window configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Tumor 3D Viewer".to_string(),
            width: 1200,
            height: 800,
        }
    }
}

/// Everything tunable about the 3D view. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Volume intensities below this are discarded
    pub threshold: f32,
    /// Opacity of volume fragments that pass the threshold
    pub opacity: f32,
    /// Camera distance in bounding-sphere radii
    pub distance_factor: f32,
    /// Camera distance for empty or single-point geometry
    pub min_camera_distance: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of queued orbit motion applied per frame
    pub damping: f32,
    pub background_color: [f32; 3],
    pub mesh_color: [f32; 3],
    pub mesh_opacity: f32,
    pub shininess: f32,
    pub double_sided: bool,
    pub ambient_intensity: f32,
    pub light_intensity: f32,
    pub light_position: [f32; 3],
    pub multisampling: bool,
    pub window: WindowConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            opacity: 0.8,
            distance_factor: 3.0,
            min_camera_distance: DEFAULT_DISTANCE,
            fov_degrees: DEFAULT_FOV_DEGREES,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            damping: 0.05,
            background_color: [0.0, 0.0, 0.0],
            mesh_color: [1.0, 0.2, 0.2],
            mesh_opacity: 0.95,
            shininess: 100.0,
            double_sided: true,
            ambient_intensity: 0.5,
            light_intensity: 0.8,
            light_position: [0.0, 1.0, 1.0],
            multisampling: true,
            window: WindowConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("loaded viewer config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn fitter(&self) -> CameraFitter {
        CameraFitter {
            distance_factor: self.distance_factor,
            min_distance: self.min_camera_distance,
            near: self.near,
            far: self.far,
        }
    }

    pub fn camera(&self, aspect_ratio: f32) -> Camera {
        let mut camera = Camera::on_axis(self.min_camera_distance, self.fov_degrees, aspect_ratio);
        camera.near = self.near;
        camera.far = self.far;
        camera
    }

    pub fn controls(&self) -> OrbitControls {
        OrbitControls::new(self.damping)
    }

    pub fn volume_params(&self) -> VolumeParams {
        VolumeParams::new(self.threshold, self.opacity)
    }

    pub fn render_config(&self) -> RenderConfig {
        let [r, g, b] = self.background_color;
        RenderConfig {
            background_color: [r as f64, g as f64, b as f64, 1.0],
            enable_depth_test: true,
            enable_multisampling: self.multisampling,
            surface: SurfaceRenderConfig {
                material: SurfaceMaterial::new(self.mesh_color, self.mesh_opacity, self.shininess),
                lighting: LightingUniform::new(
                    self.ambient_intensity,
                    Vector3::from(self.light_position),
                    self.light_intensity,
                ),
                double_sided: self.double_sided,
            },
            volume: self.volume_params(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_render_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.render_config(), RenderConfig::default());
        assert_eq!(config.fitter(), CameraFitter::default());
        assert_eq!(config.camera(1.0), Camera::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ViewerConfig::from_json_str(r#"{ "threshold": 0.5, "window": { "width": 640 } }"#)
                .unwrap();
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.opacity, 0.8);
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.volume_params().threshold, 0.5);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(ViewerConfig::from_json_str("{ threshold: }").is_err());
    }
}
