//! Scene hosting: one attached object, its GPU resources and the frame loop
//!
//! [`SceneHost`] is the entry point a host application talks to. It owns a
//! [`RenderBackend`] (which in turn owns the rendering surface), the camera,
//! the orbit controls and at most one [`Renderable`]. Replacing the scene is
//! always release-then-allocate, so two sets of GPU resources never coexist.

use crate::camera::{Camera, OrbitControls};
use crate::config::ViewerConfig;
use crate::fit::{CameraFit, CameraFitter};
use crate::render_loop::{FrameRequester, LoopHandle, RenderLoop};
use nalgebra::{Matrix4, Vector3};
use std::fmt;
use std::rc::Rc;
use tumorscope_core::{
    build_payload, AnalysisResult, BoundingSphere, BuiltGeometry, ClassificationLabel, Drawable,
    Error, Metrics, MetricsOverlay, Payload, Result,
};
use tumorscope_gpu::SceneFrame;

/// GPU side of the scene: allocation, drawing and the presentation surface
pub trait RenderBackend {
    type Resources;

    /// Upload geometry, returning handles the backend can later release
    fn allocate(&mut self, geometry: &BuiltGeometry) -> Result<Self::Resources>;

    /// Free resources returned by [`allocate`](Self::allocate)
    fn release(&mut self, resources: Self::Resources);

    /// Clear the frame and draw `resources` if present
    fn draw(&mut self, resources: Option<&Self::Resources>, frame: &SceneFrame) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32);

    /// Give up the rendering surface; called once on teardown
    fn detach_surface(&mut self);
}

/// The attached object: what was built, how it is framed, and its GPU handles
pub struct Renderable<R> {
    kind: &'static str,
    vertex_count: usize,
    face_count: usize,
    sphere: BoundingSphere,
    fit: CameraFit,
    resources: R,
}

impl<R> Renderable<R> {
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn face_count(&self) -> usize {
        self.face_count
    }

    pub fn bounding_sphere(&self) -> &BoundingSphere {
        &self.sphere
    }

    /// Model translation that centers the object at the origin
    pub fn translation(&self) -> Vector3<f32> {
        self.fit.translation
    }

    pub fn camera_distance(&self) -> f32 {
        self.fit.distance
    }

    pub fn resources(&self) -> &R {
        &self.resources
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.fit.translation)
    }
}

impl<R> fmt::Debug for Renderable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderable")
            .field("kind", &self.kind)
            .field("vertex_count", &self.vertex_count)
            .field("face_count", &self.face_count)
            .field("sphere", &self.sphere)
            .field("fit", &self.fit)
            .finish_non_exhaustive()
    }
}

/// What happened to the 3D view on a [`SceneHost::render`] call
#[derive(Debug, Clone, PartialEq)]
pub enum ViewStatus {
    /// Geometry is attached and the loop is drawing it
    Ready {
        kind: &'static str,
        vertex_count: usize,
        face_count: usize,
    },
    /// No geometry was supplied; the scene is empty
    Empty,
    /// The payload was rejected; the previous scene, if any, is still shown
    Malformed(String),
    /// The GPU could not be used; only the metrics overlay is available
    Unavailable(String),
}

impl ViewStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ViewStatus::Ready { .. })
    }
}

impl fmt::Display for ViewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewStatus::Ready {
                kind,
                vertex_count,
                face_count,
            } => write!(
                f,
                "showing {} ({} vertices, {} faces)",
                kind, vertex_count, face_count
            ),
            ViewStatus::Empty => f.write_str("no 3D data"),
            ViewStatus::Malformed(reason) => write!(f, "3D data rejected: {}", reason),
            ViewStatus::Unavailable(reason) => write!(f, "3D view unavailable: {}", reason),
        }
    }
}

/// Result of one [`SceneHost::render`] call. The overlay is always produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub view: ViewStatus,
    pub overlay: MetricsOverlay,
}

/// Owns the backend, the camera and the single attached [`Renderable`]
pub struct SceneHost<B: RenderBackend> {
    backend: B,
    camera: Camera,
    controls: OrbitControls,
    fitter: CameraFitter,
    current: Option<Renderable<B::Resources>>,
    render_loop: Option<RenderLoop>,
    requester: Option<Rc<dyn FrameRequester>>,
    viewport: (u32, u32),
    torn_down: bool,
}

impl<B: RenderBackend> SceneHost<B> {
    /// Take ownership of `backend` and the surface it renders to
    pub fn new(backend: B, config: &ViewerConfig) -> Self {
        let viewport = (config.window.width, config.window.height);
        let aspect = viewport.0.max(1) as f32 / viewport.1.max(1) as f32;
        Self {
            backend,
            camera: config.camera(aspect),
            controls: config.controls(),
            fitter: config.fitter(),
            current: None,
            render_loop: None,
            requester: None,
            viewport,
            torn_down: false,
        }
    }

    /// Build `payload` and make it the attached object.
    ///
    /// A payload that fails to build leaves the current scene untouched.
    /// Otherwise the current object's resources are released before the new
    /// ones are allocated.
    pub fn attach(&mut self, payload: Payload) -> Result<&Renderable<B::Resources>> {
        self.ensure_live()?;
        let kind = payload.kind();
        let geometry = build_payload(payload).map_err(|e| {
            log::warn!("rejected {} payload: {}", kind, e);
            e
        })?;
        self.attach_geometry(geometry)
    }

    /// Attach already-built geometry
    pub fn attach_geometry(&mut self, geometry: BuiltGeometry) -> Result<&Renderable<B::Resources>> {
        self.ensure_live()?;

        let sphere = geometry.bounding_sphere();
        let fit = self.fitter.fit(&sphere);

        self.detach();
        let resources = self.backend.allocate(&geometry).map_err(|e| {
            log::error!("failed to allocate {} resources: {}", geometry.kind(), e);
            e
        })?;

        fit.apply(&mut self.camera);
        self.controls.reset();

        log::info!(
            "attached {}: {} vertices, {} faces, radius {:.3}, camera distance {:.3}",
            geometry.kind(),
            geometry.vertex_count(),
            geometry.face_count(),
            sphere.radius,
            fit.distance
        );

        let renderable = self.current.insert(Renderable {
            kind: geometry.kind(),
            vertex_count: geometry.vertex_count(),
            face_count: geometry.face_count(),
            sphere,
            fit,
            resources,
        });
        Ok(&*renderable)
    }

    /// Release the attached object, if any
    pub fn detach(&mut self) {
        if let Some(previous) = self.current.take() {
            log::debug!("releasing {}", previous.kind);
            self.backend.release(previous.resources);
        }
    }

    /// Host entry point: show `payload` and project `metrics` for `label`
    pub fn render(
        &mut self,
        payload: Option<Payload>,
        metrics: &Metrics,
        label: &ClassificationLabel,
    ) -> RenderOutcome {
        let overlay = MetricsOverlay::new(metrics, label);

        let view = match payload {
            None => {
                self.detach();
                ViewStatus::Empty
            }
            Some(payload) => match self.attach(payload) {
                Ok(renderable) => ViewStatus::Ready {
                    kind: renderable.kind,
                    vertex_count: renderable.vertex_count,
                    face_count: renderable.face_count,
                },
                Err(e) if e.is_gpu_unavailable() => ViewStatus::Unavailable(e.to_string()),
                Err(e) => ViewStatus::Malformed(e.to_string()),
            },
        };

        self.finish(view, overlay)
    }

    /// [`render`](Self::render) for a parsed service response.
    ///
    /// Geometry rejected while parsing the response is reported as
    /// [`ViewStatus::Malformed`] and the current scene is kept.
    pub fn render_result(&mut self, result: AnalysisResult) -> RenderOutcome {
        match result.payload_error {
            Some(reason) => {
                log::warn!("keeping current scene, response geometry rejected: {}", reason);
                let overlay = MetricsOverlay::new(&result.metrics, &result.label);
                self.finish(ViewStatus::Malformed(reason), overlay)
            }
            None => self.render(result.payload, &result.metrics, &result.label),
        }
    }

    fn finish(&mut self, view: ViewStatus, overlay: MetricsOverlay) -> RenderOutcome {
        if !matches!(view, ViewStatus::Unavailable(_)) {
            if let Some(requester) = self.requester.clone() {
                self.restart_loop(requester);
            }
        }

        RenderOutcome { view, overlay }
    }

    /// Start the frame loop, replacing a running one
    pub fn start(&mut self, requester: Rc<dyn FrameRequester>) -> Result<LoopHandle> {
        self.ensure_live()?;
        self.requester = Some(requester.clone());
        Ok(self.restart_loop(requester))
    }

    fn restart_loop(&mut self, requester: Rc<dyn FrameRequester>) -> LoopHandle {
        if let Some(previous) = self.render_loop.take() {
            previous.cancel();
        }
        let render_loop = RenderLoop::start(requester);
        let handle = render_loop.handle();
        self.render_loop = Some(render_loop);
        handle
    }

    /// One frame: advance the controls, draw, request the next frame.
    ///
    /// Returns `Ok(false)` when no loop is running or it was canceled.
    pub fn frame(&mut self) -> Result<bool> {
        let Some(render_loop) = self.render_loop.as_mut() else {
            return Ok(false);
        };

        let backend = &mut self.backend;
        let camera = &mut self.camera;
        let controls = &mut self.controls;
        let current = self.current.as_ref();

        let mut drawn = Ok(());
        let ticked = render_loop.tick(|| {
            controls.update(camera);
            let frame = SceneFrame {
                view: camera.view_matrix(),
                projection: camera.projection_matrix(),
                model: current
                    .map(Renderable::model_matrix)
                    .unwrap_or_else(Matrix4::identity),
                eye: camera.position,
            };
            drawn = backend.draw(current.map(|r| &r.resources), &frame);
        });

        if let Err(e) = drawn {
            log::error!("frame failed: {}", e);
            return Err(e);
        }
        Ok(ticked)
    }

    /// Track a new viewport size; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.torn_down {
            return;
        }
        self.viewport = (width, height);
        self.camera.set_viewport(width, height);
        self.backend.resize(width, height);
    }

    /// Stop the loop, release everything and give up the surface. Idempotent.
    pub fn teardown(&mut self) {
        if let Some(render_loop) = self.render_loop.take() {
            render_loop.cancel();
        }
        self.requester = None;
        self.detach();
        if !self.torn_down {
            self.backend.detach_surface();
            self.torn_down = true;
            log::info!("scene torn down");
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.torn_down {
            Err(Error::GpuResource("scene has been torn down".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn renderable(&self) -> Option<&Renderable<B::Resources>> {
        self.current.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn loop_handle(&self) -> Option<LoopHandle> {
        self.render_loop.as_ref().map(RenderLoop::handle)
    }

    pub fn is_running(&self) -> bool {
        self.render_loop
            .as_ref()
            .is_some_and(RenderLoop::is_running)
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl<B: RenderBackend> Drop for SceneHost<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
