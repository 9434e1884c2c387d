//! Interactive window host for a [`SceneHost`]
//!
//! Opens a winit window, mounts a [`WgpuBackend`] on it and drives the frame
//! loop from `RedrawRequested`. Left-drag orbits, the wheel zooms, Escape
//! closes the window.

use std::rc::Rc;
use std::sync::Arc;
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use crate::config::ViewerConfig;
use crate::render_loop::FrameRequester;
use crate::scene::{RenderOutcome, SceneHost};
use tumorscope_core::{AnalysisResult, Error, Result};
use tumorscope_gpu::WgpuBackend;

/// Window that shows one analysis result until it is closed
pub struct InteractiveViewer {
    config: ViewerConfig,
}

#[derive(Debug, Default)]
struct PointerState {
    dragging: bool,
    last_position: Option<PhysicalPosition<f64>>,
}

impl InteractiveViewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Show `result` and block until the window closes.
    ///
    /// `on_outcome` receives the outcome of the initial render, including the
    /// metrics overlay. GPU initialization failures are returned as
    /// [`Error::GpuResource`].
    pub fn run<F>(self, result: AnalysisResult, on_outcome: F) -> Result<()>
    where
        F: FnOnce(&RenderOutcome),
    {
        log::info!("starting viewer");

        let event_loop = EventLoop::new()
            .map_err(|e| Error::Visualization(format!("Failed to create event loop: {}", e)))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(self.config.window.title.clone())
                .with_inner_size(LogicalSize::new(
                    self.config.window.width as f64,
                    self.config.window.height as f64,
                ))
                .build(&event_loop)
                .map_err(|e| Error::Visualization(format!("Failed to create window: {}", e)))?,
        );

        let size = window.inner_size();
        let backend = pollster::block_on(WgpuBackend::new(
            window.clone(),
            size,
            self.config.render_config(),
        ))
        .map_err(|e| {
            log::error!("3D view unavailable: {}", e);
            e
        })?;

        let mut host = SceneHost::new(backend, &self.config);
        host.resize(size.width, size.height);

        host.start(window_requester(window.clone()))?;

        let outcome = host.render_result(result);
        log::info!("{}", outcome.view);
        on_outcome(&outcome);

        let mut pointer = PointerState::default();

        event_loop
            .run(move |event, target| {
                target.set_control_flow(ControlFlow::Wait);

                match event {
                    Event::WindowEvent { event, window_id } if window_id == window.id() => {
                        match event {
                            WindowEvent::CloseRequested => {
                                host.teardown();
                                target.exit();
                            }
                            WindowEvent::Resized(new_size) => {
                                host.resize(new_size.width, new_size.height);
                                window.request_redraw();
                            }
                            WindowEvent::MouseInput { state, button, .. } => {
                                if button == MouseButton::Left {
                                    pointer.dragging = state == ElementState::Pressed;
                                }
                            }
                            WindowEvent::CursorMoved { position, .. } => {
                                if let (true, Some(last)) = (pointer.dragging, pointer.last_position) {
                                    host.controls_mut().rotate(
                                        (position.x - last.x) as f32,
                                        (position.y - last.y) as f32,
                                        window.inner_size().height as f32,
                                    );
                                }
                                pointer.last_position = Some(position);
                            }
                            WindowEvent::MouseWheel { delta, .. } => {
                                let steps = match delta {
                                    MouseScrollDelta::LineDelta(_, y) => y,
                                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                                };
                                host.controls_mut().zoom(steps);
                            }
                            WindowEvent::KeyboardInput { event, .. } => {
                                if event.state == ElementState::Pressed
                                    && event.logical_key == Key::Named(NamedKey::Escape)
                                {
                                    host.teardown();
                                    target.exit();
                                }
                            }
                            WindowEvent::RedrawRequested => {
                                if let Err(e) = host.frame() {
                                    log::error!("3D view unavailable: {}", e);
                                    host.teardown();
                                    target.exit();
                                }
                            }
                            _ => {}
                        }
                    }
                    Event::LoopExiting => host.teardown(),
                    _ => {}
                }
            })
            .map_err(|e| Error::Visualization(format!("Event loop error: {}", e)))?;

        Ok(())
    }
}

/// Requester used when frames are driven by a window's redraw events
pub fn window_requester(window: Arc<Window>) -> Rc<dyn FrameRequester> {
    Rc::new(move || window.request_redraw())
}
