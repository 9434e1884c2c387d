//! Scene hosting and interactive viewing for tumor geometry
//!
//! This crate ties the geometry builders and the GPU renderer into a host
//! facing API:
//! - [`SceneHost`] owns one attached object and the frame loop
//! - [`CameraFitter`] frames whatever is attached
//! - [`OrbitControls`] for damped mouse orbit and zoom
//! - [`InteractiveViewer`] to show an analysis result in a window
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tumorscope_core::AnalysisResult;
//! use tumorscope_visualization::{InteractiveViewer, ViewerConfig};
//!
//! fn show(json: &str) -> tumorscope_core::Result<()> {
//!     let result = AnalysisResult::from_json_str(json)?;
//!     InteractiveViewer::new(ViewerConfig::default()).run(result, |outcome| {
//!         println!("{}", outcome.overlay);
//!     })
//! }
//! ```

pub mod backend;
pub mod camera;
pub mod config;
pub mod fit;
pub mod interactive_viewer;
pub mod render_loop;
pub mod scene;

pub use camera::{Camera, OrbitControls};
pub use config::{ViewerConfig, WindowConfig};
pub use fit::{CameraFit, CameraFitter};
pub use interactive_viewer::{window_requester, InteractiveViewer};
pub use render_loop::{FrameRequester, LoopHandle, RenderLoop};
pub use scene::{RenderBackend, RenderOutcome, Renderable, SceneHost, ViewStatus};
