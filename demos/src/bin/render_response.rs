//! Show an analysis service response in the 3D viewer
//!
//! Usage: cargo run --bin render_response -- <RESPONSE.json> [--config viewer.json]
//!
//! The response may carry a `mesh` or `volume` payload (top level or under
//! `reconstruction`), a `metrics` object and a `tumor_type`. Controls: drag
//! to orbit, scroll to zoom, Escape to close.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tumorscope_core::{build_payload, AnalysisResult, Drawable, MetricsOverlay};
use tumorscope_visualization::{InteractiveViewer, ViewerConfig};

#[derive(Parser, Debug)]
#[command(name = "render_response", about = "Render a tumor reconstruction response")]
struct Args {
    /// Analysis response JSON file
    response: PathBuf,

    /// Viewer configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Build the geometry and print the overlay without opening a window
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("loading viewer config {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    let text = std::fs::read_to_string(&args.response)
        .with_context(|| format!("reading {}", args.response.display()))?;
    let result = AnalysisResult::from_json_str(&text).context("parsing analysis response")?;

    if args.headless {
        return describe(result, &config);
    }

    let overlay = MetricsOverlay::new(&result.metrics, &result.label);
    let shown = InteractiveViewer::new(config).run(result, |outcome| {
        println!("{}", outcome.view);
        print!("{}", outcome.overlay);
    });

    if let Err(e) = shown {
        if e.is_gpu_unavailable() {
            // the overlay does not need the GPU
            println!("3D view unavailable");
            print!("{}", overlay);
            return Ok(());
        }
        return Err(e.into());
    }
    Ok(())
}

fn describe(result: AnalysisResult, config: &ViewerConfig) -> Result<()> {
    match (result.payload, result.payload_error) {
        (Some(payload), _) => match build_payload(payload) {
            Ok(geometry) => {
                let sphere = geometry.bounding_sphere();
                let fit = config.fitter().fit(&sphere);
                println!(
                    "{}: {} vertices, {} faces, radius {:.3}, camera distance {:.3}",
                    geometry.kind(),
                    geometry.vertex_count(),
                    geometry.face_count(),
                    sphere.radius,
                    fit.distance
                );
            }
            Err(e) => println!("3D data rejected: {}", e),
        },
        (None, Some(reason)) => println!("3D data rejected: {}", reason),
        (None, None) => println!("no 3D data"),
    }

    print!("{}", MetricsOverlay::new(&result.metrics, &result.label));
    Ok(())
}
