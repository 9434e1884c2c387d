//! Print the metrics overlay of an analysis response
//!
//! Usage: cargo run --bin print_metrics -- <RESPONSE.json> [--tone]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tumorscope_core::{AnalysisResult, MetricsOverlay};

#[derive(Parser, Debug)]
#[command(name = "print_metrics", about = "Format the clinical metrics of a response")]
struct Args {
    /// Analysis response JSON file
    response: PathBuf,

    /// Also print the overlay color
    #[arg(long)]
    tone: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let text = std::fs::read_to_string(&args.response)
        .with_context(|| format!("reading {}", args.response.display()))?;
    let result = AnalysisResult::from_json_str(&text).context("parsing analysis response")?;

    let overlay = MetricsOverlay::new(&result.metrics, &result.label);
    print!("{}", overlay);
    if args.tone {
        println!("Color: {}", overlay.tone.hex());
    }
    log::debug!("payload: {:?}", result.payload.as_ref().map(|p| p.kind()));
    Ok(())
}
