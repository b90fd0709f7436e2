mod app;
mod config;
mod engine;
mod layout;
mod papers;
mod scene;
mod util;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::DataSource;
use crate::config::EngineConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON list of paper records.
    #[arg(long, default_value = "nodes.json")]
    nodes: PathBuf,

    /// JSON list of citation records.
    #[arg(long, default_value = "edges.json")]
    edges: PathBuf,

    /// Optional JSON file overriding engine tuning.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log: String,

    /// Separation gain in [0, 1]; overrides the config file.
    #[arg(long)]
    separation_gain: Option<f32>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = EngineConfig::load(args.config.as_deref())?;
    if let Some(gain) = args.separation_gain {
        config = config.with_separation_gain(gain);
    }

    let source = DataSource {
        nodes: args.nodes,
        edges: args.edges,
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "citemap",
        options,
        Box::new(move |cc| Ok(Box::new(app::CitemapApp::new(cc, source, config)))),
    )
    .map_err(|error| anyhow::anyhow!("failed to start the map window: {error}"))
}
