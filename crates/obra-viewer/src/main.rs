//! Obra Viewer - Main entry point
//!
//! Opens a building model next to its service spreadsheet and highlights
//! the elements of each construction service on demand.

mod app;
mod camera;
mod config;
mod ui;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "obra-viewer")]
#[command(about = "Building model viewer with service highlighting")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "obra.toml")]
    config: PathBuf,

    /// GLB model, relative to the assets directory
    #[arg(short, long)]
    model: Option<String>,

    /// Service spreadsheet, relative to the assets directory
    #[arg(short, long)]
    spreadsheet: Option<String>,

    /// Service registry TOML replacing the compiled-in one
    #[arg(short, long)]
    registry: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: bool,

    /// Print the active service registry as TOML and exit
    #[arg(long)]
    dump_registry: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.init_config {
        config::save_default_config(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let (mut config, notes) = config::load_config(&args.config)?;

    if let Some(model) = args.model {
        config.viewer.model = model;
    }
    if let Some(spreadsheet) = args.spreadsheet {
        config.viewer.spreadsheet = spreadsheet;
    }
    if let Some(registry) = args.registry {
        config.registry.path = Some(registry);
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},wgpu_core=warn,wgpu_hal=warn,naga=warn",
            config.logging.level
        ))
    });
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Obra viewer v{}", env!("CARGO_PKG_VERSION"));
    notes.log(&args.config);

    let registry = config.load_registry()?;

    if args.dump_registry {
        print!("{}", registry.to_toml()?);
        return Ok(());
    }

    info!(
        services = registry.len(),
        opacity = config.highlight.opacity,
        "Configuration loaded"
    );

    app::run(config, registry);
    Ok(())
}
