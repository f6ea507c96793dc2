//! obra-glb - Inspect the structure of GLB building models
//!
//! Reads the container, extracts the JSON scene description and prints node
//! hierarchies, naming-prefix statistics and service matches. Used to tune
//! the service registry keyword lists against exported models.

mod container;
mod document;
mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use obra_core::{builtin_registry, ServiceRegistry};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::container::GlbFile;

#[derive(Parser, Debug)]
#[command(name = "obra-glb")]
#[command(about = "Structural analysis of GLB building models")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Header and chunk table
    Info { file: PathBuf },
    /// Node hierarchy with mesh names and primitive counts
    Tree { file: PathBuf },
    /// Node name prefix statistics
    Prefixes { file: PathBuf },
    /// Match node names against the service registry
    Classify {
        file: PathBuf,
        /// Service registry TOML instead of the compiled-in one
        #[arg(short, long)]
        registry: Option<PathBuf>,
    },
}

fn load(path: &Path) -> Result<GlbFile> {
    GlbFile::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_registry(path: Option<&Path>) -> Result<ServiceRegistry> {
    match path {
        Some(path) => ServiceRegistry::from_file(path)
            .with_context(|| format!("Failed to load service registry {}", path.display())),
        None => Ok(builtin_registry()?),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Info { file } => {
            let glb = load(&file)?;
            if args.json {
                // Pretty-printed JSON chunk
                println!("{}", serde_json::to_string_pretty(&glb.json_value()?)?);
            } else {
                print!("{}", report::info(&glb, &glb.document()?)?);
            }
        }
        Command::Tree { file } => {
            let doc = load(&file)?.document()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                print!("{}", report::tree(&doc)?);
            }
        }
        Command::Prefixes { file } => {
            let doc = load(&file)?.document()?;
            if args.json {
                let counts = report::prefix_counts(&doc);
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                print!("{}", report::prefixes(&doc)?);
            }
        }
        Command::Classify { file, registry } => {
            let doc = load(&file)?.document()?;
            let registry = load_registry(registry.as_deref())?;
            let result = report::classify(&doc, &registry);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::classify_text(&result, &registry)?);
            }
        }
    }

    Ok(())
}
