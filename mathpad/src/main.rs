//! Mathpad - live LaTeX math preview for plain text documents

use anyhow::{Context, Result};
use clap::Parser;
use mathpad_core::{Config, Document};
use mathpad_preview::{engine, FileSink};
use std::path::PathBuf;

/// Render a document with inline and display math to a live HTML preview
#[derive(Parser, Debug)]
#[command(name = "mathpad")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the document
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Where to write the preview (defaults to FILE with an .html extension)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Use this config file instead of the platform default
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Render once and exit
    #[arg(long)]
    once: bool,

    /// Start with live preview disabled (type `live on` to enable it)
    #[arg(long)]
    no_live: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    if args.no_live {
        config.preview.live = false;
    }

    // Load document
    let doc = Document::load(&args.file)
        .with_context(|| format!("Failed to load document: {}", args.file.display()))?;

    let output = args.output.clone().unwrap_or_else(|| {
        let html = doc.path.with_extension("html");
        // Never overwrite the document itself
        if html == doc.path {
            doc.path.with_extension("preview.html")
        } else {
            html
        }
    });
    let title = doc
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mathpad".to_string());

    let engine = engine::from_config(&config.engine, &title)?;
    let sink = Box::new(FileSink::new(&output));
    log::info!("Writing preview to {}", output.display());

    if args.once {
        mathpad_preview::render_once(&config, &doc, engine, sink).context("Preview render failed")
    } else {
        mathpad_preview::run(&config, doc, engine, sink).context("Preview error")
    }
}
