//! Swasya Ingestion
//!
//! Builds the consultation index:
//! 1. Extracts consultations joined with their patients
//! 2. Renders one document per consultation
//! 3. Chunks, embeds and persists the index
//!
//! Without `--rebuild` a loadable index already on disk is reused.

use clap::Parser;
use std::path::PathBuf;
use swasya_common::{
    config::AppConfig,
    telemetry::{self, LogSink},
    ConsultationQueryEngine, VERSION,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ingestion", about = "Build or refresh the consultation index", version)]
struct Cli {
    /// Extract and rebuild even when a loadable index exists
    #[arg(long)]
    rebuild: bool,

    /// Index directory (overrides index.persist_dir)
    #[arg(long)]
    persist_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(dir) = cli.persist_dir {
        config.index.persist_dir = dir;
    }

    // Logs go to stderr; stdout carries the summary line
    telemetry::init_tracing(&config.observability, LogSink::Stderr);

    info!(version = VERSION, rebuild = cli.rebuild, "Starting Swasya ingestion");

    let engine = ConsultationQueryEngine::from_config(&config).map_err(|e| {
        tracing::error!(error = %e, "Failed to configure engine");
        e
    })?;

    let result = if cli.rebuild {
        engine.build_index().await
    } else {
        engine.load_index().await
    };

    let manifest = result.map_err(|e| {
        tracing::error!(error = %e, "Index build failed");
        e
    })?;

    println!(
        "Index ready at {}: {} node(s), embedder {} ({} dims), built {}",
        engine.persist_dir().display(),
        manifest.node_count,
        manifest.embed_model,
        manifest.dimension,
        manifest.built_at.format("%Y-%m-%d %H:%M:%S"),
    );

    Ok(())
}
