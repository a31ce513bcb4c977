//! Swasya Console
//!
//! Loads (or builds) the consultation index, then answers questions typed
//! on stdin until `quit`, `exit` or `q`.

use clap::Parser;
use swasya_common::{
    config::AppConfig,
    telemetry::{self, LogSink},
    ConsultationQueryEngine, VERSION,
};
use swasya_query::console::{print_banner, run_console};
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "console", about = "Interactive questions over indexed consultations", version)]
struct Cli {
    /// Rebuild the index from the store before starting
    #[arg(long)]
    rebuild: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    // Keep stdout for the conversation
    telemetry::init_tracing(&config.observability, LogSink::Stderr);
    info!(version = VERSION, "Starting Swasya console");

    let engine = ConsultationQueryEngine::from_config(&config)?;
    let manifest = if cli.rebuild {
        engine.build_index().await?
    } else {
        engine.load_index().await?
    };
    info!(nodes = manifest.node_count, "Index ready");

    let mut stdout = std::io::stdout();
    print_banner(&mut stdout, &engine)?;

    let asked = run_console(&engine, BufReader::new(tokio::io::stdin()), &mut stdout).await?;
    info!(asked, "Console session ended");

    Ok(())
}
