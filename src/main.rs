use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

mod cli;
mod config;
mod dataset;
mod error;
mod explorer;
mod export;
mod filter;
mod ingest;
mod pagination;
mod plotting;
mod render;
mod search;
mod source;
mod timeframe;

use cli::commands::{ChartCommand, ExportCommand, FacetsCommand, InspectCommand, ShowCommand};
use cli::interactive::InteractiveCommand;

#[derive(Parser)]
#[command(name = "indicator-explorer")]
#[command(about = "Filter, page, chart and export economic-indicator tables")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one page of the filtered table
    Show(ShowCommand),
    /// Draw a line chart for one indicator and country
    Chart(ChartCommand),
    /// Write the filtered table to a CSV file
    Export(ExportCommand),
    /// List the selectable values of each dimension
    Facets(FacetsCommand),
    /// Describe how a data file was classified and parsed
    Inspect(InspectCommand),
    /// Browse interactively with prompts
    Interactive(InteractiveCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let base_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let quiet_deps = "reqwest=warn,hyper=warn,rustls=warn,h2=warn";

    // stdout is reserved for tables, JSON and CSV
    tracing_subscriber::fmt()
        .with_max_level(base_level)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(format!(
            "indicator_explorer={},{}",
            if cli.verbose { "debug" } else { "info" },
            quiet_deps
        )))
        .init();

    debug!("Starting indicator-explorer v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Show(cmd) => cmd.execute().await,
        Commands::Chart(cmd) => cmd.execute().await,
        Commands::Export(cmd) => cmd.execute().await,
        Commands::Facets(cmd) => cmd.execute().await,
        Commands::Inspect(cmd) => cmd.execute().await,
        Commands::Interactive(cmd) => cmd.execute().await,
    }
}
