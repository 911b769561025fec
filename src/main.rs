use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use langgrid::{config, grid, pool, report};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the record stream against the grid and print the report
    Analyze {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Total pool size (coordinator plus workers); overrides the config
        #[arg(long)]
        processes: Option<usize>,
        /// Record lines per batch message; overrides the config
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Analyze {
            config,
            processes,
            batch_size,
        } => {
            let mut app_config = config::AppConfig::load_from_file(config)?;
            if let Some(n) = processes {
                app_config.run.processes = *n;
            }
            if let Some(n) = batch_size {
                app_config.run.batch_size_per_message = *n;
            }
            app_config.run.validate()?;

            let grid = Arc::new(grid::Grid::load(&app_config.input.grid)?);
            info!(cells = grid.len(), "loaded grid");

            let file = File::open(&app_config.input.records).with_context(|| {
                format!("Failed to open record file: {:?}", app_config.input.records)
            })?;

            let started = Instant::now();
            let global = pool::run(BufReader::new(file), &grid, &app_config.run)?;
            info!(
                classified = global.classified(),
                dropped = global.dropped,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "run complete"
            );

            report::render(&mut io::stdout().lock(), &grid, &global)?;
        }
    }

    Ok(())
}
