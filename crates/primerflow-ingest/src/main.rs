//! PrimerFlow ingestion CLI - Main entry point

use anyhow::Context;
use clap::Parser;
use primerflow_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use primerflow_ingest::commands::{self, build::BuildOverrides};
use primerflow_ingest::{Cli, Commands};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("primerflow-ingest")
        .filter_directives("rusqlite=warn")
        .build();

    // Environment variables take precedence over the flag-derived defaults
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI still works without logging
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Build {
            config,
            db,
            raw_data_dir,
            batch_size,
            chunk_size,
            parallel,
        } => {
            let overrides = BuildOverrides {
                config,
                db,
                raw_data_dir,
                batch_size,
                chunk_size,
                parallel,
            };
            commands::build::run(overrides)
                .await
                .context("Annotation build failed")?;
        },

        Commands::Inspect { db } => {
            commands::inspect::run(&db)
                .with_context(|| format!("Failed to inspect {}", db.display()))?;
        },

        Commands::Lookup {
            table,
            chrom,
            start,
            end,
            db,
        } => {
            commands::lookup::run(&db, table, &chrom, start, end)
                .with_context(|| format!("Lookup against {} failed", db.display()))?;
        },
    }
    Ok(())
}
