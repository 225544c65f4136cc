//! `primerflow-ingest build` command implementation
//!
//! Resolves the layered configuration, runs a full rebuild, and prints a
//! per-dataset summary.

use colored::Colorize;
use std::path::PathBuf;

use super::text_table;
use crate::config::{BuildConfig, BuildMode};
use crate::error::Result;
use crate::orchestrator::{build, BuildReport, DatasetOutcome};
use crate::progress::format_count;

/// Settings given on the command line; they win over file and environment
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub raw_data_dir: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub chunk_size: Option<usize>,
    pub parallel: bool,
}

impl BuildOverrides {
    pub fn apply(&self, config: &mut BuildConfig) {
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(dir) = &self.raw_data_dir {
            config.raw_data_dir = dir.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if self.parallel {
            config.mode = BuildMode::Parallel;
        }
    }

    /// Defaults, then the config file, then the environment, then these flags
    pub fn resolve(&self) -> Result<BuildConfig> {
        let mut config = BuildConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

/// Rebuild the annotation database
pub async fn run(overrides: BuildOverrides) -> Result<BuildReport> {
    let config = overrides.resolve()?;

    println!(
        "{} {} ({})",
        "Building".cyan().bold(),
        config.db_path.display(),
        match config.mode {
            BuildMode::Sequential => "sequential",
            BuildMode::Parallel => "parallel",
        }
    );

    let report = build(&config).await?;
    print_report(&report);
    Ok(report)
}

fn status_cell(outcome: &DatasetOutcome) -> String {
    match outcome {
        DatasetOutcome::Loaded { .. } => "loaded".green().to_string(),
        DatasetOutcome::Missing => "missing".yellow().to_string(),
        DatasetOutcome::Unreadable { .. } => "unreadable".red().to_string(),
        DatasetOutcome::Interrupted { .. } => "interrupted".red().to_string(),
    }
}

pub fn print_report(report: &BuildReport) {
    let mut table = text_table();
    table.set_header(vec!["Dataset", "Table", "Status", "Rows", "Time", "Source"]);

    for dataset in &report.datasets {
        table.add_row(vec![
            dataset.dataset.name().to_string(),
            dataset.dataset.table().name().to_string(),
            status_cell(&dataset.outcome),
            format_count(dataset.outcome.rows() as u64),
            format!("{:.1}s", dataset.elapsed.as_secs_f64()),
            dataset.path.display().to_string(),
        ]);
    }

    println!();
    println!("{}", table);

    for dataset in &report.datasets {
        match &dataset.outcome {
            DatasetOutcome::Unreadable { error } | DatasetOutcome::Interrupted { error, .. } => {
                println!("  {} {}: {}", "!".red().bold(), dataset.dataset, error);
            },
            _ => {},
        }
    }

    println!(
        "{} {} rows in {:.1}s",
        "Done:".green().bold(),
        format_count(report.total_rows() as u64),
        report.elapsed.as_secs_f64()
    );
}
