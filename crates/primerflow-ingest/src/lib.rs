//! PrimerFlow annotation ingestion
//!
//! Builds the SQLite annotation store the primer filter queries: exons from
//! GENCODE GFF3, variant positions from ClinVar VCF, repeat intervals from
//! UCSC RepeatMasker, and restriction sites scanned out of the genome FASTA.
//!
//! # Overview
//!
//! - **Sources**: [`source::open_source`] reads plain or gzip input
//! - **Parsers**: [`parsers`] stream typed records line by line
//! - **Scanner**: [`scanner::RestrictionScanner`] finds enzyme motifs with a
//!   bounded rolling window
//! - **Loader**: [`loader::BatchLoader`] commits records in fixed-size batches
//! - **Store**: [`store::AnnotationStore`] owns the schema and overlap lookups
//! - **Orchestrator**: [`orchestrator::run_build`] and
//!   [`orchestrator::run_build_parallel`] run a full rebuild
//!
//! # Example
//!
//! ```no_run
//! use primerflow_ingest::{run_build, AnnotationStore, BuildConfig, Table};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = BuildConfig::new("database/raw_data", "database/annotations.db");
//!     let report = run_build(&config)?;
//!     println!("{} rows", report.total_rows());
//!
//!     let store = AnnotationStore::open_read_only(&config.db_path)?;
//!     let blocked = store.overlaps(Table::Snp, "chr1", 10_000, 10_020)?;
//!     println!("primer overlaps a SNP: {}", blocked);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod config;
pub mod enzymes;
pub mod error;
pub mod loader;
pub mod models;
pub mod orchestrator;
pub mod parsers;
pub mod progress;
pub mod scanner;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use config::{BuildConfig, BuildMode};
pub use enzymes::EnzymeTable;
pub use error::{IngestError, Result};
pub use models::{ExonRecord, RepeatInterval, RestrictionSite, VariantRecord};
pub use orchestrator::{build, run_build, run_build_parallel, BuildReport, Dataset, DatasetOutcome};
pub use store::{AnnotationRow, AnnotationStore, Table};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PrimerFlow annotation database builder
#[derive(Parser, Debug)]
#[command(name = "primerflow-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drop and rebuild the annotation database from the raw inputs
    Build {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Directory holding the raw input files
        #[arg(long)]
        raw_data_dir: Option<PathBuf>,

        /// Rows per committed transaction
        #[arg(long)]
        batch_size: Option<usize>,

        /// Bases per restriction scan chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Parse datasets concurrently with a single writer
        #[arg(long)]
        parallel: bool,
    },

    /// Show row counts and a preview of every table
    Inspect {
        /// Database path
        #[arg(long, env = "PRIMERFLOW_DB_PATH", default_value = config::DEFAULT_DB_PATH)]
        db: PathBuf,
    },

    /// List rows of one table overlapping a region
    Lookup {
        /// exon, snp, repeats, or restriction_site
        #[arg(short, long)]
        table: Table,

        #[arg(long)]
        chrom: String,

        /// 1-based inclusive start
        #[arg(long)]
        start: u64,

        /// 1-based inclusive end
        #[arg(long)]
        end: u64,

        /// Database path
        #[arg(long, env = "PRIMERFLOW_DB_PATH", default_value = config::DEFAULT_DB_PATH)]
        db: PathBuf,
    },
}
