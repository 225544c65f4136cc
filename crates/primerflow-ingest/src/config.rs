//! Build configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables (a `.env` file is honoured), then CLI flags applied
//! by the binary.
//!
//! ```toml
//! db_path = "database/annotations.db"
//! raw_data_dir = "database/raw_data"
//! batch_size = 50000
//! mode = "parallel"
//!
//! [enzymes]
//! EcoRI = "GAATTC"
//! XhoI = "CTCGAG"
//! ```

use primerflow_common::PrimerflowError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::enzymes::EnzymeTable;
use crate::error::Result;
use crate::loader::DEFAULT_BATCH_SIZE;
use crate::orchestrator::Dataset;
use crate::scanner::DEFAULT_CHUNK_SIZE;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_DB_PATH: &str = "database/annotations.db";
pub const DEFAULT_RAW_DATA_DIR: &str = "database/raw_data";
pub const DEFAULT_EXON_FILE: &str = "gencode.v49.annotation.gff3.gz";
pub const DEFAULT_VARIANT_FILE: &str = "clinvar.vcf.gz";
pub const DEFAULT_REPEAT_FILE: &str = "rmsk.txt.gz";
pub const DEFAULT_GENOME_FILE: &str = "GRCh38.primary_assembly.genome.fa.gz";

/// How datasets are scheduled during a build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// One dataset after another on the calling thread
    #[default]
    Sequential,
    /// Parsers on blocking tasks, one writer
    Parallel,
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "serial" => Ok(BuildMode::Sequential),
            "parallel" => Ok(BuildMode::Parallel),
            other => Err(format!("invalid build mode '{}' (expected sequential or parallel)", other)),
        }
    }
}

/// Everything a build needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Output database file
    pub db_path: PathBuf,
    /// Directory holding the raw input files
    pub raw_data_dir: PathBuf,
    /// Input file names, resolved against `raw_data_dir` unless absolute
    pub exon_file: PathBuf,
    pub variant_file: PathBuf,
    pub repeat_file: PathBuf,
    pub genome_file: PathBuf,
    /// Rows per committed transaction
    pub batch_size: usize,
    /// Bases per restriction scan chunk
    pub chunk_size: usize,
    pub enzymes: EnzymeTable,
    pub mode: BuildMode,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            raw_data_dir: PathBuf::from(DEFAULT_RAW_DATA_DIR),
            exon_file: PathBuf::from(DEFAULT_EXON_FILE),
            variant_file: PathBuf::from(DEFAULT_VARIANT_FILE),
            repeat_file: PathBuf::from(DEFAULT_REPEAT_FILE),
            genome_file: PathBuf::from(DEFAULT_GENOME_FILE),
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            enzymes: EnzymeTable::default_panel(),
            mode: BuildMode::Sequential,
        }
    }
}

impl BuildConfig {
    /// Defaults with every input file under `raw_data_dir` and the store at
    /// `db_path`
    pub fn new(raw_data_dir: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            raw_data_dir: raw_data_dir.into(),
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// Read a TOML file; keys it omits keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PrimerflowError::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            PrimerflowError::config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded build configuration file");
        Ok(config)
    }

    /// Defaults or `file`, then `.env` and process environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        // A missing .env is normal
        let _ = dotenvy::dotenv();
        config.merge_env()?;
        Ok(config)
    }

    /// Override fields from `PRIMERFLOW_*` environment variables.
    ///
    /// `DB_PATH` is accepted as a fallback for `PRIMERFLOW_DB_PATH`.
    pub fn merge_env(&mut self) -> Result<()> {
        if let Some(path) = env_var("PRIMERFLOW_DB_PATH").or_else(|| env_var("DB_PATH")) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(dir) = env_var("PRIMERFLOW_RAW_DATA_DIR") {
            self.raw_data_dir = PathBuf::from(dir);
        }
        if let Some(value) = env_var("PRIMERFLOW_BATCH_SIZE") {
            self.batch_size = parse_env_usize("PRIMERFLOW_BATCH_SIZE", &value)?;
        }
        if let Some(value) = env_var("PRIMERFLOW_CHUNK_SIZE") {
            self.chunk_size = parse_env_usize("PRIMERFLOW_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = env_var("PRIMERFLOW_BUILD_MODE") {
            self.mode = value.parse().map_err(PrimerflowError::config)?;
        }
        Ok(())
    }

    /// Reject settings the build cannot run with. Called before the store is
    /// touched.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PrimerflowError::config("batch_size must be at least 1").into());
        }
        if self.chunk_size == 0 {
            return Err(PrimerflowError::config("chunk_size must be at least 1").into());
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(PrimerflowError::config("db_path must not be empty").into());
        }
        Ok(())
    }

    /// Full path of the input file for `dataset`
    pub fn source_path(&self, dataset: Dataset) -> PathBuf {
        let file = match dataset {
            Dataset::Exon => &self.exon_file,
            Dataset::Variant => &self.variant_file,
            Dataset::Repeat => &self.repeat_file,
            Dataset::RestrictionSite => &self.genome_file,
        };
        self.raw_data_dir.join(file)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_usize(name: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        PrimerflowError::config(format!("{} must be a non-negative integer, got '{}'", name, value))
            .into()
    })
}
