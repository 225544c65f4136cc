//! Error types for annotation ingestion
//!
//! File-level errors (`MissingInputFile`, `UnreadableInputFile`) are reported
//! per dataset and never abort a build. Line-level errors (`MalformedLine`)
//! never leave a parser. Store errors (`StoreWrite`) are fatal.

use std::path::PathBuf;
use thiserror::Error;

use crate::parsers::LineError;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// A configured source file does not exist
    #[error("Input file not found: {}", path.display())]
    MissingInputFile { path: PathBuf },

    /// I/O or decompression failure while opening or streaming a source
    #[error("Failed to read {}: {source}", path.display())]
    UnreadableInputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single line failed field-count or type checks
    #[error("Malformed line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: LineError,
    },

    /// Schema reset, insert, or commit failed
    #[error("Store write failed: {0}")]
    StoreWrite(#[from] rusqlite::Error),

    #[error(transparent)]
    Config(#[from] primerflow_common::PrimerflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Build task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IngestError {
    /// Create an unreadable-input error for `path`
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::UnreadableInputFile {
            path: path.into(),
            source,
        }
    }

    /// True for errors that only cost one dataset, not the whole build
    pub fn is_dataset_local(&self) -> bool {
        matches!(
            self,
            Self::MissingInputFile { .. } | Self::UnreadableInputFile { .. } | Self::MalformedLine { .. }
        )
    }
}
