//! Full annotation rebuild
//!
//! A build resets the schema once, then loads the four datasets
//! independently. A dataset whose file is missing or breaks mid-read is
//! reported in its [`DatasetOutcome`] and the build moves on; only store
//! failures abort the whole run.
//!
//! Two schedules are available:
//! - [`run_build`] loads one dataset after another on the calling thread.
//! - [`run_build_parallel`] parses every dataset on its own blocking task and
//!   funnels batches through a bounded channel to a single writer, so store
//!   writes stay serialized and each batch commits atomically.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{BuildConfig, BuildMode};
use crate::error::{IngestError, Result};
use crate::loader::{BatchLoader, StoreRecord, DEFAULT_BATCH_SIZE};
use crate::models::{ExonRecord, RepeatInterval, RestrictionSite, VariantRecord};
use crate::parsers::{Gff3Decoder, RecordSource, RecordStream, RmskDecoder, VcfDecoder};
use crate::progress::{create_record_spinner, format_count};
use crate::scanner::RestrictionScanner;
use crate::source::{open_source, SourceOutcome, SourceReader};
use crate::store::{AnnotationStore, Table};

/// Batches buffered between parsers and the writer in a parallel build
pub const CHANNEL_CAPACITY: usize = 4;

/// One of the four inputs of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Exon,
    Variant,
    Repeat,
    RestrictionSite,
}

impl Dataset {
    pub const ALL: [Dataset; 4] = [
        Dataset::Exon,
        Dataset::Variant,
        Dataset::Repeat,
        Dataset::RestrictionSite,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dataset::Exon => "exons",
            Dataset::Variant => "variants",
            Dataset::Repeat => "repeats",
            Dataset::RestrictionSite => "restriction_sites",
        }
    }

    /// Table this dataset is loaded into
    pub fn table(self) -> Table {
        match self {
            Dataset::Exon => Table::Exon,
            Dataset::Variant => Table::Snp,
            Dataset::Repeat => Table::Repeats,
            Dataset::RestrictionSite => Table::RestrictionSite,
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened to one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetOutcome {
    /// Read to the end
    Loaded { rows: usize },
    /// Input file does not exist; table left empty
    Missing,
    /// Input file exists but could not be opened; table left empty
    Unreadable { error: String },
    /// Reading failed part-way; the rows before the failure are kept
    Interrupted { rows: usize, error: String },
}

impl DatasetOutcome {
    pub fn rows(&self) -> usize {
        match self {
            DatasetOutcome::Loaded { rows } | DatasetOutcome::Interrupted { rows, .. } => *rows,
            DatasetOutcome::Missing | DatasetOutcome::Unreadable { .. } => 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, DatasetOutcome::Loaded { .. })
    }

    /// A stream that stopped on a dataset-local error is `Interrupted`; any
    /// other error aborts the build
    fn finished(rows: usize, failure: Option<IngestError>) -> Result<Self> {
        match failure {
            Some(err) if err.is_dataset_local() => Ok(DatasetOutcome::Interrupted {
                rows,
                error: err.to_string(),
            }),
            Some(err) => Err(err),
            None => Ok(DatasetOutcome::Loaded { rows }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub dataset: Dataset,
    pub path: PathBuf,
    pub outcome: DatasetOutcome,
    pub elapsed: Duration,
}

/// Summary of a finished build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub db_path: PathBuf,
    pub mode: BuildMode,
    pub datasets: Vec<DatasetReport>,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn total_rows(&self) -> usize {
        self.datasets.iter().map(|d| d.outcome.rows()).sum()
    }

    pub fn outcome(&self, dataset: Dataset) -> Option<&DatasetOutcome> {
        self.datasets
            .iter()
            .find(|d| d.dataset == dataset)
            .map(|d| &d.outcome)
    }

    /// True when every dataset was read to the end
    pub fn is_complete(&self) -> bool {
        self.datasets.iter().all(|d| d.outcome.is_complete())
    }
}

/// Run a build with the schedule selected by `config.mode`
pub async fn build(config: &BuildConfig) -> Result<BuildReport> {
    match config.mode {
        BuildMode::Sequential => {
            let config = config.clone();
            tokio::task::spawn_blocking(move || run_build(&config)).await?
        },
        BuildMode::Parallel => run_build_parallel(config).await,
    }
}

/// Validate `config`, open the store, and reset its schema
fn prepare(config: &BuildConfig) -> Result<(AnnotationStore, RestrictionScanner)> {
    config.validate()?;
    let scanner = RestrictionScanner::new(config.enzymes.clone(), config.chunk_size)?;
    let mut store = AnnotationStore::open(&config.db_path)?;
    store.reset_schema()?;
    Ok((store, scanner))
}

/// Open a dataset's input, turning a missing or unreadable file into its
/// outcome
fn open_dataset(
    dataset: Dataset,
    path: &Path,
) -> std::result::Result<SourceReader, DatasetOutcome> {
    match open_source(path) {
        SourceOutcome::Found(reader) => Ok(reader),
        SourceOutcome::Missing => {
            warn!(dataset = %dataset, path = %path.display(), "Input file not found, skipping dataset");
            Err(DatasetOutcome::Missing)
        },
        SourceOutcome::Unreadable(e) => {
            let error = IngestError::unreadable(path, e);
            warn!(dataset = %dataset, path = %path.display(), error = %error, "Input file unreadable, skipping dataset");
            Err(DatasetOutcome::Unreadable {
                error: error.to_string(),
            })
        },
    }
}

fn log_outcome(dataset: Dataset, outcome: &DatasetOutcome, elapsed: Duration) {
    match outcome {
        DatasetOutcome::Loaded { rows } => info!(
            dataset = %dataset,
            rows = *rows,
            elapsed_ms = elapsed.as_millis() as u64,
            "Loaded {} {}",
            format_count(*rows as u64),
            dataset
        ),
        DatasetOutcome::Interrupted { rows, error } => warn!(
            dataset = %dataset,
            rows = *rows,
            error = %error,
            "Dataset interrupted, keeping rows read before the failure"
        ),
        DatasetOutcome::Missing | DatasetOutcome::Unreadable { .. } => {},
    }
}

// ============================================================================
// Sequential build
// ============================================================================

/// Rebuild the store from every configured input, one dataset at a time
pub fn run_build(config: &BuildConfig) -> Result<BuildReport> {
    let started = Instant::now();
    let (mut store, scanner) = prepare(config)?;
    info!(db = %config.db_path.display(), "Starting sequential build");

    let mut datasets = Vec::with_capacity(Dataset::ALL.len());
    for dataset in Dataset::ALL {
        let path = config.source_path(dataset);
        let dataset_started = Instant::now();

        let outcome = match open_dataset(dataset, &path) {
            Ok(reader) => {
                let progress = create_record_spinner(dataset.name());
                let loader = BatchLoader::new(config.batch_size).with_progress(progress.clone());
                let outcome = load_dataset(&mut store, &loader, &scanner, dataset, &path, reader);
                progress.finish_and_clear();
                outcome?
            },
            Err(outcome) => outcome,
        };

        let elapsed = dataset_started.elapsed();
        log_outcome(dataset, &outcome, elapsed);
        datasets.push(DatasetReport {
            dataset,
            path,
            outcome,
            elapsed,
        });
    }

    let report = BuildReport {
        db_path: config.db_path.clone(),
        mode: BuildMode::Sequential,
        datasets,
        elapsed: started.elapsed(),
    };
    info!(
        rows = report.total_rows(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Build finished"
    );
    Ok(report)
}

fn load_dataset(
    store: &mut AnnotationStore,
    loader: &BatchLoader,
    scanner: &RestrictionScanner,
    dataset: Dataset,
    path: &Path,
    reader: SourceReader,
) -> Result<DatasetOutcome> {
    let conn = store.connection_mut();
    match dataset {
        Dataset::Exon => drain(loader, conn, RecordStream::new(Gff3Decoder, reader).with_path(path)),
        Dataset::Variant => drain(loader, conn, RecordStream::new(VcfDecoder, reader).with_path(path)),
        Dataset::Repeat => drain(loader, conn, RecordStream::new(RmskDecoder, reader).with_path(path)),
        Dataset::RestrictionSite => drain(loader, conn, scanner.stream(reader).with_path(path)),
    }
}

/// Load everything `source` yields, then check whether it ended early
fn drain<S, R>(loader: &BatchLoader, conn: &mut rusqlite::Connection, mut source: S) -> Result<DatasetOutcome>
where
    S: RecordSource<Item = R>,
    R: StoreRecord,
{
    let rows = loader.load(conn, source.by_ref())?;
    DatasetOutcome::finished(rows, source.take_failure())
}

// ============================================================================
// Parallel build
// ============================================================================

/// A batch of records on its way to the writer
enum WriteBatch {
    Exons(Vec<ExonRecord>),
    Variants(Vec<VariantRecord>),
    Repeats(Vec<RepeatInterval>),
    Sites(Vec<RestrictionSite>),
}

impl WriteBatch {
    fn dataset(&self) -> Dataset {
        match self {
            WriteBatch::Exons(_) => Dataset::Exon,
            WriteBatch::Variants(_) => Dataset::Variant,
            WriteBatch::Repeats(_) => Dataset::Repeat,
            WriteBatch::Sites(_) => Dataset::RestrictionSite,
        }
    }

    fn commit(&self, loader: &BatchLoader, conn: &mut rusqlite::Connection) -> Result<usize> {
        match self {
            WriteBatch::Exons(batch) => loader.commit_batch(conn, batch),
            WriteBatch::Variants(batch) => loader.commit_batch(conn, batch),
            WriteBatch::Repeats(batch) => loader.commit_batch(conn, batch),
            WriteBatch::Sites(batch) => loader.commit_batch(conn, batch),
        }
    }
}

/// How a parser task ended
enum Produced {
    Skipped(DatasetOutcome),
    Drained { failure: Option<IngestError> },
}

/// Rebuild the store with one parser task per dataset and a single writer.
///
/// Table contents equal those of [`run_build`]; only the row order across
/// datasets may differ.
pub async fn run_build_parallel(config: &BuildConfig) -> Result<BuildReport> {
    let started = Instant::now();
    let prepare_config = config.clone();
    let (mut store, scanner) = tokio::task::spawn_blocking(move || prepare(&prepare_config)).await??;
    info!(db = %config.db_path.display(), "Starting parallel build");

    let (tx, mut rx) = mpsc::channel::<WriteBatch>(CHANNEL_CAPACITY);

    let writer_loader = BatchLoader::new(config.batch_size);
    let writer = tokio::task::spawn_blocking(move || -> Result<BTreeMap<Dataset, usize>> {
        let mut rows = BTreeMap::new();
        while let Some(batch) = rx.blocking_recv() {
            let written = batch.commit(&writer_loader, store.connection_mut())?;
            *rows.entry(batch.dataset()).or_insert(0) += written;
        }
        Ok(rows)
    });

    let mut producers = Vec::with_capacity(Dataset::ALL.len());
    for dataset in Dataset::ALL {
        let path = config.source_path(dataset);
        let tx = tx.clone();
        let scanner = scanner.clone();
        let batch_size = config.batch_size;
        let task_path = path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let dataset_started = Instant::now();
            let produced = produce(dataset, &task_path, &scanner, batch_size, &tx);
            (produced, dataset_started.elapsed())
        });
        producers.push((dataset, path, handle));
    }
    // The writer stops once every producer has dropped its sender
    drop(tx);

    let mut finished = Vec::with_capacity(producers.len());
    for (dataset, path, handle) in producers {
        let (produced, elapsed) = handle.await?;
        finished.push((dataset, path, produced, elapsed));
    }
    let rows = writer.await??;

    let datasets = finished
        .into_iter()
        .map(|(dataset, path, produced, elapsed)| {
            let outcome = match produced {
                Produced::Skipped(outcome) => outcome,
                Produced::Drained { failure } => {
                    DatasetOutcome::finished(rows.get(&dataset).copied().unwrap_or(0), failure)?
                },
            };
            log_outcome(dataset, &outcome, elapsed);
            Ok(DatasetReport {
                dataset,
                path,
                outcome,
                elapsed,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let report = BuildReport {
        db_path: config.db_path.clone(),
        mode: BuildMode::Parallel,
        datasets,
        elapsed: started.elapsed(),
    };
    info!(
        rows = report.total_rows(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Build finished"
    );
    Ok(report)
}

/// Parse one dataset and send its records to the writer in batches
fn produce(
    dataset: Dataset,
    path: &Path,
    scanner: &RestrictionScanner,
    batch_size: usize,
    tx: &mpsc::Sender<WriteBatch>,
) -> Produced {
    let reader = match open_dataset(dataset, path) {
        Ok(reader) => reader,
        Err(outcome) => return Produced::Skipped(outcome),
    };
    let failure = match dataset {
        Dataset::Exon => send_batches(
            RecordStream::new(Gff3Decoder, reader).with_path(path),
            batch_size,
            tx,
            WriteBatch::Exons,
        ),
        Dataset::Variant => send_batches(
            RecordStream::new(VcfDecoder, reader).with_path(path),
            batch_size,
            tx,
            WriteBatch::Variants,
        ),
        Dataset::Repeat => send_batches(
            RecordStream::new(RmskDecoder, reader).with_path(path),
            batch_size,
            tx,
            WriteBatch::Repeats,
        ),
        Dataset::RestrictionSite => send_batches(
            scanner.stream(reader).with_path(path),
            batch_size,
            tx,
            WriteBatch::Sites,
        ),
    };
    Produced::Drained { failure }
}

/// Chunk `source` into batches and hand them to the writer. Stops early if
/// the writer has gone away (its error is reported by the writer task).
fn send_batches<S, R>(
    mut source: S,
    batch_size: usize,
    tx: &mpsc::Sender<WriteBatch>,
    wrap: fn(Vec<R>) -> WriteBatch,
) -> Option<IngestError>
where
    S: RecordSource<Item = R>,
{
    let batch_size = batch_size.max(1);
    let capacity = batch_size.min(DEFAULT_BATCH_SIZE);
    let mut batch = Vec::with_capacity(capacity);

    for record in source.by_ref() {
        batch.push(record);
        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(capacity));
            if tx.blocking_send(wrap(full)).is_err() {
                return None;
            }
        }
    }
    if !batch.is_empty() && tx.blocking_send(wrap(batch)).is_err() {
        return None;
    }
    source.take_failure()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_tables() {
        let tables: Vec<Table> = Dataset::ALL.iter().map(|d| d.table()).collect();
        assert_eq!(tables, Table::ALL.to_vec());
        assert_eq!(Dataset::Variant.to_string(), "variants");
    }

    #[test]
    fn test_outcome_rows() {
        assert_eq!(DatasetOutcome::Loaded { rows: 3 }.rows(), 3);
        assert_eq!(DatasetOutcome::Missing.rows(), 0);
        let interrupted = DatasetOutcome::finished(
            7,
            Some(IngestError::unreadable(
                "x.gz",
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated"),
            )),
        )
        .unwrap();
        assert_eq!(interrupted.rows(), 7);
        assert!(!interrupted.is_complete());
    }

    #[test]
    fn test_build_wide_failure_is_not_an_outcome() {
        let fatal = IngestError::from(primerflow_common::PrimerflowError::config("bad"));
        assert!(DatasetOutcome::finished(3, Some(fatal)).is_err());
        assert_eq!(
            DatasetOutcome::finished(3, None).unwrap(),
            DatasetOutcome::Loaded { rows: 3 }
        );
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(DatasetOutcome::Loaded { rows: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "loaded", "rows": 2}));
        let json = serde_json::to_value(DatasetOutcome::Missing).unwrap();
        assert_eq!(json, serde_json::json!({"status": "missing"}));
    }

    #[test]
    fn test_sequential_build_with_no_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::new(dir.path().join("raw"), dir.path().join("db/annotations.db"));

        let report = run_build(&config).unwrap();
        assert_eq!(report.total_rows(), 0);
        assert!(report
            .datasets
            .iter()
            .all(|d| d.outcome == DatasetOutcome::Missing));

        // Schema exists even though nothing was loaded
        let store = AnnotationStore::open_read_only(&config.db_path).unwrap();
        for table in Table::ALL {
            assert_eq!(store.row_count(table).unwrap(), 0);
        }
    }

    #[test]
    fn test_invalid_config_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfig::new(dir.path(), dir.path().join("out.db"));
        config.batch_size = 0;

        assert!(matches!(run_build(&config), Err(IngestError::Config(_))));
        assert!(!config.db_path.exists());
    }
}
