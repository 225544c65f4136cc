//! Batched writes into the annotation store
//!
//! Records are pulled from a lazy source and written in batches of
//! `batch_size`, one transaction per batch, so memory stays bounded by one
//! batch and a failure loses at most the batch in flight.

use indicatif::ProgressBar;
use rusqlite::{params, Connection, Statement};
use tracing::debug;

use crate::error::Result;
use crate::models::{ExonRecord, RepeatInterval, RestrictionSite, VariantRecord};
use crate::store::Table;

/// Default number of rows per committed batch
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Convert a coordinate for binding, refusing values SQLite cannot hold
fn sql_coord(coord: u64) -> rusqlite::Result<i64> {
    i64::try_from(coord).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// A record with a home table in the annotation store
pub trait StoreRecord {
    const TABLE: Table;

    /// Bind this record to the table's prepared insert and execute it
    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()>;
}

impl StoreRecord for ExonRecord {
    const TABLE: Table = Table::Exon;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
        stmt.execute(params![
            self.chromosome,
            sql_coord(self.start)?,
            sql_coord(self.end)?,
            self.transcript_id
        ])?;
        Ok(())
    }
}

impl StoreRecord for VariantRecord {
    const TABLE: Table = Table::Snp;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
        stmt.execute(params![self.chromosome, sql_coord(self.position)?])?;
        Ok(())
    }
}

impl StoreRecord for RepeatInterval {
    const TABLE: Table = Table::Repeats;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
        stmt.execute(params![
            self.chromosome,
            sql_coord(self.start)?,
            sql_coord(self.end)?
        ])?;
        Ok(())
    }
}

impl StoreRecord for RestrictionSite {
    const TABLE: Table = Table::RestrictionSite;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
        stmt.execute(params![
            self.chromosome,
            self.enzyme_name,
            sql_coord(self.start)?,
            sql_coord(self.end)?
        ])?;
        Ok(())
    }
}

/// Writes record streams into the store in fixed-size batches
#[derive(Clone)]
pub struct BatchLoader {
    batch_size: usize,
    progress: Option<ProgressBar>,
}

impl Default for BatchLoader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchLoader {
    /// A batch size of zero is treated as one
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            progress: None,
        }
    }

    /// Advance `progress` by the row count of every committed batch
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Drain `records` into `R::TABLE`, returning the number of rows written.
    ///
    /// Every complete batch is committed before the next is read, and the
    /// final partial batch is committed at the end. An empty source commits
    /// nothing.
    pub fn load<R, I>(&self, conn: &mut Connection, records: I) -> Result<usize>
    where
        R: StoreRecord,
        I: IntoIterator<Item = R>,
    {
        let mut batch = Vec::with_capacity(self.batch_size.min(DEFAULT_BATCH_SIZE));
        let mut written = 0;

        for record in records {
            batch.push(record);
            if batch.len() >= self.batch_size {
                written += self.commit_batch(conn, &batch)?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            written += self.commit_batch(conn, &batch)?;
        }

        debug!(table = %R::TABLE, rows = written, "Load complete");
        Ok(written)
    }

    /// Insert `batch` in a single transaction
    pub fn commit_batch<R: StoreRecord>(&self, conn: &mut Connection, batch: &[R]) -> Result<usize> {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(R::TABLE.insert_sql())?;
            for record in batch {
                record.insert(&mut stmt)?;
            }
        }
        tx.commit()?;

        if let Some(progress) = &self.progress {
            progress.inc(batch.len() as u64);
        }
        debug!(table = %R::TABLE, rows = batch.len(), "Committed batch");
        Ok(batch.len())
    }
}
