//! Read-side queries: overlap lookups and table inspection

use rusqlite::params;
use serde::Serialize;

use super::{AnnotationRow, AnnotationStore, Table};
use crate::error::Result;

/// Rows shown by [`AnnotationStore::summary`]
pub const PREVIEW_ROWS: usize = 5;

/// Row count and a short preview of one table
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table: Table,
    pub rows: u64,
    pub preview: Vec<AnnotationRow>,
}

/// No stored coordinate exceeds `i64::MAX`, so clamping a query bound there
/// leaves the answer unchanged
fn query_coord(coord: u64) -> i64 {
    i64::try_from(coord).unwrap_or(i64::MAX)
}

impl AnnotationStore {
    /// Does any row of `table` on `chromosome` intersect `[start, end]`?
    ///
    /// This is the question the primer filter asks for every candidate, e.g.
    /// "does this primer span a known SNP or an EcoRI site".
    pub fn overlaps(&self, table: Table, chromosome: &str, start: u64, end: u64) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
            table.name(),
            table.overlap_predicate()
        );
        let found: bool = self.conn.query_row(
            &sql,
            params![chromosome, query_coord(start), query_coord(end)],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// All rows of `table` on `chromosome` intersecting `[start, end]`
    pub fn find_overlapping(
        &self,
        table: Table,
        chromosome: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<AnnotationRow>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY id",
            table.columns(),
            table.name(),
            table.overlap_predicate()
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params![chromosome, query_coord(start), query_coord(end)], |row| {
                table.decode_row(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn row_count(&self, table: Table) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Rows of `table` in insertion order, optionally capped at `limit`
    pub fn rows(&self, table: Table, limit: Option<usize>) -> Result<Vec<AnnotationRow>> {
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id LIMIT ?1",
            table.columns(),
            table.name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([limit], |row| table.decode_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Row count plus the first few rows of `table`
    pub fn summary(&self, table: Table) -> Result<TableSummary> {
        Ok(TableSummary {
            table,
            rows: self.row_count(table)?,
            preview: self.rows(table, Some(PREVIEW_ROWS))?,
        })
    }
}
