//! File-backed annotation store
//!
//! A single SQLite file with four tables (`exon`, `snp`, `repeats`,
//! `restriction_site`), each indexed on its chromosome and start coordinate.
//! The build is the only writer; the downstream primer filter opens the file
//! read-only and asks overlap questions through [`AnnotationStore::overlaps`].

mod query;
pub mod schema;

pub use query::TableSummary;

use rusqlite::{Connection, OpenFlags, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::models::{ExonRecord, RepeatInterval, RestrictionSite, VariantRecord};

/// One of the four annotation tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Exon,
    Snp,
    Repeats,
    RestrictionSite,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Exon, Table::Snp, Table::Repeats, Table::RestrictionSite];

    pub fn name(self) -> &'static str {
        match self {
            Table::Exon => "exon",
            Table::Snp => "snp",
            Table::Repeats => "repeats",
            Table::RestrictionSite => "restriction_site",
        }
    }

    /// Data columns, without the surrogate key
    pub(crate) fn columns(self) -> &'static str {
        match self {
            Table::Exon => r#"chrom, start, "end", transcript_id"#,
            Table::Snp => "chrom, pos",
            Table::Repeats => r#"chrom, start, "end""#,
            Table::RestrictionSite => r#"chrom, name, start, "end""#,
        }
    }

    pub(crate) fn insert_sql(self) -> &'static str {
        match self {
            Table::Exon => {
                r#"INSERT INTO exon (chrom, start, "end", transcript_id) VALUES (?1, ?2, ?3, ?4)"#
            },
            Table::Snp => "INSERT INTO snp (chrom, pos) VALUES (?1, ?2)",
            Table::Repeats => r#"INSERT INTO repeats (chrom, start, "end") VALUES (?1, ?2, ?3)"#,
            Table::RestrictionSite => {
                r#"INSERT INTO restriction_site (chrom, name, start, "end") VALUES (?1, ?2, ?3, ?4)"#
            },
        }
    }

    /// Predicate matching rows on `?1` that intersect `[?2, ?3]`
    pub(crate) fn overlap_predicate(self) -> &'static str {
        match self {
            Table::Snp => "chrom = ?1 AND pos BETWEEN ?2 AND ?3",
            _ => r#"chrom = ?1 AND start <= ?3 AND "end" >= ?2"#,
        }
    }

    /// Decode a row selected with [`columns`](Self::columns)
    pub(crate) fn decode_row(self, row: &Row<'_>) -> rusqlite::Result<AnnotationRow> {
        let coord = |idx: usize| row.get::<_, u64>(idx);
        Ok(match self {
            Table::Exon => AnnotationRow::Exon(ExonRecord {
                chromosome: row.get(0)?,
                start: coord(1)?,
                end: coord(2)?,
                transcript_id: row.get(3)?,
            }),
            Table::Snp => AnnotationRow::Snp(VariantRecord {
                chromosome: row.get(0)?,
                position: coord(1)?,
            }),
            Table::Repeats => AnnotationRow::Repeat(RepeatInterval {
                chromosome: row.get(0)?,
                start: coord(1)?,
                end: coord(2)?,
            }),
            Table::RestrictionSite => AnnotationRow::RestrictionSite(RestrictionSite {
                chromosome: row.get(0)?,
                enzyme_name: row.get(1)?,
                start: coord(2)?,
                end: coord(3)?,
            }),
        })
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "exon" | "exons" => Ok(Table::Exon),
            "snp" | "snps" | "variant" | "variants" => Ok(Table::Snp),
            "repeats" | "repeat" => Ok(Table::Repeats),
            "restriction_site" | "restriction_sites" | "res" => Ok(Table::RestrictionSite),
            other => Err(format!(
                "unknown table '{}' (expected exon, snp, repeats, or restriction_site)",
                other
            )),
        }
    }
}

/// A stored row, without its surrogate key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum AnnotationRow {
    Exon(ExonRecord),
    Snp(VariantRecord),
    Repeat(RepeatInterval),
    RestrictionSite(RestrictionSite),
}

/// Handle on the annotation database file
pub struct AnnotationStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl AnnotationStore {
    /// Open (creating if needed) the store for writing
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened annotation store");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing store without write access
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IngestError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    /// Drop and recreate all four tables and their indexes
    pub fn reset_schema(&mut self) -> Result<()> {
        schema::reset_schema(&mut self.conn)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
