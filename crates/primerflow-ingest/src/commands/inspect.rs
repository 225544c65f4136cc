//! `primerflow-ingest inspect` command implementation
//!
//! Prints each table's row count and its first rows.

use colored::Colorize;
use std::path::Path;

use super::rows_table;
use crate::error::Result;
use crate::progress::format_count;
use crate::store::{AnnotationStore, Table, TableSummary};

/// Summaries of every table in the store at `db`
pub fn summarize(db: &Path) -> Result<Vec<TableSummary>> {
    let store = AnnotationStore::open_read_only(db)?;
    Table::ALL.iter().map(|&table| store.summary(table)).collect()
}

pub fn run(db: &Path) -> Result<()> {
    let summaries = summarize(db)?;

    println!("{} {}", "Database:".cyan().bold(), db.display());
    for summary in &summaries {
        println!();
        println!(
            "{} {} rows",
            summary.table.name().bold(),
            format_count(summary.rows)
        );
        if summary.preview.is_empty() {
            println!("  (empty)");
        } else {
            println!("{}", rows_table(&summary.preview));
        }
    }
    Ok(())
}
