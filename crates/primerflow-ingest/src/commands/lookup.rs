//! `primerflow-ingest lookup` command implementation
//!
//! Runs the same overlap query the primer filter uses and prints the hits.

use colored::Colorize;
use std::path::Path;

use super::rows_table;
use crate::error::Result;
use crate::store::{AnnotationRow, AnnotationStore, Table};

pub fn run(db: &Path, table: Table, chrom: &str, start: u64, end: u64) -> Result<Vec<AnnotationRow>> {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    let store = AnnotationStore::open_read_only(db)?;
    let rows = store.find_overlapping(table, chrom, start, end)?;

    let region = format!("{}:{}-{}", chrom, start, end);
    if rows.is_empty() {
        println!("{} no {} rows overlap {}", "Clear:".green().bold(), table, region);
    } else {
        println!(
            "{} {} {} row(s) overlap {}",
            "Hit:".yellow().bold(),
            rows.len(),
            table,
            region
        );
        println!("{}", rows_table(&rows));
    }
    Ok(rows)
}
