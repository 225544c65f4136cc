//! SQLite schema for the annotation store

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Drop and recreate every annotation table and index.
///
/// Runs in one transaction: either the whole schema is replaced or the old
/// one is left untouched.
pub fn reset_schema(conn: &mut Connection) -> Result<()> {
    info!("Resetting annotation schema (existing rows are dropped)");

    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
        DROP TABLE IF EXISTS snp;
        DROP TABLE IF EXISTS restriction_site;
        DROP TABLE IF EXISTS exon;
        DROP TABLE IF EXISTS repeats;

        CREATE TABLE snp (
            id INTEGER PRIMARY KEY,
            chrom TEXT NOT NULL,
            pos INTEGER NOT NULL
        );

        CREATE TABLE restriction_site (
            id INTEGER PRIMARY KEY,
            chrom TEXT NOT NULL,
            name TEXT NOT NULL,
            start INTEGER NOT NULL,
            "end" INTEGER NOT NULL
        );

        CREATE TABLE exon (
            id INTEGER PRIMARY KEY,
            chrom TEXT NOT NULL,
            start INTEGER NOT NULL,
            "end" INTEGER NOT NULL,
            transcript_id TEXT NOT NULL
        );

        CREATE TABLE repeats (
            id INTEGER PRIMARY KEY,
            chrom TEXT NOT NULL,
            start INTEGER NOT NULL,
            "end" INTEGER NOT NULL
        );

        CREATE INDEX idx_snp ON snp(chrom, pos);
        CREATE INDEX idx_res ON restriction_site(chrom, start);
        CREATE INDEX idx_exon ON exon(chrom, start, "end");
        CREATE INDEX idx_repeats ON repeats(chrom, start, "end");
        "#,
    )?;
    tx.commit()?;

    info!("Annotation schema ready");
    Ok(())
}
