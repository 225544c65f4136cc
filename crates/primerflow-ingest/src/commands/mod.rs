//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod build;
pub mod inspect;
pub mod lookup;

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table as TextTable};

use crate::store::AnnotationRow;

/// Column headers matching [`row_cells`]
pub(crate) const ROW_HEADER: [&str; 5] = ["chrom", "start", "end", "name", "transcript"];

/// Render a stored row as text cells; unused columns are "-"
pub(crate) fn row_cells(row: &AnnotationRow) -> Vec<String> {
    let dash = || "-".to_string();
    match row {
        AnnotationRow::Exon(exon) => vec![
            exon.chromosome.clone(),
            exon.start.to_string(),
            exon.end.to_string(),
            dash(),
            exon.transcript_id.clone(),
        ],
        AnnotationRow::Snp(variant) => vec![
            variant.chromosome.clone(),
            variant.position.to_string(),
            variant.position.to_string(),
            dash(),
            dash(),
        ],
        AnnotationRow::Repeat(repeat) => vec![
            repeat.chromosome.clone(),
            repeat.start.to_string(),
            repeat.end.to_string(),
            dash(),
            dash(),
        ],
        AnnotationRow::RestrictionSite(site) => vec![
            site.chromosome.clone(),
            site.start.to_string(),
            site.end.to_string(),
            site.enzyme_name.clone(),
            dash(),
        ],
    }
}

pub(crate) fn text_table() -> TextTable {
    let mut table = TextTable::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

/// Table of stored rows with the shared header
pub(crate) fn rows_table(rows: &[AnnotationRow]) -> TextTable {
    let mut table = text_table();
    table.set_header(ROW_HEADER.to_vec());
    for row in rows {
        table.add_row(row_cells(row));
    }
    table
}
