//! Variant position decoder (VCF and VCF-like tables)
//!
//! Only the first two columns are read: chromosome and 1-based position.
//! Header lines (`##fileformat`, `#CHROM ...`) are skipped by the stream.

use std::path::Path;

use super::{parse_coord, split_fields, LineDecoder, LineError, RecordStream};
use crate::models::VariantRecord;

#[derive(Debug, Clone, Copy, Default)]
pub struct VcfDecoder;

impl LineDecoder for VcfDecoder {
    type Record = VariantRecord;

    fn format(&self) -> &'static str {
        "vcf"
    }

    fn decode(&self, line: &str) -> Result<Option<VariantRecord>, LineError> {
        let fields = split_fields(line, 2)?;
        let position = parse_coord(fields[1], 2)?;
        if position == 0 {
            return Err(LineError::ZeroPosition(position));
        }

        Ok(Some(VariantRecord {
            chromosome: fields[0].to_string(),
            position,
        }))
    }
}

/// Stream variant positions from a VCF file (plain or gzip)
pub fn parse_vcf(path: &Path) -> RecordStream<VcfDecoder> {
    RecordStream::open(VcfDecoder, path)
}
