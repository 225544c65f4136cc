//! GFF3 exon decoder
//!
//! # Format
//! ```text
//! seqid  source  type  start  end  score  strand  phase  attributes
//! chr1   HAVANA  exon  11869  12227  .    +       .      ID=exon:ENST00000456328.2:1;Parent=transcript:ENST00000456328.2
//! ```
//!
//! Only rows with type `exon` are kept. GFF3 coordinates are already 1-based
//! inclusive, so start and end are stored unchanged.

use std::path::Path;

use super::{parse_coord, split_fields, LineDecoder, LineError, RecordStream};
use crate::models::{ExonRecord, UNKNOWN_TRANSCRIPT};

const GFF3_COLUMNS: usize = 9;
const EXON_FEATURE: &str = "exon";
const TRANSCRIPT_PREFIX: &str = "transcript:";

#[derive(Debug, Clone, Copy, Default)]
pub struct Gff3Decoder;

impl LineDecoder for Gff3Decoder {
    type Record = ExonRecord;

    fn format(&self) -> &'static str {
        "gff3"
    }

    fn decode(&self, line: &str) -> Result<Option<ExonRecord>, LineError> {
        let fields = split_fields(line, GFF3_COLUMNS)?;
        if fields[2] != EXON_FEATURE {
            return Ok(None);
        }

        let start = parse_coord(fields[3], 4)?;
        let end = parse_coord(fields[4], 5)?;
        if start > end {
            return Err(LineError::InvertedInterval { start, end });
        }

        let transcript_id = parent_transcript(fields[8])
            .unwrap_or(UNKNOWN_TRANSCRIPT)
            .to_string();

        Ok(Some(ExonRecord {
            chromosome: fields[0].to_string(),
            start,
            end,
            transcript_id,
        }))
    }
}

/// Value of the `Parent` attribute with any `transcript:` prefix removed.
///
/// ```
/// use primerflow_ingest::parsers::gff3::parent_transcript;
///
/// assert_eq!(
///     parent_transcript("ID=exon:1;Parent=transcript:ENST0001.2;rank=1"),
///     Some("ENST0001.2")
/// );
/// assert_eq!(parent_transcript("ID=gene:ENSG1"), None);
/// ```
pub fn parent_transcript(attributes: &str) -> Option<&str> {
    attributes
        .split(';')
        .filter_map(|pair| pair.trim().strip_prefix("Parent="))
        .map(|value| value.strip_prefix(TRANSCRIPT_PREFIX).unwrap_or(value))
        .find(|value| !value.is_empty())
}

/// Stream exon records from a GFF3 file (plain or gzip)
pub fn parse_gff3(path: &Path) -> RecordStream<Gff3Decoder> {
    RecordStream::open(Gff3Decoder, path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn decode(line: &str) -> Result<Option<ExonRecord>, LineError> {
        Gff3Decoder.decode(line)
    }

    #[test]
    fn test_exon_with_transcript_parent() {
        let line = "chr1\tHAVANA\texon\t11869\t12227\t.\t+\t.\tID=exon:ENST00000456328.2:1;Parent=transcript:ENST00000456328.2;gene_type=lncRNA";
        let exon = decode(line).unwrap().unwrap();
        assert_eq!(
            exon,
            ExonRecord {
                chromosome: "chr1".to_string(),
                start: 11869,
                end: 12227,
                transcript_id: "ENST00000456328.2".to_string(),
            }
        );
    }

    #[test]
    fn test_parent_without_prefix() {
        let line = "chr2\tRefSeq\texon\t100\t200\t.\t-\t.\tParent=rna-NM_000014.6";
        let exon = decode(line).unwrap().unwrap();
        assert_eq!(exon.transcript_id, "rna-NM_000014.6");
    }

    #[test]
    fn test_missing_parent_is_unknown() {
        let line = "chrX\tsrc\texon\t5\t9\t.\t+\t.\tID=exon1";
        assert_eq!(decode(line).unwrap().unwrap().transcript_id, "unknown");

        let empty_parent = "chrX\tsrc\texon\t5\t9\t.\t+\t.\tParent=;ID=exon1";
        assert_eq!(decode(empty_parent).unwrap().unwrap().transcript_id, "unknown");
    }

    #[test]
    fn test_non_exon_rows_filtered() {
        let line = "chr1\tHAVANA\tgene\t11869\t14409\t.\t+\t.\tID=gene:ENSG00000223972.5";
        assert_eq!(decode(line).unwrap(), None);
    }

    #[test]
    fn test_malformed_rows() {
        assert!(matches!(
            decode("chr1\tHAVANA\texon\t100"),
            Err(LineError::TooFewFields { expected: 9, found: 4 })
        ));
        assert!(matches!(
            decode("chr1\tsrc\texon\tabc\t200\t.\t+\t.\tParent=t1"),
            Err(LineError::InvalidInteger { column: 4, .. })
        ));
        assert!(matches!(
            decode("chr1\tsrc\texon\t300\t200\t.\t+\t.\tParent=t1"),
            Err(LineError::InvertedInterval { start: 300, end: 200 })
        ));
    }

    #[test]
    fn test_parse_gff3_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotation.gff3");
        std::fs::write(
            &path,
            "##gff-version 3\n\
             chr1\ts\tgene\t1\t500\t.\t+\t.\tID=g1\n\
             chr1\ts\texon\t1\t100\t.\t+\t.\tParent=transcript:t1\n\
             chr1\ts\texon\t200\tbad\t.\t+\t.\tParent=transcript:t1\n\
             chr1\ts\texon\t300\t500\t.\t+\t.\tParent=transcript:t1\n",
        )
        .unwrap();

        let mut stream = parse_gff3(&path);
        let exons: Vec<_> = stream.by_ref().collect();
        assert_eq!(exons.len(), 2);
        assert_eq!((exons[0].start, exons[0].end), (1, 100));
        assert_eq!((exons[1].start, exons[1].end), (300, 500));
        assert_eq!(stream.stats().lines_malformed, 1);
        assert_eq!(stream.stats().lines_filtered, 1);
    }
}
