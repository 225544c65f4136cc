//! UCSC RepeatMasker (`rmsk.txt`) decoder
//!
//! # Format
//! ```text
//! bin  swScore  milliDiv  milliDel  milliIns  genoName  genoStart  genoEnd  genoLeft  strand ...
//! 585  1504     13        4         13        chr1      10000      10468    -248945954  +   ...
//! ```
//!
//! `genoStart`/`genoEnd` are 0-based half-open. Converted to 1-based inclusive
//! by adding one to the start and keeping the end.

use std::path::Path;

use super::{parse_coord, split_fields, LineDecoder, LineError, RecordStream};
use crate::models::RepeatInterval;

const RMSK_MIN_COLUMNS: usize = 8;
const CHROM_COLUMN: usize = 5;
const START_COLUMN: usize = 6;
const END_COLUMN: usize = 7;

#[derive(Debug, Clone, Copy, Default)]
pub struct RmskDecoder;

impl LineDecoder for RmskDecoder {
    type Record = RepeatInterval;

    fn format(&self) -> &'static str {
        "rmsk"
    }

    fn decode(&self, line: &str) -> Result<Option<RepeatInterval>, LineError> {
        let fields = split_fields(line, RMSK_MIN_COLUMNS)?;
        let raw_start = parse_coord(fields[START_COLUMN], START_COLUMN + 1)?;
        let end = parse_coord(fields[END_COLUMN], END_COLUMN + 1)?;

        let start = raw_start.saturating_add(1);
        if start > end {
            return Err(LineError::InvertedInterval { start, end });
        }

        Ok(Some(RepeatInterval {
            chromosome: fields[CHROM_COLUMN].to_string(),
            start,
            end,
        }))
    }
}

/// Stream repeat intervals from an rmsk table (plain or gzip)
pub fn parse_rmsk(path: &Path) -> RecordStream<RmskDecoder> {
    RecordStream::open(RmskDecoder, path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_half_open_to_inclusive() {
        let line = "0\t0\t0\t0\t0\tchrX\t1000\t2000";
        assert_eq!(
            RmskDecoder.decode(line).unwrap(),
            Some(RepeatInterval {
                chromosome: "chrX".to_string(),
                start: 1001,
                end: 2000,
            })
        );
    }

    #[test]
    fn test_full_ucsc_row() {
        let line = "585\t1504\t13\t4\t13\tchr1\t10000\t10468\t-248945954\t+\t(TAACCC)n\tSimple_repeat\tSimple_repeat\t1\t471\t0\t1";
        let repeat = RmskDecoder.decode(line).unwrap().unwrap();
        assert_eq!(repeat.chromosome, "chr1");
        assert_eq!((repeat.start, repeat.end), (10001, 10468));
    }

    #[test]
    fn test_single_base_interval() {
        let repeat = RmskDecoder.decode("0\t0\t0\t0\t0\tchr2\t99\t100").unwrap().unwrap();
        assert_eq!((repeat.start, repeat.end), (100, 100));
    }

    #[test]
    fn test_empty_or_short_rows_rejected() {
        assert!(matches!(
            RmskDecoder.decode("0\t0\t0\t0\t0\tchr2\t100\t100"),
            Err(LineError::InvertedInterval { start: 101, end: 100 })
        ));
        assert!(matches!(
            RmskDecoder.decode("0\t0\t0\tchr2\t100\t200"),
            Err(LineError::TooFewFields { expected: 8, found: 6 })
        ));
        assert!(matches!(
            RmskDecoder.decode("0\t0\t0\t0\t0\tchr2\tx\t200"),
            Err(LineError::InvalidInteger { column: 7, .. })
        ));
    }
}
