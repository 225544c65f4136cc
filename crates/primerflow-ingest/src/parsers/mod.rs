//! Streaming decoders for tabular annotation files
//!
//! Each format implements [`LineDecoder`]; [`RecordStream`] turns a decoder and
//! a line reader into a lazy iterator of records. Memory use is one line plus
//! one record regardless of file size.
//!
//! Skipping rules shared by every format:
//! - blank lines and lines starting with `#` are ignored
//! - a line the decoder rejects ([`LineError`]) is skipped and counted
//! - an I/O or decompression error ends the stream; the error is kept and can
//!   be collected with [`RecordSource::take_failure`]

pub mod gff3;
pub mod rmsk;
pub mod vcf;

pub use gff3::{parse_gff3, Gff3Decoder};
pub use rmsk::{parse_rmsk, RmskDecoder};
pub use vcf::{parse_vcf, VcfDecoder};

use std::io::BufRead;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::source::{open_source, SourceOutcome, SourceReader};

/// Why a single line was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("expected at least {expected} tab-separated fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("column {column} is not a coordinate in 0..=2^63-1: '{value}'")]
    InvalidInteger { column: usize, value: String },

    #[error("start {start} is after end {end}")]
    InvertedInterval { start: u64, end: u64 },

    #[error("position must be >= 1, found {0}")]
    ZeroPosition(u64),
}

/// Decodes one line of a tab-delimited format.
///
/// `Ok(None)` means the line is valid but not wanted (for example a GFF3 row
/// whose feature type is not `exon`).
pub trait LineDecoder {
    type Record;

    /// Short format name used in log fields
    fn format(&self) -> &'static str;

    fn decode(&self, line: &str) -> Result<Option<Self::Record>, LineError>;
}

/// A lazy record sequence whose read failure, if any, can be inspected after
/// it has been drained.
pub trait RecordSource: Iterator {
    fn take_failure(&mut self) -> Option<IngestError>;
}

/// Per-stream counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub lines_read: usize,
    pub records_emitted: usize,
    /// Valid lines the decoder chose not to emit
    pub lines_filtered: usize,
    pub lines_malformed: usize,
}

/// Lazy iterator of decoded records over one input.
pub struct RecordStream<D: LineDecoder> {
    decoder: D,
    reader: Option<SourceReader>,
    path: PathBuf,
    line: String,
    stats: StreamStats,
    failure: Option<IngestError>,
}

impl<D: LineDecoder> RecordStream<D> {
    pub fn new(decoder: D, reader: SourceReader) -> Self {
        Self {
            decoder,
            reader: Some(reader),
            path: PathBuf::from("<stream>"),
            line: String::with_capacity(512),
            stats: StreamStats::default(),
            failure: None,
        }
    }

    /// A stream that yields nothing
    pub fn empty(decoder: D) -> Self {
        let mut stream = Self::new(decoder, Box::new(std::io::empty()));
        stream.reader = None;
        stream
    }

    /// Open `path`; a missing or unreadable file logs a warning and gives an
    /// empty stream.
    pub fn open(decoder: D, path: &Path) -> Self {
        match open_source(path) {
            SourceOutcome::Found(reader) => Self::new(decoder, reader).with_path(path),
            SourceOutcome::Missing => {
                warn!(format = decoder.format(), path = %path.display(), "Input file not found, skipping");
                Self::empty(decoder).with_path(path)
            },
            SourceOutcome::Unreadable(e) => {
                warn!(format = decoder.format(), path = %path.display(), error = %e, "Input file unreadable, skipping");
                let mut stream = Self::empty(decoder).with_path(path);
                stream.failure = Some(IngestError::unreadable(path, e));
                stream
            },
        }
    }

    /// Path reported in log events and errors
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }
}

impl<D: LineDecoder> Iterator for RecordStream<D> {
    type Item = D::Record;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let reader = self.reader.as_mut()?;
            self.line.clear();

            match reader.read_line(&mut self.line) {
                Ok(0) => {
                    debug!(
                        format = self.decoder.format(),
                        lines = self.stats.lines_read,
                        records = self.stats.records_emitted,
                        malformed = self.stats.lines_malformed,
                        "Reached end of input"
                    );
                    self.reader = None;
                    return None;
                },
                Ok(_) => {},
                Err(e) => {
                    warn!(
                        format = self.decoder.format(),
                        path = %self.path.display(),
                        line = self.stats.lines_read + 1,
                        error = %e,
                        "Read failed, abandoning the rest of this file"
                    );
                    self.failure = Some(IngestError::unreadable(&self.path, e));
                    self.reader = None;
                    return None;
                },
            }

            self.stats.lines_read += 1;
            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            match self.decoder.decode(line) {
                Ok(Some(record)) => {
                    self.stats.records_emitted += 1;
                    return Some(record);
                },
                Ok(None) => self.stats.lines_filtered += 1,
                Err(source) => {
                    self.stats.lines_malformed += 1;
                    let err = IngestError::MalformedLine {
                        line: self.stats.lines_read,
                        source,
                    };
                    debug!(format = self.decoder.format(), error = %err, "Skipping line");
                },
            }
        }
    }
}

impl<D: LineDecoder> RecordSource for RecordStream<D> {
    fn take_failure(&mut self) -> Option<IngestError> {
        self.failure.take()
    }
}

/// Split a line on tabs, requiring at least `min` fields
pub(crate) fn split_fields(line: &str, min: usize) -> Result<Vec<&str>, LineError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < min {
        return Err(LineError::TooFewFields {
            expected: min,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Largest coordinate the store can hold (SQLite integers are signed 64-bit)
pub const MAX_COORD: u64 = i64::MAX as u64;

/// Parse a coordinate in `0..=MAX_COORD`; `column` is 1-based and only used
/// for the error
pub(crate) fn parse_coord(value: &str, column: usize) -> Result<u64, LineError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|&coord| coord <= MAX_COORD)
        .ok_or_else(|| LineError::InvalidInteger {
            column,
            value: value.to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    /// Emits the first field of lines whose second field is "keep"
    struct KeepDecoder;

    impl LineDecoder for KeepDecoder {
        type Record = String;

        fn format(&self) -> &'static str {
            "test"
        }

        fn decode(&self, line: &str) -> Result<Option<String>, LineError> {
            let fields = split_fields(line, 2)?;
            Ok((fields[1] == "keep").then(|| fields[0].to_string()))
        }
    }

    fn stream(text: &str) -> RecordStream<KeepDecoder> {
        RecordStream::new(KeepDecoder, Box::new(Cursor::new(text.as_bytes().to_vec())))
    }

    #[test]
    fn test_skips_comments_blank_and_short_lines() {
        let mut s = stream("#header\n\na\tkeep\nb\tdrop\nshort\nc\tkeep\r\n");
        let records: Vec<_> = s.by_ref().collect();
        assert_eq!(records, vec!["a", "c"]);

        let stats = s.stats();
        assert_eq!(stats.lines_read, 6);
        assert_eq!(stats.records_emitted, 2);
        assert_eq!(stats.lines_filtered, 1);
        assert_eq!(stats.lines_malformed, 1);
        assert!(s.take_failure().is_none());
    }

    #[test]
    fn test_last_line_without_newline() {
        let records: Vec<_> = stream("a\tkeep\nb\tkeep").collect();
        assert_eq!(records, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_stream() {
        let mut s = RecordStream::empty(KeepDecoder);
        assert_eq!(s.next(), None);
        assert!(s.take_failure().is_none());
    }

    /// Yields its data, then fails
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "truncated gzip"));
            }
            Ok(n)
        }
    }

    #[test]
    fn test_read_error_keeps_earlier_records() {
        let reader = FailingReader {
            data: Cursor::new(b"a\tkeep\nb\tkeep\n".to_vec()),
        };
        let mut s = RecordStream::new(KeepDecoder, Box::new(io::BufReader::new(reader)))
            .with_path("broken.txt.gz");

        let records: Vec<_> = s.by_ref().collect();
        assert_eq!(records, vec!["a", "b"]);

        let failure = s.take_failure().expect("failure recorded");
        assert!(matches!(failure, IngestError::UnreadableInputFile { .. }));
        assert!(failure.to_string().contains("broken.txt.gz"));
        // The stream stays finished
        assert_eq!(s.next(), None);
    }

    #[test]
    fn test_open_missing_path_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = RecordStream::open(KeepDecoder, &dir.path().join("nope.tsv"));
        assert_eq!(s.next(), None);
        assert!(s.take_failure().is_none());
    }

    #[test]
    fn test_parse_coord() {
        assert_eq!(parse_coord(" 42 ", 2).unwrap(), 42);
        assert_eq!(
            parse_coord("-1", 7).unwrap_err(),
            LineError::InvalidInteger {
                column: 7,
                value: "-1".to_string()
            }
        );
        assert!(parse_coord("1e5", 4).is_err());
    }

    #[test]
    fn test_parse_coord_rejects_values_beyond_i64() {
        assert_eq!(parse_coord("9223372036854775807", 2).unwrap(), MAX_COORD);
        assert!(parse_coord("9223372036854775808", 2).is_err());
        assert!(parse_coord("18446744073709551615", 2).is_err());
    }
}
