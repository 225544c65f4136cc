//! Opening raw input files
//!
//! Every source may be plain text or gzip. Compression is detected from the
//! gzip magic bytes, not the file extension, and decoded with
//! `MultiGzDecoder` so BGZF files (many concatenated gzip members) are read to
//! the end instead of stopping after the first block.

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Buffer size for file and decompressor readers
pub const READ_BUFFER_SIZE: usize = 256 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Boxed line reader over a plain or decompressed source
pub type SourceReader = Box<dyn BufRead + Send>;

/// Result of trying to open a dataset's input file
pub enum SourceOutcome {
    Found(SourceReader),
    Missing,
    Unreadable(io::Error),
}

impl std::fmt::Debug for SourceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceOutcome::Found(_) => f.write_str("Found"),
            SourceOutcome::Missing => f.write_str("Missing"),
            SourceOutcome::Unreadable(e) => write!(f, "Unreadable({})", e),
        }
    }
}

/// Open `path` for line reading, transparently decompressing gzip.
pub fn open_source(path: &Path) -> SourceOutcome {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return SourceOutcome::Missing,
        Err(e) => return SourceOutcome::Unreadable(e),
    };

    match decode_transparent(file) {
        Ok(reader) => SourceOutcome::Found(reader),
        Err(e) => SourceOutcome::Unreadable(e),
    }
}

/// Wrap any byte reader, inserting a gzip decoder when the stream starts with
/// the gzip magic bytes.
pub fn decode_transparent<R>(inner: R) -> io::Result<SourceReader>
where
    R: Read + Send + 'static,
{
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, inner);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    if is_gzip {
        let decoder = MultiGzDecoder::new(reader);
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, decoder)))
    } else {
        Ok(Box::new(reader))
    }
}
