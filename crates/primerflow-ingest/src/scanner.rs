//! Rolling-window restriction site scanner
//!
//! Finds every occurrence of every enzyme motif in a FASTA file while holding
//! at most `chunk_size` bases (plus one input line) of a chromosome in memory.
//!
//! # Chunk boundaries
//!
//! When the buffer reaches `chunk_size` bases it is scanned as a non-final
//! chunk. Only matches starting before `len - overlap_len` are reported; the
//! trailing `overlap_len = max_motif_len - 1` bases are kept as the head of the
//! next chunk and `global_offset` advances by `len - overlap_len`.
//!
//! A motif starting before the cut ends inside the chunk, so it is complete
//! when reported. A motif starting inside the carried tail is reported from the
//! next chunk instead. Every start offset is therefore reported by exactly one
//! chunk, which makes the result identical to a whole-chromosome scan for any
//! `chunk_size > overlap_len`.
//!
//! Reported coordinates are 1-based inclusive:
//! `start = global_offset + match_offset + 1`, `end = start + motif_len - 1`.

use std::collections::VecDeque;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use primerflow_common::PrimerflowError;
use tracing::{debug, info, warn};

use crate::enzymes::EnzymeTable;
use crate::error::{IngestError, Result};
use crate::models::RestrictionSite;
use crate::parsers::RecordSource;
use crate::source::{open_source, SourceOutcome, SourceReader};

/// Default bases per scan chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Mutable scan position within the current chromosome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannerState {
    /// `None` before the first header, or after a header with no name
    pub chromosome: Option<String>,
    /// Uppercased bases not yet flushed
    pub buffer: Vec<u8>,
    /// Bases of this chromosome already flushed out of `buffer`
    pub global_offset: u64,
}

impl ScannerState {
    pub fn new(chromosome: impl Into<String>) -> Self {
        Self {
            chromosome: Some(chromosome.into()),
            buffer: Vec::new(),
            global_offset: 0,
        }
    }

    /// Start over on a new chromosome
    pub fn reset(&mut self, chromosome: Option<String>) {
        self.chromosome = chromosome;
        self.buffer.clear();
        self.global_offset = 0;
    }

    /// Append one sequence line, uppercasing it
    pub fn push_bases(&mut self, line: &str) {
        self.buffer
            .extend(line.bytes().map(|b| b.to_ascii_uppercase()));
    }

    /// Total bases seen on this chromosome so far
    pub fn bases_seen(&self) -> u64 {
        self.global_offset + self.buffer.len() as u64
    }
}

/// Chunked motif scanner for one enzyme table
#[derive(Debug, Clone)]
pub struct RestrictionScanner {
    enzymes: EnzymeTable,
    chunk_size: usize,
    overlap_len: usize,
}

impl RestrictionScanner {
    /// A `chunk_size` that does not exceed the overlap could never advance,
    /// so it is raised to `overlap_len + 1`. Zero is rejected.
    pub fn new(enzymes: EnzymeTable, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(PrimerflowError::config("chunk size must be at least 1").into());
        }
        let overlap_len = enzymes.overlap_len();
        let min_chunk = overlap_len + 1;
        let chunk_size = if chunk_size < min_chunk {
            warn!(
                requested = chunk_size,
                effective = min_chunk,
                "Chunk size does not exceed the motif overlap, raising it"
            );
            min_chunk
        } else {
            chunk_size
        };
        Ok(Self {
            enzymes,
            chunk_size,
            overlap_len,
        })
    }

    pub fn enzymes(&self) -> &EnzymeTable {
        &self.enzymes
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap_len(&self) -> usize {
        self.overlap_len
    }

    /// Report the motif matches in `state.buffer` owned by this chunk.
    ///
    /// A non-final chunk owns start offsets `< len - overlap_len`; a final
    /// chunk owns every offset.
    pub fn scan_chunk(&self, state: &ScannerState, is_final: bool) -> Vec<RestrictionSite> {
        let Some(chromosome) = state.chromosome.as_deref() else {
            return Vec::new();
        };
        let chunk = state.buffer.as_slice();
        let limit = if is_final {
            chunk.len()
        } else {
            chunk.len().saturating_sub(self.overlap_len)
        };

        let mut sites = Vec::new();
        for (name, motif) in self.enzymes.iter() {
            let motif = motif.as_bytes();
            let motif_len = motif.len() as u64;
            for offset in find_all(chunk, motif).take_while(|&offset| offset < limit) {
                let start = state.global_offset + offset as u64 + 1;
                sites.push(RestrictionSite {
                    chromosome: chromosome.to_string(),
                    enzyme_name: name.to_string(),
                    start,
                    end: start + motif_len - 1,
                });
            }
        }
        sites
    }

    /// Drop everything but the trailing overlap and move the offset forward.
    pub fn advance(&self, state: &mut ScannerState) {
        let keep = self.overlap_len.min(state.buffer.len());
        let flushed = state.buffer.len() - keep;
        state.buffer.drain(..flushed);
        state.global_offset += flushed as u64;
    }

    /// Scan a FASTA stream lazily
    pub fn stream(&self, reader: SourceReader) -> RestrictionSiteStream {
        RestrictionSiteStream::new(self.clone(), Some(reader))
    }

    /// Scan a FASTA file; a missing or unreadable file yields nothing.
    pub fn scan_path(&self, path: &Path) -> RestrictionSiteStream {
        match open_source(path) {
            SourceOutcome::Found(reader) => self.stream(reader).with_path(path),
            SourceOutcome::Missing => {
                warn!(path = %path.display(), "Sequence file not found, skipping restriction scan");
                RestrictionSiteStream::new(self.clone(), None).with_path(path)
            },
            SourceOutcome::Unreadable(e) => {
                warn!(path = %path.display(), error = %e, "Sequence file unreadable, skipping restriction scan");
                let mut stream = RestrictionSiteStream::new(self.clone(), None).with_path(path);
                stream.failure = Some(IngestError::unreadable(path, e));
                stream
            },
        }
    }
}

/// Start offsets of every (possibly overlapping) occurrence of `motif`
fn find_all<'a>(haystack: &'a [u8], motif: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    haystack
        .windows(motif.len().max(1))
        .enumerate()
        .filter(move |(_, window)| !motif.is_empty() && *window == motif)
        .map(|(offset, _)| offset)
}

/// Counters for a finished or in-progress scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub chromosomes: usize,
    pub bases: u64,
    pub sites: usize,
    pub chunks: usize,
}

/// Lazy iterator of restriction sites over a FASTA stream.
///
/// Holds at most one chunk's matches at a time.
pub struct RestrictionSiteStream {
    scanner: RestrictionScanner,
    reader: Option<SourceReader>,
    path: PathBuf,
    state: ScannerState,
    pending: VecDeque<RestrictionSite>,
    line: String,
    stats: ScanStats,
    orphan_warned: bool,
    failure: Option<IngestError>,
}

impl RestrictionSiteStream {
    fn new(scanner: RestrictionScanner, reader: Option<SourceReader>) -> Self {
        if reader.is_some() && scanner.enzymes.is_empty() {
            warn!("Enzyme table is empty, no restriction sites will be reported");
        }
        let reader = reader.filter(|_| !scanner.enzymes.is_empty());
        Self {
            scanner,
            reader,
            path: PathBuf::from("<stream>"),
            state: ScannerState::default(),
            pending: VecDeque::new(),
            line: String::with_capacity(128),
            stats: ScanStats::default(),
            orphan_warned: false,
            failure: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn consume_line(&mut self, raw: &str) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }

        if let Some(header) = line.strip_prefix('>') {
            self.finish_chromosome();
            match header.split_whitespace().next() {
                Some(name) => {
                    debug!(chromosome = name, "Scanning chromosome");
                    self.stats.chromosomes += 1;
                    self.state.reset(Some(name.to_string()));
                },
                None => {
                    warn!(path = %self.path.display(), "FASTA header without a name, skipping its sequence");
                    self.orphan_warned = true;
                    self.state.reset(None);
                },
            }
            return;
        }

        if self.state.chromosome.is_none() {
            if !self.orphan_warned {
                warn!(path = %self.path.display(), "Sequence before any FASTA header, ignoring it");
                self.orphan_warned = true;
            }
            return;
        }

        self.state.push_bases(line);
        if self.state.buffer.len() >= self.scanner.chunk_size {
            self.flush_chunk(false);
            self.scanner.advance(&mut self.state);
        }
    }

    fn flush_chunk(&mut self, is_final: bool) {
        let sites = self.scanner.scan_chunk(&self.state, is_final);
        self.stats.chunks += 1;
        self.stats.sites += sites.len();
        self.pending.extend(sites);
    }

    /// Scan whatever is left of the current chromosome as a final chunk
    fn finish_chromosome(&mut self) {
        if let Some(chromosome) = self.state.chromosome.clone() {
            if !self.state.buffer.is_empty() {
                self.flush_chunk(true);
            }
            let bases = self.state.bases_seen();
            self.stats.bases += bases;
            info!(chromosome = %chromosome, bases, "Chromosome scan complete");
        }
        self.state.reset(None);
    }
}

impl Iterator for RestrictionSiteStream {
    type Item = RestrictionSite;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(site) = self.pending.pop_front() {
                return Some(site);
            }

            let reader = self.reader.as_mut()?;
            self.line.clear();
            match reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.reader = None;
                    self.finish_chromosome();
                    debug!(
                        chromosomes = self.stats.chromosomes,
                        sites = self.stats.sites,
                        chunks = self.stats.chunks,
                        "Sequence scan finished"
                    );
                },
                Ok(_) => {
                    let line = std::mem::take(&mut self.line);
                    self.consume_line(&line);
                    self.line = line;
                },
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Read failed, abandoning the rest of the sequence file"
                    );
                    self.failure = Some(IngestError::unreadable(&self.path, e));
                    self.reader = None;
                    // Bases already buffered are real sequence; report their sites
                    self.finish_chromosome();
                },
            }
        }
    }
}

impl RecordSource for RestrictionSiteStream {
    fn take_failure(&mut self) -> Option<IngestError> {
        self.failure.take()
    }
}

/// Scan `path` with `enzymes` using chunks of `chunk_size` bases.
pub fn scan_restriction_sites(
    path: &Path,
    enzymes: &EnzymeTable,
    chunk_size: usize,
) -> Result<RestrictionSiteStream> {
    let scanner = RestrictionScanner::new(enzymes.clone(), chunk_size)?;
    Ok(scanner.scan_path(path))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ecori() -> EnzymeTable {
        EnzymeTable::new().with_enzyme("EcoRI", "GAATTC").unwrap()
    }

    fn scan(fasta: &str, enzymes: EnzymeTable, chunk_size: usize) -> Vec<RestrictionSite> {
        let scanner = RestrictionScanner::new(enzymes, chunk_size).unwrap();
        scanner
            .stream(Box::new(Cursor::new(fasta.as_bytes().to_vec())))
            .collect()
    }

    fn site(chrom: &str, name: &str, start: u64, end: u64) -> RestrictionSite {
        RestrictionSite {
            chromosome: chrom.to_string(),
            enzyme_name: name.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_find_all_overlapping() {
        let hits: Vec<_> = find_all(b"AAAA", b"AA").collect();
        assert_eq!(hits, vec![0, 1, 2]);
        assert_eq!(find_all(b"AC", b"ACGT").count(), 0);
        assert_eq!(find_all(b"ACGT", b"").count(), 0);
    }

    #[test]
    fn test_scan_chunk_non_final_defers_overlap_region() {
        // NotI sets the overlap to 7, so a complete EcoRI site can sit in the tail
        let enzymes = ecori().with_enzyme("NotI", "GCGGCCGC").unwrap();
        let scanner = RestrictionScanner::new(enzymes, 10).unwrap();
        assert_eq!(scanner.overlap_len(), 7);

        let mut state = ScannerState::new("chr1");
        state.push_bases("ttttgaattc");
        assert!(scanner.scan_chunk(&state, false).is_empty());
        assert_eq!(
            scanner.scan_chunk(&state, true),
            vec![site("chr1", "EcoRI", 5, 10)]
        );

        // The deferred site is found again from the carried tail
        scanner.advance(&mut state);
        assert_eq!(state.global_offset, 3);
        assert_eq!(state.buffer, b"TGAATTC");
        assert_eq!(
            scanner.scan_chunk(&state, true),
            vec![site("chr1", "EcoRI", 5, 10)]
        );
    }

    #[test]
    fn test_scan_chunk_non_final_reports_before_cut() {
        let scanner = RestrictionScanner::new(ecori(), 10).unwrap();
        assert_eq!(scanner.overlap_len(), 5);

        let mut state = ScannerState::new("chr1");
        state.push_bases("ACGGAATTCA");
        assert_eq!(
            scanner.scan_chunk(&state, false),
            vec![site("chr1", "EcoRI", 4, 9)]
        );
    }

    #[test]
    fn test_scan_chunk_final_reports_everything() {
        let scanner = RestrictionScanner::new(ecori(), 10).unwrap();
        let mut state = ScannerState::new("chr1");
        state.global_offset = 100;
        state.push_bases("TTTGAATTC");
        assert_eq!(
            scanner.scan_chunk(&state, true),
            vec![site("chr1", "EcoRI", 104, 109)]
        );
    }

    #[test]
    fn test_advance_keeps_overlap() {
        let scanner = RestrictionScanner::new(ecori(), 8).unwrap();
        let mut state = ScannerState::new("chr1");
        state.push_bases("AAAAAAAAGAATT");
        scanner.advance(&mut state);
        assert_eq!(state.buffer, b"GAATT");
        assert_eq!(state.global_offset, 8);
        assert_eq!(state.bases_seen(), 13);
    }

    #[test]
    fn test_scan_chunk_without_chromosome() {
        let scanner = RestrictionScanner::new(ecori(), 8).unwrap();
        let mut state = ScannerState::default();
        state.push_bases("GAATTC");
        assert!(scanner.scan_chunk(&state, true).is_empty());
    }

    #[test]
    fn test_small_chunk_size_is_raised() {
        assert_eq!(RestrictionScanner::new(ecori(), 4).unwrap().chunk_size(), 6);
        assert_eq!(RestrictionScanner::new(ecori(), 6).unwrap().chunk_size(), 6);
        assert_eq!(RestrictionScanner::new(EnzymeTable::new(), 1).unwrap().chunk_size(), 1);
        assert!(RestrictionScanner::new(ecori(), 0).is_err());
    }

    #[test]
    fn test_lowercase_and_wrapped_lines() {
        let fasta = ">chr1 assembled\nacgga\natTCAA\n";
        assert_eq!(scan(fasta, ecori(), 6), vec![site("chr1", "EcoRI", 4, 9)]);
    }

    #[test]
    fn test_headers_reset_offsets() {
        let fasta = ">chrA\nGAATTC\n>chrB desc\nTTGAATTC\n";
        assert_eq!(
            scan(fasta, ecori(), 1_000),
            vec![site("chrA", "EcoRI", 1, 6), site("chrB", "EcoRI", 3, 8)]
        );
    }

    #[test]
    fn test_motif_split_across_chromosomes_is_not_a_site() {
        let fasta = ">chr1\nTTTGAA\n>chr2\nTTCAAA\n";
        assert!(scan(fasta, ecori(), 6).is_empty());
    }

    #[test]
    fn test_orphan_sequence_and_nameless_header_ignored() {
        let fasta = "GAATTC\n>\nGAATTC\n>chr3\nGAATTC\n";
        assert_eq!(scan(fasta, ecori(), 100), vec![site("chr3", "EcoRI", 1, 6)]);
    }

    #[test]
    fn test_empty_enzyme_table_yields_nothing() {
        assert!(scan(">chr1\nGAATTC\n", EnzymeTable::new(), 10).is_empty());
    }

    #[test]
    fn test_overlapping_motifs_of_different_enzymes() {
        let enzymes = EnzymeTable::new()
            .with_enzyme("NotI", "GCGGCCGC")
            .unwrap()
            .with_enzyme("EagI", "CGGCCG")
            .unwrap();
        let fasta = ">chr1\nAAGCGGCCGCAA\n";
        assert_eq!(
            scan(fasta, enzymes, 8),
            vec![site("chr1", "EagI", 4, 9), site("chr1", "NotI", 3, 10)]
        );
    }

    #[test]
    fn test_missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream =
            scan_restriction_sites(&dir.path().join("genome.fa.gz"), &ecori(), 100).unwrap();
        assert_eq!(stream.next(), None);
        assert!(stream.take_failure().is_none());
    }

    #[test]
    fn test_stats() {
        let scanner = RestrictionScanner::new(ecori(), 8).unwrap();
        let mut stream =
            scanner.stream(Box::new(Cursor::new(b">c1\nGAATTCGAATTC\n>c2\nAAAA\n".to_vec())));
        let sites: Vec<_> = stream.by_ref().collect();
        assert_eq!(sites.len(), 2);
        let stats = stream.stats();
        assert_eq!(stats.chromosomes, 2);
        assert_eq!(stats.bases, 16);
        assert_eq!(stats.sites, 2);
    }
}
