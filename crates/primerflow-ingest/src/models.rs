//! Annotation records produced by the parsers and the restriction scanner
//!
//! All coordinates are 1-based and inclusive, per chromosome. Records carry no
//! identity of their own; the store assigns surrogate keys on insert.

use serde::{Deserialize, Serialize};

/// An exon row from a GFF3 annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExonRecord {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    /// `"unknown"` when the row has no `Parent=` attribute
    pub transcript_id: String,
}

/// A known variant position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantRecord {
    pub chromosome: String,
    pub position: u64,
}

/// A repeat-masked interval, already converted from 0-based half-open
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepeatInterval {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

/// One occurrence of an enzyme recognition motif
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RestrictionSite {
    pub chromosome: String,
    pub enzyme_name: String,
    pub start: u64,
    pub end: u64,
}

/// Default transcript id for exons without a parent
pub const UNKNOWN_TRANSCRIPT: &str = "unknown";
