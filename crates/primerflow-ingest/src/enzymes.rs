//! Restriction enzyme recognition table
//!
//! Motifs are exact uppercase nucleotide strings. Ambiguity codes (N, R, Y, ...)
//! are rejected rather than expanded.

use primerflow_common::{PrimerflowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Enzymes scanned by a default build
pub const DEFAULT_ENZYMES: &[(&str, &str)] = &[
    ("EcoRI", "GAATTC"),
    ("BamHI", "GGATCC"),
    ("HindIII", "AAGCTT"),
    ("NotI", "GCGGCCGC"),
];

/// Mapping from enzyme name to recognition motif.
///
/// Backed by a `BTreeMap` so scans visit enzymes in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct EnzymeTable {
    motifs: BTreeMap<String, String>,
}

impl EnzymeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four-enzyme panel used by the reference build
    pub fn default_panel() -> Self {
        let motifs = DEFAULT_ENZYMES
            .iter()
            .map(|(name, motif)| (name.to_string(), motif.to_string()))
            .collect();
        Self { motifs }
    }

    /// Add or replace an enzyme. The motif is uppercased before validation.
    pub fn insert(&mut self, name: impl Into<String>, motif: &str) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PrimerflowError::config("enzyme name must not be empty"));
        }
        let motif = normalize_motif(&name, motif)?;
        self.motifs.insert(name, motif);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_enzyme(mut self, name: impl Into<String>, motif: &str) -> Result<Self> {
        self.insert(name, motif)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.motifs.get(name).map(String::as_str)
    }

    /// Iterate `(name, motif)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.motifs.iter().map(|(n, m)| (n.as_str(), m.as_str()))
    }

    pub fn len(&self) -> usize {
        self.motifs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motifs.is_empty()
    }

    pub fn max_motif_len(&self) -> usize {
        self.motifs.values().map(String::len).max().unwrap_or(0)
    }

    /// Bases carried between scan chunks: longest motif minus one
    pub fn overlap_len(&self) -> usize {
        self.max_motif_len().saturating_sub(1)
    }
}

fn normalize_motif(name: &str, motif: &str) -> Result<String> {
    let motif = motif.trim().to_ascii_uppercase();
    if motif.is_empty() {
        return Err(PrimerflowError::config(format!(
            "enzyme '{}' has an empty motif",
            name
        )));
    }
    if let Some(bad) = motif.chars().find(|c| !matches!(c, 'A' | 'C' | 'G' | 'T')) {
        return Err(PrimerflowError::config(format!(
            "enzyme '{}' motif '{}' contains '{}'; only A, C, G, T are allowed",
            name, motif, bad
        )));
    }
    Ok(motif)
}

impl TryFrom<BTreeMap<String, String>> for EnzymeTable {
    type Error = PrimerflowError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self> {
        let mut table = Self::new();
        for (name, motif) in raw {
            table.insert(name, &motif)?;
        }
        Ok(table)
    }
}

impl From<EnzymeTable> for BTreeMap<String, String> {
    fn from(table: EnzymeTable) -> Self {
        table.motifs
    }
}
