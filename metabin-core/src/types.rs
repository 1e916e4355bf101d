use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    ARCHAEA_MARKER_COUNT, BACTERIA_MARKER_COUNT, MAX_QUALITY_SCORE, UNASSIGNED_TAXA,
};

/// Biological domain whose single-copy marker set parameterizes quality scores.
///
/// # Examples
///
/// ```rust
/// use metabin_core::types::Domain;
///
/// let domain: Domain = "archaea".parse()?;
/// assert_eq!(domain.expected_markers(), 162);
/// # Ok::<(), metabin_core::types::MetabinError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Bacterial marker set
    #[default]
    Bacteria,
    /// Archaeal marker set
    Archaea,
}

impl Domain {
    /// Number of distinct single-copy markers expected once per genome
    #[must_use]
    pub const fn expected_markers(self) -> usize {
        match self {
            Self::Bacteria => BACTERIA_MARKER_COUNT,
            Self::Archaea => ARCHAEA_MARKER_COUNT,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bacteria => "bacteria",
            Self::Archaea => "archaea",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = MetabinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bacteria" => Ok(Self::Bacteria),
            "archaea" => Ok(Self::Archaea),
            other => Err(MetabinError::InvalidConfig(format!(
                "unknown domain '{other}' (expected bacteria or archaea)"
            ))),
        }
    }
}

/// Canonical taxonomic ranks, ordered from coarsest to finest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Superkingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    /// All ranks from superkingdom down to species
    pub const CANONICAL: [Rank; 7] = [
        Self::Superkingdom,
        Self::Phylum,
        Self::Class,
        Self::Order,
        Self::Family,
        Self::Genus,
        Self::Species,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Superkingdom => "superkingdom",
            Self::Phylum => "phylum",
            Self::Class => "class",
            Self::Order => "order",
            Self::Family => "family",
            Self::Genus => "genus",
            Self::Species => "species",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = MetabinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::CANONICAL
            .into_iter()
            .find(|rank| rank.as_str() == wanted)
            .ok_or_else(|| MetabinError::InvalidConfig(format!("unknown taxonomic rank '{s}'")))
    }
}

/// Ordered rank to taxon mapping of one contig.
///
/// Values that mean "not classified" (blank, `unclassified`, `NA`) are never
/// stored, so [`Lineage::taxon`] returning `None` always means unassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    taxa: BTreeMap<Rank, String>,
}

impl Lineage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the taxon at `rank`, ignoring unassigned placeholders
    pub fn set(&mut self, rank: Rank, taxon: &str) {
        let taxon = taxon.trim();
        if UNASSIGNED_TAXA
            .iter()
            .any(|placeholder| placeholder.eq_ignore_ascii_case(taxon))
        {
            self.taxa.remove(&rank);
        } else {
            self.taxa.insert(rank, taxon.to_string());
        }
    }

    #[must_use]
    pub fn with(mut self, rank: Rank, taxon: &str) -> Self {
        self.set(rank, taxon);
        self
    }

    #[must_use]
    pub fn taxon(&self, rank: Rank) -> Option<&str> {
        self.taxa.get(&rank).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    /// Iterate assigned ranks from coarsest to finest
    pub fn iter(&self) -> impl Iterator<Item = (Rank, &str)> {
        self.taxa.iter().map(|(rank, taxon)| (*rank, taxon.as_str()))
    }
}

/// One contig as delivered by the embedding, coverage and lineage providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContigRecord {
    /// Unique contig identifier
    pub id: String,
    /// Low dimensional k-mer embedding
    pub embedding: Vec<f64>,
    /// Read coverage depth
    pub coverage: f64,
    /// Contig length in base pairs (0 when unknown)
    pub length: u64,
    /// Taxonomic lineage, if one was resolved
    pub lineage: Option<Lineage>,
}

impl ContigRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, embedding: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            embedding,
            coverage: 0.0,
            length: 0,
            lineage: None,
        }
    }

    #[must_use]
    pub fn with_coverage(mut self, coverage: f64) -> Self {
        self.coverage = coverage;
        self
    }

    #[must_use]
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn with_lineage(mut self, lineage: Lineage) -> Self {
        self.lineage = Some(lineage);
        self
    }
}

/// Completeness and purity of a contig set, both on a 0-100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quality {
    /// Share of expected markers present at least once
    pub completeness: f64,
    /// Share of present markers present exactly once
    pub purity: f64,
}

impl Quality {
    #[must_use]
    pub fn new(completeness: f64, purity: f64) -> Self {
        Self {
            completeness: completeness.clamp(0.0, MAX_QUALITY_SCORE),
            purity: purity.clamp(0.0, MAX_QUALITY_SCORE),
        }
    }

    /// Whether both cutoffs are met
    #[must_use]
    pub fn passes(&self, completeness_cutoff: f64, purity_cutoff: f64) -> bool {
        self.purity >= purity_cutoff && self.completeness >= completeness_cutoff
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completeness >= MAX_QUALITY_SCORE
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "completeness={:.2};purity={:.2}",
            self.completeness, self.purity
        )
    }
}

/// Clustering parameter value that produced a labeling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScanParameter {
    /// DBSCAN neighbourhood radius
    Eps(f64),
    /// HDBSCAN minimum cluster size
    MinClusterSize(usize),
}

impl fmt::Display for ScanParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eps(eps) => write!(f, "eps={eps:.4}"),
            Self::MinClusterSize(size) => write!(f, "min_cluster_size={size}"),
        }
    }
}

/// Error types that can occur while binning contigs
#[derive(Error, Debug)]
pub enum MetabinError {
    /// Clustering family name or scan range is not recognized
    #[error("Invalid clustering method: {0}")]
    InvalidMethod(String),
    /// No marker hits at all, so completeness cannot be assessed
    #[error("No marker genes found for domain {domain}")]
    InsufficientMarkerData { domain: Domain },
    /// Input table is malformed (missing columns, duplicate ids, wrong shape)
    #[error("Table format error: {0}")]
    TableFormat(String),
    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// File I/O operation failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// Error parsing input data
    #[error("Parse error: {0}")]
    ParseError(String),
}
