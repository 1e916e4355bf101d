use std::fmt;

use serde::{Serialize, Serializer};

use crate::constants::{BIN_NAME_PREFIX, BIN_NAME_WIDTH, UNCLUSTERED_LABEL};
use crate::types::{Domain, Quality, Rank, ScanParameter};

/// Final label of one contig: an accepted bin or the reserved
/// `unclustered` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BinLabel {
    Bin(String),
    Unclustered,
}

impl BinLabel {
    /// Name of the `number`-th accepted bin, counting from 1
    #[must_use]
    pub fn numbered(number: usize) -> Self {
        Self::Bin(format!("{BIN_NAME_PREFIX}{number:0BIN_NAME_WIDTH$}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bin(name) => name,
            Self::Unclustered => UNCLUSTERED_LABEL,
        }
    }

    #[must_use]
    pub const fn is_unclustered(&self) -> bool {
        matches!(self, Self::Unclustered)
    }
}

impl fmt::Display for BinLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BinLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An accepted bin. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinRecord {
    /// `bin_0001`, `bin_0002`, ... in acceptance order
    pub name: String,
    /// Member contig ids in contig table order
    pub contigs: Vec<String>,
    /// Scored from the union of the members' marker hits at acceptance
    pub quality: Quality,
    /// Scan value that produced the bin
    pub parameter: ScanParameter,
    /// Rank of the taxon subset the bin was found in (taxonomy mode)
    pub rank: Option<Rank>,
    /// Taxon of that subset; `None` is the unassigned subset
    pub taxon: Option<String>,
}

/// Label of one contig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContigAssignment {
    pub contig: String,
    #[serde(rename = "cluster")]
    pub label: BinLabel,
}

/// Trace of one productive clustering pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassRecord {
    pub rank: Option<Rank>,
    pub taxon: Option<String>,
    /// Pass number within its partition call, starting at 1
    pub iteration: usize,
    pub parameter: ScanParameter,
    pub bins_accepted: usize,
    /// Rows of the partition call left after the pass
    pub residual: usize,
}

/// Complete output of a binning run.
///
/// # Examples
///
/// ```rust,no_run
/// use metabin_core::engine::Binner;
/// use metabin_core::io::{read_contig_table, read_marker_table};
/// use metabin_core::types::Domain;
///
/// let table = read_contig_table("embedding.tsv")?;
/// let markers = read_marker_table("markers.tsv", Domain::Bacteria)?;
/// let results = Binner::new().bin(&table, &markers)?;
///
/// for bin in &results.bins {
///     println!("{}: {} contigs, {}", bin.name, bin.contigs.len(), bin.quality);
/// }
/// println!("{} contigs unclustered", results.n_unclustered());
/// # Ok::<(), metabin_core::types::MetabinError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinningResults {
    pub domain: Domain,
    /// Clustering method name
    pub method: String,
    /// One row per contig, in contig table order
    pub assignments: Vec<ContigAssignment>,
    /// Accepted bins in acceptance order
    pub bins: Vec<BinRecord>,
    /// Productive passes in execution order
    pub passes: Vec<PassRecord>,
}

impl BinningResults {
    /// Label of `contig`, if it is part of the run
    #[must_use]
    pub fn label_of(&self, contig: &str) -> Option<&BinLabel> {
        self.assignments
            .iter()
            .find(|assignment| assignment.contig == contig)
            .map(|assignment| &assignment.label)
    }

    #[must_use]
    pub fn bin(&self, name: &str) -> Option<&BinRecord> {
        self.bins.iter().find(|bin| bin.name == name)
    }

    #[must_use]
    pub fn n_unclustered(&self) -> usize {
        self.assignments
            .iter()
            .filter(|assignment| assignment.label.is_unclustered())
            .count()
    }

    /// `(contig, label)` pairs as plain strings
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.assignments
            .iter()
            .map(|assignment| (assignment.contig.as_str(), assignment.label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> BinningResults {
        BinningResults {
            domain: Domain::Bacteria,
            method: "density-eps-scan".to_string(),
            assignments: vec![
                ContigAssignment {
                    contig: "c1".to_string(),
                    label: BinLabel::numbered(1),
                },
                ContigAssignment {
                    contig: "c2".to_string(),
                    label: BinLabel::Unclustered,
                },
            ],
            bins: vec![BinRecord {
                name: "bin_0001".to_string(),
                contigs: vec!["c1".to_string()],
                quality: Quality::new(50.0, 100.0),
                parameter: ScanParameter::Eps(0.5),
                rank: None,
                taxon: None,
            }],
            passes: Vec::new(),
        }
    }

    #[test]
    fn test_bin_label_names() {
        assert_eq!(BinLabel::numbered(1).to_string(), "bin_0001");
        assert_eq!(BinLabel::numbered(12345).as_str(), "bin_12345");
        assert_eq!(BinLabel::Unclustered.to_string(), "unclustered");
        assert!(BinLabel::Unclustered.is_unclustered());
    }

    #[test]
    fn test_results_lookup() {
        let results = results();
        assert_eq!(results.label_of("c1"), Some(&BinLabel::numbered(1)));
        assert_eq!(results.label_of("c2"), Some(&BinLabel::Unclustered));
        assert_eq!(results.label_of("c3"), None);
        assert_eq!(results.n_unclustered(), 1);
        assert!(results.bin("bin_0001").is_some());
        assert_eq!(
            results.labels().collect::<Vec<_>>(),
            vec![("c1", "bin_0001"), ("c2", "unclustered")]
        );
    }

    #[test]
    fn test_assignment_serializes_label_as_string() {
        let json = serde_json::to_string(&results().assignments[1]).unwrap();
        assert_eq!(json, r#"{"contig":"c2","cluster":"unclustered"}"#);
    }
}
