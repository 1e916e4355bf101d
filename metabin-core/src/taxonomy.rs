//! Splitting contig rows by their taxon at one rank.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::table::ContigTable;
use crate::types::Rank;

/// Rows sharing one taxon at one rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonSubset {
    pub rank: Rank,
    /// `None` for contigs without a taxon at `rank`
    pub taxon: Option<String>,
    /// Rows in input order
    pub rows: Vec<usize>,
}

impl TaxonSubset {
    /// Taxon name, or `unassigned`
    #[must_use]
    pub fn name(&self) -> &str {
        self.taxon.as_deref().unwrap_or("unassigned")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Groups `rows` by taxon at `rank`.
///
/// Subsets come in taxon name order; a trailing unassigned subset is present
/// only when some row has no taxon at `rank`. Subsets are disjoint and cover
/// every input row.
///
/// # Examples
///
/// ```rust
/// use metabin_core::table::ContigTable;
/// use metabin_core::taxonomy::split;
/// use metabin_core::types::{ContigRecord, Lineage, Rank};
///
/// let table = ContigTable::new(vec![
///     ContigRecord::new("a", vec![0.0])
///         .with_lineage(Lineage::new().with(Rank::Phylum, "Proteobacteria")),
///     ContigRecord::new("b", vec![1.0])
///         .with_lineage(Lineage::new().with(Rank::Phylum, "Firmicutes")),
///     ContigRecord::new("c", vec![2.0]),
/// ])?;
///
/// let subsets = split(&table.all_rows(), &table, Rank::Phylum);
/// let names: Vec<&str> = subsets.iter().map(|s| s.name()).collect();
/// assert_eq!(names, ["Firmicutes", "Proteobacteria", "unassigned"]);
/// # Ok::<(), metabin_core::types::MetabinError>(())
/// ```
#[must_use]
pub fn split(rows: &[usize], table: &ContigTable, rank: Rank) -> Vec<TaxonSubset> {
    let mut by_taxon: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut unassigned = Vec::new();

    for &row in rows {
        match table.lineage(row).and_then(|lineage| lineage.taxon(rank)) {
            Some(taxon) => by_taxon.entry(taxon).or_default().push(row),
            None => unassigned.push(row),
        }
    }

    let mut subsets: Vec<TaxonSubset> = by_taxon
        .into_iter()
        .map(|(taxon, rows)| TaxonSubset {
            rank,
            taxon: Some(taxon.to_string()),
            rows,
        })
        .collect();
    if !unassigned.is_empty() {
        subsets.push(TaxonSubset {
            rank,
            taxon: None,
            rows: unassigned,
        });
    }
    subsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContigRecord, Lineage};

    fn table() -> ContigTable {
        let lineage = |phylum: &str, genus: &str| {
            Lineage::new()
                .with(Rank::Superkingdom, "Bacteria")
                .with(Rank::Phylum, phylum)
                .with(Rank::Genus, genus)
        };
        ContigTable::new(vec![
            ContigRecord::new("a", vec![0.0]).with_lineage(lineage("Firmicutes", "Bacillus")),
            ContigRecord::new("b", vec![1.0]).with_lineage(lineage("Actinobacteria", "unclassified")),
            ContigRecord::new("c", vec![2.0]),
            ContigRecord::new("d", vec![3.0]).with_lineage(lineage("Firmicutes", "Clostridium")),
        ])
        .unwrap()
    }

    #[test]
    fn test_split_orders_by_taxon_then_unassigned() {
        let table = table();
        let subsets = split(&table.all_rows(), &table, Rank::Phylum);
        assert_eq!(subsets.len(), 3);
        assert_eq!(subsets[0].taxon.as_deref(), Some("Actinobacteria"));
        assert_eq!(subsets[0].rows, vec![1]);
        assert_eq!(subsets[1].taxon.as_deref(), Some("Firmicutes"));
        assert_eq!(subsets[1].rows, vec![0, 3]);
        assert_eq!(subsets[2].name(), "unassigned");
        assert_eq!(subsets[2].rows, vec![2]);
    }

    #[test]
    fn test_split_unclassified_is_unassigned() {
        let table = table();
        let subsets = split(&table.all_rows(), &table, Rank::Genus);
        let names: Vec<&str> = subsets.iter().map(TaxonSubset::name).collect();
        assert_eq!(names, ["Bacillus", "Clostridium", "unassigned"]);
        assert_eq!(subsets[2].rows, vec![1, 2]);
    }

    #[test]
    fn test_split_without_unassigned_rows() {
        let table = table();
        let subsets = split(&[0, 3], &table, Rank::Superkingdom);
        assert_eq!(subsets.len(), 1);
        assert_eq!(subsets[0].len(), 2);
        assert_eq!(subsets[0].rank, Rank::Superkingdom);
    }

    #[test]
    fn test_split_partitions_input() {
        let table = table();
        for rank in Rank::CANONICAL {
            let mut rows: Vec<usize> = split(&table.all_rows(), &table, rank)
                .into_iter()
                .flat_map(|subset| subset.rows)
                .collect();
            rows.sort_unstable();
            assert_eq!(rows, table.all_rows());
        }
        assert!(split(&[], &table, Rank::Phylum).is_empty());
    }
}
