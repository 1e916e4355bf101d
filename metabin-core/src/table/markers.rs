use std::collections::BTreeMap;

use tracing::warn;

use crate::table::ContigTable;
use crate::types::Domain;

/// Single-copy marker hits per contig for one domain.
///
/// Each contig maps to a multiset of marker identifiers: the same marker
/// listed twice on a contig means two copies were detected.
///
/// # Examples
///
/// ```rust
/// use metabin_core::table::MarkerTable;
/// use metabin_core::types::Domain;
///
/// let mut markers = MarkerTable::new(Domain::Bacteria);
/// markers.add_hit("contig_1", "PF00380");
/// markers.add_hit("contig_1", "PF00380");
/// markers.add_hit("contig_2", "PF00410");
///
/// assert_eq!(markers.hits("contig_1").len(), 2);
/// assert_eq!(markers.expected_markers(), 139);
/// ```
#[derive(Debug, Clone)]
pub struct MarkerTable {
    domain: Domain,
    expected_markers: usize,
    hits: BTreeMap<String, Vec<String>>,
}

impl MarkerTable {
    /// Empty table using the domain's default expected marker count
    #[must_use]
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            expected_markers: domain.expected_markers(),
            hits: BTreeMap::new(),
        }
    }

    /// Overrides the number of distinct markers expected per genome
    #[must_use]
    pub fn with_expected_markers(mut self, expected_markers: usize) -> Self {
        self.expected_markers = expected_markers;
        self
    }

    pub fn add_hit(&mut self, contig: &str, marker: &str) {
        self.hits
            .entry(contig.to_string())
            .or_default()
            .push(marker.to_string());
    }

    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    #[must_use]
    pub const fn expected_markers(&self) -> usize {
        self.expected_markers
    }

    /// Marker hits of one contig (empty for contigs without hits)
    #[must_use]
    pub fn hits(&self, contig: &str) -> &[String] {
        self.hits.get(contig).map_or(&[], Vec::as_slice)
    }

    /// Contigs with at least one hit, in id order
    pub fn contigs(&self) -> impl Iterator<Item = &str> {
        self.hits.keys().map(String::as_str)
    }

    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.hits.values().map(Vec::len).sum()
    }

    /// True when no contig carries any marker hit
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_hits() == 0
    }
}

/// Marker hits interned to integer ids and aligned with [`ContigTable`] rows.
#[derive(Debug, Clone)]
pub struct MarkerIndex {
    domain: Domain,
    expected_markers: usize,
    n_markers: usize,
    row_hits: Vec<Vec<u32>>,
}

impl MarkerIndex {
    /// Aligns `markers` to the rows of `table`.
    ///
    /// Hits on contigs that are not in the table cannot be clustered and are
    /// dropped with a warning.
    #[must_use]
    pub fn build(markers: &MarkerTable, table: &ContigTable) -> Self {
        let mut ids: BTreeMap<&str, u32> = BTreeMap::new();
        for contig in markers.contigs() {
            for marker in markers.hits(contig) {
                ids.entry(marker.as_str()).or_insert(0);
            }
        }
        for (next, id) in ids.values_mut().enumerate() {
            *id = next as u32;
        }

        let mut row_hits = vec![Vec::new(); table.len()];
        let mut unknown = 0usize;
        for contig in markers.contigs() {
            match table.row_of(contig) {
                Some(row) => {
                    row_hits[row] = markers
                        .hits(contig)
                        .iter()
                        .map(|marker| ids[marker.as_str()])
                        .collect();
                }
                None => unknown += 1,
            }
        }
        if unknown > 0 {
            warn!(
                contigs = unknown,
                "Ignoring marker hits on contigs missing from the contig table"
            );
        }

        Self {
            domain: markers.domain(),
            expected_markers: markers.expected_markers(),
            n_markers: ids.len(),
            row_hits,
        }
    }

    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    #[must_use]
    pub const fn expected_markers(&self) -> usize {
        self.expected_markers
    }

    /// Number of distinct marker ids seen anywhere
    #[must_use]
    pub fn n_markers(&self) -> usize {
        self.n_markers
    }

    #[must_use]
    pub fn hits(&self, row: usize) -> &[u32] {
        &self.row_hits[row]
    }

    /// True when no row carries any marker hit
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_hits.iter().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContigRecord;

    fn table(ids: &[&str]) -> ContigTable {
        ContigTable::new(
            ids.iter()
                .enumerate()
                .map(|(i, id)| ContigRecord::new(*id, vec![i as f64, 0.0]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_marker_table_multiset() {
        let mut markers = MarkerTable::new(Domain::Archaea);
        markers.add_hit("c1", "m1");
        markers.add_hit("c1", "m1");
        markers.add_hit("c2", "m2");
        assert_eq!(markers.hits("c1"), ["m1", "m1"]);
        assert!(markers.hits("c3").is_empty());
        assert_eq!(markers.total_hits(), 3);
        assert_eq!(markers.contigs().collect::<Vec<_>>(), vec!["c1", "c2"]);
        assert_eq!(markers.expected_markers(), 162);
        assert!(!markers.is_empty());
    }

    #[test]
    fn test_marker_table_expected_override() {
        let markers = MarkerTable::new(Domain::Bacteria).with_expected_markers(2);
        assert_eq!(markers.expected_markers(), 2);
        assert!(markers.is_empty());
    }

    #[test]
    fn test_marker_index_alignment() {
        let contigs = table(&["a", "b", "c"]);
        let mut markers = MarkerTable::new(Domain::Bacteria);
        markers.add_hit("c", "zeta");
        markers.add_hit("a", "alpha");
        markers.add_hit("a", "zeta");
        markers.add_hit("ghost", "alpha");

        let index = MarkerIndex::build(&markers, &contigs);
        assert_eq!(index.n_markers(), 2);
        assert_eq!(index.hits(0), [0, 1]);
        assert!(index.hits(1).is_empty());
        assert_eq!(index.hits(2), [1]);
        assert!(!index.is_empty());
        assert_eq!(index.domain(), Domain::Bacteria);
    }

    #[test]
    fn test_marker_index_empty_when_no_hits_match() {
        let contigs = table(&["a"]);
        let mut markers = MarkerTable::new(Domain::Bacteria);
        markers.add_hit("other", "m1");
        let index = MarkerIndex::build(&markers, &contigs);
        assert!(index.is_empty());
    }
}
