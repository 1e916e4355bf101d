//! Completeness and purity of candidate bins from single-copy marker counts.
//!
//! Both scores are percentages:
//!
//! - completeness: distinct markers present at least once, over the number of
//!   markers expected once per genome
//! - purity: distinct markers present exactly once, over distinct markers
//!   present
//!
//! A duplicated marker lowers purity but never completeness. A contig set
//! without any marker hit scores `(0, 0)`.

use std::collections::{BTreeSet, HashMap};

use crate::constants::MAX_QUALITY_SCORE;
use crate::table::{MarkerIndex, MarkerTable};
use crate::types::Quality;

/// Scores a set of contig ids against a marker table.
///
/// `contig_ids` is treated as a set: listing a contig twice does not double
/// its markers.
///
/// # Examples
///
/// ```rust
/// use metabin_core::quality::score;
/// use metabin_core::table::MarkerTable;
/// use metabin_core::types::Domain;
///
/// let mut markers = MarkerTable::new(Domain::Bacteria).with_expected_markers(2);
/// markers.add_hit("a", "m1");
/// markers.add_hit("b", "m2");
///
/// let quality = score(&["a", "b"], &markers);
/// assert_eq!(quality.completeness, 100.0);
/// assert_eq!(quality.purity, 100.0);
/// ```
#[must_use]
pub fn score<S: AsRef<str>>(contig_ids: &[S], markers: &MarkerTable) -> Quality {
    let contigs: BTreeSet<&str> = contig_ids.iter().map(AsRef::as_ref).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for contig in contigs {
        for marker in markers.hits(contig) {
            *counts.entry(marker.as_str()).or_default() += 1;
        }
    }
    from_counts(counts.values().copied(), markers.expected_markers())
}

/// Scores table rows against an interned [`MarkerIndex`].
///
/// This is the hot path of the cluster search; rows are assumed distinct.
#[must_use]
pub fn score_rows(rows: &[usize], index: &MarkerIndex) -> Quality {
    let mut counts = vec![0usize; index.n_markers()];
    for &row in rows {
        for &marker in index.hits(row) {
            counts[marker as usize] += 1;
        }
    }
    from_counts(counts.into_iter(), index.expected_markers())
}

fn from_counts(counts: impl Iterator<Item = usize>, expected_markers: usize) -> Quality {
    let (present, single_copy) = counts
        .filter(|&count| count > 0)
        .fold((0usize, 0usize), |(present, single), count| {
            (present + 1, single + usize::from(count == 1))
        });

    if present == 0 || expected_markers == 0 {
        return Quality::default();
    }

    let completeness = present as f64 / expected_markers as f64 * MAX_QUALITY_SCORE;
    let purity = single_copy as f64 / present as f64 * MAX_QUALITY_SCORE;
    Quality::new(completeness, purity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ContigTable;
    use crate::types::{ContigRecord, Domain};
    use approx::assert_relative_eq;

    fn two_marker_table() -> MarkerTable {
        let mut markers = MarkerTable::new(Domain::Bacteria).with_expected_markers(2);
        markers.add_hit("A", "m1");
        markers.add_hit("B", "m2");
        markers.add_hit("C", "m1");
        markers
    }

    #[test]
    fn test_score_complete_and_pure() {
        let quality = score(&["A", "B"], &two_marker_table());
        assert_relative_eq!(quality.completeness, 100.0);
        assert_relative_eq!(quality.purity, 100.0);
    }

    #[test]
    fn test_duplicate_marker_lowers_purity_only() {
        let quality = score(&["A", "B", "C"], &two_marker_table());
        assert_relative_eq!(quality.completeness, 100.0);
        assert_relative_eq!(quality.purity, 50.0);
    }

    #[test]
    fn test_score_empty_and_markerless() {
        let markers = two_marker_table();
        assert_eq!(score::<&str>(&[], &markers), Quality::default());
        assert_eq!(score(&["unknown"], &markers), Quality::default());
    }

    #[test]
    fn test_score_treats_ids_as_set() {
        let quality = score(&["A", "A"], &two_marker_table());
        assert_relative_eq!(quality.completeness, 50.0);
        assert_relative_eq!(quality.purity, 100.0);
    }

    #[test]
    fn test_multi_copy_on_one_contig() {
        let mut markers = MarkerTable::new(Domain::Archaea);
        markers.add_hit("x", "m1");
        markers.add_hit("x", "m1");
        markers.add_hit("x", "m2");
        let quality = score(&["x"], &markers);
        assert_relative_eq!(quality.completeness, 2.0 / 162.0 * 100.0);
        assert_relative_eq!(quality.purity, 50.0);
    }

    #[test]
    fn test_score_rows_matches_score() {
        let table = ContigTable::new(vec![
            ContigRecord::new("A", vec![0.0]),
            ContigRecord::new("B", vec![1.0]),
            ContigRecord::new("C", vec![2.0]),
        ])
        .unwrap();
        let markers = two_marker_table();
        let index = MarkerIndex::build(&markers, &table);

        assert_eq!(score_rows(&[0, 1], &index), score(&["A", "B"], &markers));
        assert_eq!(
            score_rows(&[0, 1, 2], &index),
            score(&["A", "B", "C"], &markers)
        );
        assert_eq!(score_rows(&[], &index), Quality::default());
    }

    #[test]
    fn test_scores_stay_in_range() {
        let mut markers = MarkerTable::new(Domain::Bacteria).with_expected_markers(1);
        markers.add_hit("a", "m1");
        markers.add_hit("a", "m2");
        markers.add_hit("a", "m3");
        let quality = score(&["a"], &markers);
        assert_relative_eq!(quality.completeness, 100.0);
        assert_relative_eq!(quality.purity, 100.0);
    }
}
